//! Route guard wrapper for protected pages.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use crate::backend::models::Role;
use crate::backend::services::{GuardView, RedirectTarget, RouteGuard};
use crate::frontend::app::Route;
use crate::frontend::components::config_error::ConfigError;
use crate::frontend::components::loading::{LoadingPanel, Spinner};
use crate::frontend::services::{AppServices, AuthContext};
use dioxus::prelude::*;
use dioxus_router::use_navigator;

/// Interval at which loading escalation is re-evaluated.
const TICK: Duration = Duration::from_millis(250);

#[component]
pub fn ProtectedRoute(
    /// Location being guarded, remembered for the login redirect.
    #[props(into)]
    path: String,
    #[props(default)] admin_only: bool,
    children: Element,
) -> Element {
    let services = use_context::<AppServices>();
    let auth = use_context::<AuthContext>();
    let nav = use_navigator();

    let guard = use_hook(|| {
        Rc::new(RefCell::new(RouteGuard::new(
            services.is_configured(),
            admin_only.then_some(Role::Admin),
            services.clock.clone(),
            services.guard,
        )))
    });
    let mut verified = use_signal(|| false);
    let mut tick = use_signal(|| 0_u64);

    // Independent session check on mount; a live session the store missed
    // is adopted before the guard decides
    use_future({
        let store = services.store.clone();
        move || {
            let store = store.clone();
            async move {
                if let Some(store) = store {
                    match store.sync_session().await {
                        Some(session) => log::debug!("Session valid for {}", session.user.id),
                        None => log::debug!("No session on protected route"),
                    }
                }
                verified.set(true);
            }
        }
    });

    use_future(move || async move {
        loop {
            tokio::time::sleep(TICK).await;
            tick += 1;
        }
    });

    let view = use_memo({
        let guard = guard.clone();
        move || {
            tick.read();
            let mut guard = guard.borrow_mut();
            if verified() {
                guard.mark_session_verified();
            }
            guard.view(&auth.state.read(), &path)
        }
    });

    use_effect(move || {
        if let GuardView::Redirect(target) = view() {
            let route = match target {
                RedirectTarget::Login { from } => Route::Login { from },
                RedirectTarget::Panel => Route::Panel {},
            };
            nav.replace(route);
        }
    });

    match view() {
        GuardView::ConfigError => rsx! { ConfigError {} },
        GuardView::VerifyingSession => rsx! { Spinner { message: "Verificando sessão..." } },
        GuardView::Loading(stage) => rsx! { LoadingPanel { stage } },
        GuardView::Redirect(_) => rsx! { Spinner { message: "Redirecionando..." } },
        GuardView::Authorized => rsx! { {children} },
    }
}

use crate::frontend::app::Route;
use crate::frontend::services::{AppServices, AuthContext};
use dioxus::prelude::*;
use dioxus_router::{use_navigator, use_route};

#[component]
pub fn Navigation() -> Element {
    let nav = use_navigator();
    let route = use_route::<Route>();
    let services = use_context::<AppServices>();
    let auth = use_context::<AuthContext>();
    let mut signing_out = use_signal(|| false);

    let active_tab = match route {
        Route::Panel {} => "Panel",
        Route::Admin {} => "Admin",
        _ => "",
    };

    let state = auth.state.read();
    let is_admin = state.is_admin();
    let role_label = state.role().map(|r| r.label()).unwrap_or_default();
    let name = auth.display_name();
    drop(state);

    let on_sign_out = move |_| {
        let store = services.store.clone();
        signing_out.set(true);
        spawn(async move {
            if let Some(store) = store {
                store.sign_out().await;
            }
            signing_out.set(false);
            nav.replace(Route::Login { from: String::new() });
        });
    };

    rsx! {
        nav { class: "navigation",
            span { class: "nav-brand", "Academia" }
            ul { class: "nav-items",
                li {
                    class: if active_tab == "Panel" { "nav-item active" } else { "nav-item" },
                    onclick: move |_| { nav.push(Route::Panel {}); },
                    span { class: "nav-text", "Painel" }
                }
                if is_admin {
                    li {
                        class: if active_tab == "Admin" { "nav-item active" } else { "nav-item" },
                        onclick: move |_| { nav.push(Route::Admin {}); },
                        span { class: "nav-text", "Administração" }
                    }
                }
            }
            div { class: "nav-user",
                span { class: "nav-user-name", "{name}" }
                if !role_label.is_empty() {
                    span { class: "nav-user-role", "{role_label}" }
                }
                button {
                    class: "nav-sign-out",
                    disabled: signing_out(),
                    onclick: on_sign_out,
                    if signing_out() { "Saindo..." } else { "Sair" }
                }
            }
        }
    }
}

use crate::backend::services::LoadingStage;
use crate::backend::services::diagnostics::CheckOutcome;
use crate::frontend::app::Route;
use crate::frontend::components::toast::Toasts;
use crate::frontend::services::{AppServices, AuthContext, use_database_check};
use dioxus::prelude::*;
use dioxus_router::use_navigator;

#[component]
pub fn Spinner(message: &'static str) -> Element {
    rsx! {
        div { class: "loading",
            div { class: "spinner" }
            p { class: "loading-message", "{message}" }
        }
    }
}

/// Shown while the store settles; grows recovery actions and diagnostics
/// as the wait gets longer.
#[component]
pub fn LoadingPanel(stage: LoadingStage) -> Element {
    let services = use_context::<AppServices>();
    let auth = use_context::<AuthContext>();
    let mut toasts = use_context::<Toasts>();
    let nav = use_navigator();
    let check = use_database_check();

    let last_error = auth
        .state
        .read()
        .auth_error
        .as_ref()
        .map(ToString::to_string)
        .unwrap_or_default();

    let retry = {
        let store = services.store.clone();
        move |_| {
            let store = store.clone();
            spawn(async move {
                let Some(store) = store else { return };
                if let Err(e) = store.retry_profile_fetch().await {
                    toasts.error(format!("Falha ao recarregar o perfil: {e}"));
                }
            });
        }
    };

    let reset = {
        let store = services.store.clone();
        move |_| {
            let store = store.clone();
            spawn(async move {
                if let Some(store) = store {
                    store.reset_auth_state().await;
                }
                toasts.info("Estado de autenticação reiniciado");
                nav.replace(Route::Login { from: String::new() });
            });
        }
    };

    let force_logout = {
        let store = services.store.clone();
        move |_| {
            let store = store.clone();
            spawn(async move {
                if let Some(store) = store {
                    store.sign_out().await;
                }
                nav.replace(Route::Login { from: String::new() });
            });
        }
    };

    let run_check = {
        let check = check.clone();
        move |_| check.run(auth.user_id())
    };

    let report = check.report.read().clone();

    rsx! {
        div { class: "loading",
            div { class: "spinner" }
            p { class: "loading-message", "Carregando seu perfil..." }

            if stage.offers_recovery() {
                div { class: "loading-panel",
                    p { "Isso está demorando mais que o esperado." }
                    div { class: "loading-actions",
                        button { onclick: retry, "Tentar novamente" }
                        button { onclick: reset, "Reiniciar autenticação" }
                        button { class: "danger", onclick: force_logout, "Forçar saída" }
                    }
                }
            }

            if stage.shows_diagnostics() {
                div { class: "loading-diagnostics",
                    if !last_error.is_empty() {
                        p { class: "loading-error", "Último erro: {last_error}" }
                    }
                    button {
                        disabled: (check.running)(),
                        onclick: run_check,
                        if (check.running)() { "Verificando..." } else { "Verificar banco de dados" }
                    }
                    if let Some(report) = report {
                        p {
                            class: if matches!(report.outcome, CheckOutcome::Failed(_)) { "report report-failed" } else { "report" },
                            "{report}"
                        }
                    }
                }
            }
        }
    }
}

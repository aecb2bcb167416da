use crate::backend::services::FirstAccess as FirstAccessService;
use crate::backend::services::guard::is_settling;
use crate::frontend::app::Route;
use crate::frontend::components::AuthLayout;
use crate::frontend::components::config_error::ConfigError;
use crate::frontend::components::toast::Toasts;
use crate::frontend::services::{AppServices, AuthContext};
use crate::utils::error::AuthError;
use dioxus::prelude::*;
use dioxus_router::{Link, use_navigator};

/// Public while no administrator exists; afterwards it forwards to login.
#[component]
pub fn FirstAccess() -> Element {
    let services = use_context::<AppServices>();
    let auth = use_context::<AuthContext>();
    let mut toasts = use_context::<Toasts>();
    let nav = use_navigator();
    let mut claiming = use_signal(|| false);

    let store = services.store.clone();
    let open = use_resource(move || {
        let store = store.clone();
        async move {
            match store {
                Some(store) => FirstAccessService::new(store).is_open().await,
                None => Err(AuthError::NotConfigured),
            }
        }
    });

    use_effect(move || {
        if let Some(Ok(false)) = &*open.read() {
            log::info!("First access already completed, leaving /primeiro-acesso");
            nav.replace(Route::Login { from: String::new() });
        }
    });

    if !services.is_configured() {
        return rsx! { ConfigError {} };
    }

    let claim = {
        let store = services.store.clone();
        move |_| {
            let Some(store) = store.clone() else { return };
            claiming.set(true);
            spawn(async move {
                match FirstAccessService::new(store).claim_admin().await {
                    Ok(_) => {
                        toasts.success("Você agora é administrador.");
                        nav.replace(Route::Admin {});
                    }
                    Err(e) => toasts.error(format!("Não foi possível concluir: {e}")),
                }
                claiming.set(false);
            });
        }
    };

    let state = auth.state.read();
    // A failed profile load falls through to the claim, which refetches
    let settling = is_settling(&state) && state.auth_error.is_none();
    let signed_in = state.is_authenticated();
    drop(state);

    let body = match &*open.read() {
        None => rsx! { p { class: "muted", "Verificando..." } },
        Some(Ok(true)) if settling => rsx! { p { class: "muted", "Carregando sua conta..." } },
        Some(Ok(true)) if signed_in => rsx! {
            p { "Nenhum administrador foi cadastrado. Assuma a administração desta academia." }
            button {
                disabled: claiming(),
                onclick: claim,
                if claiming() { "Concluindo..." } else { "Tornar-me administrador" }
            }
        },
        Some(Ok(true)) => rsx! {
            p { "Nenhum administrador foi cadastrado. Entre com sua conta para continuar." }
            Link {
                to: Route::Login { from: "/primeiro-acesso".to_string() },
                "Entrar"
            }
        },
        Some(Ok(false)) => rsx! { p { class: "muted", "Redirecionando..." } },
        Some(Err(e)) => rsx! { p { class: "error-message", "Falha ao verificar: {e}" } },
    };

    rsx! {
        AuthLayout {
            div { class: "card first-access",
                h1 { "Primeiro acesso" }
                {body}
            }
        }
    }
}

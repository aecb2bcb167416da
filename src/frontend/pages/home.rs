use crate::backend::services::guard::landing_path;
use crate::frontend::components::config_error::ConfigError;
use crate::frontend::components::loading::Spinner;
use crate::frontend::services::{AppServices, AuthContext};
use dioxus::prelude::*;
use dioxus_router::use_navigator;

/// Root route: waits for the session, then forwards.
#[component]
pub fn Home() -> Element {
    let services = use_context::<AppServices>();
    let auth = use_context::<AuthContext>();
    let nav = use_navigator();

    use_effect(move || {
        if let Some(path) = landing_path(&auth.state.read()) {
            nav.replace(path);
        }
    });

    if !services.is_configured() {
        return rsx! { ConfigError {} };
    }

    rsx! { Spinner { message: "Carregando..." } }
}

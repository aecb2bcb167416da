use crate::backend::utils::config::{ANON_KEY_ENV, URL_ENV};
use crate::backend::utils::paths::app_dir_or_local;
use crate::frontend::components::AuthLayout;
use dioxus::prelude::*;

/// Terminal screen for a missing backend configuration.
#[component]
pub fn ConfigError() -> Element {
    let config_path = app_dir_or_local().join("config.json");
    let config_path = config_path.display().to_string();

    rsx! {
        AuthLayout {
            div { class: "card config-error",
                h1 { "Configuração ausente" }
                p { "O endereço do servidor ou a chave pública não foram configurados." }
                p {
                    "Defina "
                    code { "{URL_ENV}" }
                    " e "
                    code { "{ANON_KEY_ENV}" }
                    ", ou preencha "
                    code { "{config_path}" }
                    "."
                }
            }
        }
    }
}

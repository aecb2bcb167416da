use crate::frontend::app::Route;
use crate::frontend::components::AuthLayout;
use dioxus::prelude::*;
use dioxus_router::Link;

#[component]
pub fn NotFound(segments: Vec<String>) -> Element {
    let path = format!("/{}", segments.join("/"));
    log::info!("No route for {path}");

    rsx! {
        AuthLayout {
            div { class: "card",
                h1 { "Página não encontrada" }
                p { "Nada em " code { "{path}" } "." }
                Link { to: Route::Home {}, "Voltar ao início" }
            }
        }
    }
}

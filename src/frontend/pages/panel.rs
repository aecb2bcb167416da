use crate::frontend::app::Route;
use crate::frontend::components::ProtectedRoute;
use crate::frontend::services::AuthContext;
use dioxus::prelude::*;
use dioxus_router::Link;

#[component]
pub fn Panel() -> Element {
    rsx! {
        ProtectedRoute { path: "/painel", PanelContent {} }
    }
}

#[component]
fn PanelContent() -> Element {
    let auth = use_context::<AuthContext>();
    let state = auth.state.read();
    let name = auth.display_name();
    let role = state.role().map(|r| r.label()).unwrap_or_default();
    let email = state
        .profile
        .as_ref()
        .map(|p| p.email.clone())
        .unwrap_or_default();
    let is_admin = state.is_admin();

    rsx! {
        section { class: "page panel",
            h1 { "Olá, {name}" }
            p { class: "muted", "{email} · {role}" }
            div { class: "cards",
                div { class: "card",
                    h2 { "Turmas" }
                    p { "Acompanhe suas turmas e a presença dos alunos." }
                }
                if is_admin {
                    div { class: "card",
                        h2 { "Administração" }
                        p { "Gerencie professores e verifique o banco de dados." }
                        Link { to: Route::Admin {}, "Abrir administração" }
                    }
                }
            }
        }
    }
}

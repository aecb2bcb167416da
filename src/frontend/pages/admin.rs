use crate::frontend::components::ProtectedRoute;
use crate::frontend::services::{AuthContext, use_database_check};
use dioxus::prelude::*;

#[component]
pub fn Admin() -> Element {
    rsx! {
        ProtectedRoute { path: "/admin", admin_only: true, AdminContent {} }
    }
}

#[component]
fn AdminContent() -> Element {
    let auth = use_context::<AuthContext>();
    let check = use_database_check();

    // Check once on open
    use_hook({
        let check = check.clone();
        move || check.run(auth.user_id())
    });

    let run_check = {
        let check = check.clone();
        move |_| check.run(auth.user_id())
    };
    let report = check.report.read().clone();

    rsx! {
        section { class: "page admin",
            h1 { "Administração" }
            div { class: "card",
                h2 { "Banco de dados" }
                {
                    match report {
                        Some(report) => rsx! {
                            p { class: if report.is_healthy() { "report" } else { "report report-failed" }, "{report}" }
                        },
                        None => rsx! { p { class: "muted", "Nenhuma verificação ainda." } },
                    }
                }
                button {
                    disabled: (check.running)(),
                    onclick: run_check,
                    if (check.running)() { "Verificando..." } else { "Verificar novamente" }
                }
            }
        }
    }
}

use crate::frontend::app::Route;
use crate::frontend::assets::ResourceLoader;
use crate::frontend::components::navigation::Navigation;
use dioxus::prelude::*;
use dioxus_router::Outlet;

/// Centered card layout for the login and first-access pages.
#[component]
pub fn AuthLayout(children: Element) -> Element {
    let mut show_ui = use_signal(|| false);

    use_effect(move || {
        spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
            show_ui.set(true);
        });
    });

    rsx! {
        style { dangerous_inner_html: ResourceLoader::get_css("auth") }

        div {
            class: if show_ui() { "auth-container fade-in" } else { "auth-container fade-out" },
            {children}
        }
    }
}

/// Navigation bar above the authenticated pages.
#[component]
pub fn AppShell() -> Element {
    rsx! {
        div { class: "shell",
            Navigation {}
            main { class: "shell-content", Outlet::<Route> {} }
        }
    }
}

//! Application routing system.

use crate::frontend::components::layout::AppShell;
use crate::frontend::pages::{
    admin::Admin, first_access::FirstAccess, home::Home, login::Login, not_found::NotFound,
    panel::Panel,
};

use dioxus::prelude::*;
use dioxus_router::Routable;

/// Main routing enum for the application.
#[derive(Clone, Routable, Debug, PartialEq, Eq)]
#[rustfmt::skip]
pub enum Route {
    /// Sends the visitor to the panel or to login once the session is known.
    #[route("/")]
    Home {},
    /// Login, remembering where the visitor was headed.
    #[route("/login?:from")]
    Login { from: String },
    /// Administrator bootstrap while no administrator exists.
    #[route("/primeiro-acesso")]
    FirstAccess {},
    #[layout(AppShell)]
        /// Default authenticated landing page.
        #[route("/painel")]
        Panel {},
        /// Administrators only.
        #[route("/admin")]
        Admin {},
    #[end_layout]
    #[route("/:..segments")]
    NotFound { segments: Vec<String> },
}

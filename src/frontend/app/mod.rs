//! Application shell and routing.

pub mod root;
pub mod routes;

pub use root::App;
pub use routes::Route;

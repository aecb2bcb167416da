//! Routed pages.

pub mod admin;
pub mod first_access;
pub mod home;
pub mod login;
pub mod not_found;
pub mod panel;

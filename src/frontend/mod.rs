//! Frontend module for the back-office.

pub mod app;
pub mod assets;
pub mod components;
pub mod pages;
pub mod services;

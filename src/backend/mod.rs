//! Backend of the application.

pub mod hosted;
pub mod models;
pub mod provider;
pub mod services;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use hosted::HostedBackend;

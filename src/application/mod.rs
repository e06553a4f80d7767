//! Application layer with pipeline services that need no I/O.

/// Application services.
pub mod services;

pub use services::DispatchRegistry;

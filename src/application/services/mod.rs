pub mod dispatch_registry;

pub use dispatch_registry::DispatchRegistry;

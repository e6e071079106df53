//! Business logic services for the application layer.

pub mod cleanup_service;
pub mod resolver_service;

pub use cleanup_service::{CleanupReport, CleanupService};
pub use resolver_service::LinkResolver;

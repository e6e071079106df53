//! Repository trait definitions for the domain layer.
//!
//! The trait defines the contract for durable link storage; concrete
//! implementations live in `crate::infrastructure::persistence`. A mock
//! implementation is auto-generated via `mockall` for unit tests.

pub mod link_repository;

pub use link_repository::LinkRepository;

#[cfg(test)]
pub use link_repository::MockLinkRepository;

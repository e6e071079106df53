//! Core domain entities representing the business data model.
//!
//! # Entity Types
//!
//! - [`Link`] - A shortened URL mapping with access metadata
//! - [`LinkStats`] - A point-in-time statistics snapshot, safe to cache
//!
//! # Design Pattern
//!
//! Entities follow the "New Type" pattern with separate structs for creation
//! and mutation: [`NewLink`] for inserts, [`LinkUpdate`] for partial updates.

pub mod link;
pub mod stats;

pub use link::{Link, LinkUpdate, NewLink};
pub use stats::LinkStats;

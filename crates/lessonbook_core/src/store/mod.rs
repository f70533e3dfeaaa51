//! In-memory entity store.
//!
//! # Responsibility
//! - Hold the canonical, id-unique collections of students and lessons.
//! - Expose lookups and whole-record add/remove/replace.
//!
//! # Invariants
//! - Store operations never edit relationship sets; the relationship
//!   synchronizer owns both sides of every edge.

pub mod entity_store;

pub use entity_store::{BrokenEdge, EntityStore, EntityTable, StoreError, StoreResult};

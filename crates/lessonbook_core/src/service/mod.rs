//! Use-case services over the entity store.
//!
//! # Responsibility
//! - Keep both sides of every enrollment edge in step.
//! - Offer the book facade that owns the store and id allocators.

pub mod book;
pub mod relationship;

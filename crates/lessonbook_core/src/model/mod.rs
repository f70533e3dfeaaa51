//! Domain model for students, lessons and their identities.
//!
//! # Responsibility
//! - Define canonical records and validated field values.
//! - Define the id types and the per-kind id allocator.
//!
//! # Invariants
//! - Every record is identified by a stable integer id.
//! - Relationship sets hold partner ids, never embedded records.

pub mod fields;
pub mod id;
pub mod lesson;
pub mod person;

use crate::model::id::EntityId;
use std::collections::BTreeSet;

/// Record held by the entity store.
pub trait Entity: Clone {
    type Id: EntityId;
    /// Id type of the records on the other side of the relationship.
    type PartnerId: EntityId;

    fn id(&self) -> Self::Id;

    /// Ids of the partner records this record is linked to.
    fn partners(&self) -> &BTreeSet<Self::PartnerId>;

    /// Identity equality: same id, attributes and partners ignored.
    /// `PartialEq` on the records is full-value equality.
    fn is_same(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

/// Mutable access to the relationship set. Crate-private so only the
/// synchronizer and the decoder can touch one side of an edge.
pub(crate) trait Linked: Entity {
    fn partners_mut(&mut self) -> &mut BTreeSet<Self::PartnerId>;
}

//! Relationship synchronizer for student/lesson enrollment edges.
//!
//! # Responsibility
//! - Apply enroll/withdraw to both sides of an edge in one call.
//! - Carry edges across edits and strip them on delete.
//!
//! # Invariants
//! - For every stored student P and lesson L:
//!   `P.lessons ∋ L.id ⇔ L.students ∋ P.id` once any call returns.
//! - Every check runs before the first mutation, so a failed call leaves
//!   the store untouched.
//! - A partner that does not mirror an edge is reported as
//!   `PartnerNotFound` and never patched silently.
//! - Edit and delete hooks refuse to run while the store still holds the
//!   record under the id being retired.

use crate::model::id::{EntityId, EntityKind, LessonId, StudentId};
use crate::model::lesson::Lesson;
use crate::model::person::Person;
use crate::model::{Entity, Linked};
use crate::store::entity_store::{EntityStore, EntityTable, StoreError, Stored};
use log::{error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Relationship synchronizer errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// The referenced record is not in the store. Caller bug.
    EntityNotRegistered { kind: EntityKind, id: u32 },
    /// An edge of `kind`/`id` is not mirrored by its partner. The
    /// bidirectional invariant was already broken before the call.
    PartnerNotFound {
        kind: EntityKind,
        id: u32,
        partner_kind: EntityKind,
        partner_id: u32,
    },
    /// A delete or identity-changing edit hook ran while `kind`/`id` is
    /// still stored. The caller skipped the store mutation.
    StillRegistered { kind: EntityKind, id: u32 },
    /// `edit_*` was handed a record whose id differs from the target.
    IdentityChange {
        kind: EntityKind,
        id: u32,
        edited_id: u32,
    },
    /// Store-level failure while replacing or removing a record.
    Store(StoreError),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EntityNotRegistered { kind, id } => {
                write!(f, "{kind} {id} is not registered in the store")
            }
            Self::PartnerNotFound {
                kind,
                id,
                partner_kind,
                partner_id,
            } => write!(
                f,
                "{partner_kind} {partner_id} does not mirror its edge to {kind} {id}"
            ),
            Self::StillRegistered { kind, id } => {
                write!(f, "{kind} {id} is still in the store; remove or replace it first")
            }
            Self::IdentityChange {
                kind,
                id,
                edited_id,
            } => write!(f, "edit of {kind} {id} cannot change its id to {edited_id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::EntityNotRegistered { .. }
            | Self::PartnerNotFound { .. }
            | Self::StillRegistered { .. }
            | Self::IdentityChange { .. } => None,
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Operation layer that owns both sides of every enrollment edge.
///
/// Borrows the store mutably for its lifetime, so no other code path can
/// update one side while a synchronizer call is in progress.
pub struct RelationshipSynchronizer<'store> {
    store: &'store mut EntityStore,
}

impl<'store> RelationshipSynchronizer<'store> {
    pub fn new(store: &'store mut EntityStore) -> Self {
        Self { store }
    }

    /// Read-only view of the underlying store.
    pub fn store(&self) -> &EntityStore {
        &*self.store
    }

    /// Returns whether the student is enrolled in the lesson.
    ///
    /// Commands use this to report "already assigned" before `enroll`.
    pub fn is_enrolled(&self, student_id: StudentId, lesson_id: LessonId) -> SyncResult<bool> {
        self.ensure_registered(student_id, lesson_id)?;
        Ok(self
            .store
            .get_person(student_id)
            .is_some_and(|person| person.has_lesson(lesson_id)))
    }

    /// Adds the edge on both sides.
    ///
    /// Does not check for an existing edge; that is the caller's
    /// domain-level decision.
    pub fn enroll(&mut self, student_id: StudentId, lesson_id: LessonId) -> SyncResult<()> {
        self.ensure_registered(student_id, lesson_id)?;
        let (persons, lessons) = self.store.tables_mut();
        if let (Some(person), Some(lesson)) =
            (persons.get_mut(student_id), lessons.get_mut(lesson_id))
        {
            person.partners_mut().insert(lesson_id);
            lesson.partners_mut().insert(student_id);
        }
        info!(
            "event=enroll module=relationship status=ok student_id={} lesson_id={}",
            student_id.value(),
            lesson_id.value()
        );
        Ok(())
    }

    /// Removes the edge from both sides.
    pub fn withdraw(&mut self, student_id: StudentId, lesson_id: LessonId) -> SyncResult<()> {
        self.ensure_registered(student_id, lesson_id)?;
        let (persons, lessons) = self.store.tables_mut();
        if let (Some(person), Some(lesson)) =
            (persons.get_mut(student_id), lessons.get_mut(lesson_id))
        {
            person.partners_mut().remove(&lesson_id);
            lesson.partners_mut().remove(&student_id);
        }
        info!(
            "event=withdraw module=relationship status=ok student_id={} lesson_id={}",
            student_id.value(),
            lesson_id.value()
        );
        Ok(())
    }

    /// Repoints every lesson enrolled by `original` to the edited student
    /// and copies the lesson set onto the edited record.
    ///
    /// Call right after the store replaced `original` with `edited_id`.
    ///
    /// # Errors
    /// - `StillRegistered` when the id changed but `original` is still stored.
    /// - `EntityNotRegistered` when `edited_id` is not stored.
    pub fn on_person_edit(&mut self, original: &Person, edited_id: StudentId) -> SyncResult<()> {
        propagate_edit(self.store, original, edited_id)
    }

    /// Lesson counterpart of [`Self::on_person_edit`].
    pub fn on_lesson_edit(&mut self, original: &Lesson, edited_id: LessonId) -> SyncResult<()> {
        propagate_edit(self.store, original, edited_id)
    }

    /// Strips a removed student from every enrolled lesson.
    ///
    /// # Errors
    /// - `StillRegistered` when `removed` has not been taken out of the store.
    pub fn on_person_delete(&mut self, removed: &Person) -> SyncResult<()> {
        propagate_delete(self.store, removed)
    }

    /// Strips a removed lesson from every enrolled student.
    pub fn on_lesson_delete(&mut self, removed: &Lesson) -> SyncResult<()> {
        propagate_delete(self.store, removed)
    }

    /// Replaces a student record and carries its enrollments over.
    ///
    /// Any lesson set on `edited` is discarded; the new set is the one the
    /// replaced record had. Returns the replaced record.
    ///
    /// Ids come from the book's allocators, so `edited` must keep `target`;
    /// identity changes go through the store plus [`Self::on_person_edit`].
    pub fn edit_person(&mut self, target: StudentId, edited: Person) -> SyncResult<Person> {
        edit_record(self.store, target, edited)
    }

    /// Lesson counterpart of [`Self::edit_person`].
    pub fn edit_lesson(&mut self, target: LessonId, edited: Lesson) -> SyncResult<Lesson> {
        edit_record(self.store, target, edited)
    }

    /// Removes a student and withdraws it from every lesson.
    pub fn delete_person(&mut self, id: StudentId) -> SyncResult<Person> {
        delete_record::<Person>(self.store, id)
    }

    /// Removes a lesson and withdraws every enrolled student from it.
    pub fn delete_lesson(&mut self, id: LessonId) -> SyncResult<Lesson> {
        delete_record::<Lesson>(self.store, id)
    }

    fn ensure_registered(&self, student_id: StudentId, lesson_id: LessonId) -> SyncResult<()> {
        if !self.store.contains_person(student_id) {
            return Err(not_registered(student_id));
        }
        if !self.store.contains_lesson(lesson_id) {
            return Err(not_registered(lesson_id));
        }
        Ok(())
    }
}

fn not_registered<I: EntityId>(id: I) -> SyncError {
    SyncError::EntityNotRegistered {
        kind: I::KIND,
        id: id.value(),
    }
}

fn still_registered<I: EntityId>(id: I) -> SyncError {
    SyncError::StillRegistered {
        kind: I::KIND,
        id: id.value(),
    }
}

fn edit_record<E: Stored>(store: &mut EntityStore, target: E::Id, edited: E) -> SyncResult<E> {
    let (own, partners) = E::split(store);
    let original = own.get(target).ok_or_else(|| not_registered(target))?;
    if !edited.is_same(original) {
        return Err(SyncError::IdentityChange {
            kind: E::Id::KIND,
            id: target.value(),
            edited_id: edited.id().value(),
        });
    }
    verify_mirrored(partners, original)?;

    let original = E::split(store).0.replace(target, edited)?;
    propagate_edit(store, &original, target)?;
    info!(
        "event=entity_edit module=relationship status=ok kind={} id={} edges={}",
        E::Id::KIND,
        target.value(),
        original.partners().len()
    );
    Ok(original)
}

fn delete_record<E: Stored>(store: &mut EntityStore, id: E::Id) -> SyncResult<E> {
    let (own, partners) = E::split(store);
    let existing = own.get(id).ok_or_else(|| not_registered(id))?;
    verify_mirrored(partners, existing)?;

    let removed = E::split(store).0.remove(id)?;
    propagate_delete(store, &removed)?;
    info!(
        "event=entity_delete module=relationship status=ok kind={} id={} edges={}",
        E::Id::KIND,
        id.value(),
        removed.partners().len()
    );
    Ok(removed)
}

fn propagate_edit<E: Stored>(
    store: &mut EntityStore,
    original: &E,
    edited_id: E::Id,
) -> SyncResult<()> {
    let original_id = original.id();
    let (own, partners) = E::split(store);
    if edited_id != original_id && own.contains(original_id) {
        return Err(still_registered(original_id));
    }
    if !own.contains(edited_id) {
        return Err(not_registered(edited_id));
    }
    verify_mirrored(partners, original)?;

    for partner_id in original.partners() {
        if let Some(partner) = partners.get_mut(*partner_id) {
            let mirror = partner.partners_mut();
            mirror.remove(&original_id);
            mirror.insert(edited_id);
        }
    }
    if let Some(edited) = own.get_mut(edited_id) {
        *edited.partners_mut() = original.partners().clone();
    }
    Ok(())
}

fn propagate_delete<E: Stored>(store: &mut EntityStore, removed: &E) -> SyncResult<()> {
    let removed_id = removed.id();
    let (own, partners) = E::split(store);
    if own.contains(removed_id) {
        return Err(still_registered(removed_id));
    }
    verify_mirrored(partners, removed)?;

    for partner_id in removed.partners() {
        if let Some(partner) = partners.get_mut(*partner_id) {
            partner.partners_mut().remove(&removed_id);
        }
    }
    Ok(())
}

fn verify_mirrored<E: Stored>(partners: &EntityTable<E::Partner>, record: &E) -> SyncResult<()> {
    let record_id = record.id();
    for partner_id in record.partners() {
        let mirrored = partners
            .get(*partner_id)
            .is_some_and(|partner| partner.partners().contains(&record_id));
        if !mirrored {
            error!(
                "event=consistency_violation module=relationship status=error kind={} id={} partner_kind={} partner_id={}",
                E::Id::KIND,
                record_id.value(),
                E::PartnerId::KIND,
                partner_id.value()
            );
            return Err(SyncError::PartnerNotFound {
                kind: E::Id::KIND,
                id: record_id.value(),
                partner_kind: E::PartnerId::KIND,
                partner_id: partner_id.value(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{RelationshipSynchronizer, SyncError};
    use crate::model::fields::{Day, Email, Name, Note, Phone, Tag, Time, Venue};
    use crate::model::id::{EntityKind, LessonId, StudentId};
    use crate::model::lesson::Lesson;
    use crate::model::person::Person;
    use crate::model::{Entity, Linked};
    use crate::store::EntityStore;

    fn person(id: u32, name: &str) -> Person {
        Person::new(
            StudentId::new(id),
            Name::parse(name).unwrap(),
            Phone::parse("94351253").unwrap(),
            Email::parse("student@example.com").unwrap(),
            Note::default(),
            Vec::<Tag>::new(),
        )
    }

    fn lesson(id: u32) -> Lesson {
        Lesson::new(
            LessonId::new(id),
            Day::Mon,
            Time::parse("0900").unwrap(),
            Time::parse("1030").unwrap(),
            Venue::new("Block 52"),
            Note::default(),
        )
        .unwrap()
    }

    fn store_with_edge() -> EntityStore {
        let mut store = EntityStore::new();
        store.add_person(person(1, "Alice")).unwrap();
        store.add_lesson(lesson(10)).unwrap();
        RelationshipSynchronizer::new(&mut store)
            .enroll(StudentId::new(1), LessonId::new(10))
            .unwrap();
        store
    }

    #[test]
    fn edit_with_broken_mirror_fails_before_mutation() {
        let mut store = store_with_edge();
        // Break the lesson side behind the synchronizer's back.
        store
            .tables_mut()
            .1
            .get_mut(LessonId::new(10))
            .unwrap()
            .partners_mut()
            .clear();
        let before = store.clone();

        let err = RelationshipSynchronizer::new(&mut store)
            .edit_person(StudentId::new(1), person(1, "Alice Tan"))
            .unwrap_err();
        assert_eq!(
            err,
            SyncError::PartnerNotFound {
                kind: EntityKind::Person,
                id: 1,
                partner_kind: EntityKind::Lesson,
                partner_id: 10,
            }
        );
        assert_eq!(store, before);
    }

    #[test]
    fn delete_with_missing_partner_reports_partner_not_found() {
        let mut store = store_with_edge();
        // Drop the lesson record without running the delete hook.
        store.tables_mut().1.remove(LessonId::new(10)).unwrap();

        let err = RelationshipSynchronizer::new(&mut store)
            .delete_person(StudentId::new(1))
            .unwrap_err();
        assert!(matches!(err, SyncError::PartnerNotFound { partner_id: 10, .. }));
        assert!(store.contains_person(StudentId::new(1)));
    }

    #[test]
    fn identity_changing_edit_repoints_partners() {
        let mut store = store_with_edge();
        let original = store
            .replace_person_with_identity_change(StudentId::new(1), person(7, "Alice"))
            .unwrap();
        RelationshipSynchronizer::new(&mut store)
            .on_person_edit(&original, StudentId::new(7))
            .unwrap();

        let lesson = store.get_lesson(LessonId::new(10)).unwrap();
        assert!(lesson.has_student(StudentId::new(7)));
        assert!(!lesson.has_student(StudentId::new(1)));
        assert!(store
            .get_person(StudentId::new(7))
            .unwrap()
            .has_lesson(LessonId::new(10)));
        store.check_consistency().unwrap();
    }
}

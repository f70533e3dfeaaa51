//! Entity identifiers and per-kind id allocation.
//!
//! # Responsibility
//! - Define the stable integer identities of students and lessons.
//! - Issue fresh ids through an explicit, injectable allocator.
//!
//! # Invariants
//! - An allocator never issues the same id twice within its lifetime.
//! - `next()` fails fast until the allocator has been seeded.
//! - After load, the allocator is seeded above every persisted id.

use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::marker::PhantomData;

const STUDENT_ID_DISPLAY_WIDTH: usize = 4;

/// Entity kind tag used by ids, allocators and error payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    /// A student record (`Person`).
    Person,
    /// A lesson record.
    Lesson,
}

impl EntityKind {
    /// Stable lowercase name used in log events and error messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Lesson => "lesson",
        }
    }
}

impl Display for EntityKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Common surface of the per-kind id newtypes.
pub trait EntityId: Copy + Ord + Debug + Display {
    /// Entity kind this id belongs to.
    const KIND: EntityKind;

    fn from_raw(value: u32) -> Self;

    fn value(self) -> u32;
}

/// Stable identity of one student.
///
/// Displays zero-padded to four digits (`0007`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StudentId(u32);

impl StudentId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }
}

impl EntityId for StudentId {
    const KIND: EntityKind = EntityKind::Person;

    fn from_raw(value: u32) -> Self {
        Self(value)
    }

    fn value(self) -> u32 {
        self.0
    }
}

impl Display for StudentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:0width$}", self.0, width = STUDENT_ID_DISPLAY_WIDTH)
    }
}

/// Stable identity of one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LessonId(u32);

impl LessonId {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }
}

impl EntityId for LessonId {
    const KIND: EntityKind = EntityKind::Lesson;

    fn from_raw(value: u32) -> Self {
        Self(value)
    }

    fn value(self) -> u32 {
        self.0
    }
}

impl Display for LessonId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type IdResult<T> = Result<T, IdError>;

/// Allocation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// `next()` was called before `seed()`.
    NotSeeded(EntityKind),
    /// Seed value is negative or outside the id range.
    InvalidSeed { kind: EntityKind, value: i64 },
    /// Every representable id has been issued.
    Exhausted(EntityKind),
}

impl Display for IdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotSeeded(kind) => write!(f, "{kind} id allocator used before seeding"),
            Self::InvalidSeed { kind, value } => {
                write!(f, "invalid {kind} id seed `{value}`; expected 0..={}", u32::MAX)
            }
            Self::Exhausted(kind) => write!(f, "{kind} id range exhausted"),
        }
    }
}

impl Error for IdError {}

/// Monotonic id allocator for one entity kind.
///
/// Owned by the composition root; there is no hidden global counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdAllocator<I> {
    // `None` until seeded. `Some(None)` means the range is exhausted.
    next: Option<Option<u32>>,
    _kind: PhantomData<I>,
}

impl<I: EntityId> Default for IdAllocator<I> {
    fn default() -> Self {
        Self::unseeded()
    }
}

impl<I: EntityId> IdAllocator<I> {
    /// Creates an allocator that refuses to issue ids until seeded.
    pub fn unseeded() -> Self {
        Self {
            next: None,
            _kind: PhantomData,
        }
    }

    /// Creates an allocator for an empty book; the first id is 0.
    pub fn fresh() -> Self {
        Self {
            next: Some(Some(0)),
            _kind: PhantomData,
        }
    }

    /// Creates an allocator already seeded with `next_value`.
    pub fn seeded(next_value: i64) -> IdResult<Self> {
        let mut allocator = Self::unseeded();
        allocator.seed(next_value)?;
        Ok(allocator)
    }

    /// Creates an allocator whose first id follows `last`. Exhausted when
    /// `last` is the largest representable id.
    pub fn after(last: I) -> Self {
        Self {
            next: Some(last.value().checked_add(1)),
            _kind: PhantomData,
        }
    }

    /// Sets the next id to issue.
    ///
    /// # Errors
    /// - `InvalidSeed` when `next_value` is negative or above `u32::MAX`.
    pub fn seed(&mut self, next_value: i64) -> IdResult<()> {
        let value = u32::try_from(next_value).map_err(|_| IdError::InvalidSeed {
            kind: I::KIND,
            value: next_value,
        })?;
        self.next = Some(Some(value));
        Ok(())
    }

    /// Returns whether `seed()` has been called.
    pub fn is_seeded(&self) -> bool {
        self.next.is_some()
    }

    /// Returns the id the next `next()` call would issue.
    pub fn peek(&self) -> Option<I> {
        self.next.flatten().map(I::from_raw)
    }

    /// Issues the current id and advances the counter.
    ///
    /// # Errors
    /// - `NotSeeded` before the first `seed()`.
    /// - `Exhausted` once `u32::MAX` has been issued.
    pub fn next(&mut self) -> IdResult<I> {
        let slot = self.next.as_mut().ok_or(IdError::NotSeeded(I::KIND))?;
        let current = slot.ok_or(IdError::Exhausted(I::KIND))?;
        *slot = current.checked_add(1);
        Ok(I::from_raw(current))
    }
}

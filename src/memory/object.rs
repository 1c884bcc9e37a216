//! Objects: typed regions of storage with explicit lifetime
//!
//! An object is created (storage allocated), has its lifetime started
//! exactly once, and is eventually killed. The progression is monotone:
//!
//! ```text
//! NotStarted → Alive → Dead
//! ```
//!
//! Killing an already-dead object is a no-op, never a crash; reading
//! through a dead object is undefined behavior surfaced to the runtime as
//! an explicit outcome, not a panic. Arrays and class objects own their
//! subobjects, which occupy sub-ranges of the parent's storage.

use super::value::Value;
use super::{Address, ObjectId};
use crate::types::{ClassId, Type};

/// What kind of storage an object occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// A local, parameter, or return slot in some frame
    Automatic,
    /// Heap storage
    Dynamic,
    /// A global with static storage duration (includes string literals)
    Static,
    /// A materialized temporary
    Temporary,
    /// An array element or class member inside a containing object
    Subobject,
    /// The poison object invalid dereferences resolve to
    Invalid,
}

/// Lifetime state; transitions are monotone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    NotStarted,
    Alive,
    Dead,
}

/// The single value slot of an atomic (arithmetic or pointer) object
#[derive(Debug, Clone, Default)]
pub struct AtomicSlot {
    pub value: Value,
    /// False while the value is indeterminate (never written, or the
    /// object's lifetime has been violated)
    pub valid: bool,
}

/// Shape-specific contents of an object
#[derive(Debug, Clone)]
pub enum ObjectData {
    Atomic(AtomicSlot),
    Array { elements: Vec<ObjectId> },
    Class {
        class: ClassId,
        base: Option<ObjectId>,
        members: Vec<ObjectId>,
    },
}

/// A typed region of storage
#[derive(Debug, Clone)]
pub struct Object {
    pub id: ObjectId,
    /// Display name (entity name, `name[i]` for elements, `<temp#N>`…)
    pub name: String,
    pub ty: Type,
    pub storage: StorageKind,
    pub address: Address,
    pub size: usize,
    pub lifetime: Lifetime,
    pub data: ObjectData,
    /// The object this one is a subobject of, if any
    pub containing: Option<ObjectId>,
}

impl Object {
    pub fn is_alive(&self) -> bool {
        self.lifetime == Lifetime::Alive
    }

    /// The atomic slot; panics on non-atomic objects (shape mismatches are
    /// compiler bugs, not user errors)
    pub fn slot(&self) -> &AtomicSlot {
        match &self.data {
            ObjectData::Atomic(slot) => slot,
            _ => panic!("object '{}' is not atomic", self.name),
        }
    }

    pub fn slot_mut(&mut self) -> &mut AtomicSlot {
        match &mut self.data {
            ObjectData::Atomic(slot) => slot,
            _ => panic!("object '{}' is not atomic", self.name),
        }
    }

    /// Element ids of an array object
    pub fn elements(&self) -> &[ObjectId] {
        match &self.data {
            ObjectData::Array { elements } => elements,
            _ => panic!("object '{}' is not an array", self.name),
        }
    }
}

//! Simulation events
//!
//! Every program-visible incident the engine can detect is a typed event.
//! Events are appended to the simulation's log and offered to registered
//! listeners; all of them are advisory except [`SimEvent::Crash`], which
//! terminates the simulation.

use crate::constructs::ConstructId;
use crate::entities::EntityId;
use crate::memory::object::StorageKind;
use crate::memory::ObjectId;
use thiserror::Error;

/// Why an operation had undefined behavior. Advisory: the simulation keeps
/// running with an explicitly invalid result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UbReason {
    #[error("read of an uninitialized value")]
    ReadUninitialized,
    #[error("read through an object whose lifetime has ended")]
    ReadDeadObject,
    #[error("write through an object whose lifetime has ended")]
    WriteDeadObject,
    #[error("integer division by zero")]
    DivisionByZero,
    #[error("pointer arithmetic moved outside the array")]
    PointerArithmeticOutOfBounds,
    #[error("dereference of a past-the-end or out-of-bounds pointer")]
    DereferenceOutOfBounds,
    #[error("use of an invalid pointer value")]
    InvalidPointer,
    #[error("subtraction of pointers into different arrays")]
    UnrelatedPointerSubtraction,
}

/// Why behavior is unspecified (defined to produce *a* value, but which one
/// is not pinned down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnspecifiedReason {
    #[error("relational comparison of pointers into different objects")]
    UnrelatedPointerComparison,
}

/// Why the simulation crashed outright
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CrashReason {
    #[error("null pointer dereference")]
    NullPointerDereference,
}

/// The closed set of simulation events
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimEvent {
    /// Control entered a function (after its arguments were initialized)
    Called { function: EntityId },
    /// Control left a function
    Returned { function: EntityId },
    /// An object's lifetime began through an initializer
    ObjectInitialized {
        object: ObjectId,
        storage: StorageKind,
    },
    /// A reference was bound
    ReferenceInitialized { entity: EntityId, object: ObjectId },
    /// An object's lifetime ended through a deallocator
    ObjectDestroyed {
        object: ObjectId,
        storage: StorageKind,
    },
    UndefinedBehavior {
        construct: ConstructId,
        reason: UbReason,
    },
    UnspecifiedBehavior {
        construct: ConstructId,
        reason: UnspecifiedReason,
    },
    /// `assert` was called with a false argument; advisory, like the
    /// undefined-behavior events
    AssertionFailure { construct: ConstructId },
    /// Unrecoverable misstep; terminates the simulation
    Crash {
        construct: ConstructId,
        reason: CrashReason,
    },
}

impl SimEvent {
    /// Whether this event ends the simulation
    pub fn is_fatal(&self) -> bool {
        matches!(self, SimEvent::Crash { .. })
    }
}

/// Observer of simulation events. Registration is optional; the simulation
/// also keeps its own event log.
pub trait SimulationListener {
    fn on_event(&mut self, event: &SimEvent);
}

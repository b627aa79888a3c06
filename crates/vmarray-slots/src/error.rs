//! Slot-array-specific error types.
//!
//! Only construction is fallible. Once an array exists, every failure
//! (commit errors during growth, running past the maximum element count)
//! is a broken process invariant and panics instead.

use std::error::Error;
use std::fmt;

use vmarray_sys::VmError;

/// Errors that can occur while creating a slot array.
#[derive(Debug)]
pub enum SlotArrayError {
    /// The configuration was rejected by [`SlotArrayConfig::validate`](crate::SlotArrayConfig::validate).
    InvalidConfig {
        /// Human-readable description of the problem.
        reason: String,
    },
    /// `max_elements * slot_size` does not fit in the address space.
    CapacityOverflow {
        /// The requested maximum element count.
        max_elements: u32,
        /// Size of one slot in bytes.
        slot_size: usize,
    },
    /// The virtual memory backend failed to reserve or commit.
    Vm(VmError),
}

impl fmt::Display for SlotArrayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConfig { reason } => write!(f, "invalid slot array config: {reason}"),
            Self::CapacityOverflow {
                max_elements,
                slot_size,
            } => {
                write!(
                    f,
                    "{max_elements} slots of {slot_size} bytes exceed the address space"
                )
            }
            Self::Vm(err) => write!(f, "virtual memory error: {err}"),
        }
    }
}

impl Error for SlotArrayError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Vm(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VmError> for SlotArrayError {
    fn from(err: VmError) -> Self {
        Self::Vm(err)
    }
}

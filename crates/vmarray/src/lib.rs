//! vmarray: concurrent slot arrays with stable indices on reserved virtual memory.
//!
//! This is the top-level facade crate that re-exports the public API from
//! the vmarray sub-crates. For most users, adding `vmarray` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use vmarray::prelude::*;
//!
//! let config = SlotArrayConfig::new().with_growth(GrowthPolicy::Doubling);
//! let array: Arc<SlotArray<(u64, u64), 65_536>> = Arc::new(SlotArray::with_config(config));
//!
//! let handles: Vec<_> = (0..4u64)
//!     .map(|t| {
//!         let array = Arc::clone(&array);
//!         thread::spawn(move || {
//!             (0..100u64).map(|i| array.emplace((t, i))).collect::<Vec<u32>>()
//!         })
//!     })
//!     .collect();
//! let indices: Vec<u32> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
//!
//! assert_eq!(array.len(), 400);
//! // SAFETY: every thread has finished, so nothing else reads this slot.
//! let (t, i) = unsafe { array.remove(indices[0]) };
//! assert_eq!(t, 0);
//! assert_eq!(i, 0);
//! assert_eq!(array.iter().count(), 399);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`slots`] | `vmarray-slots` | `SlotArray`, config, errors, iterators |
//! | [`sys`] | `vmarray-sys` | Page size, reserve / commit / release, `Reservation` |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// The slot array and its configuration (`vmarray-slots`).
///
/// [`slots::SlotArray`] is the main type; it is also in the [`prelude`].
pub use vmarray_slots as slots;

/// Portable virtual memory primitives (`vmarray-sys`).
///
/// Use [`sys::Reservation`] for an owned address range, or the free
/// functions [`sys::reserve`], [`sys::commit`] and [`sys::release`].
pub use vmarray_sys as sys;

/// Common imports for typical vmarray usage.
///
/// ```rust
/// use vmarray::prelude::*;
/// ```
pub mod prelude {
    pub use vmarray_slots::{GrowthPolicy, SlotArray, SlotArrayConfig, SlotArrayError};
    pub use vmarray_sys::VmError;
}

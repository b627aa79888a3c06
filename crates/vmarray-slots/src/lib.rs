//! Concurrent slot array with stable indices on reserved virtual memory.
//!
//! [`SlotArray`] hands out `u32` indices to values of one type, reusing
//! freed indices before minting new ones. Storage for the maximum element
//! count is reserved as virtual address space when the array is created;
//! physical pages are committed only as the high-water mark advances, and
//! values are never moved or copied by growth.
//!
//! # Architecture
//!
//! ```text
//! SlotArray (engine: emplace / remove / index / iterate)
//! ├── SlotStorage      reserved value buffer, committed lazily
//! ├── ControlRegister  occupancy bitmap, one AtomicU64 per 64 slots
//! ├── FreeList         lock-free Treiber stack stored inside free slots
//! └── GrowthManager    mutex-guarded commit of new pages (the only lock)
//!     └── vmarray-sys  reserve / commit / release
//! ```
//!
//! # Concurrency
//!
//! Insertion, removal, lookup and iteration all work through `&self`.
//! Only bookkeeping (free list, occupancy bits, counters) is synchronized;
//! the value in a slot belongs to whoever inserted it until it is removed.
//! That is why [`SlotArray::remove`] is `unsafe`: the caller promises no
//! other thread still reads the value being removed.
//!
//! This crate is one of two that may contain `unsafe` code (along with
//! `vmarray-sys`). It is confined to the `cell`, `control`, `free_list`,
//! `array` and `iter` modules.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod array;
mod cell;
pub mod config;
mod control;
pub mod error;
mod free_list;
mod growth;
pub mod iter;

// Public re-exports for the primary API surface.
pub use array::SlotArray;
pub use config::{GrowthPolicy, SlotArrayConfig};
pub use error::SlotArrayError;
pub use iter::{Iter, IterIndexed, IterMut};

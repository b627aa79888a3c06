//! Test utilities and fixture payloads for vmarray development.
//!
//! - [`DropLedger`] / [`Tracked`]: payloads that count their own drops,
//!   for checking that every value is destroyed exactly once.
//! - [`Pair`] / [`stamp`]: the `(u64, u64)` payload used by the stress
//!   scenarios, with a self-checking encoding.
//! - [`Wide`]: a payload larger than a page.
//! - [`seeded_rng`]: deterministic per-thread random streams.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub mod fixtures;

pub use fixtures::{stamp, unstamp, Pair, Wide};

/// Shared counter of drops, one per [`Tracked`] value destroyed.
#[derive(Debug, Default)]
pub struct DropLedger {
    created: AtomicUsize,
    dropped: AtomicUsize,
}

impl DropLedger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Number of `Tracked` values created against this ledger.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    /// Number of `Tracked` values dropped.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Values created but not yet dropped.
    pub fn alive(&self) -> usize {
        self.created() - self.dropped()
    }
}

/// A payload that records its destruction in a [`DropLedger`].
///
/// Cloning is deliberately not supported so that every drop corresponds
/// to exactly one construction.
#[derive(Debug)]
pub struct Tracked {
    pub id: u64,
    ledger: Arc<DropLedger>,
}

impl Tracked {
    pub fn new(id: u64, ledger: &Arc<DropLedger>) -> Self {
        ledger.created.fetch_add(1, Ordering::SeqCst);
        Self {
            id,
            ledger: Arc::clone(ledger),
        }
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.ledger.dropped.fetch_add(1, Ordering::SeqCst);
    }
}

/// Deterministic RNG for thread `stream` of a test seeded with `seed`.
pub fn seeded_rng(seed: u64, stream: u64) -> ChaCha8Rng {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    rng.set_stream(stream);
    rng
}

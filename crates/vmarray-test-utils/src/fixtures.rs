//! Fixture payloads for slot array tests.

/// The two-word payload of the concurrency stress scenario.
pub type Pair = (u64, u64);

/// Encode `(owner, sequence)` into a [`Pair`] whose second word is a
/// checksum of the first, so torn or foreign writes are detectable.
pub fn stamp(owner: u32, sequence: u32) -> Pair {
    let word = (u64::from(owner) << 32) | u64::from(sequence);
    (word, !word.rotate_left(17))
}

/// Decode a [`stamp`]ed pair, or `None` if the checksum does not match.
pub fn unstamp(pair: Pair) -> Option<(u32, u32)> {
    let (word, check) = pair;
    (check == !word.rotate_left(17)).then_some(((word >> 32) as u32, word as u32))
}

/// A payload larger than a typical 4 KiB page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wide {
    pub tag: u32,
    pub body: [u8; 5000],
}

impl Wide {
    pub fn new(tag: u32) -> Self {
        Self {
            tag,
            body: [tag as u8; 5000],
        }
    }
}

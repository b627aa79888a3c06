//! Page size queries and rounding helpers.

/// The OS virtual memory page size in bytes.
///
/// Queried once by the `region` crate and cached for the process.
pub fn page_size() -> usize {
    region::page::size()
}

/// Round `size` up to the nearest multiple of `page_size`.
///
/// `page_size` must be a power of two.
pub fn round_up_to_page_size(size: usize, page_size: usize) -> usize {
    debug_assert!(page_size.is_power_of_two());
    (size + (page_size - 1)) & !(page_size - 1)
}

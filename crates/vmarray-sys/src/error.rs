//! Virtual memory error types.

use std::error::Error;
use std::fmt;
use std::io;

/// Errors reported by the virtual memory backend.
#[derive(Debug)]
pub enum VmError {
    /// A zero-byte reservation was requested.
    ZeroSize,
    /// The OS refused to reserve address space.
    Reserve {
        /// Number of bytes requested.
        size: usize,
        /// The underlying OS error.
        source: io::Error,
    },
    /// The OS refused to commit a reserved sub-range.
    Commit {
        /// Byte offset of the sub-range within its reservation.
        offset: usize,
        /// Number of bytes requested.
        size: usize,
        /// The underlying OS error.
        source: io::Error,
    },
    /// The OS refused to release a reservation.
    Release {
        /// Size of the reservation in bytes.
        size: usize,
        /// The underlying OS error.
        source: io::Error,
    },
    /// A commit request reached outside the reservation.
    OutOfRange {
        /// Byte offset of the request.
        offset: usize,
        /// Number of bytes requested.
        size: usize,
        /// Total size of the reservation.
        reserved: usize,
    },
    /// A commit request was not aligned to the OS page size.
    Misaligned {
        /// Byte offset of the request.
        offset: usize,
        /// The OS page size.
        page_size: usize,
    },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize => write!(f, "cannot reserve a zero-byte range"),
            Self::Reserve { size, source } => {
                write!(f, "reserve of {size} bytes failed: {source}")
            }
            Self::Commit {
                offset,
                size,
                source,
            } => {
                write!(
                    f,
                    "commit of {size} bytes at offset {offset} failed: {source}"
                )
            }
            Self::Release { size, source } => {
                write!(f, "release of {size}-byte reservation failed: {source}")
            }
            Self::OutOfRange {
                offset,
                size,
                reserved,
            } => {
                write!(
                    f,
                    "range {offset}..{} exceeds reservation of {reserved} bytes",
                    offset.saturating_add(*size)
                )
            }
            Self::Misaligned { offset, page_size } => {
                write!(f, "offset {offset} is not aligned to page size {page_size}")
            }
        }
    }
}

impl Error for VmError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Reserve { source, .. }
            | Self::Commit { source, .. }
            | Self::Release { source, .. } => Some(source),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reports_end_offset() {
        let err = VmError::OutOfRange {
            offset: 4096,
            size: 8192,
            reserved: 8192,
        };
        assert_eq!(
            err.to_string(),
            "range 4096..12288 exceeds reservation of 8192 bytes"
        );
    }

    #[test]
    fn os_errors_are_exposed_as_source() {
        let err = VmError::Commit {
            offset: 0,
            size: 4096,
            source: io::Error::from(io::ErrorKind::OutOfMemory),
        };
        assert!(err.source().is_some());
        assert!(VmError::ZeroSize.source().is_none());
    }
}

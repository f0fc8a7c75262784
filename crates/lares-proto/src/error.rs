//! Codec error types.
//!
//! Every fallible operation in this crate reports one of the kinds below.
//! Compound operations are transactional: the packet's append size or read
//! cursor is restored to its value at entry before the error is returned.

use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Wire codec errors.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An append would grow the packet past the 65 535-byte limit.
    #[error("message too big: {size} bytes exceeds the 65535 byte limit")]
    MessageTooBig {
        /// Size the packet would have needed.
        size: usize,
    },

    /// A label exceeds the 63-byte limit.
    #[error("label too long: {length} bytes exceeds maximum of 63")]
    LabelTooLong {
        /// Actual label length.
        length: usize,
    },

    /// A name's wire encoding exceeds the 255-byte limit.
    #[error("name too long: {length} bytes exceeds maximum of 255")]
    NameTooLong {
        /// Wire length the name would have needed.
        length: usize,
    },

    /// A read ran past the end of the valid packet bytes.
    #[error("truncated packet: read at offset {offset} past size {size}")]
    Truncated {
        /// Offset the read would have ended at.
        offset: usize,
        /// Logical packet size.
        size: usize,
    },

    /// A compression pointer referenced an illegal target.
    #[error("bad compression pointer at offset {offset}: target {target}")]
    BadPointer {
        /// Offset of the pointer bytes.
        offset: usize,
        /// Offset the pointer referenced.
        target: usize,
    },

    /// Any other structural violation of the wire format.
    #[error("malformed packet at offset {offset}: {reason}")]
    Malformed {
        /// Offset at which the violation was detected.
        offset: usize,
        /// Short description of the violation.
        reason: &'static str,
    },
}

impl Error {
    /// Creates a new `Truncated` error.
    #[inline]
    pub fn truncated(offset: usize, size: usize) -> Self {
        Self::Truncated { offset, size }
    }

    /// Creates a new `Malformed` error.
    #[inline]
    pub fn malformed(offset: usize, reason: &'static str) -> Self {
        Self::Malformed { offset, reason }
    }

    /// Returns true if this error means the packet should be dropped as
    /// garbage rather than reported as a local failure.
    #[inline]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Truncated { .. } | Self::BadPointer { .. } | Self::Malformed { .. }
        )
    }
}

//! Error types for eeprog-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// Details about a write-verify mismatch
///
/// Produced when a read-back after a write never matches the written
/// value within the retry budget. Carries full context so a caller can
/// decide whether to abort or continue a bulk operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyFailure {
    /// Address that was written
    pub addr: u32,
    /// The value that was written
    pub expected: u8,
    /// The value read back on the final attempt
    pub found: u8,
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// Read-back after write never matched within the retry budget
    Verify(VerifyFailure),

    /// Write-enable latch never set after retrying - hardware
    /// write-protect condition, not correctable in software
    WriteProtected,

    /// Requested page write crosses a page boundary
    ///
    /// Rejected before any bus transaction; the device would wrap
    /// around silently and corrupt unrelated bytes.
    PageBoundary {
        /// Requested start address
        addr: u32,
        /// Requested length in bytes
        len: u32,
        /// Page size of the chip
        page_size: u32,
    },

    /// Page program payload is larger than one page
    PageOverflow {
        /// Requested length in bytes
        len: u32,
        /// Page size of the chip
        max: u32,
    },

    /// Address or address range is beyond chip capacity
    AddressOutOfBounds,

    /// Busy poll exhausted its budget without the device going ready
    Timeout,

    /// Bus transaction failed at the transport layer
    Bus,
}

impl fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "verify failed at 0x{:06X}: wrote 0x{:02X}, read 0x{:02X}",
            self.addr, self.expected, self.found
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Verify(failure) => write!(f, "{}", failure),
            Self::WriteProtected => {
                write!(f, "write enable latch not set, check the /WP pin")
            }
            Self::PageBoundary {
                addr,
                len,
                page_size,
            } => write!(
                f,
                "write of {} bytes at 0x{:06X} crosses a {}-byte page boundary",
                len, addr, page_size
            ),
            Self::PageOverflow { len, max } => {
                write!(f, "page write of {} bytes exceeds page size {}", len, max)
            }
            Self::AddressOutOfBounds => write!(f, "address out of bounds"),
            Self::Timeout => write!(f, "operation timed out"),
            Self::Bus => write!(f, "bus transaction failed"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;

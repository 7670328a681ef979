//! Line-offset indexing for log byte sources.
//!
//! This crate provides:
//! - [`IndexingData`], the shared post-indexing state (line ends, size
//!   covered, longest line, encodings)
//! - [`LineScanner`], the block-based scanning pass that extends it
//!
//! The scanner is driven by a background worker (see the `logview-data`
//! crate); readers consult [`IndexingData`] to turn line numbers into byte
//! ranges.

pub mod error;
pub use error::{IndexError, Result};

pub mod data;
pub use data::{IndexSnapshot, IndexingData, LineRange};

pub mod scan;
pub use scan::{LineScanner, ScanPass, SCAN_BLOCK_SIZE};

/// Terminal status of an indexing pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexingStatus {
    /// The pass covered the source to its end and committed its results.
    Successful,
    /// The pass stopped early; accumulated results were discarded.
    Interrupted,
    /// The index could not grow; previously committed data is untouched.
    NoMemory,
}

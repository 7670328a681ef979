//! Low-level building blocks for reading log files.
//!
//! This crate provides byte-level access to log files and the text encoding
//! model used to decode them.
//!
//! For related functionality:
//! - Line indexing over a byte source: see `logview-index` crate
//! - The log data facade, worker and watcher: see `logview-data` crate

// Core error types used throughout the crate
pub mod error;

// Text encodings: detection, decoding, code-unit geometry
pub mod encoding;

// Seekable, re-openable byte stream over a file
pub mod source;

// Re-export commonly used types for convenience
pub use encoding::{Encoding, WidthClass};
pub use error::{CoreError, Result};
pub use source::{FileSource, SharedSource};

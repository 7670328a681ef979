//! Common types and utilities shared across logview crates.
//!
//! This crate provides foundational types used by multiple log-viewing
//! crates, avoiding code duplication and circular dependencies.

pub mod text;
pub mod units;

pub use text::{expand_tabs, expanded_width, TAB_STOP};
pub use units::{BytePos, LineLength, LineNumber, LinesCount};

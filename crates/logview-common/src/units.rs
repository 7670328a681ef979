//! Semantic units for addressing log content.
//!
//! Provides type-safe wrappers for line numbers, line counts, line lengths
//! and byte offsets to prevent unit confusion between the indexer, the data
//! facade and their consumers.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Zero-based index of a line within an indexed source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineNumber(pub u64);

/// Non-negative count of lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LinesCount(pub u64);

/// Length of a line in decoded code units, after tab expansion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineLength(pub u32);

/// Byte offset into a byte source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BytePos(pub u64);

impl LineNumber {
    /// Create a line number from a zero-based index.
    pub fn new(line: u64) -> Self {
        Self(line)
    }

    /// Get the raw zero-based index.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Checked subtraction of a count. Returns None if underflow occurred.
    pub fn checked_sub(self, count: LinesCount) -> Option<Self> {
        self.0.checked_sub(count.0).map(LineNumber)
    }
}

impl LinesCount {
    /// Create a count of lines.
    pub fn new(count: u64) -> Self {
        Self(count)
    }

    /// Get the raw count.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Add two counts with saturation at the numeric bounds.
    pub fn saturating_add(self, other: Self) -> Self {
        LinesCount(self.0.saturating_add(other.0))
    }

    /// Subtract two counts with saturation at the numeric bounds.
    pub fn saturating_sub(self, other: Self) -> Self {
        LinesCount(self.0.saturating_sub(other.0))
    }
}

impl LineLength {
    /// Create a line length from a number of code units.
    pub fn new(length: u32) -> Self {
        Self(length)
    }

    /// Get the raw length.
    pub fn get(self) -> u32 {
        self.0
    }

    /// The larger of two lengths.
    pub fn max(self, other: Self) -> Self {
        LineLength(self.0.max(other.0))
    }
}

impl BytePos {
    /// Create a byte offset.
    pub fn new(pos: u64) -> Self {
        Self(pos)
    }

    /// Get the raw offset.
    pub fn get(self) -> u64 {
        self.0
    }

    /// Subtract two offsets with saturation at zero.
    pub fn saturating_sub(self, other: Self) -> Self {
        BytePos(self.0.saturating_sub(other.0))
    }
}

impl Add<LinesCount> for LineNumber {
    type Output = Self;

    fn add(self, count: LinesCount) -> Self {
        LineNumber(self.0 + count.0)
    }
}

impl Add for LinesCount {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        LinesCount(self.0 + other.0)
    }
}

impl Sub for LinesCount {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        LinesCount(self.0 - other.0)
    }
}

impl Add for BytePos {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        BytePos(self.0 + other.0)
    }
}

impl Sub for BytePos {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        BytePos(self.0 - other.0)
    }
}

impl From<u64> for LineNumber {
    fn from(line: u64) -> Self {
        LineNumber(line)
    }
}

impl From<u64> for LinesCount {
    fn from(count: u64) -> Self {
        LinesCount(count)
    }
}

impl From<u64> for BytePos {
    fn from(pos: u64) -> Self {
        BytePos(pos)
    }
}

impl std::fmt::Display for LineNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for LinesCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for LineLength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for BytePos {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_number_plus_count() {
        let line = LineNumber::new(10);
        let count = LinesCount::new(5);
        assert_eq!(line + count, LineNumber::new(15));
    }

    #[test]
    fn test_line_number_checked_sub() {
        let line = LineNumber::new(3);
        assert_eq!(line.checked_sub(LinesCount::new(1)), Some(LineNumber::new(2)));
        assert_eq!(line.checked_sub(LinesCount::new(4)), None);
    }

    #[test]
    fn test_lines_count_saturating() {
        let a = LinesCount::new(2);
        let b = LinesCount::new(5);
        assert_eq!(a.saturating_sub(b), LinesCount::new(0));
        assert_eq!(a.saturating_add(b), LinesCount::new(7));
    }

    #[test]
    fn test_byte_pos_arithmetic() {
        let a = BytePos::new(100);
        let b = BytePos::new(40);
        assert_eq!(a - b, BytePos::new(60));
        assert_eq!(a + b, BytePos::new(140));
        assert_eq!(b.saturating_sub(a), BytePos::new(0));
    }

    #[test]
    #[should_panic]
    fn test_byte_pos_sub_underflow() {
        let a = BytePos::new(10);
        let b = BytePos::new(20);
        let _ = a - b; // Should panic
    }

    #[test]
    fn test_line_length_max() {
        let a = LineLength::new(8);
        let b = LineLength::new(12);
        assert_eq!(a.max(b), LineLength::new(12));
        assert_eq!(b.max(a), LineLength::new(12));
    }

    #[test]
    fn test_from_conversions() {
        let line: LineNumber = 7u64.into();
        assert_eq!(line.get(), 7);

        let pos: BytePos = 1024u64.into();
        assert_eq!(pos.get(), 1024);
    }

    #[test]
    fn test_display() {
        assert_eq!(LineNumber::new(42).to_string(), "42");
        assert_eq!(BytePos::new(4096).to_string(), "4096");
    }
}

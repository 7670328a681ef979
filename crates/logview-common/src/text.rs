//! Tab expansion for display purposes.
//!
//! The viewer renders tabs as runs of spaces up to the next tab stop. The
//! indexer accounts for the same expansion when it computes the length of
//! the longest line, so both sides of the system must agree on the tab
//! width. `TAB_STOP` is the single source of truth.

use crate::units::LineLength;

/// Distance between tab stops, in columns.
pub const TAB_STOP: u32 = 8;

/// Replace each tab with spaces up to the next multiple of [`TAB_STOP`].
pub fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_owned();
    }

    let mut expanded = String::with_capacity(line.len() + TAB_STOP as usize);
    let mut column: u32 = 0;

    for ch in line.chars() {
        if ch == '\t' {
            let pad = TAB_STOP - column % TAB_STOP;
            for _ in 0..pad {
                expanded.push(' ');
            }
            column += pad;
        } else {
            expanded.push(ch);
            column += 1;
        }
    }

    expanded
}

/// Width of a line in columns after tab expansion.
pub fn expanded_width(line: &str) -> LineLength {
    let mut column: u32 = 0;

    for ch in line.chars() {
        if ch == '\t' {
            column += TAB_STOP - column % TAB_STOP;
        } else {
            column += 1;
        }
    }

    LineLength(column)
}

//! Shared post-indexing state.
//!
//! [`IndexingData`] is the authoritative product of indexing: the ordered
//! line-end offsets, the number of bytes they cover, the longest line seen
//! and the encodings in play. It is written by the single indexing pass and
//! read by any number of line-access callers, so the inner state sits
//! behind a readers-writer lock and the handle is cheaply cloneable.
//!
//! Invariants maintained here:
//! - `line_ends` is strictly increasing
//! - `line_ends.last() <= size_indexed`
//! - a partial append leaves the existing prefix untouched

use crate::error::{IndexError, Result};
use logview_common::{BytePos, LineLength, LineNumber, LinesCount};
use logview_core::Encoding;
use parking_lot::RwLock;
use std::sync::Arc;

struct Inner {
    size_indexed: BytePos,
    line_ends: Vec<BytePos>,
    max_length: LineLength,
    forced_encoding: Option<Encoding>,
    guessed_encoding: Encoding,
}

impl Inner {
    fn empty() -> Self {
        Inner {
            size_indexed: BytePos(0),
            line_ends: Vec::new(),
            max_length: LineLength(0),
            forced_encoding: None,
            guessed_encoding: Encoding::default(),
        }
    }
}

/// Cloneable handle to the shared indexing state (thread-safe).
#[derive(Clone)]
pub struct IndexingData {
    inner: Arc<RwLock<Inner>>,
}

/// Byte addressing for a contiguous range of lines, taken under a single
/// read guard so the range is internally consistent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineRange {
    /// Offset of the first byte of the first line.
    pub first_byte: BytePos,
    /// End offset (exclusive, past the terminator) of each line in turn.
    pub ends: Vec<BytePos>,
}

/// A point-in-time copy of the indexing state, for comparison in tests and
/// diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSnapshot {
    pub size_indexed: BytePos,
    pub line_ends: Vec<BytePos>,
    pub max_length: LineLength,
    pub forced_encoding: Option<Encoding>,
    pub guessed_encoding: Encoding,
}

impl IndexingData {
    /// Create empty indexing data.
    pub fn new() -> Self {
        IndexingData {
            inner: Arc::new(RwLock::new(Inner::empty())),
        }
    }

    /// Number of lines indexed so far.
    pub fn nb_lines(&self) -> LinesCount {
        LinesCount(self.inner.read().line_ends.len() as u64)
    }

    /// Length of the longest line seen, in display columns.
    pub fn max_length(&self) -> LineLength {
        self.inner.read().max_length
    }

    /// Bytes of the source covered by the index.
    pub fn size(&self) -> BytePos {
        self.inner.read().size_indexed
    }

    /// Byte offset just past the terminator of `line`.
    pub fn pos_for_line(&self, line: LineNumber) -> Option<BytePos> {
        self.inner
            .read()
            .line_ends
            .get(usize::try_from(line.get()).ok()?)
            .copied()
    }

    /// Byte offset of the first byte of `line`, or `None` when the line is
    /// not indexed. Bounds check and lookup happen under one guard.
    pub fn line_start(&self, line: LineNumber) -> Option<BytePos> {
        let inner = self.inner.read();
        let index = usize::try_from(line.get()).ok()?;

        if index >= inner.line_ends.len() {
            return None;
        }
        if index == 0 {
            Some(BytePos(0))
        } else {
            Some(inner.line_ends[index - 1])
        }
    }

    /// Byte addressing for `count` lines starting at `first`, or `None`
    /// when the range is not fully indexed.
    pub fn line_range(&self, first: LineNumber, count: LinesCount) -> Option<LineRange> {
        let inner = self.inner.read();
        let first_index = usize::try_from(first.get()).ok()?;
        let count = usize::try_from(count.get()).ok()?;
        let last_index = first_index.checked_add(count)?.checked_sub(1)?;

        if last_index >= inner.line_ends.len() {
            return None;
        }

        let first_byte = if first_index == 0 {
            BytePos(0)
        } else {
            inner.line_ends[first_index - 1]
        };

        Some(LineRange {
            first_byte,
            ends: inner.line_ends[first_index..=last_index].to_vec(),
        })
    }

    /// The encoding pinned by the user, if any.
    pub fn forced_encoding(&self) -> Option<Encoding> {
        self.inner.read().forced_encoding
    }

    /// The detector's best guess for the source encoding.
    pub fn guessed_encoding(&self) -> Encoding {
        self.inner.read().guessed_encoding
    }

    /// The encoding the index was built with: the forced one when pinned,
    /// the guess otherwise.
    pub fn index_encoding(&self) -> Encoding {
        let inner = self.inner.read();
        inner.forced_encoding.unwrap_or(inner.guessed_encoding)
    }

    /// Pin (or unpin) the indexing encoding. Called by the worker at the
    /// start of a full pass.
    pub fn set_forced_encoding(&self, encoding: Option<Encoding>) {
        self.inner.write().forced_encoding = encoding;
    }

    /// Record the detector's guess. Called by the worker.
    pub fn set_guessed_encoding(&self, encoding: Encoding) {
        self.inner.write().guessed_encoding = encoding;
    }

    /// Clear all fields. Called by the worker at the start of a full pass.
    pub fn reset(&self) {
        *self.inner.write() = Inner::empty();
    }

    /// Extend the index with the results of a completed pass.
    ///
    /// `new_line_ends` is drained into the index; the pre-existing prefix
    /// is untouched. `new_size` becomes the covered size and `new_max`
    /// is merged into the running maximum. Called only by the worker, once
    /// per successful pass.
    pub fn append_partial(
        &self,
        new_line_ends: &mut Vec<BytePos>,
        new_size: BytePos,
        new_max: LineLength,
    ) -> Result<()> {
        let mut inner = self.inner.write();

        debug_assert!(
            new_line_ends
                .first()
                .zip(inner.line_ends.last())
                .map_or(true, |(new_first, old_last)| new_first > old_last),
            "appended line ends must extend the existing index"
        );

        inner
            .line_ends
            .try_reserve(new_line_ends.len())
            .map_err(|_| IndexError::OutOfMemory)?;
        inner.line_ends.append(new_line_ends);
        inner.size_indexed = new_size;
        inner.max_length = inner.max_length.max(new_max);

        Ok(())
    }

    /// Copy the current state.
    pub fn snapshot(&self) -> IndexSnapshot {
        let inner = self.inner.read();
        IndexSnapshot {
            size_indexed: inner.size_indexed,
            line_ends: inner.line_ends.clone(),
            max_length: inner.max_length,
            forced_encoding: inner.forced_encoding,
            guessed_encoding: inner.guessed_encoding,
        }
    }
}

impl Default for IndexingData {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IndexingData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.read();
        f.debug_struct("IndexingData")
            .field("size_indexed", &inner.size_indexed)
            .field("nb_lines", &inner.line_ends.len())
            .field("max_length", &inner.max_length)
            .field("forced_encoding", &inner.forced_encoding)
            .field("guessed_encoding", &inner.guessed_encoding)
            .finish()
    }
}

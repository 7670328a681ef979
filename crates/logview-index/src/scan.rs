//! Block-based line scanning.
//!
//! [`LineScanner`] turns a byte source into line-end offsets. A pass reads
//! the source in fixed-size blocks under the shared source mutex, releasing
//! it between blocks so interactive readers are never starved, and checks
//! the interrupt flag at every block boundary.
//!
//! Results are accumulated in scratch buffers and committed to
//! [`IndexingData`] only when the pass reaches the end of the source; an
//! interrupted or failed pass leaves previously committed data untouched.

use crate::data::IndexingData;
use crate::error::{IndexError, Result};
use crate::IndexingStatus;
use logview_common::{BytePos, LineLength, TAB_STOP};
use logview_core::{CoreError, Encoding, SharedSource};
use memchr::memchr_iter;
use std::collections::TryReserveError;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, warn};

/// Bytes read from the source per scanning step.
pub const SCAN_BLOCK_SIZE: usize = 64 * 1024;

/// What a scanning pass covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPass {
    /// Rescan from byte 0, discarding the previous index first.
    Full {
        /// Encoding pinned by the caller; skips detection when set.
        forced_encoding: Option<Encoding>,
    },
    /// Append-scan from the currently indexed size to the end of file.
    Additional,
}

/// Reusable scanning pass with scratch buffers.
pub struct LineScanner {
    // Block read buffer, SCAN_BLOCK_SIZE bytes
    block: Vec<u8>,

    // Line ends accumulated by the current pass, committed on success
    line_ends: Vec<BytePos>,
}

impl LineScanner {
    /// Create a scanner with an allocated block buffer.
    pub fn new() -> Self {
        LineScanner {
            block: vec![0u8; SCAN_BLOCK_SIZE],
            line_ends: Vec::new(),
        }
    }

    /// Execute one scanning pass.
    ///
    /// Progress is reported through `progress` as a percentage after every
    /// block, monotone non-decreasing within the pass. The `interrupt` flag
    /// is sampled at block boundaries; when set the pass stops and its
    /// accumulated results are dropped.
    pub fn run(
        &mut self,
        source: &SharedSource,
        data: &IndexingData,
        pass: ScanPass,
        interrupt: &AtomicBool,
        mut progress: impl FnMut(u32),
    ) -> IndexingStatus {
        self.line_ends.clear();

        let (start, forced) = match pass {
            ScanPass::Full { forced_encoding } => (BytePos(0), forced_encoding),
            ScanPass::Additional => (data.size(), None),
        };

        // Observe the total size once; progress is relative to it.
        let total = match self.source_size(source) {
            Ok(total) => total,
            Err(e) => {
                warn!("cannot stat source at start of pass: {}", e);
                return IndexingStatus::Interrupted;
            }
        };

        if matches!(pass, ScanPass::Full { .. }) {
            data.reset();
            data.set_forced_encoding(forced);
        }

        let mut encoding = match pass {
            ScanPass::Full { forced_encoding } => forced_encoding.unwrap_or_default(),
            ScanPass::Additional => data.index_encoding(),
        };
        let mut detection_pending = matches!(pass, ScanPass::Full { .. });

        debug!(
            "scanning pass {:?} from {} (total {})",
            pass, start, total
        );

        let mut pos = start;
        let mut column: u32 = 0;
        let mut max_length: u32 = match pass {
            ScanPass::Full { .. } => 0,
            ScanPass::Additional => data.max_length().get(),
        };
        let mut last_percent: u32 = 0;

        loop {
            if interrupt.load(Ordering::Acquire) {
                debug!("scanning pass interrupted at {}", pos);
                return IndexingStatus::Interrupted;
            }

            let read = match self.read_block(source, pos) {
                Ok(read) => read,
                Err(e) => {
                    warn!("scanning pass aborted at {}: {}", pos, e);
                    return IndexingStatus::Interrupted;
                }
            };
            if read == 0 {
                break;
            }

            if detection_pending {
                let guess = Encoding::detect(&self.block[..read]);
                debug!("encoding guess: {}", guess);
                data.set_guessed_encoding(guess);
                if forced.is_none() {
                    encoding = guess;
                }
                detection_pending = false;
            }

            // A byte-order mark belongs to the first line's bytes but not
            // to its display width.
            let mut skip = 0usize;
            if pos.get() == 0 {
                let bom = encoding.bom();
                if !bom.is_empty() && self.block[..read].starts_with(bom) {
                    skip = bom.len();
                }
            }

            let scanned = match scan_block(
                &self.block[skip..read],
                BytePos(pos.get() + skip as u64),
                encoding,
                &mut column,
                &mut max_length,
                &mut self.line_ends,
            ) {
                Ok(scanned) => scanned,
                Err(_) => {
                    warn!("line index allocation failed at {}", pos);
                    return IndexingStatus::NoMemory;
                }
            };

            let consumed = if scanned == 0 {
                // Trailing bytes too short to form a code unit
                column += 1;
                read
            } else {
                skip + scanned
            };
            pos = BytePos(pos.get() + consumed as u64);

            let percent = if total.get() == 0 {
                0
            } else {
                ((100 * pos.get() / total.get()).min(100)) as u32
            };
            last_percent = last_percent.max(percent);
            progress(last_percent);
        }

        // A trailing byte sequence without a terminator counts as one
        // final line whose end is the end of file.
        let last_end = self.line_ends.last().copied().unwrap_or(start);
        if pos > last_end {
            if self.line_ends.try_reserve(1).is_err() {
                return IndexingStatus::NoMemory;
            }
            self.line_ends.push(pos);
            max_length = max_length.max(column);
        }

        progress(if total.get() == 0 && pos.get() == 0 { 0 } else { 100 });

        match data.append_partial(&mut self.line_ends, pos, LineLength(max_length)) {
            Ok(()) => {
                debug!("scanning pass done: {} covered, {} lines", pos, data.nb_lines());
                IndexingStatus::Successful
            }
            Err(IndexError::OutOfMemory) => IndexingStatus::NoMemory,
            Err(e) => {
                warn!("failed to commit scanning pass: {}", e);
                IndexingStatus::Interrupted
            }
        }
    }

    fn source_size(&self, source: &SharedSource) -> Result<BytePos> {
        let guard = source.lock();
        let src = guard.as_ref().ok_or(CoreError::SourceClosed)?;
        Ok(src.size()?)
    }

    /// Read one block at `pos`, retrying once on a transient failure.
    fn read_block(&mut self, source: &SharedSource, pos: BytePos) -> Result<usize> {
        match self.try_read_block(source, pos) {
            Ok(read) => Ok(read),
            Err(e) => {
                warn!("source read failed at {}: {}, retrying", pos, e);
                self.try_read_block(source, pos)
            }
        }
    }

    fn try_read_block(&mut self, source: &SharedSource, pos: BytePos) -> Result<usize> {
        let mut guard = source.lock();
        let src = guard.as_mut().ok_or(CoreError::SourceClosed)?;
        src.seek(pos)?;
        Ok(src.read_into(&mut self.block)?)
    }
}

impl Default for LineScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Scan one block for terminators, updating the running column and the
/// longest-line counter. Returns the number of bytes covered (always the
/// whole block for single-byte units, whole code units otherwise).
fn scan_block(
    block: &[u8],
    base: BytePos,
    encoding: Encoding,
    column: &mut u32,
    max_length: &mut u32,
    line_ends: &mut Vec<BytePos>,
) -> std::result::Result<usize, TryReserveError> {
    match encoding.code_unit_width() {
        1 => scan_narrow(
            block,
            base,
            encoding == Encoding::Utf8,
            column,
            max_length,
            line_ends,
        ),
        width => scan_wide(block, base, width, encoding, column, max_length, line_ends),
    }
}

fn scan_narrow(
    block: &[u8],
    base: BytePos,
    utf8: bool,
    column: &mut u32,
    max_length: &mut u32,
    line_ends: &mut Vec<BytePos>,
) -> std::result::Result<usize, TryReserveError> {
    line_ends.try_reserve(memchr_iter(b'\n', block).count())?;

    let mut segment_start = 0usize;
    for nl in memchr_iter(b'\n', block) {
        advance_columns(&block[segment_start..nl], utf8, column);
        *max_length = (*max_length).max(*column);
        line_ends.push(BytePos(base.get() + nl as u64 + 1));
        *column = 0;
        segment_start = nl + 1;
    }
    advance_columns(&block[segment_start..], utf8, column);

    Ok(block.len())
}

fn advance_columns(bytes: &[u8], utf8: bool, column: &mut u32) {
    for &byte in bytes {
        if byte == b'\t' {
            *column += TAB_STOP - *column % TAB_STOP;
        } else if utf8 && (byte & 0xC0) == 0x80 {
            // UTF-8 continuation byte, not a new column
        } else {
            *column += 1;
        }
    }
}

fn scan_wide(
    block: &[u8],
    base: BytePos,
    width: usize,
    encoding: Encoding,
    column: &mut u32,
    max_length: &mut u32,
    line_ends: &mut Vec<BytePos>,
) -> std::result::Result<usize, TryReserveError> {
    let usable = block.len() - block.len() % width;
    let block = &block[..usable];

    let newlines = block
        .chunks_exact(width)
        .filter(|unit| unit_value(unit, encoding) == u32::from(b'\n'))
        .count();
    line_ends.try_reserve(newlines)?;

    for (index, unit) in block.chunks_exact(width).enumerate() {
        match unit_value(unit, encoding) {
            0x0A => {
                *max_length = (*max_length).max(*column);
                line_ends.push(BytePos(base.get() + ((index + 1) * width) as u64));
                *column = 0;
            }
            0x09 => *column += TAB_STOP - *column % TAB_STOP,
            _ => *column += 1,
        }
    }

    Ok(usable)
}

fn unit_value(unit: &[u8], encoding: Encoding) -> u32 {
    match encoding {
        Encoding::Utf16Le => u32::from(u16::from_le_bytes([unit[0], unit[1]])),
        Encoding::Utf16Be => u32::from(u16::from_be_bytes([unit[0], unit[1]])),
        Encoding::Utf32Le => u32::from_le_bytes([unit[0], unit[1], unit[2], unit[3]]),
        Encoding::Utf32Be => u32::from_be_bytes([unit[0], unit[1], unit[2], unit[3]]),
        Encoding::Latin1 | Encoding::Utf8 => u32::from(unit[0]),
    }
}

//! The log data facade.
//!
//! [`LogData`] owns the byte source and the indexing state, runs the
//! operation queue against the background worker, and exposes synchronous
//! line access to readers. Consumers receive progress and change
//! notifications through the event receiver returned by [`LogData::new`].
//!
//! Locking rules: readers take the indexing-data read lock to translate
//! line numbers into byte ranges, then the source mutex to read bytes. The
//! source mutex is never held across an event emission, and never acquired
//! while holding the indexing-data write lock.

use crate::access::FilteredView;
use crate::error::{DataError, Result};
use crate::events::{ControlMsg, FileChangeStatus, LogDataEvent};
use crate::monitor::Monitor;
use crate::queue::{LogDataOperation, OpQueue};
use crate::worker::{IndexWorker, WorkerEvent};
use logview_common::{expand_tabs, expanded_width, BytePos, LineLength, LineNumber, LinesCount};
use logview_core::{Encoding, FileSource, SharedSource};
use logview_index::{IndexingData, IndexingStatus};
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

/// The content of a log file, addressable by line number.
///
/// The handle is cheap to clone; all clones share the same state. Line
/// access is thread-safe and may be called while indexing runs in the
/// background. Dropping the last clone interrupts any running pass, stops
/// the worker and joins its threads.
#[derive(Clone)]
pub struct LogData {
    inner: Arc<Inner>,
}

struct Inner {
    source: SharedSource,
    indexing_data: IndexingData,
    queue: Arc<OpQueue>,
    worker: IndexWorker,
    control_tx: Sender<ControlMsg>,
    control_thread: Option<JoinHandle<()>>,
    attached_path: Arc<Mutex<Option<PathBuf>>>,
    last_modified: Arc<Mutex<Option<SystemTime>>>,
    display_encoding: Mutex<Encoding>,
}

impl LogData {
    /// Create an empty facade and the receiver for its notifications.
    ///
    /// The facade behaves as an empty log until [`attach`](Self::attach)
    /// is called.
    pub fn new() -> Result<(LogData, Receiver<LogDataEvent>)> {
        let (event_tx, event_rx) = mpsc::channel();
        let (control_tx, control_rx) = mpsc::channel();

        let source: SharedSource = Arc::new(Mutex::new(None));
        let indexing_data = IndexingData::new();

        let worker = IndexWorker::spawn(source.clone(), indexing_data.clone(), control_tx.clone())?;
        let queue = Arc::new(OpQueue::new(worker.handle()));

        let watcher_tx = control_tx.clone();
        let monitor = Monitor::new(move |event| {
            // The control loop is gone during teardown; nothing to notify
            let _ = watcher_tx.send(ControlMsg::FileEvent(event));
        })?;

        let attached_path = Arc::new(Mutex::new(None));
        let last_modified = Arc::new(Mutex::new(None));

        let control = ControlLoop {
            control_rx,
            events: event_tx,
            monitor,
            source: source.clone(),
            indexing_data: indexing_data.clone(),
            queue: Arc::clone(&queue),
            attached_path: Arc::clone(&attached_path),
            last_modified: Arc::clone(&last_modified),
            file_status: FileChangeStatus::Unchanged,
        };
        let control_thread = std::thread::Builder::new()
            .name(String::from("logview-control"))
            .spawn(move || control.run())?;

        let log_data = LogData {
            inner: Arc::new(Inner {
                source,
                indexing_data,
                queue,
                worker,
                control_tx,
                control_thread: Some(control_thread),
                attached_path,
                last_modified,
                display_encoding: Mutex::new(Encoding::default()),
            }),
        };

        Ok((log_data, event_rx))
    }

    /// Bind the facade to a file and start indexing it in the background.
    ///
    /// Can be called exactly once; a second call fails with
    /// [`DataError::AlreadyAttached`].
    pub fn attach(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        debug!("attach {:?}", path);

        let mut attached = self.inner.attached_path.lock();
        if attached.is_some() {
            return Err(DataError::AlreadyAttached);
        }

        let source = FileSource::open(path)?;
        *self.inner.source.lock() = Some(source);
        *attached = Some(path.to_path_buf());
        drop(attached);

        self.inner.queue.enqueue(LogDataOperation::Attach {
            path: path.to_path_buf(),
        });
        Ok(())
    }

    /// Interrupt any running pass, re-open the file and enqueue a full
    /// reindex.
    ///
    /// Re-opening matters when the file has been moved: the open handle
    /// follows the old inode, the reader wants the current name.
    pub fn reload(&self, forced_encoding: Option<Encoding>) {
        self.inner.worker.interrupt();

        let Some(path) = self.inner.attached_path.lock().clone() else {
            warn!("reload requested but no file is attached");
            return;
        };

        match FileSource::open(&path) {
            Ok(reopened) => *self.inner.source.lock() = Some(reopened),
            Err(e) => warn!("cannot re-open {:?}: {}", path, e),
        }

        self.inner
            .queue
            .enqueue(LogDataOperation::FullIndex { forced_encoding });
    }

    /// Ask the running indexing pass to stop at its next block boundary.
    ///
    /// The pass ends with [`IndexingStatus::Interrupted`] and its partial
    /// results are discarded.
    pub fn interrupt_loading(&self) {
        self.inner.worker.interrupt();
    }

    /// Number of lines indexed so far.
    pub fn nb_lines(&self) -> LinesCount {
        self.inner.indexing_data.nb_lines()
    }

    /// Display length of the longest line seen.
    pub fn max_length(&self) -> LineLength {
        self.inner.indexing_data.max_length()
    }

    /// Bytes of the file covered by the index.
    pub fn file_size(&self) -> BytePos {
        self.inner.indexing_data.size()
    }

    /// Modification time observed at the last load or change detection.
    pub fn last_modified(&self) -> Option<SystemTime> {
        *self.inner.last_modified.lock()
    }

    /// The encoding used to decode lines for display.
    pub fn display_encoding(&self) -> Encoding {
        *self.inner.display_encoding.lock()
    }

    /// The indexer's best guess for the file encoding.
    pub fn detected_encoding(&self) -> Encoding {
        self.inner.indexing_data.guessed_encoding()
    }

    /// Byte offset just past the terminator of `line`.
    pub fn pos_for_line(&self, line: LineNumber) -> Option<BytePos> {
        self.inner.indexing_data.pos_for_line(line)
    }

    /// One decoded line, terminator stripped. Empty when `line` is out of
    /// range.
    pub fn get_line(&self, line: LineNumber) -> String {
        self.read_line_string(line, false)
    }

    /// One decoded line with tabs expanded. Empty when `line` is out of
    /// range.
    pub fn get_expanded_line(&self, line: LineNumber) -> String {
        self.read_line_string(line, true)
    }

    /// Display length of one line, zero when `line` is out of range.
    pub fn get_line_length(&self, line: LineNumber) -> LineLength {
        expanded_width(&self.get_line(line))
    }

    /// A contiguous range of decoded lines. Empty when the range exceeds
    /// [`nb_lines`](Self::nb_lines).
    pub fn get_lines(&self, first: LineNumber, count: LinesCount) -> Vec<String> {
        self.read_lines_string(first, count, false)
    }

    /// A contiguous range of decoded lines with tabs expanded.
    pub fn get_expanded_lines(&self, first: LineNumber, count: LinesCount) -> Vec<String> {
        self.read_lines_string(first, count, true)
    }

    /// Change the encoding used to decode lines for display.
    ///
    /// When the new encoding's code-unit geometry is incompatible with the
    /// one the index was built with, the line offsets are meaningless for
    /// it and a reload is triggered with the new encoding pinned (or with
    /// detection re-enabled when the new encoding is the detector's own
    /// guess).
    pub fn set_display_encoding(&self, encoding: Encoding) {
        debug!("set_display_encoding: {}", encoding);
        *self.inner.display_encoding.lock() = encoding;

        let index_encoding = self.inner.indexing_data.index_encoding();
        if encoding != index_encoding
            && encoding.width_class() != index_encoding.width_class()
        {
            let is_guess = encoding == self.inner.indexing_data.guessed_encoding();
            self.reload(if is_guess { None } else { Some(encoding) });
        }
    }

    /// A handle for a search/filter consumer, bound to this facade.
    pub fn new_filtered_view(&self) -> FilteredView {
        FilteredView::new(self.clone())
    }

    fn read_line_string(&self, line: LineNumber, expand: bool) -> String {
        let Some(start) = self.inner.indexing_data.line_start(line) else {
            return String::new();
        };

        let raw = {
            let mut guard = self.inner.source.lock();
            let Some(source) = guard.as_mut() else {
                return String::new();
            };
            if let Err(e) = source.seek(start) {
                warn!("cannot seek to line {}: {}", line, e);
                return String::new();
            }
            match source.read_line() {
                Ok(raw) => raw,
                Err(e) => {
                    warn!("cannot read line {}: {}", line, e);
                    return String::new();
                }
            }
        };

        let mut decoded = self.display_encoding().decode(&raw);
        if decoded.ends_with('\n') {
            decoded.pop();
        }
        if expand {
            expand_tabs(&decoded)
        } else {
            decoded
        }
    }

    fn read_lines_string(
        &self,
        first: LineNumber,
        count: LinesCount,
        expand: bool,
    ) -> Vec<String> {
        if count.get() == 0 {
            return Vec::new();
        }

        let Some(range) = self.inner.indexing_data.line_range(first, count) else {
            warn!("lines out of bound asked for: {} + {}", first, count);
            return Vec::new();
        };
        let Some(last_byte) = range.ends.last().copied() else {
            return Vec::new();
        };
        let span = last_byte.saturating_sub(range.first_byte).get() as usize;

        // One source acquisition for the whole range
        let blob = {
            let mut guard = self.inner.source.lock();
            let Some(source) = guard.as_mut() else {
                return Vec::new();
            };
            if let Err(e) = source.seek(range.first_byte) {
                warn!("cannot seek to line {}: {}", first, e);
                return Vec::new();
            }
            match source.read(span) {
                Ok(blob) => blob,
                Err(e) => {
                    warn!("cannot read lines {} + {}: {}", first, count, e);
                    return Vec::new();
                }
            }
        };

        let encoding = self.display_encoding();
        let mut lines = Vec::with_capacity(range.ends.len());
        let mut beginning = 0usize;

        for end in &range.ends {
            // Clamp in case the file shrank between indexing and reading
            let end = ((end.get() - range.first_byte.get()) as usize).min(blob.len());
            let beginning_clamped = beginning.min(end);

            let mut decoded = encoding.decode(&blob[beginning_clamped..end]);
            if decoded.ends_with('\n') {
                decoded.pop();
            }
            lines.push(if expand { expand_tabs(&decoded) } else { decoded });

            beginning = end;
        }

        lines
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        debug!("shutting down log data");

        // Abort any running pass, then stop both background threads. The
        // worker must be gone before the shared source and indexing data
        // are dropped.
        self.worker.interrupt();
        let _ = self.control_tx.send(ControlMsg::Shutdown);
        self.worker.shutdown();
        if let Some(control) = self.control_thread.take() {
            let _ = control.join();
        }
    }
}

// ============================================================================
// Control loop
// ============================================================================

/// Dispatches worker completions and watcher notifications on a dedicated
/// thread, forwarding consumer-facing events in order.
struct ControlLoop {
    control_rx: Receiver<ControlMsg>,
    events: Sender<LogDataEvent>,
    monitor: Monitor,
    source: SharedSource,
    indexing_data: IndexingData,
    queue: Arc<OpQueue>,
    attached_path: Arc<Mutex<Option<PathBuf>>>,
    last_modified: Arc<Mutex<Option<SystemTime>>>,
    file_status: FileChangeStatus,
}

impl ControlLoop {
    fn run(mut self) {
        while let Ok(msg) = self.control_rx.recv() {
            match msg {
                ControlMsg::Shutdown => break,
                ControlMsg::Worker(WorkerEvent::Progressed(percent)) => {
                    let _ = self.events.send(LogDataEvent::LoadingProgressed(percent));
                }
                ControlMsg::Worker(WorkerEvent::Finished(status)) => {
                    self.on_indexing_finished(status);
                }
                ControlMsg::FileEvent(event) => self.on_file_event(event),
            }
        }

        debug!("log data control loop stopped");
    }

    fn on_indexing_finished(&mut self, status: IndexingStatus) {
        debug!(
            "indexing finished: {:?}, found {} lines",
            status,
            self.indexing_data.nb_lines()
        );

        if status == IndexingStatus::Successful {
            self.file_status = FileChangeStatus::Unchanged;

            if let Some(path) = self.attached_path.lock().clone() {
                // (Re-)arm the watcher on the current path
                if let Err(e) = self.monitor.watch_file(&path) {
                    warn!("cannot watch {:?}: {}", path, e);
                }
                *self.last_modified.lock() = modification_time(&path);
            }
        }

        let _ = self.events.send(LogDataEvent::LoadingFinished(status));

        // The operation is done; start the pending one, if any
        self.queue.advance();
    }

    fn on_file_event(&mut self, event: notify::Event) {
        trace!("file event: {:?}", event.kind);

        let Some(path) = self.attached_path.lock().clone() else {
            return;
        };
        info!("file changed on disk: {:?}", path);

        let indexed_size = self.indexing_data.size();
        let stat_size = std::fs::metadata(&path).map(|m| BytePos(m.len())).ok();
        let handle_size = self.source.lock().as_ref().and_then(|src| src.size().ok());
        let was_closed = handle_size.is_none();

        // In absence of any clearer information, a size mismatch between
        // the name and the open handle is taken to mean the name now
        // points at a different file (log rotation). We want to follow
        // the name, so re-open. This is a crude heuristic but necessary
        // for notification services that give no details.
        if stat_size != handle_size {
            info!("inconsistent size, the file might have changed, re-opening");
            self.reopen_source(&path);
        }

        let real_size = self
            .source
            .lock()
            .as_ref()
            .and_then(|src| src.size().ok())
            .unwrap_or(BytePos(0));

        let operation = if was_closed {
            // The source had become unreadable; now that a re-stat worked,
            // start over from scratch
            self.file_status = FileChangeStatus::Truncated;
            info!("file is readable again, full reindex");
            Some(LogDataOperation::FullIndex {
                forced_encoding: None,
            })
        } else if real_size < indexed_size {
            self.file_status = FileChangeStatus::Truncated;
            info!("file truncated");
            Some(LogDataOperation::FullIndex {
                forced_encoding: None,
            })
        } else if real_size == indexed_size {
            info!("no change in file");
            None
        } else if self.file_status != FileChangeStatus::DataAdded {
            self.file_status = FileChangeStatus::DataAdded;
            info!("new data on disk");
            Some(LogDataOperation::PartialIndex)
        } else {
            // The scheduled or running partial reindex will pick the new
            // bytes up from the indexed size
            None
        };

        if let Some(operation) = operation {
            self.queue.enqueue(operation);
            *self.last_modified.lock() = modification_time(&path);
            let _ = self.events.send(LogDataEvent::FileChanged(self.file_status));
        }
    }

    fn reopen_source(&self, path: &Path) {
        match FileSource::open(path) {
            Ok(reopened) => *self.source.lock() = Some(reopened),
            Err(e) => {
                warn!("cannot re-open {:?}: {}", path, e);
                *self.source.lock() = None;
            }
        }
    }
}

fn modification_time(path: &Path) -> Option<SystemTime> {
    std::fs::metadata(path).and_then(|m| m.modified()).ok()
}

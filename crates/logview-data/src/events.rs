//! Events delivered to consumers of a [`LogData`](crate::LogData).

use crate::worker::WorkerEvent;
use logview_index::IndexingStatus;

/// On-disk status of the attached file relative to the last successful
/// index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeStatus {
    /// The file matches what was indexed.
    Unchanged,
    /// The file grew; a partial reindex covers the new bytes.
    DataAdded,
    /// The file shrank or was replaced; a full reindex is required.
    Truncated,
}

/// Notifications emitted by the facade.
///
/// Within one operation, `LoadingProgressed` percentages are monotone
/// non-decreasing and all precede the operation's `LoadingFinished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDataEvent {
    /// Indexing progress, 0..=100.
    LoadingProgressed(u32),
    /// An indexing operation ended with the given status.
    LoadingFinished(IndexingStatus),
    /// The watcher observed a change to the attached file.
    FileChanged(FileChangeStatus),
}

/// Messages fanned in to the facade's control loop.
pub(crate) enum ControlMsg {
    Worker(WorkerEvent),
    FileEvent(notify::Event),
    Shutdown,
}

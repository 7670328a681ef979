//! The operation queue.
//!
//! Background work is serialised through a coalescing slot of depth 1: one
//! operation runs at a time, and at most one more waits behind it. A later
//! enqueue overwrites the pending slot — only the latest request matters,
//! because a partial reindex always resumes from the currently indexed
//! size.

use crate::worker::WorkerHandle;
use logview_core::Encoding;
use parking_lot::Mutex;
use std::path::PathBuf;
use tracing::debug;

/// A unit of background work executed by the indexing worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDataOperation {
    /// Initial indexing of a freshly attached file.
    Attach { path: PathBuf },
    /// Full reindex, optionally pinning the encoding.
    FullIndex {
        forced_encoding: Option<Encoding>,
    },
    /// Partial reindex from the currently indexed size.
    PartialIndex,
}

impl LogDataOperation {
    fn start(&self, worker: &WorkerHandle) {
        match self {
            LogDataOperation::Attach { path } => {
                debug!("attaching {:?}", path);
                worker.index_all(None);
            }
            LogDataOperation::FullIndex { forced_encoding } => {
                debug!("reindexing (full)");
                worker.index_all(*forced_encoding);
            }
            LogDataOperation::PartialIndex => {
                debug!("reindexing (partial)");
                worker.index_additional();
            }
        }
    }
}

struct Slots {
    current: Option<LogDataOperation>,
    pending: Option<LogDataOperation>,
}

/// Serialises operations against the single worker.
pub(crate) struct OpQueue {
    worker: WorkerHandle,
    slots: Mutex<Slots>,
}

impl OpQueue {
    pub fn new(worker: WorkerHandle) -> Self {
        OpQueue {
            worker,
            slots: Mutex::new(Slots {
                current: None,
                pending: None,
            }),
        }
    }

    /// Add an operation and start it immediately if none is running.
    ///
    /// When an operation is in progress the new one takes the pending
    /// slot, replacing whatever was there.
    pub fn enqueue(&self, operation: LogDataOperation) {
        let mut slots = self.slots.lock();

        if slots.current.is_none() {
            operation.start(&self.worker);
            slots.current = Some(operation);
        } else {
            debug!("an operation is in progress, scheduling for later");
            slots.pending = Some(operation);
        }
    }

    /// The running operation finished: promote and start the pending one,
    /// if any.
    pub fn advance(&self) {
        let mut slots = self.slots.lock();
        debug_assert!(slots.current.is_some(), "advance without a running operation");

        slots.current = slots.pending.take();
        if let Some(operation) = &slots.current {
            debug!("starting the next queued operation");
            operation.start(&self.worker);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::WorkerCommand;
    use std::sync::atomic::AtomicBool;
    use std::sync::mpsc::{channel, Receiver, TryRecvError};
    use std::sync::Arc;

    fn queue_with_probe() -> (OpQueue, Receiver<WorkerCommand>) {
        let (commands, command_rx) = channel();
        let handle = WorkerHandle::new(commands, Arc::new(AtomicBool::new(false)));
        (OpQueue::new(handle), command_rx)
    }

    #[test]
    fn test_enqueue_on_idle_starts_immediately() {
        let (queue, commands) = queue_with_probe();

        queue.enqueue(LogDataOperation::FullIndex {
            forced_encoding: None,
        });

        assert!(matches!(
            commands.try_recv(),
            Ok(WorkerCommand::IndexAll { .. })
        ));
        assert!(matches!(commands.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_pending_slot_coalesces() {
        let (queue, commands) = queue_with_probe();

        queue.enqueue(LogDataOperation::FullIndex {
            forced_encoding: None,
        });
        // Three partial requests arrive while the full index runs
        queue.enqueue(LogDataOperation::PartialIndex);
        queue.enqueue(LogDataOperation::PartialIndex);
        queue.enqueue(LogDataOperation::PartialIndex);

        // Only the initial operation has been started
        assert!(matches!(
            commands.try_recv(),
            Ok(WorkerCommand::IndexAll { .. })
        ));
        assert!(matches!(commands.try_recv(), Err(TryRecvError::Empty)));

        // Completion starts exactly one more operation, not three
        queue.advance();
        assert!(matches!(
            commands.try_recv(),
            Ok(WorkerCommand::IndexAdditional)
        ));
        assert!(matches!(commands.try_recv(), Err(TryRecvError::Empty)));

        // And the queue drains
        queue.advance();
        assert!(matches!(commands.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn test_later_pending_operation_wins() {
        let (queue, commands) = queue_with_probe();

        queue.enqueue(LogDataOperation::PartialIndex);
        queue.enqueue(LogDataOperation::PartialIndex);
        queue.enqueue(LogDataOperation::FullIndex {
            forced_encoding: Some(Encoding::Utf8),
        });

        assert!(matches!(
            commands.try_recv(),
            Ok(WorkerCommand::IndexAdditional)
        ));

        queue.advance();
        assert!(matches!(
            commands.try_recv(),
            Ok(WorkerCommand::IndexAll {
                forced_encoding: Some(Encoding::Utf8)
            })
        ));
    }
}

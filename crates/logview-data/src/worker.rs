//! Background indexing worker.
//!
//! A single dedicated thread executes indexing passes sequentially,
//! publishing progress and completion into the facade's control channel.
//! The interrupt flag is shared with the facade so a running pass can be
//! aborted at its next block boundary.

use crate::events::ControlMsg;
use logview_core::{Encoding, SharedSource};
use logview_index::{IndexingData, IndexingStatus, LineScanner, ScanPass};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::debug;

/// Commands executed sequentially by the worker thread.
#[derive(Debug)]
pub(crate) enum WorkerCommand {
    /// Full reindex from byte 0.
    IndexAll {
        forced_encoding: Option<Encoding>,
    },
    /// Partial reindex from the currently indexed size.
    IndexAdditional,
    /// Leave the command loop.
    Shutdown,
}

/// Events published by the worker thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerEvent {
    Progressed(u32),
    Finished(IndexingStatus),
}

/// Cheap handle for submitting work and requesting interruption.
#[derive(Clone)]
pub(crate) struct WorkerHandle {
    commands: Sender<WorkerCommand>,
    interrupt: Arc<AtomicBool>,
}

impl WorkerHandle {
    pub(crate) fn new(commands: Sender<WorkerCommand>, interrupt: Arc<AtomicBool>) -> Self {
        WorkerHandle {
            commands,
            interrupt,
        }
    }

    /// Queue a full reindex.
    pub fn index_all(&self, forced_encoding: Option<Encoding>) {
        let _ = self.commands.send(WorkerCommand::IndexAll { forced_encoding });
    }

    /// Queue a partial reindex.
    pub fn index_additional(&self) {
        let _ = self.commands.send(WorkerCommand::IndexAdditional);
    }

    /// Ask the running pass to stop at its next block boundary.
    pub fn interrupt(&self) {
        self.interrupt.store(true, Ordering::Release);
    }
}

/// Owns the worker thread.
pub(crate) struct IndexWorker {
    handle: WorkerHandle,
    thread: Option<JoinHandle<()>>,
}

impl IndexWorker {
    /// Start the worker thread.
    pub fn spawn(
        source: SharedSource,
        data: IndexingData,
        events: Sender<ControlMsg>,
    ) -> io::Result<Self> {
        let (commands, command_rx) = channel();
        let interrupt = Arc::new(AtomicBool::new(false));

        let thread_interrupt = Arc::clone(&interrupt);
        let thread = std::thread::Builder::new()
            .name(String::from("logview-indexer"))
            .spawn(move || worker_loop(command_rx, source, data, thread_interrupt, events))?;

        Ok(IndexWorker {
            handle: WorkerHandle::new(commands, interrupt),
            thread: Some(thread),
        })
    }

    /// A cloneable handle for submitting work.
    pub fn handle(&self) -> WorkerHandle {
        self.handle.clone()
    }

    /// Ask the running pass to stop at its next block boundary.
    pub fn interrupt(&self) {
        self.handle.interrupt();
    }

    /// Stop the command loop and join the thread.
    pub fn shutdown(&mut self) {
        let _ = self.handle.commands.send(WorkerCommand::Shutdown);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

fn worker_loop(
    commands: Receiver<WorkerCommand>,
    source: SharedSource,
    data: IndexingData,
    interrupt: Arc<AtomicBool>,
    events: Sender<ControlMsg>,
) {
    let mut scanner = LineScanner::new();

    loop {
        let Ok(command) = commands.recv() else {
            // Facade gone
            break;
        };

        let pass = match command {
            WorkerCommand::Shutdown => break,
            WorkerCommand::IndexAll { forced_encoding } => ScanPass::Full { forced_encoding },
            WorkerCommand::IndexAdditional => ScanPass::Additional,
        };

        // Each pass starts with a clear interrupt request; an earlier
        // interrupt targets the pass that was running when it was set.
        interrupt.store(false, Ordering::Release);

        let progress_events = events.clone();
        let status = scanner.run(&source, &data, pass, &interrupt, |percent| {
            let _ = progress_events.send(ControlMsg::Worker(WorkerEvent::Progressed(percent)));
        });

        if events
            .send(ControlMsg::Worker(WorkerEvent::Finished(status)))
            .is_err()
        {
            break;
        }
    }

    debug!("index worker stopped");
}

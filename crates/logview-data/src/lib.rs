//! The data core of an interactive log viewer.
//!
//! [`LogData`] ingests a potentially huge, possibly growing log file and
//! makes it randomly addressable by line number:
//!
//! - a background worker builds and incrementally extends a line-offset
//!   index (see the `logview-index` crate)
//! - a file watcher drives partial or full reindexing as the file grows,
//!   shrinks or is rotated
//! - line-access calls decode bytes on demand with a configurable display
//!   encoding
//!
//! # Example
//!
//! ```no_run
//! use logview_data::{LogData, LogDataEvent};
//! use logview_common::LineNumber;
//!
//! let (log_data, events) = LogData::new().unwrap();
//! log_data.attach("/var/log/syslog").unwrap();
//! while let Ok(event) = events.recv() {
//!     if let LogDataEvent::LoadingFinished(status) = event {
//!         println!("loaded: {:?}, {} lines", status, log_data.nb_lines());
//!         println!("first line: {}", log_data.get_line(LineNumber(0)));
//!         break;
//!     }
//! }
//! ```

pub mod access;
pub mod error;
pub mod events;
pub mod log_data;
pub mod monitor;
pub mod queue;

mod worker;

pub use access::{FilteredView, LineAccess};
pub use error::{DataError, Result};
pub use events::{FileChangeStatus, LogDataEvent};
pub use log_data::LogData;
pub use monitor::Monitor;
pub use queue::LogDataOperation;

// Re-export the status consumers see in `LoadingFinished` for convenience
pub use logview_index::IndexingStatus;

use std::io;
use thiserror::Error;

/// Errors surfaced by the log data facade.
///
/// Background failures are not errors: they are reported through
/// [`LogDataEvent::LoadingFinished`](crate::LogDataEvent) statuses.
#[derive(Error, Debug)]
pub enum DataError {
    /// `attach` was called on a facade that already has a file.
    #[error("a file is already attached")]
    AlreadyAttached,

    #[error("source error: {0}")]
    Source(#[from] logview_core::CoreError),

    #[error("file watcher error: {0}")]
    Watcher(#[from] notify::Error),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DataError>;

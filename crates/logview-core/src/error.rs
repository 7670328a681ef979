use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("i/o error during source operation: {0}")]
    Io(#[from] io::Error),

    #[error("source is closed")]
    SourceClosed,

    #[error("unknown encoding name: {0}")]
    UnknownEncoding(String),
}

static_assertions::const_assert!(std::mem::size_of::<CoreError>() <= 32);

pub type Result<T> = std::result::Result<T, CoreError>;

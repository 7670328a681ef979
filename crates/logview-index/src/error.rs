use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("out of memory while growing the line index")]
    OutOfMemory,

    #[error("source error: {0}")]
    Source(#[from] logview_core::CoreError),
}

static_assertions::const_assert!(std::mem::size_of::<IndexError>() <= 40);

pub type Result<T> = std::result::Result<T, IndexError>;

use thiserror::Error;

use super::types::PageId;

/// Error type for the storage core.
///
/// Kept intentionally small: the core surfaces failures to its caller rather
/// than attempting local recovery (see the error-handling design notes).
#[derive(Error, Debug)]
pub enum CrioError {
    #[error("I/O failure: {0}")]
    IoFailure(#[from] std::io::Error),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("all frames are pinned; no evictable victim is available")]
    AllPinned,

    #[error("disk scheduler is closed")]
    SchedulerClosed,

    #[error("unexpected end of file reading page {0}")]
    UnexpectedEof(PageId),

    #[error("page overflow: tuple of {tuple_size} bytes exceeds {available} bytes available")]
    PageOverflow { tuple_size: usize, available: usize },

    #[error("invalid slot index: {0}")]
    InvalidSlotId(u16),
}

pub type Result<T> = std::result::Result<T, CrioError>;

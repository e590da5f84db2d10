use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexError>;

/// Build-time failures. Queries never fail: a missing entry simply answers
/// `contains = false` with an empty completion list.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Pass 1 / pass 2 disagreement or a damaged internal structure.
    #[error("corruption detected: {0}")]
    Corruption(&'static str),
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),
    #[error("malformed gloss: {0}")]
    MalformedGloss(String),
}

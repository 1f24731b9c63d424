use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid data type {code:?}: {reason}")]
    InvalidType { code: String, reason: &'static str },

    #[error("invalid overlay width {width}: must be a power of two no larger than 8")]
    InvalidOverlay { width: usize },

    #[error("variable {name:?} not found")]
    NotFound { name: String },

    #[error("button {name:?} is not in the button list")]
    UnknownButton { name: String },

    #[error("button {name:?} is at index {index}, past the 64 bits of an action mask")]
    ButtonIndex { name: String, index: usize },

    #[error("metrics encoding failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("address {address:#x} is not mapped by any block")]
    Unmapped { address: usize },

    #[error("access of {width} bytes at {address:#x} runs past the end of its block")]
    OutOfBounds { address: usize, width: usize },

    #[error("block at {offset:#x} (size {size:#x}) overlaps an existing block")]
    Overlap { offset: usize, size: usize },

    #[error("manifest has no \"info\" object")]
    MissingInfo,

    #[error("malformed manifest: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Coarse classification of [`Error`], for callers that only care about the
/// class of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Construction,
    NotFound,
    Range,
    Format,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidType { .. } | Error::InvalidOverlay { .. } => ErrorKind::Construction,
            Error::NotFound { .. } | Error::UnknownButton { .. } => ErrorKind::NotFound,
            Error::Unmapped { .. }
            | Error::OutOfBounds { .. }
            | Error::Overlap { .. }
            | Error::ButtonIndex { .. } => ErrorKind::Range,
            Error::MissingInfo | Error::Json(_) | Error::Metrics(_) => ErrorKind::Format,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

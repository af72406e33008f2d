//! Store errors.
//!
//! Everything here is fatal for the transaction that hit it: the write is
//! rolled back and the error surfaces to the caller. Advisory problems found
//! while parsing or binding are diagnostics, never `PdomError`s.

use std::path::PathBuf;

use cidx_ir::Canceled;

use crate::RecordNo;

#[derive(Debug, thiserror::Error)]
pub enum PdomError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The image is not a database or a record points outside it.
    #[error("corrupt index: {0}")]
    Corrupt(String),

    /// The image was written by an incompatible layout version; rebuild it.
    #[error("index version {found} does not match expected version {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("failed to (de)serialize record {record}: {message}")]
    Serialization { record: RecordNo, message: String },
}

impl PdomError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PdomError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn out_of_bounds(record: RecordNo, len: usize) -> Self {
        PdomError::Corrupt(format!("record {record} lies outside the image ({len} bytes)"))
    }
}

/// Outcome of a write transaction that did not commit.
#[derive(Debug, thiserror::Error)]
pub enum WriteError {
    #[error("indexing was canceled")]
    Canceled,

    #[error(transparent)]
    Store(#[from] PdomError),
}

impl From<Canceled> for WriteError {
    fn from(_: Canceled) -> Self {
        WriteError::Canceled
    }
}

pub type PdomResult<T> = Result<T, PdomError>;

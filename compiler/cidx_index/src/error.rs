//! Errors of an indexing run.

use std::path::PathBuf;

use cidx_ir::Canceled;
use cidx_pdom::{PdomError, WriteError};

/// Why indexing stopped. Problems in the source are not errors; they are
/// reported with each unit.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The run was canceled; nothing of the interrupted unit was stored.
    #[error("indexing was canceled")]
    Canceled,
    /// The index could not be read or written.
    #[error(transparent)]
    Store(#[from] PdomError),
    /// A source file named for indexing could not be read.
    #[error("cannot read {}", path.display())]
    Read { path: PathBuf },
}

impl From<Canceled> for IndexError {
    fn from(_: Canceled) -> Self {
        IndexError::Canceled
    }
}

impl From<WriteError> for IndexError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Canceled => IndexError::Canceled,
            WriteError::Store(err) => IndexError::Store(err),
        }
    }
}

pub type IndexResult<T> = Result<T, IndexError>;

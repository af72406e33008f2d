//! The shared, file-backed index.

use std::io::Write as _;
use std::path::{Path, PathBuf};

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use cidx_bindings::ArgMap;
use cidx_ir::{CancellationToken, Dialect};

use crate::database::{Database, RecordNo};
use crate::error::{PdomError, PdomResult, WriteError};
use crate::query::{FileInfo, StoredBinding};
use crate::write::{UnitContribution, WriteSummary};

/// A persistent symbol index.
///
/// One lock guards the whole database. A writer holds it for the full store
/// of one translation unit; readers share it. Every store runs in a
/// transaction that is rolled back on error or cancellation, leaving the
/// database as it was.
pub struct Pdom {
    db: RwLock<Database>,
    path: Option<PathBuf>,
}

impl Pdom {
    /// An index that lives only in memory.
    pub fn in_memory() -> Self {
        Pdom {
            db: RwLock::new(Database::new()),
            path: None,
        }
    }

    /// Open the index at `path`, starting empty when the file does not exist.
    /// A [`PdomError::VersionMismatch`] means the caller should rebuild with
    /// [`Pdom::create`].
    pub fn open(path: impl Into<PathBuf>) -> PdomResult<Self> {
        let path = path.into();
        let db = match std::fs::read(&path) {
            Ok(bytes) => Database::from_bytes(bytes)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Database::new(),
            Err(err) => return Err(PdomError::io(&path, err)),
        };
        tracing::debug!(path = %path.display(), bytes = db.len(), "opened index");
        Ok(Pdom {
            db: RwLock::new(db),
            path: Some(path),
        })
    }

    /// A fresh, empty index at `path`, discarding any existing one on the
    /// next flush.
    pub fn create(path: impl Into<PathBuf>) -> Self {
        Pdom {
            db: RwLock::new(Database::new()),
            path: Some(path.into()),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Write the image to disk atomically: a temporary file in the same
    /// directory, then a rename over the target.
    pub fn flush(&self) -> PdomResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let db = self.db.read();
        let tmp = path.with_extension("tmp");
        let write = || -> std::io::Result<()> {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(db.as_bytes())?;
            file.sync_all()?;
            std::fs::rename(&tmp, path)
        };
        write().map_err(|e| PdomError::io(path, e))?;
        tracing::debug!(path = %path.display(), bytes = db.len(), "flushed index");
        Ok(())
    }

    /// Shared access for queries.
    pub fn read(&self) -> RwLockReadGuard<'_, Database> {
        self.db.read()
    }

    /// Exclusive access, e.g. for [`Database::specialize`].
    pub fn write(&self) -> RwLockWriteGuard<'_, Database> {
        self.db.write()
    }

    /// Run `f` in a write transaction, rolling back unless it succeeds.
    pub fn transaction<T, E>(&self, f: impl FnOnce(&mut Database) -> Result<T, E>) -> Result<T, E> {
        let mut db = self.db.write();
        db.begin();
        match f(&mut db) {
            Ok(value) => {
                db.commit();
                Ok(value)
            }
            Err(err) => {
                db.rollback();
                Err(err)
            }
        }
    }

    /// Store one translation unit, replacing what its files contributed
    /// before. On cancellation or error nothing changes.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn write_unit(
        &self,
        contribution: &UnitContribution<'_>,
        cancel: &CancellationToken,
    ) -> Result<WriteSummary, WriteError> {
        self.transaction(|db| db.write_unit(contribution, cancel))
    }

    /// Remove a file's contribution and forget the file. Returns how many
    /// bindings were deleted, or `None` for an unknown file.
    pub fn remove_file(&self, path: &str) -> PdomResult<Option<usize>> {
        self.transaction(|db| db.remove_file(path))
    }

    /// Drop everything.
    pub fn clear(&self) {
        *self.db.write() = Database::new();
    }

    pub fn record_count(&self) -> PdomResult<u32> {
        self.read().record_count()
    }

    pub fn files(&self) -> PdomResult<Vec<FileInfo>> {
        self.read().files()
    }

    pub fn find_bindings(
        &self,
        linkage: Dialect,
        name: &str,
        prefix: bool,
    ) -> PdomResult<Vec<StoredBinding>> {
        self.read().find_bindings(linkage, name, prefix)
    }

    /// Find or create the specialization of `generic` for `args`.
    pub fn specialize(&self, generic: RecordNo, args: &ArgMap<RecordNo>) -> PdomResult<RecordNo> {
        self.transaction(|db| db.specialize(generic, args))
    }

    pub fn dump(&self) -> PdomResult<String> {
        self.read().dump()
    }
}

impl std::fmt::Debug for Pdom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pdom")
            .field("path", &self.path)
            .field("bytes", &self.db.read().len())
            .finish()
    }
}

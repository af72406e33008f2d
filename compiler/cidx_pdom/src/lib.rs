//! Persistent symbol index.
//!
//! Bindings, their declaration and reference sites, class bases and template
//! specializations are stored as fixed-layout records in one byte image
//! ([`Database`]) that is flushed to disk as a whole. Records reference each
//! other by [`RecordNo`]; types and argument maps are serialized blobs using
//! the same [`Type`](cidx_bindings::Type) shape as the binder, with
//! `RecordNo` in place of `BindingId`.
//!
//! [`Pdom`] wraps the database behind a read/write lock and runs every store
//! of a translation unit as one transaction.
//!
//! ```text
//! BoundUnit ──write_unit──▶ binding records ◀── names ◀── file records
//!                               │
//!                               ├─ members, bases
//!                               └─ specializations ──▶ ClassView
//! ```

mod database;
mod error;
mod query;
mod records;
pub mod specialization;
mod store;
mod visitor;
mod write;

#[cfg(test)]
mod tests;

pub use database::{Database, RecordNo, Root, MAGIC, VERSION};
pub use error::{PdomError, PdomResult, WriteError};
pub use query::{FileInfo, StoredBinding, StoredName, TuState};
pub use specialization::{BaseView, ClassView, MemberView, ResolutionBatch};
pub use store::Pdom;
pub use visitor::PdomVisitor;
pub use write::{SourceFile, UnitContribution, WriteSummary};

//! Indexer driver.
//!
//! Ties the pipeline together: each translation unit is preprocessed,
//! parsed and bound on a worker thread, then stored in the shared
//! [`Pdom`](cidx_pdom::Pdom) under its write lock. [`Indexer`] also answers
//! the queries the `cidx` command exposes.

pub mod config;
mod error;
mod indexer;
mod logging;
pub mod query;

pub use config::{ConfigError, IndexerConfig};
pub use error::{IndexError, IndexResult};
pub use indexer::{IndexSummary, Indexer, ParsedUnit, UnitReport};
pub use logging::init_tracing;
pub use query::{BaseClass, Location, Member, Role, Symbol};

//! The indexing pipeline: preprocess, parse and bind translation units in
//! parallel, then store each one in its own write transaction.

use std::hash::Hasher;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHasher};

use cidx_bindings::{bind, BoundUnit};
use cidx_diagnostic::span_utils::LineOffsetTable;
use cidx_diagnostic::{Diagnostic, DiagnosticConfig, DiagnosticQueue};
use cidx_ir::{CancellationToken, Dialect, FileId, SharedInterner};
use cidx_parse::parse;
use cidx_pdom::{Pdom, PdomError, SourceFile, UnitContribution, WriteSummary};
use cidx_preprocess::{
    FileContentProvider, FsContentProvider, LocationMap, Preprocessor, ScanContext,
};

use crate::config::IndexerConfig;
use crate::error::{IndexError, IndexResult};

/// Worker stack size. Deeply nested declarators and expressions recurse in
/// the parser and binder; `stacker` grows the stack past this when needed.
const WORKER_STACK_SIZE: usize = 16 * 1024 * 1024;

fn content_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(text.as_bytes());
    hasher.finish()
}

/// A translation unit ready to be stored.
pub struct ParsedUnit {
    pub path: PathBuf,
    pub unit: BoundUnit,
    pub sources: LocationMap,
    pub files: Vec<SourceFile>,
    /// Preprocessor, syntax and binding problems, in that order.
    pub problems: Vec<Diagnostic>,
}

/// What storing one translation unit did.
pub struct UnitReport {
    pub path: PathBuf,
    pub summary: WriteSummary,
    /// Problems sorted by position, at most the configured number of errors.
    pub problems: Vec<Diagnostic>,
    /// Errors dropped by the limit.
    pub suppressed: usize,
    /// Files and text of the unit, for rendering `problems`.
    pub sources: LocationMap,
}

/// Outcome of [`Indexer::index`].
#[derive(Default)]
pub struct IndexSummary {
    pub units: Vec<UnitReport>,
    /// Inputs that could not be read; the others were still indexed.
    pub unreadable: Vec<PathBuf>,
}

impl IndexSummary {
    /// Sum of every unit's write summary.
    pub fn totals(&self) -> WriteSummary {
        let mut total = WriteSummary::default();
        for unit in &self.units {
            let s = &unit.summary;
            total.files_written += s.files_written;
            total.files_skipped += s.files_skipped;
            total.bindings_created += s.bindings_created;
            total.names_written += s.names_written;
            total.bindings_deleted += s.bindings_deleted;
        }
        total
    }

    pub fn problem_count(&self) -> usize {
        self.units.iter().map(|u| u.problems.len()).sum()
    }
}

/// Indexes translation units into one [`Pdom`].
///
/// All units share one interner, so a `Name` means the same string in every
/// bound unit, and one content provider, so headers are read once.
pub struct Indexer {
    config: IndexerConfig,
    pdom: Pdom,
    interner: SharedInterner,
    provider: Arc<dyn FileContentProvider>,
    cancel: CancellationToken,
    pub(crate) lines: Mutex<FxHashMap<String, Option<(Arc<str>, LineOffsetTable)>>>,
}

impl Indexer {
    /// Open the index at `config.db_path`, reading sources from disk. An
    /// index written by another format version is discarded and rebuilt.
    pub fn open(config: IndexerConfig) -> IndexResult<Indexer> {
        let pdom = match Pdom::open(&config.db_path) {
            Ok(pdom) => pdom,
            Err(PdomError::VersionMismatch { found, expected }) => {
                tracing::warn!(
                    path = %config.db_path.display(),
                    found,
                    expected,
                    "index has another format version; rebuilding"
                );
                Pdom::create(&config.db_path)
            }
            Err(err) => return Err(err.into()),
        };
        Ok(Indexer::with_store(config, pdom, Arc::new(FsContentProvider::new())))
    }

    /// An indexer over an existing store and content provider.
    pub fn with_store(
        config: IndexerConfig,
        pdom: Pdom,
        provider: Arc<dyn FileContentProvider>,
    ) -> Indexer {
        Indexer {
            config,
            pdom,
            interner: SharedInterner::new(),
            provider,
            cancel: CancellationToken::new(),
            lines: Mutex::new(FxHashMap::default()),
        }
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn pdom(&self) -> &Pdom {
        &self.pdom
    }

    pub(crate) fn provider(&self) -> &dyn FileContentProvider {
        &*self.provider
    }

    /// Cancel to stop the run: the unit being stored is rolled back and no
    /// further unit starts.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Preprocess, parse and bind `path`.
    #[tracing::instrument(level = "debug", skip(self), fields(path = %path.display()))]
    pub fn parse_unit(&self, path: &Path) -> IndexResult<ParsedUnit> {
        self.cancel.check()?;
        let Some(text) = self.provider.read(path) else {
            return Err(IndexError::Read {
                path: path.to_path_buf(),
            });
        };
        let dialect = Dialect::from_path(path);
        let ctx = ScanContext::new(self.interner.clone(), Arc::clone(&self.provider))
            .with_cancel(self.cancel.clone());
        let mut pp = Preprocessor::new(ctx, &self.config.scanner, dialect, path, text);
        let parsed = parse(&mut pp, self.config.mode, &self.cancel)?;
        let (sources, mut problems) = pp.finish();
        let unit = bind(&parsed.unit, &self.interner, dialect);
        problems.extend(parsed.problems);
        problems.extend(unit.problems.iter().cloned());

        let files = sources
            .files()
            .filter_map(|(id, file)| {
                let text = sources.source(id)?;
                Some(SourceFile {
                    id,
                    path: file.display().to_string(),
                    hash: content_hash(text),
                })
            })
            .collect();
        tracing::debug!(
            bindings = unit.bindings.len(),
            problems = problems.len(),
            "bound translation unit"
        );
        Ok(ParsedUnit {
            path: path.to_path_buf(),
            unit,
            sources,
            files,
            problems,
        })
    }

    /// Store a parsed unit, replacing what its files contributed before.
    pub fn store(&self, parsed: ParsedUnit) -> IndexResult<UnitReport> {
        let contribution = UnitContribution {
            unit: &parsed.unit,
            interner: &self.interner,
            files: &parsed.files,
        };
        let summary = self.pdom.write_unit(&contribution, &self.cancel)?;
        let (problems, suppressed) = self.limit_problems(&parsed.problems, &parsed.sources);
        Ok(UnitReport {
            path: parsed.path,
            summary,
            problems,
            suppressed,
            sources: parsed.sources,
        })
    }

    pub fn index_file(&self, path: &Path) -> IndexResult<UnitReport> {
        let parsed = self.parse_unit(path)?;
        self.store(parsed)
    }

    /// Index `paths` and flush the index.
    ///
    /// Unreadable inputs are reported and skipped. Cancellation or a store
    /// error ends the run without flushing, so the file on disk keeps its
    /// previous contents.
    #[tracing::instrument(level = "debug", skip_all, fields(units = paths.len()))]
    pub fn index(&self, paths: &[PathBuf]) -> IndexResult<IndexSummary> {
        let outcomes = if self.config.parallel && paths.len() > 1 {
            self.index_parallel(paths)
        } else {
            paths.iter().map(|path| self.index_file(path)).collect()
        };
        let mut summary = IndexSummary::default();
        for outcome in outcomes {
            match outcome {
                Ok(report) => summary.units.push(report),
                Err(IndexError::Read { path }) => {
                    tracing::warn!(path = %path.display(), "cannot read source file; skipped");
                    summary.unreadable.push(path);
                }
                Err(err) => return Err(err),
            }
        }
        self.pdom.flush()?;
        let totals = summary.totals();
        tracing::info!(
            units = summary.units.len(),
            files = totals.files_written,
            skipped = totals.files_skipped,
            bindings = totals.bindings_created,
            names = totals.names_written,
            "indexing finished"
        );
        Ok(summary)
    }

    /// Parse on a scoped pool; each worker stores its own unit, so writes
    /// queue on the store's lock while other units are still parsing.
    fn index_parallel(&self, paths: &[PathBuf]) -> Vec<IndexResult<UnitReport>> {
        let mut builder = rayon::ThreadPoolBuilder::new().stack_size(WORKER_STACK_SIZE);
        if let Some(jobs) = self.config.jobs {
            builder = builder.num_threads(jobs);
        }
        builder
            .build_scoped(rayon::ThreadBuilder::run, |pool| {
                pool.install(|| {
                    paths
                        .par_iter()
                        .map(|path| self.index_file(path))
                        .collect::<Vec<_>>()
                })
            })
            .unwrap_or_else(|e| {
                tracing::warn!("failed to create thread pool ({e}), indexing sequentially");
                paths.iter().map(|path| self.index_file(path)).collect()
            })
    }

    /// Remove a file's contribution and flush. Returns how many bindings
    /// went with it, or `None` if the file was never indexed.
    pub fn remove(&self, path: &Path) -> IndexResult<Option<usize>> {
        let removed = self.pdom.remove_file(&path.display().to_string())?;
        if removed.is_some() {
            self.pdom.flush()?;
        }
        Ok(removed)
    }

    fn limit_problems(&self, problems: &[Diagnostic], sources: &LocationMap) -> (Vec<Diagnostic>, usize) {
        let mut queue = DiagnosticQueue::with_config(DiagnosticConfig {
            error_limit: self.config.diagnostic_limit,
            deduplicate: true,
        });
        let mut tables: FxHashMap<FileId, LineOffsetTable> = FxHashMap::default();
        for problem in problems {
            let file = problem.primary_file();
            let offset = problem.primary_span().map_or(0, |s| s.start);
            let (line, column) = match sources.source(file) {
                Some(text) => tables
                    .entry(file)
                    .or_insert_with(|| LineOffsetTable::build(text))
                    .offset_to_line_col(text, offset),
                None => (0, 0),
            };
            queue.add(problem.clone(), line, column);
        }
        let suppressed = queue.suppressed_count();
        (queue.flush(), suppressed)
    }
}

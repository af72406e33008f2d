//! Index tests over real source text.
//!
//! - `storage`: storing, re-storing, flushing and reopening
//! - `specializations`: implicit and explicit specializations, class views
//! - `removal`: removing files and sweeping orphaned bindings

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod removal;
mod specializations;
mod storage;

use std::hash::Hasher;
use std::path::Path;
use std::sync::Arc;

use rustc_hash::FxHasher;

use cidx_bindings::{bind, BoundUnit};
use cidx_ir::{CancellationToken, Dialect, SharedInterner};
use cidx_parse::{parse, ParseMode};
use cidx_preprocess::{InMemoryProvider, Preprocessor, ScanContext, ScannerInfo};

use crate::{Pdom, SourceFile, UnitContribution, WriteSummary};

/// A bound translation unit with the files it read.
pub(crate) struct Unit {
    pub unit: BoundUnit,
    pub interner: SharedInterner,
    pub files: Vec<SourceFile>,
}

fn content_hash(text: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(text.as_bytes());
    hasher.finish()
}

/// Preprocess, parse and bind `path` with `text`, resolving includes against
/// `headers`.
pub(crate) fn bind_unit(path: &str, text: &str, headers: &[(&str, &str)]) -> Unit {
    let interner = SharedInterner::new();
    let mut provider = InMemoryProvider::new();
    for (header, contents) in headers {
        provider.add(*header, contents);
    }
    let dialect = Dialect::from_path(Path::new(path));
    let ctx = ScanContext::new(interner.clone(), Arc::new(provider));
    let mut pp = Preprocessor::new(ctx, &ScannerInfo::default(), dialect, path, Arc::from(text));
    let parsed = parse(&mut pp, ParseMode::Complete, &CancellationToken::new()).unwrap();
    assert!(
        parsed.problems.is_empty(),
        "unexpected syntax problems in {text:?}: {:?}",
        parsed.problems
    );
    let (map, problems) = pp.finish();
    assert!(problems.is_empty(), "unexpected preprocessor problems: {problems:?}");
    let unit = bind(&parsed.unit, &interner, dialect);
    let files = map
        .files()
        .map(|(id, file)| SourceFile {
            id,
            path: file.display().to_string(),
            hash: content_hash(map.source(id).unwrap_or_default()),
        })
        .collect();
    Unit {
        unit,
        interner,
        files,
    }
}

/// Bind a single C++ file at `/src/main.cpp`.
pub(crate) fn bind_text(text: &str) -> Unit {
    bind_unit("/src/main.cpp", text, &[])
}

impl Unit {
    pub fn contribution(&self) -> UnitContribution<'_> {
        UnitContribution {
            unit: &self.unit,
            interner: &self.interner,
            files: &self.files,
        }
    }
}

/// Store `unit` into `pdom`, which must succeed.
pub(crate) fn store(pdom: &Pdom, unit: &Unit) -> WriteSummary {
    pdom.write_unit(&unit.contribution(), &CancellationToken::new())
        .unwrap()
}

/// A fresh in-memory index holding `text`.
pub(crate) fn index_text(text: &str) -> Pdom {
    let pdom = Pdom::in_memory();
    store(&pdom, &bind_text(text));
    pdom
}

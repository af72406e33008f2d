//! Scanner configuration.

use std::path::PathBuf;

/// Default bound on `#include` nesting.
pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 200;

/// Everything a scanner needs to know about the build of one translation unit.
#[derive(Clone, Debug)]
pub struct ScannerInfo {
    /// `-I` directories, searched for `<...>` and `"..."` includes.
    pub include_paths: Vec<PathBuf>,
    /// `-iquote` directories, searched for `"..."` includes only.
    pub quote_include_paths: Vec<PathBuf>,
    /// `-D` definitions as `(name, value)`; `-DX` is `("X", "1")`.
    pub defines: Vec<(String, String)>,
    /// `-U` names, removed after the defines are installed.
    pub undefines: Vec<String>,
    /// `-imacros` files: scanned for definitions only.
    pub macro_files: Vec<PathBuf>,
    /// `-include` files: scanned as if included at the top of the main file.
    pub include_files: Vec<PathBuf>,
    pub max_include_depth: usize,
}

impl Default for ScannerInfo {
    fn default() -> Self {
        ScannerInfo {
            include_paths: Vec::new(),
            quote_include_paths: Vec::new(),
            defines: Vec::new(),
            undefines: Vec::new(),
            macro_files: Vec::new(),
            include_files: Vec::new(),
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
        }
    }
}

impl ScannerInfo {
    /// Add a `-D` style definition: `NAME` or `NAME=VALUE`.
    pub fn define(&mut self, spec: &str) {
        let (name, value) = split_define(spec);
        self.defines.push((name.to_owned(), value.to_owned()));
    }
}

/// Split `NAME=VALUE` into its parts; a bare `NAME` has value `1`.
pub fn split_define(spec: &str) -> (&str, &str) {
    match spec.split_once('=') {
        Some((name, value)) => (name.trim(), value),
        None => (spec.trim(), "1"),
    }
}

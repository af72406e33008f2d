//! Indexer configuration and command-line option parsing.

use std::path::PathBuf;

use cidx_parse::ParseMode;
use cidx_preprocess::ScannerInfo;

/// Index file used when `--db` is not given.
pub const DEFAULT_DB_PATH: &str = "cidx.pdom";

/// Errors kept per translation unit when `--error-limit` is not given.
pub const DEFAULT_DIAGNOSTIC_LIMIT: usize = 100;

/// Everything one indexing run needs.
#[derive(Clone, Debug)]
pub struct IndexerConfig {
    /// Where the index lives (`--db`).
    pub db_path: PathBuf,
    /// Include paths, definitions and forced includes shared by every unit.
    pub scanner: ScannerInfo,
    /// `Structural` skips function bodies; `--full` parses them, which also
    /// records the references inside them.
    pub mode: ParseMode,
    /// Parse translation units on a thread pool (`--no-parallel` disables).
    pub parallel: bool,
    /// Worker threads (`--jobs=N`); `None` lets the pool decide.
    pub jobs: Option<usize>,
    /// Errors kept per translation unit; 0 keeps all.
    pub diagnostic_limit: usize,
    /// Source files named on the command line.
    pub inputs: Vec<PathBuf>,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        IndexerConfig {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            scanner: ScannerInfo::default(),
            mode: ParseMode::Structural,
            parallel: true,
            jobs: None,
            diagnostic_limit: DEFAULT_DIAGNOSTIC_LIMIT,
            inputs: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("option `{0}` needs a value")]
    MissingValue(String),
    #[error("invalid value `{value}` for `{option}`")]
    InvalidValue { option: String, value: String },
    #[error("unknown option `{0}`")]
    UnknownOption(String),
}

/// Value of an option spelled `-Xvalue`, `-X value`, `--opt=value` or
/// `--opt value`. Advances `i` past a separate value.
fn take_value(
    args: &[String],
    i: &mut usize,
    option: &str,
    attached: &str,
) -> Result<String, ConfigError> {
    let attached = attached.strip_prefix('=').unwrap_or(attached);
    if !attached.is_empty() {
        return Ok(attached.to_owned());
    }
    *i += 1;
    args.get(*i)
        .cloned()
        .ok_or_else(|| ConfigError::MissingValue(option.to_owned()))
}

fn parse_count(option: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        option: option.to_owned(),
        value: value.to_owned(),
    })
}

impl IndexerConfig {
    /// Build a configuration from command-line arguments (without the
    /// program and subcommand names). Arguments not starting with `-` are
    /// input files.
    pub fn from_args(args: &[String]) -> Result<IndexerConfig, ConfigError> {
        let mut config = IndexerConfig::default();
        let mut i = 0;
        while i < args.len() {
            let arg = args[i].as_str();
            if let Some(rest) = arg.strip_prefix("-iquote") {
                let dir = take_value(args, &mut i, "-iquote", rest)?;
                config.scanner.quote_include_paths.push(PathBuf::from(dir));
            } else if let Some(rest) = arg.strip_prefix("-imacros") {
                let file = take_value(args, &mut i, "-imacros", rest)?;
                config.scanner.macro_files.push(PathBuf::from(file));
            } else if let Some(rest) = arg.strip_prefix("-include") {
                let file = take_value(args, &mut i, "-include", rest)?;
                config.scanner.include_files.push(PathBuf::from(file));
            } else if let Some(rest) = arg.strip_prefix("-I") {
                let dir = take_value(args, &mut i, "-I", rest)?;
                config.scanner.include_paths.push(PathBuf::from(dir));
            } else if let Some(rest) = arg.strip_prefix("-D") {
                let spec = take_value(args, &mut i, "-D", rest)?;
                config.scanner.define(&spec);
            } else if let Some(rest) = arg.strip_prefix("-U") {
                let name = take_value(args, &mut i, "-U", rest)?;
                config.scanner.undefines.push(name);
            } else if let Some(rest) = arg.strip_prefix("--db") {
                let path = take_value(args, &mut i, "--db", rest)?;
                config.db_path = PathBuf::from(path);
            } else if let Some(rest) = arg.strip_prefix("--jobs") {
                let value = take_value(args, &mut i, "--jobs", rest)?;
                let jobs = parse_count("--jobs", &value)?;
                if jobs == 0 {
                    return Err(ConfigError::InvalidValue {
                        option: "--jobs".to_owned(),
                        value,
                    });
                }
                config.jobs = Some(jobs);
            } else if let Some(rest) = arg.strip_prefix("--max-include-depth") {
                let value = take_value(args, &mut i, "--max-include-depth", rest)?;
                config.scanner.max_include_depth = parse_count("--max-include-depth", &value)?;
            } else if let Some(rest) = arg.strip_prefix("--error-limit") {
                let value = take_value(args, &mut i, "--error-limit", rest)?;
                config.diagnostic_limit = parse_count("--error-limit", &value)?;
            } else if arg == "--full" {
                config.mode = ParseMode::Complete;
            } else if arg == "--no-parallel" {
                config.parallel = false;
            } else if arg.starts_with('-') && arg != "-" {
                return Err(ConfigError::UnknownOption(arg.to_owned()));
            } else {
                config.inputs.push(PathBuf::from(arg));
            }
            i += 1;
        }
        Ok(config)
    }
}

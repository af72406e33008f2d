//! `cidx`: build and query a C/C++ symbol index.

use std::io::IsTerminal;
use std::process::ExitCode;

use cidx_diagnostic::emitter::TerminalEmitter;
use cidx_index::{init_tracing, IndexError, Indexer, IndexerConfig, Role};

fn print_usage() {
    eprintln!("cidx: C/C++ symbol index");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  cidx index [options] <file>...   Index translation units");
    eprintln!("  cidx find [--db=<path>] <name>   Show symbols and where they are declared");
    eprintln!("  cidx refs [--db=<path>] <name>   Show references to symbols");
    eprintln!("  cidx members [--db=<path>] <class>");
    eprintln!("  cidx files [--db=<path>]         List indexed files");
    eprintln!("  cidx remove [--db=<path>] <file>...");
    eprintln!("  cidx dump [--db=<path>]          Print the whole index");
    eprintln!();
    eprintln!("Names: `Point`, `geo::Point` (qualified), `Po*` (prefix).");
    eprintln!();
    eprintln!("Index options:");
    eprintln!("  -I <dir>, -iquote <dir>        Include search paths");
    eprintln!("  -D <name>[=<value>], -U <name> Define or undefine a macro");
    eprintln!("  -imacros <file>, -include <file>");
    eprintln!("  --db=<path>                    Index file (default: cidx.pdom)");
    eprintln!("  --full                         Parse function bodies too");
    eprintln!("  --no-parallel, --jobs=<n>      Parallelism");
    eprintln!("  --max-include-depth=<n>, --error-limit=<n>");
    eprintln!();
    eprintln!("Logging: CIDX_LOG=<filter> (or RUST_LOG), CIDX_LOG_TREE=1 for a span tree.");
}

fn main() -> ExitCode {
    init_tracing();
    let args: Vec<String> = std::env::args().collect();
    let Some(command) = args.get(1) else {
        print_usage();
        return ExitCode::FAILURE;
    };
    let config = match IndexerConfig::from_args(&args[2..]) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };
    let result = match command.as_str() {
        "index" => run_index(config),
        "find" => run_find(config, false),
        "refs" => run_find(config, true),
        "members" => run_members(config),
        "files" => run_files(config),
        "remove" => run_remove(config),
        "dump" => run_dump(config),
        "help" | "--help" | "-h" => {
            print_usage();
            return ExitCode::SUCCESS;
        }
        other => {
            eprintln!("error: unknown command `{other}`");
            print_usage();
            return ExitCode::FAILURE;
        }
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_index(config: IndexerConfig) -> Result<ExitCode, IndexError> {
    if config.inputs.is_empty() {
        eprintln!("error: no input files");
        return Ok(ExitCode::FAILURE);
    }
    let inputs = config.inputs.clone();
    let indexer = Indexer::open(config)?;
    let summary = indexer.index(&inputs)?;

    let mut emitter = TerminalEmitter::new(std::io::stderr(), std::io::stderr().is_terminal());
    for unit in &summary.units {
        if let Err(err) = emitter.emit_all(&unit.problems, &unit.sources) {
            tracing::warn!(%err, "cannot write problems");
        }
        if unit.suppressed > 0 {
            eprintln!(
                "{}: {} more errors not shown",
                unit.path.display(),
                unit.suppressed
            );
        }
    }
    for path in &summary.unreadable {
        eprintln!("error: cannot read {}", path.display());
    }
    let totals = summary.totals();
    println!(
        "indexed {} units: {} files written, {} unchanged, {} new bindings, {} names, {} problems",
        summary.units.len(),
        totals.files_written,
        totals.files_skipped,
        totals.bindings_created,
        totals.names_written,
        summary.problem_count()
    );
    Ok(if summary.unreadable.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_find(config: IndexerConfig, references_only: bool) -> Result<ExitCode, IndexError> {
    let patterns = config.inputs.clone();
    let indexer = Indexer::open(config)?;
    let mut any = false;
    for pattern in &patterns {
        for symbol in indexer.find(&pattern.to_string_lossy())? {
            any = true;
            match &symbol.ty {
                Some(ty) => println!("{} {}: {ty}", symbol.kind, symbol.qualified_name),
                None => println!("{} {}", symbol.kind, symbol.qualified_name),
            }
            for location in indexer.locations(&symbol)? {
                let is_reference = matches!(location.role, Role::Reference | Role::ImplicitCall);
                if is_reference == references_only {
                    println!("  {} {location}", location.role.as_str());
                }
            }
        }
    }
    if !any {
        eprintln!("no matching symbols");
    }
    Ok(ExitCode::SUCCESS)
}

fn run_members(config: IndexerConfig) -> Result<ExitCode, IndexError> {
    let patterns = config.inputs.clone();
    let indexer = Indexer::open(config)?;
    for pattern in &patterns {
        for class in indexer.find(&pattern.to_string_lossy())? {
            if !class.kind.is_class() {
                continue;
            }
            println!("{} {}", class.kind, class.qualified_name);
            for base in indexer.bases(&class)? {
                let virt = if base.is_virtual { " virtual" } else { "" };
                println!("  base{virt} {:?} {}", base.access, base.name);
            }
            for member in indexer.members(&class)? {
                match &member.ty {
                    Some(ty) => println!("  {} {}: {ty}", member.kind, member.name),
                    None => println!("  {} {}", member.kind, member.name),
                }
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn run_files(config: IndexerConfig) -> Result<ExitCode, IndexError> {
    let indexer = Indexer::open(config)?;
    for file in indexer.pdom().files()? {
        println!("{:?} {}", file.state, file.path);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_remove(config: IndexerConfig) -> Result<ExitCode, IndexError> {
    let paths = config.inputs.clone();
    let indexer = Indexer::open(config)?;
    let mut code = ExitCode::SUCCESS;
    for path in &paths {
        match indexer.remove(path)? {
            Some(deleted) => println!("removed {} ({deleted} bindings)", path.display()),
            None => {
                eprintln!("error: {} is not indexed", path.display());
                code = ExitCode::FAILURE;
            }
        }
    }
    Ok(code)
}

fn run_dump(config: IndexerConfig) -> Result<ExitCode, IndexError> {
    let indexer = Indexer::open(config)?;
    print!("{}", indexer.pdom().dump()?);
    Ok(ExitCode::SUCCESS)
}

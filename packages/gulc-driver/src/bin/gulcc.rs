//! gulcc - the Language's semantic-front-end driver CLI.
//!
//! A thin argument-parsing shell around a library entry point
//! (`gulc_driver::compile`), printing diagnostics and exiting non-zero on
//! failure.
//!
//! No parser collaborator is wired in here, so each positional source file
//! becomes an empty `AstFile` rather than a real parsed tree - enough to
//! exercise the pipeline and the CLI surface end to end, but not to compile
//! real source text. A real deployment swaps in a parser ahead of
//! `gulc_driver::compile`.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use gulc_ast::{Ast, AstFile};
use gulc_driver::{CompileReport, LinkerCollaborator, NullLinker, ParsedProgram};

/// Semantic front-end driver for the Language compiler.
#[derive(Parser)]
#[command(name = "gulcc", version, about)]
struct Cli {
    /// Source files to compile.
    #[arg(required = true)]
    sources: Vec<PathBuf>,

    /// Output object file path.
    #[arg(short = 'o', value_name = "OBJFILE")]
    output: Option<PathBuf>,

    /// Target triple passed through to the linker collaborator unchanged.
    #[arg(long, value_name = "TRIPLE", default_value = "x86_64-unknown-linux-gnu")]
    target: String,

    /// Increase logging verbosity; repeatable (-v, -vv).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        _ => log::LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();

    let mut ast = Ast::new();
    let mut file_paths = Vec::new();
    for (i, path) in cli.sources.iter().enumerate() {
        if let Err(e) = std::fs::metadata(path) {
            eprintln!("error: cannot read `{}`: {e}", path.display());
            process::exit(1);
        }
        ast.files.push(AstFile::new(i as u32, path.display().to_string()));
        file_paths.push(path.display().to_string());
    }

    log::debug!("running pipeline over {} file(s)", file_paths.len());

    let outcome = match gulc_driver::compile(ParsedProgram::new(ast, file_paths)) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("{}", err.diagnostic());
            process::exit(1);
        }
    };

    for warning in &outcome.warnings {
        eprintln!("{warning}");
    }

    let report = CompileReport::from_outcome(&outcome);
    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => log::error!("failed to serialize compile report: {e}"),
    }

    if let Some(output) = cli.output {
        let linker = NullLinker;
        if let Err(e) = linker.link(&[], &output.display().to_string(), &cli.target) {
            eprintln!("warning: {e}");
        }
    }
}

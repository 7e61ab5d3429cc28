//! gatesim — a command-line driver for the gatesim evaluator.
//!
//! Provides `gatesim test` for running a JSON test-case file against a
//! module, `gatesim cost` for printing a module's NAND-equivalent gate
//! count, and `gatesim truth-table` for exhaustively enumerating a small
//! combinational module.

#![warn(missing_docs)]

mod cost;
mod test;
mod truth_table;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

/// gatesim — a cycle-based simulator for a bounded SystemVerilog subset.
#[derive(Parser, Debug)]
#[command(name = "gatesim", version, about = "gatesim SystemVerilog evaluator")]
pub struct Cli {
    /// Suppress all output except errors and the final pass/fail summary.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a JSON test-case file against a module.
    Test(TestArgs),
    /// Print a module's NAND-equivalent gate count.
    Cost(ModuleArgs),
    /// Exhaustively enumerate a combinational module's truth table.
    TruthTable(TruthTableArgs),
}

/// Arguments shared by every subcommand that resolves a single module.
#[derive(Parser, Debug)]
pub struct ModuleArgs {
    /// Name of the module to resolve (without the `.sv` extension).
    pub module: String,

    /// Directories to search for `{module}.sv` and ROM data files, beyond
    /// the module's own referrer directory. May be given more than once.
    #[arg(long = "search-dir", value_name = "DIR")]
    pub search_dirs: Vec<PathBuf>,
}

/// Arguments for the `gatesim test` subcommand.
#[derive(Parser, Debug)]
pub struct TestArgs {
    #[command(flatten)]
    pub module_args: ModuleArgs,

    /// Path to the JSON test-case file (combinational array or sequential
    /// object, per gatesim's test-case schema).
    pub case_file: PathBuf,
}

/// Arguments for the `gatesim truth-table` subcommand.
#[derive(Parser, Debug)]
pub struct TruthTableArgs {
    #[command(flatten)]
    pub module_args: ModuleArgs,

    /// Maximum total input-port width gatesim will exhaustively enumerate.
    #[arg(long, default_value_t = gatesim_eval::DEFAULT_MAX_INPUT_BITS)]
    pub max_bits: u32,
}

fn main() {
    let cli = Cli::parse();
    let result = match &cli.command {
        Command::Test(args) => test::run(args, &cli),
        Command::Cost(args) => cost::run(args, &cli),
        Command::TruthTable(args) => truth_table::run(args, &cli),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            process::exit(2);
        }
    }
}

/// Builds a [`gatesim_eval::ModuleCache`] rooted at the current directory
/// plus any extra search directories the user passed with `--search-dir`.
pub(crate) fn build_cache(extra_dirs: &[PathBuf]) -> gatesim_eval::ModuleCache {
    let mut dirs = vec![PathBuf::from(".")];
    dirs.extend(extra_dirs.iter().cloned());
    gatesim_eval::ModuleCache::new(dirs)
}

/// Renders every diagnostic in `sink` to stderr using the source text
/// recorded in the cache's module lookups.
pub(crate) fn report_diagnostics(
    sink: &gatesim_diagnostics::DiagnosticSink,
    cache: &gatesim_eval::ModuleCache,
) {
    use gatesim_diagnostics::DiagnosticRenderer;
    let renderer = gatesim_diagnostics::TerminalRenderer::new(false, 100);
    for diag in sink.diagnostics() {
        eprint!("{}", renderer.render(&diag, cache.source_db()));
    }
}

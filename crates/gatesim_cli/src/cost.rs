//! `gatesim cost` — print a module's NAND-equivalent gate count.

use gatesim_diagnostics::DiagnosticSink;

use crate::{build_cache, report_diagnostics, Cli, ModuleArgs};

/// Runs the `gatesim cost` command. Exits 0 and prints the cost, or exits
/// 1 and prints diagnostics if the module couldn't be resolved.
pub fn run(args: &ModuleArgs, cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let mut cache = build_cache(&args.search_dirs);
    let sink = DiagnosticSink::new();

    match gatesim_eval::nand_cost(&args.module, &mut cache, &sink) {
        Ok(cost) => {
            if !cli.quiet {
                println!("{}: {cost}", args.module);
            }
            report_diagnostics(&sink, &cache);
            Ok(0)
        }
        Err(err) => {
            eprintln!("error: {err}");
            report_diagnostics(&sink, &cache);
            Ok(1)
        }
    }
}

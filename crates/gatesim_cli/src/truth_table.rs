//! `gatesim truth-table` — exhaustively enumerate a combinational module.

use gatesim_diagnostics::DiagnosticSink;

use crate::{build_cache, report_diagnostics, Cli, TruthTableArgs};

/// Runs the `gatesim truth-table` command. Prints one line per row, in
/// enumeration order, followed by the module's gate cost.
pub fn run(args: &TruthTableArgs, cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let mut cache = build_cache(&args.module_args.search_dirs);
    let sink = DiagnosticSink::new();

    let table = match gatesim_eval::enumerate(
        &args.module_args.module,
        &mut cache,
        args.max_bits,
        &sink,
    ) {
        Ok(table) => table,
        Err(err) => {
            eprintln!("error: {err}");
            report_diagnostics(&sink, &cache);
            return Ok(1);
        }
    };

    if !cli.quiet {
        for row in &table.rows {
            let inputs = format_row(&row.inputs);
            let outputs = format_row(&row.outputs);
            println!("{inputs} -> {outputs}");
        }
        println!("gate cost: {}", table.gate_cost);
    }
    report_diagnostics(&sink, &cache);
    Ok(0)
}

fn format_row(values: &std::collections::HashMap<String, gatesim_common::value::Value>) -> String {
    let mut names: Vec<&String> = values.keys().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| format!("{name}={}", values[name].bits()))
        .collect::<Vec<_>>()
        .join(" ")
}

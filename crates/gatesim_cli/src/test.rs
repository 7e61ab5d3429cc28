//! `gatesim test` — run a JSON test-case file against a module.
//!
//! Loads the file, sniffs its shape (a bare array is a combinational
//! test-case list; an object with `"sequential": true` is a sequential
//! test-case suite), runs it through `gatesim_eval`, and prints a
//! pass/fail line per case. Exits 0 only if every case passed.

use std::fs;

use gatesim_diagnostics::DiagnosticSink;

use crate::{build_cache, report_diagnostics, Cli, TestArgs};

/// Runs the `gatesim test` command.
pub fn run(args: &TestArgs, cli: &Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let module = &args.module_args.module;
    let mut cache = build_cache(&args.module_args.search_dirs);
    let sink = DiagnosticSink::new();

    let contents = fs::read_to_string(&args.case_file)?;
    let cases: serde_json::Value = serde_json::from_str(&contents)?;

    let is_sequential = cases
        .get("sequential")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);

    let all_passed = if is_sequential {
        run_sequential(module, &mut cache, &cases, &sink, cli.quiet)?
    } else {
        run_combinational(module, &mut cache, &cases, &sink, cli.quiet)?
    };

    report_diagnostics(&sink, &cache);
    Ok(if all_passed { 0 } else { 1 })
}

fn run_combinational(
    module: &str,
    cache: &mut gatesim_eval::ModuleCache,
    cases: &serde_json::Value,
    sink: &DiagnosticSink,
    quiet: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let outcomes = gatesim_eval::run_combinational_cases(module, cache, cases, sink)?;
    let mut all_passed = true;
    for outcome in &outcomes {
        all_passed &= outcome.passed();
        if quiet {
            continue;
        }
        if outcome.passed() {
            println!("{module}[{}]: pass", outcome.index);
        } else {
            println!("{module}[{}]: FAIL", outcome.index);
            for mismatch in &outcome.mismatches {
                println!(
                    "  {}: expected {}, got {}",
                    mismatch.signal, mismatch.expected, mismatch.actual
                );
            }
        }
    }
    Ok(all_passed)
}

fn run_sequential(
    module: &str,
    cache: &mut gatesim_eval::ModuleCache,
    spec: &serde_json::Value,
    sink: &DiagnosticSink,
    quiet: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let outcomes = gatesim_eval::run_sequential_cases(module, cache, spec, sink)?;
    let mut all_passed = true;
    for outcome in &outcomes {
        all_passed &= outcome.passed();
        if quiet {
            continue;
        }
        if outcome.passed() {
            println!("{}: pass", outcome.name);
        } else {
            println!("{}: FAIL", outcome.name);
            for step in &outcome.steps {
                if step.passed() {
                    continue;
                }
                println!("  step {}:", step.step_index);
                for mismatch in &step.mismatches {
                    println!(
                        "    {}: expected {}, got {}",
                        mismatch.signal, mismatch.expected, mismatch.actual
                    );
                }
            }
        }
    }
    Ok(all_passed)
}

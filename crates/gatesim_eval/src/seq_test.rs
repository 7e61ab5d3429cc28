//! JSON-driven test stepping for combinational and sequential modules.
//!
//! This module owns the two test-case shapes a gatesim test file can take:
//! a bare array of input/expect maps for a combinational module, or an
//! object with `"sequential": true` describing a sequence of clocked
//! steps per test case. Outcomes are returned as data (mismatches, not
//! errors) so a caller can report every case's result rather than
//! aborting at the first failure.

use std::collections::HashMap;
use std::path::Path;

use gatesim_common::value::Value;
use gatesim_diagnostics::DiagnosticSink;
use gatesim_parser::ast::{Direction, ModuleDecl, NetKind};

use crate::comb::eval_combinational;
use crate::error::EvalError;
use crate::resolver::{ModuleCache, ResolvedModule};
use crate::seq::SequentialEvaluator;

/// A single input/output mismatch observed while checking a test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mismatch {
    /// The output port name that didn't match.
    pub signal: String,
    /// The value the design actually produced.
    pub actual: u64,
    /// The value the test case expected.
    pub expected: u64,
}

/// The outcome of one combinational test-case row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationalCaseOutcome {
    /// Index of this row within the test file's array.
    pub index: usize,
    /// Mismatches between actual and expected outputs; empty means the row
    /// passed.
    pub mismatches: Vec<Mismatch>,
}

impl CombinationalCaseOutcome {
    /// Whether every expected output matched.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// The outcome of one step within a sequential test case's sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialStepOutcome {
    /// Index of this step within the case's `sequence` array.
    pub step_index: usize,
    /// Mismatches between actual and expected outputs; empty means the
    /// step passed.
    pub mismatches: Vec<Mismatch>,
}

impl SequentialStepOutcome {
    /// Whether every expected output at this step matched.
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// The outcome of one named sequential test case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequentialCaseOutcome {
    /// The case's `"name"` field.
    pub name: String,
    /// Per-step outcomes, in sequence order.
    pub steps: Vec<SequentialStepOutcome>,
}

impl SequentialCaseOutcome {
    /// Whether every step in this case passed.
    pub fn passed(&self) -> bool {
        self.steps.iter().all(SequentialStepOutcome::passed)
    }
}

/// Runs every row of a combinational test-case array (the bare-array JSON
/// shape) against `module_name`, reporting mismatches per row.
///
/// Each row is a JSON object mapping input-port names to integers, plus an
/// `"expect"` key mapping output-port names to integers. Missing inputs
/// default to zero; outputs the row doesn't mention are not checked.
pub fn run_combinational_cases(
    module_name: &str,
    cache: &mut ModuleCache,
    cases: &serde_json::Value,
    sink: &DiagnosticSink,
) -> Result<Vec<CombinationalCaseOutcome>, EvalError> {
    let resolved = cache.resolve(module_name, sink)?;
    let module: std::sync::Arc<ModuleDecl> = match &*resolved {
        ResolvedModule::Source(m) => m.clone(),
        ResolvedModule::Rom(_) => {
            return Err(EvalError::UnsupportedConstruct(format!(
                "'{module_name}' is a ROM primitive, not a testable combinational module"
            )))
        }
    };

    let rows = cases.as_array().ok_or_else(|| {
        EvalError::UnsupportedConstruct("combinational test file must be a JSON array".to_string())
    })?;

    let mut outcomes = Vec::with_capacity(rows.len());
    let empty_regs = HashMap::new();
    for (index, row) in rows.iter().enumerate() {
        let inputs = port_values(&module, Direction::Input, row)?;
        let expect = row.get("expect").cloned().unwrap_or(serde_json::Value::Null);
        let outputs = eval_combinational(&module, cache, &inputs, &empty_regs, sink)?;
        let mismatches = compare(&outputs, &expect)?;
        outcomes.push(CombinationalCaseOutcome { index, mismatches });
    }
    Ok(outcomes)
}

/// Runs every case of a sequential test-file object (`"sequential": true`)
/// against `module_name`.
///
/// Each case gets a fresh [`SequentialEvaluator`] (registers and memories
/// reset to zero, then re-preloaded from `memory_files`), so earlier cases
/// never leak state into later ones. Every step drives the named clock
/// signal low, then high, so a genuine rising edge is always observed —
/// callers only ever specify the steady-state input values they'd see on
/// the clock's high phase.
pub fn run_sequential_cases(
    module_name: &str,
    cache: &mut ModuleCache,
    spec: &serde_json::Value,
    sink: &DiagnosticSink,
) -> Result<Vec<SequentialCaseOutcome>, EvalError> {
    let resolved = cache.resolve(module_name, sink)?;
    let module: std::sync::Arc<ModuleDecl> = match &*resolved {
        ResolvedModule::Source(m) => m.clone(),
        ResolvedModule::Rom(_) => {
            return Err(EvalError::UnsupportedConstruct(format!(
                "'{module_name}' is a ROM primitive, not a testable sequential module"
            )))
        }
    };

    let clock_name = clock_port(&module)?;

    let test_cases = spec
        .get("test_cases")
        .and_then(serde_json::Value::as_array)
        .ok_or_else(|| {
            EvalError::UnsupportedConstruct(
                "sequential test file is missing a 'test_cases' array".to_string(),
            )
        })?;

    let mut outcomes = Vec::with_capacity(test_cases.len());
    for case in test_cases {
        let name = case
            .get("name")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("")
            .to_string();
        let sequence = case
            .get("sequence")
            .and_then(serde_json::Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut evaluator = SequentialEvaluator::new(&module);
        if let Some(bindings) = spec.get("memory_files").and_then(serde_json::Value::as_array) {
            for binding in bindings {
                if binding.get("module").and_then(serde_json::Value::as_str) != Some(module_name) {
                    continue;
                }
                let memory = binding
                    .get("memory")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| {
                        EvalError::UnsupportedConstruct(
                            "memory_files binding is missing 'memory'".to_string(),
                        )
                    })?;
                let file = binding
                    .get("file")
                    .and_then(serde_json::Value::as_str)
                    .ok_or_else(|| {
                        EvalError::UnsupportedConstruct(
                            "memory_files binding is missing 'file'".to_string(),
                        )
                    })?;
                evaluator.preload_memory(memory, Path::new(file))?;
            }
        }

        let mut steps = Vec::with_capacity(sequence.len());
        for (step_index, step) in sequence.iter().enumerate() {
            let inputs = step
                .get("inputs")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            let mut input_values = port_values(&module, Direction::Input, &inputs)?;
            input_values.remove(&clock_name);

            let mut low = input_values.clone();
            low.insert(clock_name.clone(), Value::from_bool(false));
            evaluator.step(cache, &low, sink)?;

            let mut high = input_values;
            high.insert(clock_name.clone(), Value::from_bool(true));
            let outputs = evaluator.step(cache, &high, sink)?;

            let expected = step
                .get("expected")
                .cloned()
                .unwrap_or(serde_json::Value::Null);
            let mismatches = compare(&outputs, &expected)?;
            steps.push(SequentialStepOutcome {
                step_index,
                mismatches,
            });
        }

        outcomes.push(SequentialCaseOutcome { name, steps });
    }
    Ok(outcomes)
}

/// Finds the module's lone clock input: the signal named by every
/// `always_ff @(posedge ...)` block. gatesim's bounded subset requires all
/// blocks in one module to share a single clock, so the first one found
/// names it.
fn clock_port(module: &ModuleDecl) -> Result<String, EvalError> {
    use gatesim_parser::ast::{ModuleItem, ProcessKind};
    module
        .items
        .iter()
        .find_map(|item| match item {
            ModuleItem::Process(p) => match &p.kind {
                ProcessKind::AlwaysFf { clock } => Some(clock.clone()),
                ProcessKind::AlwaysComb => None,
            },
            _ => None,
        })
        .ok_or_else(|| {
            EvalError::UnsupportedConstruct(format!(
                "'{}' has no always_ff block to find a clock from",
                module.name
            ))
        })
}

/// Builds a `{port name -> Value}` map for every `direction` port of
/// `module`, reading each value out of a JSON object and defaulting to
/// zero for any port the object doesn't mention.
fn port_values(
    module: &ModuleDecl,
    direction: Direction,
    json: &serde_json::Value,
) -> Result<HashMap<String, Value>, EvalError> {
    let mut values = HashMap::new();
    for port in module.ports.iter().filter(|p| p.direction == direction) {
        let width = port.width.map_or(1, |w| w.width() as u32);
        let raw = json
            .get(&port.name)
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0);
        values.insert(port.name.clone(), Value::new(width, raw as u64));
    }
    let _ = NetKind::Reg;
    Ok(values)
}

/// Compares a module's settled outputs against an `{output name -> int}`
/// expectation map, returning one [`Mismatch`] per output the map actually
/// names and got wrong. Outputs the map is silent about are not checked.
fn compare(
    outputs: &HashMap<String, Value>,
    expect: &serde_json::Value,
) -> Result<Vec<Mismatch>, EvalError> {
    let mut mismatches = Vec::new();
    if let Some(obj) = expect.as_object() {
        for (name, expected_json) in obj {
            let Some(actual) = outputs.get(name) else {
                continue;
            };
            let expected = expected_json.as_i64().unwrap_or(0) as u64 & mask(actual.width());
            if actual.bits() != expected {
                mismatches.push(Mismatch {
                    signal: name.clone(),
                    actual: actual.bits(),
                    expected,
                });
            }
        }
    }
    Ok(mismatches)
}

fn mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_module(src: &str) -> ModuleDecl {
        let sink = DiagnosticSink::new();
        let file = gatesim_parser::parse_file(src, gatesim_source::FileId::from_raw(0), &sink);
        assert!(!sink.has_errors());
        file.modules.into_iter().next().unwrap()
    }

    fn write_module(dir: &std::path::Path, name: &str, contents: &str) {
        std::fs::write(dir.join(format!("{name}.sv")), contents).unwrap();
    }

    #[test]
    fn combinational_cases_report_row_mismatches() {
        let tmp = tempfile::tempdir().unwrap();
        write_module(
            tmp.path(),
            "nand_gate",
            "module nand_gate(input a, input b, output y);
               assign y = ~(a & b);
             endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let cases = serde_json::json!([
            { "a": 1, "b": 1, "expect": { "y": 0 } },
            { "a": 0, "b": 0, "expect": { "y": 1 } },
            { "a": 1, "b": 1, "expect": { "y": 1 } },
        ]);
        let outcomes =
            run_combinational_cases("nand_gate", &mut cache, &cases, &sink).unwrap();
        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].passed());
        assert!(outcomes[1].passed());
        assert!(!outcomes[2].passed());
        assert_eq!(
            outcomes[2].mismatches,
            vec![Mismatch {
                signal: "y".to_string(),
                actual: 0,
                expected: 1,
            }]
        );
    }

    #[test]
    fn sequential_cases_drive_real_clock_edges() {
        let tmp = tempfile::tempdir().unwrap();
        write_module(
            tmp.path(),
            "counter",
            "module counter(input clk, input rst, input en, output reg [3:0] count);
               always_ff @(posedge clk) begin
                 if (rst)
                   count <= 4'd0;
                 else if (en)
                   count <= count + 4'd1;
               end
             endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let spec = serde_json::json!({
            "sequential": true,
            "test_cases": [
                {
                    "name": "reset then count",
                    "sequence": [
                        { "inputs": { "clk": 1, "rst": 1, "en": 0 }, "expected": { "count": 0 } },
                        { "inputs": { "clk": 1, "rst": 0, "en": 1 }, "expected": { "count": 1 } },
                        { "inputs": { "clk": 1, "rst": 0, "en": 1 }, "expected": { "count": 2 } }
                    ]
                }
            ]
        });
        let outcomes = run_sequential_cases("counter", &mut cache, &spec, &sink).unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].passed(), "{:?}", outcomes[0]);
    }

    #[test]
    fn missing_expected_outputs_are_not_checked() {
        let module = parse_module(
            "module two_out(input a, output x, output y);
               assign x = a;
               assign y = ~a;
             endmodule",
        );
        let outputs = HashMap::from([
            ("x".to_string(), Value::from_bool(true)),
            ("y".to_string(), Value::from_bool(false)),
        ]);
        let expect = serde_json::json!({ "x": 1 });
        let mismatches = compare(&outputs, &expect).unwrap();
        assert!(mismatches.is_empty());
        let _ = module;
    }
}

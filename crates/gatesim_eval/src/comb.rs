//! Combinational evaluation: a dataflow fixpoint over continuous
//! assignments, `always_comb` blocks, and child instances, plus recursive
//! NAND-equivalent gate-cost counting.

use std::collections::HashMap;

use gatesim_common::value::Value;
use gatesim_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use gatesim_parser::ast::{
    CaseArm, Direction, Expr, ModuleDecl, ModuleItem, PortConnection, ProcessKind, Statement,
};

use crate::error::EvalError;
use crate::expr_eval::{assign_target, eval, Env};
use crate::resolver::{ModuleCache, ResolvedModule};

/// The most fixpoint passes `eval_combinational` will attempt before
/// concluding the design has a combinational cycle.
const MAX_ITERATIONS: usize = 64;

/// Evaluates `module` to a combinational fixpoint.
///
/// `inputs` supplies the values driving the module's own input ports.
/// `regs` supplies the *current* (pre-edge) value of every net declared
/// `reg` — from the sequential evaluator's point of view these behave as
/// additional read-only inputs during a single cycle's steady-state
/// evaluation. `always_ff` process bodies are not executed here; their
/// targets simply hold whatever `regs` provides.
pub fn eval_combinational(
    module: &ModuleDecl,
    cache: &mut ModuleCache,
    inputs: &HashMap<String, Value>,
    regs: &HashMap<String, Value>,
    sink: &DiagnosticSink,
) -> Result<HashMap<String, Value>, EvalError> {
    let mut env = initial_env(module);
    for (name, value) in inputs {
        if let Some(port) = module.ports.iter().find(|p| &p.name == name) {
            let expected = port.width.map_or(1, |w| w.width() as u32);
            check_port_width(&module.name, name, expected, value.width())?;
        }
        env.insert(name.clone(), *value);
    }
    for (name, value) in regs {
        env.insert(name.clone(), *value);
    }

    for _ in 0..MAX_ITERATIONS {
        let snapshot = env.clone();
        run_pass(module, cache, &mut env, sink)?;
        if env == snapshot {
            return Ok(env);
        }
    }
    Err(EvalError::CombinationalCycle(module.name.clone()))
}

/// Builds the zero-initialized signal map for every port and net the
/// module declares.
fn initial_env(module: &ModuleDecl) -> HashMap<String, Value> {
    let mut env = HashMap::new();
    for port in &module.ports {
        let width = port.width.map_or(1, |w| w.width() as u32);
        env.insert(port.name.clone(), Value::zero(width));
    }
    for item in &module.items {
        if let ModuleItem::Net(net) = item {
            if net.memory_dims.is_some() {
                continue;
            }
            let width = net.width.map_or(1, |w| w.width() as u32);
            env.entry(net.name.clone()).or_insert(Value::zero(width));
        }
    }
    env
}

fn run_pass(
    module: &ModuleDecl,
    cache: &mut ModuleCache,
    env: &mut HashMap<String, Value>,
    sink: &DiagnosticSink,
) -> Result<(), EvalError> {
    for item in &module.items {
        match item {
            ModuleItem::Net(_) | ModuleItem::Error(_) => {}
            ModuleItem::Assign(assign) => {
                let value = eval(&assign.rhs, &Env::new(env))?;
                assign_target(env, &assign.lhs, value)?;
            }
            ModuleItem::Process(process) => match &process.kind {
                ProcessKind::AlwaysComb => exec_statement(&process.body, env)?,
                ProcessKind::AlwaysFf { .. } => {}
            },
            ModuleItem::Instance(instance) => {
                run_instance(instance.module_name.as_str(), &instance.connections, cache, env, sink)?;
            }
        }
    }
    Ok(())
}

fn run_instance(
    module_name: &str,
    connections: &[PortConnection],
    cache: &mut ModuleCache,
    env: &mut HashMap<String, Value>,
    sink: &DiagnosticSink,
) -> Result<(), EvalError> {
    let resolved = cache.resolve(module_name, sink)?;
    match &*resolved {
        ResolvedModule::Rom(rom) => {
            let addr_expr = connection_expr(connections, &rom.addr_port, &rom.port_order)?;
            let addr = eval(addr_expr, &Env::new(env))?;
            check_port_width(&rom.name, &rom.addr_port, rom.addr_width, addr.width())?;
            let data = rom.data.get(&addr.bits()).copied().unwrap_or(0);
            let data_target = connection_expr(connections, &rom.data_port, &rom.port_order)?;
            assign_target(env, data_target, Value::new(rom.data_width, data))?;
            Ok(())
        }
        ResolvedModule::Source(child) => {
            let port_order: Vec<String> = child.ports.iter().map(|p| p.name.clone()).collect();
            let mut child_inputs = HashMap::new();
            for port in child.ports.iter().filter(|p| p.direction == Direction::Input) {
                let expr = connection_expr(connections, &port.name, &port_order)?;
                let width = port.width.map_or(1, |w| w.width() as u32);
                let value = eval(expr, &Env::new(env))?;
                check_port_width(&child.name, &port.name, width, value.width())?;
                child_inputs.insert(port.name.clone(), value);
            }
            let child_regs = HashMap::new();
            let child_env = eval_combinational(child, cache, &child_inputs, &child_regs, sink)?;
            for port in child.ports.iter().filter(|p| p.direction == Direction::Output) {
                let expr = connection_expr(connections, &port.name, &port_order)?;
                assign_target(env, expr, child_env[&port.name])?;
            }
            Ok(())
        }
    }
}

/// Returns an error if `actual` does not match `expected`, the width
/// declared for `port` on `module`.
fn check_port_width(
    module: &str,
    port: &str,
    expected: u32,
    actual: u32,
) -> Result<(), EvalError> {
    if expected != actual {
        return Err(EvalError::PortWidthMismatch {
            module: module.to_string(),
            port: port.to_string(),
            expected,
            actual,
        });
    }
    Ok(())
}

/// Finds the expression connected to `port_name`. Named (`.port(expr)`)
/// connections are matched by name; an all-positional connection list
/// (`Type label(e1, e2, …);`) is matched by `port_name`'s index within
/// `port_order`, the target module's ports in declaration order.
fn connection_expr<'a>(
    connections: &'a [PortConnection],
    port_name: &str,
    port_order: &[String],
) -> Result<&'a Expr, EvalError> {
    if let Some(c) = connections
        .iter()
        .find(|c| c.port_name.as_deref() == Some(port_name))
    {
        return Ok(&c.expr);
    }
    if let Some(index) = port_order.iter().position(|p| p == port_name) {
        if let Some(c) = connections.get(index).filter(|c| c.port_name.is_none()) {
            return Ok(&c.expr);
        }
    }
    Err(EvalError::PortMismatch {
        module: port_name.to_string(),
        reason: format!("no connection named '{port_name}'"),
    })
}

fn exec_statement(stmt: &Statement, env: &mut HashMap<String, Value>) -> Result<(), EvalError> {
    match stmt {
        Statement::Block(stmts, _) => {
            for s in stmts {
                exec_statement(s, env)?;
            }
            Ok(())
        }
        Statement::BlockingAssign { lhs, rhs, .. } => {
            let value = eval(rhs, &Env::new(env))?;
            assign_target(env, lhs, value)
        }
        Statement::NonBlockingAssign { lhs, rhs, .. } => {
            // Outside always_ff, treat like blocking assignment: combinational
            // code has no notion of deferred update.
            let value = eval(rhs, &Env::new(env))?;
            assign_target(env, lhs, value)
        }
        Statement::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            if eval(cond, &Env::new(env))?.is_truthy() {
                exec_statement(then_branch, env)
            } else if let Some(else_branch) = else_branch {
                exec_statement(else_branch, env)
            } else {
                Ok(())
            }
        }
        Statement::Case {
            selector,
            arms,
            default,
            ..
        } => exec_case(selector, arms, default, env),
        Statement::Error(_) => Ok(()),
    }
}

fn exec_case(
    selector: &Expr,
    arms: &[CaseArm],
    default: &Option<Box<Statement>>,
    env: &mut HashMap<String, Value>,
) -> Result<(), EvalError> {
    let selector_val = eval(selector, &Env::new(env))?;
    for arm in arms {
        for m in &arm.matches {
            let match_val = eval(m, &Env::new(env))?;
            if match_val.bits() == selector_val.resize(match_val.width()).bits() {
                return exec_statement(&arm.body, env);
            }
        }
    }
    if let Some(default) = default {
        exec_statement(default, env)
    } else {
        Ok(())
    }
}

/// Recursively counts the NAND-equivalent gate cost of `module_name`.
///
/// A module literally named `nand_gate` contributes exactly 1, regardless
/// of its body — it is the one primitive the metric counts. Every other
/// module contributes the sum of its child instances' costs; a leaf module
/// (no child instances) that isn't `nand_gate` contributes 0, since its
/// behavior was described directly rather than built from gate instances.
/// ROM primitives contribute 0: they model a memory resource, not
/// synthesized combinational logic.
///
/// A module that instantiates itself, directly or transitively, would
/// otherwise recurse forever; the cycle is reported to `sink` and counted
/// as 0 instead of aborting the whole computation.
pub fn nand_cost(
    module_name: &str,
    cache: &mut ModuleCache,
    sink: &DiagnosticSink,
) -> Result<u64, EvalError> {
    let mut path = std::collections::HashSet::new();
    nand_cost_inner(module_name, cache, sink, &mut path)
}

fn nand_cost_inner(
    module_name: &str,
    cache: &mut ModuleCache,
    sink: &DiagnosticSink,
    path: &mut std::collections::HashSet<String>,
) -> Result<u64, EvalError> {
    if module_name == "nand_gate" {
        // Still resolve it, so a missing/malformed nand_gate.sv is reported
        // rather than silently trusted by name alone.
        cache.resolve(module_name, sink)?;
        return Ok(1);
    }

    if !path.insert(module_name.to_string()) {
        sink.emit(Diagnostic::warning(
            DiagnosticCode::new(Category::Warning, 302),
            format!("instance cycle through '{module_name}' costed as 0"),
            gatesim_source::Span::DUMMY,
        ));
        return Ok(0);
    }

    let resolved = cache.resolve(module_name, sink)?;
    let result = match &*resolved {
        ResolvedModule::Rom(_) => Ok(0),
        ResolvedModule::Source(module) => {
            let instances: Vec<String> = module
                .items
                .iter()
                .filter_map(|item| match item {
                    ModuleItem::Instance(inst) => Some(inst.module_name.clone()),
                    _ => None,
                })
                .collect();
            let mut total = 0u64;
            for child in instances {
                total += nand_cost_inner(&child, cache, sink, path)?;
            }
            Ok(total)
        }
    };
    path.remove(module_name);
    result
}

/// Total width, in bits, of every `input` port on `module`.
pub fn total_input_width(module: &ModuleDecl) -> u32 {
    module
        .ports
        .iter()
        .filter(|p| p.direction == Direction::Input)
        .map(|p| p.width.map_or(1, |w| w.width() as u32))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatesim_diagnostics::DiagnosticSink;
    use std::fs;
    use std::io::Write;

    fn write_file(dir: &std::path::Path, name: &str, contents: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
    }

    fn parse_module(src: &str) -> ModuleDecl {
        let sink = DiagnosticSink::new();
        let file = gatesim_parser::parse_file(src, gatesim_source::FileId::from_raw(0), &sink);
        assert!(!sink.has_errors());
        file.modules.into_iter().next().unwrap()
    }

    #[test]
    fn evaluates_nand_gate_truth_table_row() {
        let module = parse_module(
            "module nand_gate(input a, input b, output y);
               assign y = ~(a & b);
             endmodule",
        );
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let inputs = HashMap::from([
            ("a".to_string(), Value::from_bool(true)),
            ("b".to_string(), Value::from_bool(true)),
        ]);
        let env = eval_combinational(&module, &mut cache, &inputs, &HashMap::new(), &sink).unwrap();
        assert_eq!(env["y"].bits(), 0);
    }

    #[test]
    fn nand_gate_cost_is_one() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "nand_gate.sv",
            "module nand_gate(input a, input b, output y);
               assign y = ~(a & b);
             endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        assert_eq!(nand_cost("nand_gate", &mut cache, &sink).unwrap(), 1);
    }

    #[test]
    fn hierarchical_cost_sums_nand_gate_leaves() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "nand_gate.sv",
            "module nand_gate(input a, input b, output y); assign y = ~(a & b); endmodule",
        );
        write_file(
            tmp.path(),
            "not_gate.sv",
            "module not_gate(input a, output y);
               nand_gate n0(.a(a), .b(a), .y(y));
             endmodule",
        );
        write_file(
            tmp.path(),
            "and_gate.sv",
            "module and_gate(input a, input b, output y);
               wire nand_out;
               nand_gate n0(.a(a), .b(b), .y(nand_out));
               not_gate n1(.a(nand_out), .y(y));
             endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        // and_gate = 1 nand_gate + 1 not_gate (itself 1 nand_gate) = 2.
        assert_eq!(nand_cost("and_gate", &mut cache, &sink).unwrap(), 2);
    }

    #[test]
    fn behavioral_leaf_module_costs_zero() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "xor_gate.sv",
            "module xor_gate(input a, input b, output y); assign y = a ^ b; endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        // xor_gate has no child instances and is not nand_gate itself, so
        // it doesn't count as a synthesized gate.
        assert_eq!(nand_cost("xor_gate", &mut cache, &sink).unwrap(), 0);
    }

    #[test]
    fn instance_cycle_costs_zero_and_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "ping.sv",
            "module ping(input a, output y);
               pong p0(.a(a), .y(y));
             endmodule",
        );
        write_file(
            tmp.path(),
            "pong.sv",
            "module pong(input a, output y);
               ping p0(.a(a), .y(y));
             endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        assert_eq!(nand_cost("ping", &mut cache, &sink).unwrap(), 0);
        assert!(!sink.diagnostics().is_empty());
    }

    #[test]
    fn rom_lookup_drives_output() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "rom_deadbeef.sv",
            "module rom_deadbeef(input [1:0] addr, output [7:0] data);
             endmodule",
        );
        write_file(
            tmp.path(),
            "deadbeef.txt",
            "11011110\n10101101\n10111110\n11101111\n",
        );
        write_file(
            tmp.path(),
            "lookup.sv",
            "module lookup(input [1:0] a, output [7:0] y);
               rom_deadbeef r0(.addr(a), .data(y));
             endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let module = parse_module(
            "module lookup(input [1:0] a, output [7:0] y);
               rom_deadbeef r0(.addr(a), .data(y));
             endmodule",
        );
        let inputs = HashMap::from([("a".to_string(), Value::new(2, 2))]);
        let env = eval_combinational(&module, &mut cache, &inputs, &HashMap::new(), &sink).unwrap();
        assert_eq!(env["y"].bits(), 0xBE);
    }

    #[test]
    fn positional_instance_connections_are_resolved_by_declaration_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "nand_gate.sv",
            "module nand_gate(input a, input b, output y); assign y = ~(a & b); endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let module = parse_module(
            "module wrap(input a, input b, output y);
               nand_gate n0(a, b, y);
             endmodule",
        );
        let inputs = HashMap::from([
            ("a".to_string(), Value::from_bool(true)),
            ("b".to_string(), Value::from_bool(false)),
        ]);
        let env = eval_combinational(&module, &mut cache, &inputs, &HashMap::new(), &sink).unwrap();
        assert_eq!(env["y"].bits(), 1);
    }

    #[test]
    fn top_level_input_width_mismatch_is_rejected() {
        let module = parse_module("module buf1(input [3:0] a, output [3:0] y); assign y = a; endmodule");
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let inputs = HashMap::from([("a".to_string(), Value::new(8, 0xFF))]);
        let result = eval_combinational(&module, &mut cache, &inputs, &HashMap::new(), &sink);
        assert!(matches!(result, Err(EvalError::PortWidthMismatch { .. })));
    }

    #[test]
    fn child_instance_input_width_mismatch_is_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write_file(
            tmp.path(),
            "buf4.sv",
            "module buf4(input [3:0] a, output [3:0] y); assign y = a; endmodule",
        );
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let module = parse_module(
            "module wrap(input [7:0] a, output [3:0] y);
               buf4 b0(.a(a), .y(y));
             endmodule",
        );
        let inputs = HashMap::from([("a".to_string(), Value::new(8, 0xFF))]);
        let result = eval_combinational(&module, &mut cache, &inputs, &HashMap::new(), &sink);
        assert!(matches!(result, Err(EvalError::PortWidthMismatch { .. })));
    }

    #[test]
    fn detects_combinational_cycle() {
        let module = parse_module(
            "module bad(input x, output y);
               assign y = ~y;
             endmodule",
        );
        let tmp = tempfile::tempdir().unwrap();
        let mut cache = ModuleCache::new(vec![tmp.path().to_path_buf()]);
        let sink = DiagnosticSink::new();
        let inputs = HashMap::from([("x".to_string(), Value::from_bool(true))]);
        let result = eval_combinational(&module, &mut cache, &inputs, &HashMap::new(), &sink);
        assert!(matches!(result, Err(EvalError::CombinationalCycle(_))));
    }
}

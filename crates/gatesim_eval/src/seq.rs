//! Cycle-based sequential evaluation: registers live only in the module
//! passed to [`SequentialEvaluator::new`] (child instances are always
//! evaluated combinationally, recursively, by [`crate::comb`]); a module
//! whose own children need independent clocked state is outside gatesim's
//! bounded subset.
//!
//! Each call to [`SequentialEvaluator::step`] runs a fixed four-step
//! algorithm:
//!
//! 1. **Sample** — the caller's `inputs` plus the registers' pre-edge
//!    values become this cycle's read-only state.
//! 2. **Steady-state evaluation** — [`crate::comb::eval_combinational`]
//!    runs to a fixpoint over the continuous assigns, `always_comb`
//!    blocks, and child instances, with the registers held constant.
//! 3. **Edge detection** — for each `always_ff @(posedge clk)` block, the
//!    named clock's value this cycle is compared against its value last
//!    cycle; the block executes only on a 0-to-1 transition. Blocking
//!    assignments inside a triggered block mutate a local shadow copy of
//!    the environment so later statements in the same block see them
//!    immediately; non-blocking assignments are recorded as pending
//!    writes without being applied yet.
//! 4. **Two-phase commit** — once every triggered block has finished, all
//!    pending non-blocking writes are applied to the registers
//!    simultaneously.

use std::collections::HashMap;

use gatesim_common::value::Value;
use gatesim_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use gatesim_parser::ast::{
    CaseArm, Direction, Expr, ModuleDecl, ModuleItem, NetKind, ProcessKind, Statement,
};

use crate::comb::eval_combinational;
use crate::error::EvalError;
use crate::expr_eval::{eval, Env};
use crate::resolver::ModuleCache;

/// A scalar register, keyed by net name.
type RegMap = HashMap<String, Value>;
/// A memory array, keyed by net name, indexed by address.
type MemMap = HashMap<String, Vec<Value>>;

/// Owns the persistent register and memory state of one module instance
/// across repeated clock cycles.
pub struct SequentialEvaluator<'m> {
    module: &'m ModuleDecl,
    regs: RegMap,
    mem: MemMap,
    mem_depths: HashMap<String, u32>,
    /// The sampled value of each named clock signal as of the end of the
    /// last cycle, used to detect a 0-to-1 transition. Absent until a
    /// clock has been sampled at least once, which is implicitly `0`.
    prev_clocks: HashMap<String, bool>,
}

impl<'m> SequentialEvaluator<'m> {
    /// Builds a new evaluator for `module`, with every register and memory
    /// cell initialized to zero.
    pub fn new(module: &'m ModuleDecl) -> Self {
        let mut regs = HashMap::new();
        let mut mem = HashMap::new();
        let mut mem_depths = HashMap::new();

        for port in &module.ports {
            if port.net_kind == Some(NetKind::Reg) {
                let width = port.width.map_or(1, |w| w.width() as u32);
                regs.insert(port.name.clone(), Value::zero(width));
            }
        }
        for item in &module.items {
            if let ModuleItem::Net(net) = item {
                let width = net.width.map_or(1, |w| w.width() as u32);
                if let Some(dims) = net.memory_dims {
                    // Memory dims are conventionally written ascending
                    // (`[0:255]`), unlike a descending bit-range width, so
                    // the depth is the absolute span plus one either way.
                    let depth = (dims.msb - dims.lsb).unsigned_abs() as u32 + 1;
                    mem.insert(net.name.clone(), vec![Value::zero(width); depth as usize]);
                    mem_depths.insert(net.name.clone(), depth);
                } else if net.net_kind == NetKind::Reg {
                    regs.insert(net.name.clone(), Value::zero(width));
                }
            }
        }

        Self {
            module,
            regs,
            mem,
            mem_depths,
            prev_clocks: HashMap::new(),
        }
    }

    /// The current value of register `name`, if it exists.
    pub fn reg(&self, name: &str) -> Option<Value> {
        self.regs.get(name).copied()
    }

    /// The current contents of memory array `name`, if it exists.
    pub fn memory(&self, name: &str) -> Option<&[Value]> {
        self.mem.get(name).map(Vec::as_slice)
    }

    /// Preloads memory array `name` from a data file in the same
    /// binary-literal-per-line format used for ROM primitives, overwriting
    /// whatever it was previously initialized to. Addresses the file
    /// doesn't mention keep their existing (zero) value.
    pub fn preload_memory(&mut self, name: &str, file: &std::path::Path) -> Result<(), EvalError> {
        let width = self
            .mem
            .get(name)
            .and_then(|cells| cells.first())
            .map(Value::width)
            .ok_or_else(|| EvalError::UndefinedIdentifier(name.to_string()))?;
        let contents = std::fs::read_to_string(file).map_err(|e| EvalError::RomDataInvalid {
            module: name.to_string(),
            reason: e.to_string(),
        })?;
        let data =
            crate::resolver::parse_rom_data(&contents, width).map_err(|reason| {
                EvalError::RomDataInvalid {
                    module: name.to_string(),
                    reason,
                }
            })?;
        let depth = self.mem_depths[name];
        let cells = self.mem.get_mut(name).unwrap();
        for (addr, value) in data {
            if addr < depth as u64 {
                cells[addr as usize] = Value::new(width, value);
            }
        }
        Ok(())
    }

    /// Advances one clock cycle: applies `inputs`, runs the module to a
    /// steady state, executes every `always_ff` body once, commits the
    /// resulting register writes, and returns the module's output ports
    /// from the steady state reached *before* the edge (matching a
    /// synchronous design's observable behavior: outputs reflect the
    /// values sampled going into this edge).
    pub fn step(
        &mut self,
        cache: &mut ModuleCache,
        inputs: &HashMap<String, Value>,
        sink: &DiagnosticSink,
    ) -> Result<HashMap<String, Value>, EvalError> {
        let steady = eval_combinational(self.module, cache, inputs, &self.regs, sink)?;

        let mut pending_regs: RegMap = HashMap::new();
        let mut pending_mem: HashMap<String, Vec<(u32, Value)>> = HashMap::new();
        let mut next_clocks: HashMap<String, bool> = HashMap::new();

        for item in &self.module.items {
            if let ModuleItem::Process(process) = item {
                if let ProcessKind::AlwaysFf { clock } = &process.kind {
                    let curr = steady
                        .get(clock)
                        .or_else(|| inputs.get(clock))
                        .map(Value::is_truthy)
                        .unwrap_or(false);
                    let prev = *self.prev_clocks.get(clock).unwrap_or(&false);
                    next_clocks.insert(clock.clone(), curr);

                    if prev || !curr {
                        continue;
                    }
                    let mut shadow = steady.clone();
                    self.exec_ff_statement(
                        &process.body,
                        &mut shadow,
                        &mut pending_regs,
                        &mut pending_mem,
                        sink,
                    )?;
                }
            }
        }
        for (clock, value) in next_clocks {
            self.prev_clocks.insert(clock, value);
        }

        for (name, value) in pending_regs {
            self.regs.insert(name, value);
        }
        for (name, writes) in pending_mem {
            if let Some(array) = self.mem.get_mut(&name) {
                for (index, value) in writes {
                    if (index as usize) < array.len() {
                        array[index as usize] = value;
                    }
                    // Out-of-range writes are silently dropped.
                }
            }
        }

        let outputs = self
            .module
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Output)
            .map(|p| (p.name.clone(), steady[&p.name]))
            .collect();
        Ok(outputs)
    }

    fn exec_ff_statement(
        &self,
        stmt: &Statement,
        shadow: &mut HashMap<String, Value>,
        pending_regs: &mut RegMap,
        pending_mem: &mut HashMap<String, Vec<(u32, Value)>>,
        sink: &DiagnosticSink,
    ) -> Result<(), EvalError> {
        match stmt {
            Statement::Block(stmts, _) => {
                for s in stmts {
                    self.exec_ff_statement(s, shadow, pending_regs, pending_mem, sink)?;
                }
                Ok(())
            }
            Statement::BlockingAssign { lhs, rhs, .. } => {
                let value = eval(rhs, &Env::new(shadow))?;
                self.write_local(lhs, value, shadow)
            }
            Statement::NonBlockingAssign { lhs, rhs, .. } => {
                let value = eval(rhs, &Env::new(shadow))?;
                self.schedule_nonblocking(lhs, value, shadow, pending_regs, pending_mem, sink)
            }
            Statement::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => {
                if eval(cond, &Env::new(shadow))?.is_truthy() {
                    self.exec_ff_statement(then_branch, shadow, pending_regs, pending_mem, sink)
                } else if let Some(else_branch) = else_branch {
                    self.exec_ff_statement(else_branch, shadow, pending_regs, pending_mem, sink)
                } else {
                    Ok(())
                }
            }
            Statement::Case {
                selector,
                arms,
                default,
                ..
            } => self.exec_ff_case(
                selector,
                arms,
                default,
                shadow,
                pending_regs,
                pending_mem,
                sink,
            ),
            Statement::Error(_) => Ok(()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn exec_ff_case(
        &self,
        selector: &Expr,
        arms: &[CaseArm],
        default: &Option<Box<Statement>>,
        shadow: &mut HashMap<String, Value>,
        pending_regs: &mut RegMap,
        pending_mem: &mut HashMap<String, Vec<(u32, Value)>>,
        sink: &DiagnosticSink,
    ) -> Result<(), EvalError> {
        let selector_val = eval(selector, &Env::new(shadow))?;
        for arm in arms {
            for m in &arm.matches {
                let match_val = eval(m, &Env::new(shadow))?;
                if match_val.bits() == selector_val.resize(match_val.width()).bits() {
                    return self.exec_ff_statement(
                        &arm.body,
                        shadow,
                        pending_regs,
                        pending_mem,
                        sink,
                    );
                }
            }
        }
        if let Some(default) = default {
            self.exec_ff_statement(default, shadow, pending_regs, pending_mem, sink)
        } else {
            Ok(())
        }
    }

    /// A blocking assignment inside `always_ff` updates the local shadow
    /// copy immediately, matching SystemVerilog's blocking-assignment
    /// semantics within a single procedural block.
    fn write_local(
        &self,
        target: &Expr,
        value: Value,
        shadow: &mut HashMap<String, Value>,
    ) -> Result<(), EvalError> {
        crate::expr_eval::assign_target(shadow, target, value)
    }

    /// A non-blocking assignment is recorded for the two-phase commit: the
    /// shadow environment used for the rest of this block's reads is left
    /// untouched, mirroring `<=`'s deferred-update semantics.
    fn schedule_nonblocking(
        &self,
        target: &Expr,
        value: Value,
        shadow: &HashMap<String, Value>,
        pending_regs: &mut RegMap,
        pending_mem: &mut HashMap<String, Vec<(u32, Value)>>,
        sink: &DiagnosticSink,
    ) -> Result<(), EvalError> {
        match target {
            Expr::Ident(name, _) => {
                let width = shadow
                    .get(name)
                    .map(|v| v.width())
                    .or_else(|| self.regs.get(name).map(|v| v.width()))
                    .ok_or_else(|| EvalError::UndefinedIdentifier(name.clone()))?;
                pending_regs.insert(name.clone(), value.resize(width));
                Ok(())
            }
            Expr::Index { base, index, span } => {
                let depth = *self
                    .mem_depths
                    .get(base)
                    .ok_or_else(|| EvalError::UndefinedIdentifier(base.clone()))?;
                let idx = eval(index, &Env::new(shadow))?.bits() as i64;
                if idx >= 0 && (idx as u32) < depth {
                    pending_mem
                        .entry(base.clone())
                        .or_default()
                        .push((idx as u32, value));
                } else {
                    // Out-of-range memory writes are dropped, not errors, but
                    // surfaced so a caller can notice a design writing past
                    // its declared memory depth.
                    sink.emit(Diagnostic::warning(
                        DiagnosticCode::new(Category::Warning, 301),
                        format!(
                            "write to '{base}[{idx}]' dropped: out of range for a {depth}-entry memory"
                        ),
                        *span,
                    ));
                }
                Ok(())
            }
            Expr::Error(_) => Ok(()),
            other => Err(EvalError::UnsupportedConstruct(format!(
                "'{other:?}' is not a valid non-blocking assignment target"
            ))),
        }
    }
}

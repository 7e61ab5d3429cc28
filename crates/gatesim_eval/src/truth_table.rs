//! Exhaustive truth-table enumeration for combinational modules.
//!
//! Every combination of the module's input bits is evaluated once via
//! [`crate::comb::eval_combinational`]; the results are returned as rows
//! alongside the module's NAND-equivalent gate cost. Enumeration is only
//! tractable for modules with a small number of total input bits, so a
//! configurable limit guards against accidentally enumerating something
//! like the CPU's full input space.

use std::collections::HashMap;

use gatesim_common::value::Value;
use gatesim_diagnostics::DiagnosticSink;
use gatesim_parser::ast::{Direction, ModuleDecl};

use crate::comb::{eval_combinational, nand_cost, total_input_width};
use crate::error::EvalError;
use crate::resolver::ModuleCache;

/// The default ceiling on total input bits a module may have before
/// [`enumerate`] refuses to exhaustively walk its input space (2^20 rows).
pub const DEFAULT_MAX_INPUT_BITS: u32 = 20;

/// One row of a truth table: the input assignment and the resulting
/// output values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruthTableRow {
    /// The value driven onto each input port for this row.
    pub inputs: HashMap<String, Value>,
    /// The value read from each output port once the module settled.
    pub outputs: HashMap<String, Value>,
}

/// A module's full truth table plus its gate cost.
#[derive(Debug, Clone)]
pub struct TruthTable {
    /// One row per input combination, in ascending order of the inputs'
    /// concatenated bit pattern (first-declared input port in the most
    /// significant position).
    pub rows: Vec<TruthTableRow>,
    /// The module's NAND-equivalent gate count, per [`crate::comb::nand_cost`].
    pub gate_cost: u64,
}

/// Enumerates every input combination of `module_name`, evaluating each
/// through a fresh combinational pass.
///
/// Returns [`EvalError::TooManyInputsToEnumerate`] if the module's total
/// input width exceeds `max_input_bits`.
pub fn enumerate(
    module_name: &str,
    cache: &mut ModuleCache,
    max_input_bits: u32,
    sink: &DiagnosticSink,
) -> Result<TruthTable, EvalError> {
    let resolved = cache.resolve(module_name, sink)?;
    let module: &ModuleDecl = match &*resolved {
        crate::resolver::ResolvedModule::Source(m) => m,
        crate::resolver::ResolvedModule::Rom(_) => {
            return Err(EvalError::UnsupportedConstruct(format!(
                "'{module_name}' is a ROM primitive, not a combinational module to enumerate"
            )))
        }
    };
    let module = module.clone();

    let input_ports: Vec<_> = module
        .ports
        .iter()
        .filter(|p| p.direction == Direction::Input)
        .map(|p| (p.name.clone(), p.width.map_or(1, |w| w.width() as u32)))
        .collect();

    let total_bits = total_input_width(&module);
    if total_bits > max_input_bits {
        return Err(EvalError::TooManyInputsToEnumerate {
            module: module_name.to_string(),
            bits: total_bits,
            limit: max_input_bits,
        });
    }

    let combinations: u64 = 1u64 << total_bits;
    let mut rows = Vec::with_capacity(combinations as usize);
    let empty_regs = HashMap::new();

    for pattern in 0..combinations {
        let mut inputs = HashMap::new();
        let mut shift = 0u32;
        for (name, width) in &input_ports {
            let mask = if *width >= 64 { u64::MAX } else { (1u64 << width) - 1 };
            let bits = (pattern >> shift) & mask;
            inputs.insert(name.clone(), Value::new(*width, bits));
            shift += width;
        }

        let outputs = eval_combinational(&module, cache, &inputs, &empty_regs, sink)?;
        let output_only: HashMap<String, Value> = module
            .ports
            .iter()
            .filter(|p| p.direction == Direction::Output)
            .map(|p| (p.name.clone(), outputs[&p.name]))
            .collect();

        rows.push(TruthTableRow {
            inputs,
            outputs: output_only,
        });
    }

    let gate_cost = nand_cost(module_name, cache, sink)?;
    Ok(TruthTable { rows, gate_cost })
}

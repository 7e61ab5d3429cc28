//! Cycle-based evaluator for gatesim's bounded SystemVerilog subset.
//!
//! This crate turns a parsed module (from `gatesim_parser`) into runnable
//! behavior: combinational evaluation to a fixpoint, a two-phase-commit
//! sequential stepper for `always_ff` blocks, NAND-equivalent gate-cost
//! counting, exhaustive truth-table enumeration, ROM-primitive resolution,
//! and JSON test-case stepping.
//!
//! # Architecture
//!
//! [`resolver::ModuleCache`] maps module names to parsed ASTs (or ROM
//! primitives, by the `rom_` naming convention), memoizing by name so a
//! module instantiated many times is parsed once. [`comb::eval_combinational`]
//! runs continuous assigns, `always_comb` blocks, and child instances to a
//! fixpoint; [`seq::SequentialEvaluator`] layers persistent register and
//! memory state and genuine clock-edge detection on top of it for a single
//! clocked module. [`truth_table::enumerate`] and [`seq_test`] are the two
//! test-facing facades: exhaustive enumeration for small combinational
//! modules, and JSON test-case stepping (both combinational and sequential
//! schemas) for everything else.
//!
//! # Modules
//!
//! - `error` — evaluation error types
//! - `resolver` — module name resolution, parse cache, ROM primitives
//! - `expr_eval` — expression evaluation over the bit-vector value model
//! - `comb` — combinational fixpoint evaluation and NAND-equivalent cost
//! - `seq` — sequential (clocked) evaluation
//! - `truth_table` — exhaustive truth-table enumeration
//! - `seq_test` — JSON test-case stepping for combinational and sequential
//!   modules

#![warn(missing_docs)]

pub mod comb;
pub mod error;
pub mod expr_eval;
pub mod resolver;
pub mod seq;
pub mod seq_test;
pub mod truth_table;

pub use comb::{eval_combinational, nand_cost, total_input_width};
pub use error::EvalError;
pub use resolver::{ModuleCache, ResolvedModule, RomPrimitive};
pub use seq::SequentialEvaluator;
pub use seq_test::{
    run_combinational_cases, run_sequential_cases, CombinationalCaseOutcome, Mismatch,
    SequentialCaseOutcome, SequentialStepOutcome,
};
pub use truth_table::{enumerate, TruthTable, TruthTableRow, DEFAULT_MAX_INPUT_BITS};

//! Hand-rolled recursive-descent parser for gatesim's bounded SystemVerilog
//! subset.
//!
//! This crate turns source text into a [`ast::SourceFile`]: a lexer produces
//! spanned tokens, and a recursive-descent parser with Pratt expression
//! parsing builds the AST, reporting diagnostics to a
//! [`gatesim_diagnostics::DiagnosticSink`] and recovering via `Error` nodes
//! rather than aborting on the first malformed construct. The main entry
//! point is [`parse_file`].
//!
//! # Architecture
//!
//! - **Lexer** ([`lexer`]): converts source text to tokens — keywords, the
//!   bounded operator set, sized/unsized numeric literals, and comments.
//! - **Parser** ([`parser`]): module and statement grammar, with Pratt
//!   expression parsing in [`expr`].
//! - **AST** ([`ast`]): all AST node types with spans and serde support.
//!
//! # Scope
//!
//! Covers a synthesizable, single-clock-domain subset: module declarations
//! with ANSI or non-ANSI ports, `wire`/`logic`/`reg` nets (including 1-D
//! memory arrays), `assign` continuous assignments, module instantiation,
//! `always_comb` and `always_ff @(posedge clk)` procedural blocks with
//! `if`/`else`, `case`/`default`, nested `begin`/`end`, and blocking/
//! non-blocking assignment. Parameters, generate blocks, interfaces,
//! packages, tasks/functions, and 4-state (`x`/`z`) literals are outside
//! this subset; the lexer still tokenizes their keywords as plain
//! identifiers so the parser can report them as an unsupported construct in
//! context rather than as a raw lex error.

#![warn(missing_docs)]

/// AST node types for gatesim's bounded SystemVerilog subset.
pub mod ast;
/// Expression parsing (Pratt/operator-precedence).
mod expr;
/// Lexical analysis.
pub mod lexer;
/// Parser driver: module and statement grammar.
pub mod parser;
/// Token kinds.
pub mod token;

use ast::SourceFile;
use gatesim_diagnostics::DiagnosticSink;
use gatesim_source::FileId;

/// Lexes and parses `source` as a single SystemVerilog source file.
///
/// Returns the parsed [`SourceFile`] regardless of whether errors were
/// reported; callers should check `sink.has_errors()` before trusting the
/// result for elaboration, since malformed items and statements are
/// represented as `Error` nodes rather than causing this function to fail.
pub fn parse_file(source: &str, file: FileId, sink: &DiagnosticSink) -> SourceFile {
    let tokens = lexer::lex(source, file, sink);
    parser::parse_source_file(tokens, file, sink)
}

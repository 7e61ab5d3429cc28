//! Shared foundational types used across the gatesim toolchain.
//!
//! This crate provides the masked bit-vector value model shared by every
//! evaluator.

#![warn(missing_docs)]

pub mod value;

pub use value::Value;

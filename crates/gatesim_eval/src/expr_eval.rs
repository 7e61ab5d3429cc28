//! Expression evaluation against a flat signal environment.

use std::collections::HashMap;

use gatesim_common::value::Value;
use gatesim_parser::ast::{BinaryOp, Expr, UnaryOp};

use crate::error::EvalError;

/// A read-only view of the signals visible to an expression: the current
/// value of every port and net in the enclosing module, keyed by name.
pub struct Env<'a> {
    signals: &'a HashMap<String, Value>,
}

impl<'a> Env<'a> {
    /// Wraps a signal map for expression evaluation.
    pub fn new(signals: &'a HashMap<String, Value>) -> Self {
        Self { signals }
    }

    fn lookup(&self, name: &str) -> Result<Value, EvalError> {
        self.signals
            .get(name)
            .copied()
            .ok_or_else(|| EvalError::UndefinedIdentifier(name.to_string()))
    }
}

/// Evaluates `expr` against `env`, producing its value.
///
/// Width handling follows the usual HDL convention: mismatched operand
/// widths are resolved by zero-extending the narrower operand up to the
/// wider one before applying the operator (sign-extension is not performed
/// automatically — gatesim treats every value as unsigned unless an
/// operand is explicitly typed `signed`, which the bounded grammar does not
/// currently plumb into expression evaluation).
pub fn eval(expr: &Expr, env: &Env) -> Result<Value, EvalError> {
    match expr {
        Expr::Ident(name, _) => env.lookup(name),

        Expr::Literal { width, value, .. } => {
            let w = width.unwrap_or(32).clamp(1, gatesim_common::value::MAX_WIDTH);
            Ok(Value::new(w, *value))
        }

        Expr::Index { base, index, .. } => {
            let base_val = env.lookup(base)?;
            let idx = eval(index, env)?;
            let i = idx.bits() as i64;
            base_val
                .bit_select(i as u32)
                .filter(|_| i >= 0)
                .ok_or_else(|| EvalError::IndexOutOfRange {
                    signal: base.clone(),
                    index: i,
                    width: base_val.width(),
                })
        }

        Expr::PartSelect { base, hi, lo, .. } => {
            let base_val = env.lookup(base)?;
            let hi_val = eval(hi, env)?.bits() as i64;
            let lo_val = eval(lo, env)?.bits() as i64;
            if hi_val < lo_val || lo_val < 0 {
                return Err(EvalError::IndexOutOfRange {
                    signal: base.clone(),
                    index: hi_val,
                    width: base_val.width(),
                });
            }
            base_val
                .part_select(lo_val as u32, hi_val as u32)
                .ok_or_else(|| EvalError::IndexOutOfRange {
                    signal: base.clone(),
                    index: hi_val,
                    width: base_val.width(),
                })
        }

        Expr::Concat(parts, _) => {
            let mut values = Vec::with_capacity(parts.len());
            for part in parts {
                values.push(eval(part, env)?);
            }
            let total_width: u32 = values.iter().map(|v| v.width()).sum();
            if total_width > gatesim_common::value::MAX_WIDTH {
                return Err(EvalError::WidthOverflow {
                    attempted: total_width,
                    max: gatesim_common::value::MAX_WIDTH,
                });
            }
            let mut iter = values.into_iter();
            let first = iter.next().expect("concat always has at least one part");
            Ok(iter.fold(first, |acc, next| acc.concat(&next)))
        }

        Expr::Replicate { count, value, .. } => {
            let n = eval(count, env)?.bits();
            if n == 0 {
                return Err(EvalError::UnsupportedConstruct(
                    "replication count must be at least 1".to_string(),
                ));
            }
            let v = eval(value, env)?;
            let total_width = v.width() as u64 * n;
            if total_width > gatesim_common::value::MAX_WIDTH as u64 {
                return Err(EvalError::WidthOverflow {
                    attempted: total_width as u32,
                    max: gatesim_common::value::MAX_WIDTH,
                });
            }
            let mut acc = v;
            for _ in 1..n {
                acc = acc.concat(&v);
            }
            Ok(acc)
        }

        Expr::Unary { op, expr, .. } => {
            let v = eval(expr, env)?;
            Ok(match op {
                UnaryOp::Plus => v,
                UnaryOp::Neg => v.negate(),
                UnaryOp::BitNot => v.bitnot(),
                UnaryOp::LogicalNot => v.logical_not(),
                UnaryOp::ReduceAnd => v.reduce_and(),
                UnaryOp::ReduceOr => v.reduce_or(),
                UnaryOp::ReduceXor => v.reduce_xor(),
            })
        }

        Expr::Binary { op, lhs, rhs, .. } => eval_binary(*op, eval(lhs, env)?, eval(rhs, env)?),

        Expr::Ternary {
            cond,
            then_expr,
            else_expr,
            ..
        } => {
            if eval(cond, env)?.is_truthy() {
                eval(then_expr, env)
            } else {
                eval(else_expr, env)
            }
        }

        Expr::Error(_) => Err(EvalError::UnsupportedConstruct(
            "expression failed to parse".to_string(),
        )),
    }
}

/// Widens `a` and `b` to their common width (the wider of the two),
/// zero-extending the narrower operand.
fn common_width(a: Value, b: Value) -> (Value, Value) {
    let width = a.width().max(b.width());
    (a.resize(width), b.resize(width))
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    use BinaryOp::*;
    match op {
        LogicalAnd => Ok(Value::from_bool(lhs.is_truthy() && rhs.is_truthy())),
        LogicalOr => Ok(Value::from_bool(lhs.is_truthy() || rhs.is_truthy())),
        Eq => {
            let (a, b) = common_width(lhs, rhs);
            Ok(Value::from_bool(a.bits() == b.bits()))
        }
        Neq => {
            let (a, b) = common_width(lhs, rhs);
            Ok(Value::from_bool(a.bits() != b.bits()))
        }
        Lt => {
            let (a, b) = common_width(lhs, rhs);
            Ok(Value::from_bool(a.cmp_unsigned(&b).is_lt()))
        }
        Le => {
            let (a, b) = common_width(lhs, rhs);
            Ok(Value::from_bool(a.cmp_unsigned(&b).is_le()))
        }
        Gt => {
            let (a, b) = common_width(lhs, rhs);
            Ok(Value::from_bool(a.cmp_unsigned(&b).is_gt()))
        }
        Ge => {
            let (a, b) = common_width(lhs, rhs);
            Ok(Value::from_bool(a.cmp_unsigned(&b).is_ge()))
        }
        Shl => Ok(lhs.shift_left(rhs.bits() as u32)),
        Shr => Ok(lhs.shift_right_logical(rhs.bits() as u32)),
        Add => {
            let (a, b) = common_width(lhs, rhs);
            Ok(a.wrapping_add(&b))
        }
        Sub => {
            let (a, b) = common_width(lhs, rhs);
            Ok(a.wrapping_sub(&b))
        }
        Mul => {
            let (a, b) = common_width(lhs, rhs);
            Ok(a.wrapping_mul(&b))
        }
        And => {
            let (a, b) = common_width(lhs, rhs);
            Ok(a.bitand(&b))
        }
        Or => {
            let (a, b) = common_width(lhs, rhs);
            Ok(a.bitor(&b))
        }
        Xor => {
            let (a, b) = common_width(lhs, rhs);
            Ok(a.bitxor(&b))
        }
        Xnor => {
            let (a, b) = common_width(lhs, rhs);
            Ok(a.bitxor(&b).bitnot())
        }
    }
}

/// Assigns `value` into the signal named by `target`, handling bit-select,
/// part-select, and whole-signal assignment targets. `width` lookup comes
/// from the current value already stored in `env`, since a target must
/// already exist as a declared net before it can be driven.
pub fn assign_target(
    env: &mut HashMap<String, Value>,
    target: &Expr,
    value: Value,
) -> Result<(), EvalError> {
    match target {
        Expr::Ident(name, _) => {
            let width = env
                .get(name)
                .map(|v| v.width())
                .ok_or_else(|| EvalError::UndefinedIdentifier(name.clone()))?;
            env.insert(name.clone(), value.resize(width));
            Ok(())
        }
        Expr::Index { base, index, .. } => {
            let current = env
                .get(base)
                .copied()
                .ok_or_else(|| EvalError::UndefinedIdentifier(base.clone()))?;
            let idx = eval(index, &Env::new(env))?.bits() as i64;
            if idx < 0 || idx as u32 >= current.width() {
                return Err(EvalError::IndexOutOfRange {
                    signal: base.clone(),
                    index: idx,
                    width: current.width(),
                });
            }
            let bit = value.is_truthy();
            let mut bits = current.bits();
            if bit {
                bits |= 1 << idx;
            } else {
                bits &= !(1 << idx);
            }
            env.insert(base.clone(), Value::new(current.width(), bits));
            Ok(())
        }
        Expr::PartSelect { base, hi, lo, .. } => {
            let current = env
                .get(base)
                .copied()
                .ok_or_else(|| EvalError::UndefinedIdentifier(base.clone()))?;
            let hi_val = eval(hi, &Env::new(env))?.bits() as i64;
            let lo_val = eval(lo, &Env::new(env))?.bits() as i64;
            if hi_val < lo_val || lo_val < 0 || hi_val as u32 >= current.width() {
                return Err(EvalError::IndexOutOfRange {
                    signal: base.clone(),
                    index: hi_val,
                    width: current.width(),
                });
            }
            let field_width = (hi_val - lo_val + 1) as u32;
            let resized = value.resize(field_width);
            let mask = if field_width >= 64 {
                u64::MAX
            } else {
                (1u64 << field_width) - 1
            } << lo_val;
            let bits = (current.bits() & !mask) | ((resized.bits() << lo_val) & mask);
            env.insert(base.clone(), Value::new(current.width(), bits));
            Ok(())
        }
        Expr::Error(_) => Ok(()),
        other => Err(EvalError::UnsupportedConstruct(format!(
            "'{other:?}' is not a valid assignment target"
        ))),
    }
}

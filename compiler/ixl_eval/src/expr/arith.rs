//! Runtime arithmetic over numeric values.
//!
//! Operands widen to the wider of their two types (bytes widen to int), the
//! same promotion verification uses for the static result type. Integer
//! operations are checked; floating operations follow IEEE 754.

use ixl_types::DataType;
use ixl_value::Value;

use super::ArithmeticOp;
use crate::errors::{
    division_by_zero, integer_overflow, modulo_by_zero, unexpected_input, ExecResult,
};

#[inline]
fn checked_arith<T>(
    result: Option<T>,
    wrap: fn(T) -> Value,
    op_name: &'static str,
) -> ExecResult<Value> {
    result.map(wrap).ok_or_else(|| integer_overflow(op_name))
}

/// Checked division with zero guard.
#[inline]
fn checked_div<T, F>(
    is_zero: bool,
    op: F,
    wrap: fn(T) -> Value,
    op_name: &'static str,
) -> ExecResult<Value>
where
    F: FnOnce() -> Option<T>,
{
    if is_zero {
        Err(division_by_zero())
    } else {
        op().map(wrap).ok_or_else(|| integer_overflow(op_name))
    }
}

/// Checked modulo with zero guard.
#[inline]
fn checked_mod<T, F>(
    is_zero: bool,
    op: F,
    wrap: fn(T) -> Value,
    op_name: &'static str,
) -> ExecResult<Value>
where
    F: FnOnce() -> Option<T>,
{
    if is_zero {
        Err(modulo_by_zero())
    } else {
        op().map(wrap).ok_or_else(|| integer_overflow(op_name))
    }
}

/// Apply `op` to two numeric values.
pub(super) fn evaluate(left: &Value, right: &Value, op: ArithmeticOp) -> ExecResult<Value> {
    let Some(ty) = left.data_type().promote(&right.data_type()) else {
        let offending = if left.is_numeric() { right } else { left };
        return Err(unexpected_input("numeric", &offending.data_type()));
    };
    match ty {
        DataType::Int => eval_int(int_operand(left)?, int_operand(right)?, op),
        DataType::Long => eval_long(long_operand(left)?, long_operand(right)?, op),
        DataType::Float => Ok(eval_float(float_operand(left)?, float_operand(right)?, op)),
        _ => Ok(eval_double(double_operand(left)?, double_operand(right)?, op)),
    }
}

fn eval_int(a: i32, b: i32, op: ArithmeticOp) -> ExecResult<Value> {
    match op {
        ArithmeticOp::Add => checked_arith(a.checked_add(b), Value::Int, "addition"),
        ArithmeticOp::Sub => checked_arith(a.checked_sub(b), Value::Int, "subtraction"),
        ArithmeticOp::Mul => checked_arith(a.checked_mul(b), Value::Int, "multiplication"),
        ArithmeticOp::Div => checked_div(b == 0, || a.checked_div(b), Value::Int, "division"),
        ArithmeticOp::Mod => checked_mod(b == 0, || a.checked_rem(b), Value::Int, "remainder"),
    }
}

fn eval_long(a: i64, b: i64, op: ArithmeticOp) -> ExecResult<Value> {
    match op {
        ArithmeticOp::Add => checked_arith(a.checked_add(b), Value::Long, "addition"),
        ArithmeticOp::Sub => checked_arith(a.checked_sub(b), Value::Long, "subtraction"),
        ArithmeticOp::Mul => checked_arith(a.checked_mul(b), Value::Long, "multiplication"),
        ArithmeticOp::Div => checked_div(b == 0, || a.checked_div(b), Value::Long, "division"),
        ArithmeticOp::Mod => checked_mod(b == 0, || a.checked_rem(b), Value::Long, "remainder"),
    }
}

fn eval_float(a: f32, b: f32, op: ArithmeticOp) -> Value {
    Value::Float(match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Sub => a - b,
        ArithmeticOp::Mul => a * b,
        ArithmeticOp::Div => a / b,
        ArithmeticOp::Mod => a % b,
    })
}

fn eval_double(a: f64, b: f64, op: ArithmeticOp) -> Value {
    Value::Double(match op {
        ArithmeticOp::Add => a + b,
        ArithmeticOp::Sub => a - b,
        ArithmeticOp::Mul => a * b,
        ArithmeticOp::Div => a / b,
        ArithmeticOp::Mod => a % b,
    })
}

fn int_operand(value: &Value) -> ExecResult<i32> {
    value
        .as_i64()
        .and_then(|n| i32::try_from(n).ok())
        .ok_or_else(|| unexpected_input("int", &value.data_type()))
}

fn long_operand(value: &Value) -> ExecResult<i64> {
    value
        .as_i64()
        .ok_or_else(|| unexpected_input("long", &value.data_type()))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "operands promoted to float are at most float wide"
)]
fn float_operand(value: &Value) -> ExecResult<f32> {
    match value {
        Value::Float(f) => Ok(*f),
        other => double_operand(other).map(|d| d as f32),
    }
}

fn double_operand(value: &Value) -> ExecResult<f64> {
    value
        .as_f64()
        .ok_or_else(|| unexpected_input("double", &value.data_type()))
}

//! Type conversions.
//!
//! Numbers convert between widths when the value fits. Strings are parsed
//! after trimming surrounding whitespace. Anything else is an error naming
//! the offending literal.

use ixl_types::DataType;
use ixl_value::{Value, WeightedSetValue};

use super::{Operation, OperationRegistry};
use crate::context::ExecutionContext;
use crate::errors::{conversion_failed, ExecResult, VerificationErrorKind};

pub(super) fn register(registry: &mut OperationRegistry) {
    let scalar: [(&str, DataType, super::ExecuteFn); 7] = [
        ("to_string", DataType::String, to_string),
        ("to_byte", DataType::Byte, to_byte),
        ("to_int", DataType::Int, to_int),
        ("to_long", DataType::Long, to_long),
        ("to_float", DataType::Float, to_float),
        ("to_double", DataType::Double, to_double),
        ("to_bool", DataType::Bool, to_bool),
    ];
    for (name, ty, body) in scalar {
        registry.register(Operation::new(name, body).requires(DataType::Any).creates(ty));
    }
    registry.register(
        Operation::new("to_array", to_array)
            .requires(DataType::Any)
            .creates(DataType::Unresolved)
            .verify_with(array_of_input),
    );
    registry.register(
        Operation::new("to_wset", to_wset)
            .requires(DataType::Any)
            .creates(DataType::Unresolved)
            .verify_with(wset_of_input),
    );
}

/// Apply `f` to the current value.
fn convert(
    ctx: &ExecutionContext<'_>,
    f: impl FnOnce(&Value) -> ExecResult<Value>,
) -> ExecResult<Option<Value>> {
    ctx.value().map(f).transpose()
}

/// Integral form of a value, or a conversion error naming `target`.
fn integral(value: &Value, target: &DataType) -> ExecResult<i64> {
    let failed = || conversion_failed(value, target);
    match value {
        Value::Byte(_) | Value::Int(_) | Value::Long(_) => value.as_i64().ok_or_else(failed),
        Value::Float(_) | Value::Double(_) => {
            let n = value.as_f64().ok_or_else(failed)?;
            truncate(n).ok_or_else(failed)
        }
        Value::Str(s) => s.trim().parse::<i64>().map_err(|_| failed()),
        _ => Err(failed()),
    }
}

/// Truncate toward zero, rejecting non-finite and out-of-range values.
#[expect(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    reason = "range checked against i64 bounds before the cast"
)]
fn truncate(n: f64) -> Option<i64> {
    let t = n.trunc();
    (t.is_finite() && t >= i64::MIN as f64 && t < i64::MAX as f64).then(|| t as i64)
}

fn floating(value: &Value, target: &DataType) -> ExecResult<f64> {
    match value {
        Value::Str(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| conversion_failed(value, target)),
        other => other
            .as_f64()
            .ok_or_else(|| conversion_failed(value, target)),
    }
}

fn to_string(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| Ok(Value::string(v.to_string())))
}

fn to_byte(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| {
        let n = integral(v, &DataType::Byte)?;
        i8::try_from(n)
            .map(Value::Byte)
            .map_err(|_| conversion_failed(v, &DataType::Byte))
    })
}

fn to_int(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| {
        let n = integral(v, &DataType::Int)?;
        i32::try_from(n)
            .map(Value::Int)
            .map_err(|_| conversion_failed(v, &DataType::Int))
    })
}

fn to_long(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| integral(v, &DataType::Long).map(Value::Long))
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "narrowing to single precision is the conversion"
)]
fn to_float(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| floating(v, &DataType::Float).map(|n| Value::Float(n as f32)))
}

fn to_double(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| floating(v, &DataType::Double).map(Value::Double))
}

fn to_bool(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| match v {
        Value::Bool(b) => Ok(Value::Bool(*b)),
        Value::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(conversion_failed(v, &DataType::Bool)),
        },
        other if other.is_numeric() => Ok(Value::Bool(other.as_f64() != Some(0.0))),
        _ => Err(conversion_failed(v, &DataType::Bool)),
    })
}

fn to_array(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| Ok(Value::array(v.data_type(), vec![v.clone()])))
}

fn to_wset(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    convert(ctx, |v| {
        let mut set = WeightedSetValue::new(v.data_type());
        set.insert(v.clone(), 1);
        Ok(Value::from(set))
    })
}

fn array_of_input(_: &[Value], input: &DataType) -> Result<DataType, VerificationErrorKind> {
    Ok(DataType::array(input.clone()))
}

fn wset_of_input(_: &[Value], input: &DataType) -> Result<DataType, VerificationErrorKind> {
    Ok(DataType::weighted_set(input.clone()))
}

//! String transformations.

use ixl_types::DataType;
use ixl_value::Value;

use super::{expect_str, index_arg, Operation, OperationRegistry};
use crate::context::ExecutionContext;
use crate::errors::{invalid_argument, out_of_range, ExecResult, VerificationErrorKind};

pub(super) fn register(registry: &mut OperationRegistry) {
    for (name, body) in [
        ("lowercase", lowercase as super::ExecuteFn),
        ("uppercase", uppercase),
        ("trim", trim),
    ] {
        registry.register(
            Operation::new(name, body)
                .requires(DataType::String)
                .creates(DataType::String),
        );
    }
    registry.register(
        Operation::new("substring", substring)
            .requires(DataType::String)
            .creates(DataType::String)
            .args(vec![DataType::Int, DataType::Int])
            .check_args_with(check_substring),
    );
}

/// Apply `f` to the current string value.
fn map_str(
    ctx: &ExecutionContext<'_>,
    f: impl FnOnce(&str) -> String,
) -> ExecResult<Option<Value>> {
    let Some(value) = ctx.value() else {
        return Ok(None);
    };
    Ok(Some(Value::string(f(expect_str(value)?))))
}

fn lowercase(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    map_str(ctx, str::to_lowercase)
}

fn uppercase(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    map_str(ctx, str::to_uppercase)
}

fn trim(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    map_str(ctx, |s| s.trim().to_string())
}

fn check_substring(name: &str, args: &[Value]) -> Result<(), VerificationErrorKind> {
    let (from, to) = substring_bounds(name, args)?;
    if from > to {
        return Err(invalid_argument(
            name,
            format!("'from' ({from}) must not exceed 'to' ({to})"),
        ));
    }
    Ok(())
}

fn substring_bounds(name: &str, args: &[Value]) -> Result<(usize, usize), VerificationErrorKind> {
    match args {
        [from, to] => Ok((index_arg(name, from)?, index_arg(name, to)?)),
        _ => Err(invalid_argument(name, "expected 'from' and 'to'")),
    }
}

/// Characters `from..to`, clamped to the string length.
fn substring(args: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    let (from, to) = substring_bounds("substring", args)
        .map_err(|kind| out_of_range(kind.to_string()))?;
    map_str(ctx, |s| s.chars().skip(from).take(to.saturating_sub(from)).collect())
}

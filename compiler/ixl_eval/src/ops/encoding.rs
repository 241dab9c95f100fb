//! Hex and base64 codecs over raw bytes.

use data_encoding::{Encoding, BASE64, HEXLOWER, HEXLOWER_PERMISSIVE};
use ixl_types::DataType;
use ixl_value::Value;

use super::{expect_str, Operation, OperationRegistry};
use crate::context::ExecutionContext;
use crate::errors::{invalid_encoding, unexpected_input, ExecResult};

pub(super) fn register(registry: &mut OperationRegistry) {
    registry.register(
        Operation::new("hex_encode", hex_encode)
            .requires(DataType::Raw)
            .creates(DataType::String),
    );
    registry.register(
        Operation::new("hex_decode", hex_decode)
            .requires(DataType::String)
            .creates(DataType::Raw),
    );
    registry.register(
        Operation::new("base64_encode", base64_encode)
            .requires(DataType::Raw)
            .creates(DataType::String),
    );
    registry.register(
        Operation::new("base64_decode", base64_decode)
            .requires(DataType::String)
            .creates(DataType::Raw),
    );
}

fn encode(ctx: &ExecutionContext<'_>, encoding: &Encoding) -> ExecResult<Option<Value>> {
    match ctx.value() {
        None => Ok(None),
        Some(Value::Raw(bytes)) => Ok(Some(Value::string(encoding.encode(bytes)))),
        Some(other) => Err(unexpected_input("raw", &other.data_type())),
    }
}

fn decode(
    ctx: &ExecutionContext<'_>,
    encoding: &Encoding,
    name: &'static str,
) -> ExecResult<Option<Value>> {
    let Some(value) = ctx.value() else {
        return Ok(None);
    };
    let text = expect_str(value)?;
    encoding
        .decode(text.as_bytes())
        .map(|bytes| Some(Value::raw(bytes)))
        .map_err(|_| invalid_encoding(name, text))
}

fn hex_encode(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    encode(ctx, &HEXLOWER)
}

fn hex_decode(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    decode(ctx, &HEXLOWER_PERMISSIVE, "hex")
}

fn base64_encode(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    encode(ctx, &BASE64)
}

fn base64_decode(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    decode(ctx, &BASE64, "base64")
}

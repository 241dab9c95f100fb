//! Explicit language selection.

use ixl_types::DataType;
use ixl_value::Value;

use super::{expect_str, Operation, OperationRegistry};
use crate::context::ExecutionContext;
use crate::errors::ExecResult;
use crate::language::Language;

pub(super) fn register(registry: &mut OperationRegistry) {
    registry.register(Operation::new("set_language", set_language).requires(DataType::String));
}

/// Fix the context language to the current string value, passing the value
/// through unchanged.
fn set_language(_: &[Value], ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    let Some(value) = ctx.value().cloned() else {
        return Ok(None);
    };
    let language = Language::from_tag(expect_str(&value)?);
    tracing::debug!(%language, "language set explicitly");
    ctx.set_language(language);
    Ok(Some(value))
}

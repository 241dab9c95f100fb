//! Clock access.

use std::time::{SystemTime, UNIX_EPOCH};

use ixl_types::DataType;
use ixl_value::Value;

use super::{Operation, OperationRegistry};
use crate::context::ExecutionContext;
use crate::errors::{out_of_range, ExecResult};

pub(super) fn register(registry: &mut OperationRegistry) {
    registry.register(Operation::new("now", now).creates(DataType::Long));
}

/// Seconds since the unix epoch. Ignores the current value.
fn now(_: &[Value], _: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| out_of_range("system clock is set before the unix epoch"))?;
    let secs = i64::try_from(elapsed.as_secs())
        .map_err(|_| out_of_range("system clock is beyond the representable range"))?;
    Ok(Some(Value::Long(secs)))
}

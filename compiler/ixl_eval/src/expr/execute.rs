//! Execution: evaluate a verified tree against one document.

use ixl_types::DataType;
use ixl_value::{ArrayValue, MapValue, Value, WeightedSetValue};

use super::{arith, concat_type, Expression, GuardExpr, InputFields};
use crate::adapter::DocumentSchema;
use crate::context::{ExecutionContext, VerificationContext};
use crate::errors::{struct_field_rejected, unexpected_input, ExecResult};
use crate::stack::ensure_sufficient_stack;

impl Expression {
    /// Evaluate this node against the current value of `ctx`, replacing it
    /// with the node's result.
    ///
    /// A node that requires input does nothing when the current value is
    /// absent, so absence flows down a pipe without failing it.
    pub fn execute(&self, ctx: &mut ExecutionContext<'_>) -> ExecResult<()> {
        ensure_sufficient_stack(|| {
            tracing::trace!(expression = %self, "execute");
            let needs_input = self.owns_type_checks() && self.required_input_type().is_some();
            if needs_input && ctx.value().is_none() {
                return Ok(());
            }
            self.execute_node(ctx)
        })
    }

    fn execute_node(&self, ctx: &mut ExecutionContext<'_>) -> ExecResult<()> {
        match self {
            Expression::Constant(value) => ctx.set_value(Some(value.clone())),
            Expression::This => {}
            Expression::Input(field) => {
                let value = ctx.input_value(field)?;
                ctx.set_value(value);
            }
            Expression::Output { field, .. } => {
                if let Some(value) = ctx.value().cloned() {
                    ctx.set_output_value(field, value)?;
                }
            }
            Expression::GetVar(name) => {
                let value = ctx.variable(name).cloned();
                ctx.set_value(value);
            }
            Expression::SetVar(name) => {
                let value = ctx.value().cloned();
                ctx.set_variable(name, value);
            }
            Expression::Operation(call) => {
                let value = call.execute(ctx)?;
                ctx.set_value(value);
            }
            Expression::Statement(s) => {
                for child in &s.children {
                    child.execute(ctx)?;
                }
            }
            Expression::Script(s) => {
                let input = ctx.value().cloned();
                for (statement, fields) in s.statements.iter().zip(&s.inputs) {
                    if !ctx.is_complete() && !fields.is_empty() && !any_present(ctx, fields)? {
                        tracing::debug!(%statement, "skipping statement, no input present");
                        continue;
                    }
                    ctx.set_value(input.clone());
                    for child in &statement.children {
                        child.execute(ctx)?;
                    }
                }
                ctx.set_value(input);
            }
            Expression::ForEach(inner) => {
                let Some(value) = ctx.take_value() else {
                    return Ok(());
                };
                let result = for_each(inner, value, ctx)?;
                ctx.set_value(Some(result));
            }
            Expression::IfThen(s) => {
                let input = ctx.value().cloned();
                let left = execute_from(&s.left, input.clone(), ctx)?;
                let right = execute_from(&s.right, input.clone(), ctx)?;
                let (Some(left), Some(right)) = (left, right) else {
                    ctx.set_value(None);
                    return Ok(());
                };
                let branch = if s.comparator.matches(left.compare_to(&right)) {
                    Some(&*s.if_true)
                } else {
                    s.if_false.as_deref()
                };
                ctx.set_value(input);
                match branch {
                    Some(branch) => branch.execute(ctx)?,
                    None => ctx.set_value(None),
                }
            }
            Expression::Switch(s) => {
                let input = ctx.value().cloned();
                if let Some(value) = &input {
                    let key = value
                        .as_str()
                        .ok_or_else(|| unexpected_input("string", &value.data_type()))?;
                    if let Some(branch) = s.case(key).or(s.default.as_deref()) {
                        branch.execute(ctx)?;
                    }
                }
                ctx.set_value(input);
            }
            Expression::SelectInput(s) => {
                let input = ctx.value().cloned();
                for (field, exp) in &s.cases {
                    if ctx.has_input(field)? {
                        let value = ctx.input_value(field)?;
                        execute_from(exp, value, ctx)?;
                        break;
                    }
                }
                ctx.set_value(input);
            }
            Expression::Guard(s) => {
                if guard_admits(s, ctx)? {
                    s.inner.execute(ctx)?;
                } else {
                    tracing::debug!(expression = %s.inner, "guard skipped, inputs not present");
                    ctx.set_value(None);
                }
            }
            Expression::Paren(inner) => inner.execute(ctx)?,
            Expression::Cat(s) => {
                let input = ctx.value().cloned();
                let mut parts = Vec::with_capacity(s.children.len());
                for child in &s.children {
                    match execute_from(child, input.clone(), ctx)? {
                        Some(value) => parts.push(value),
                        None => {
                            ctx.set_value(None);
                            return Ok(());
                        }
                    }
                }
                ctx.set_value(Some(concatenate(&parts)));
            }
            Expression::Arithmetic(s) => {
                let input = ctx.value().cloned();
                let left = execute_from(&s.left, input.clone(), ctx)?;
                let right = execute_from(&s.right, input, ctx)?;
                let result = match (left, right) {
                    (Some(left), Some(right)) => Some(arith::evaluate(&left, &right, s.op)?),
                    _ => None,
                };
                ctx.set_value(result);
            }
            Expression::Choice(s) => {
                let input = ctx.value().cloned();
                let mut result = None;
                for alt in &s.alternatives {
                    result = execute_from(alt, input.clone(), ctx)?;
                    if result.is_some() {
                        break;
                    }
                }
                ctx.set_value(result);
            }
        }
        Ok(())
    }
}

/// Run `exp` starting from `input`, returning its result.
fn execute_from(
    exp: &Expression,
    input: Option<Value>,
    ctx: &mut ExecutionContext<'_>,
) -> ExecResult<Option<Value>> {
    ctx.set_value(input);
    exp.execute(ctx)?;
    Ok(ctx.take_value())
}

fn any_present(ctx: &ExecutionContext<'_>, fields: &InputFields) -> ExecResult<bool> {
    for field in fields {
        if ctx.has_input(field)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// A complete document always runs the guarded expression. A partial
/// update runs it only when every field it reads is part of the update.
fn guard_admits(guard: &GuardExpr, ctx: &ExecutionContext<'_>) -> ExecResult<bool> {
    if ctx.is_complete() {
        return Ok(true);
    }
    if guard.inputs.is_empty() {
        return Ok(false);
    }
    for field in &guard.inputs {
        if !ctx.has_input(field)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn for_each(inner: &Expression, value: Value, ctx: &mut ExecutionContext<'_>) -> ExecResult<Value> {
    match value {
        Value::Array(array) => {
            let items = map_items(inner, array.items().iter().cloned(), ctx)?;
            let element =
                first_type(&items).unwrap_or_else(|| mapped_type(inner, array.element_type()));
            Ok(ArrayValue::new(element, items).into())
        }
        Value::WeightedSet(set) => {
            let mut out: Option<WeightedSetValue> = None;
            for (item, weight) in set.entries() {
                if let Some(mapped) = execute_from(inner, Some(item.clone()), ctx)? {
                    out.get_or_insert_with(|| WeightedSetValue::new(mapped.data_type()))
                        .insert(mapped, *weight);
                }
            }
            Ok(out
                .unwrap_or_else(|| WeightedSetValue::new(mapped_type(inner, set.element_type())))
                .into())
        }
        Value::Map(map) => {
            let mut out: Option<MapValue> = None;
            for (key, item) in map.entries() {
                if let Some(mapped) = execute_from(inner, Some(item.clone()), ctx)? {
                    out.get_or_insert_with(|| {
                        MapValue::new(map.key_type().clone(), mapped.data_type())
                    })
                    .insert(key.clone(), mapped);
                }
            }
            Ok(out
                .unwrap_or_else(|| {
                    MapValue::new(map.key_type().clone(), mapped_type(inner, map.value_type()))
                })
                .into())
        }
        Value::Struct(mut st) => {
            let ty = st.struct_type().clone();
            for (index, field) in ty.fields().iter().enumerate() {
                let current = st.field_at(index).cloned();
                let mapped = execute_from(inner, current, ctx)?;
                if let Some(mapped) = &mapped {
                    if !mapped.conforms_to(field.data_type()) {
                        return Err(struct_field_rejected(
                            field.name(),
                            field.data_type(),
                            &mapped.data_type(),
                        ));
                    }
                }
                st.set_field_at(index, mapped);
            }
            Ok(Value::Struct(st))
        }
        other => Err(unexpected_input(
            "array, struct, weighted-set, or map",
            &other.data_type(),
        )),
    }
}

/// Map every item through `inner`, dropping absent results.
fn map_items(
    inner: &Expression,
    items: impl Iterator<Item = Value>,
    ctx: &mut ExecutionContext<'_>,
) -> ExecResult<Vec<Value>> {
    let mut out = Vec::new();
    for item in items {
        if let Some(mapped) = execute_from(inner, Some(item), ctx)? {
            out.push(mapped);
        }
    }
    Ok(out)
}

fn first_type(items: &[Value]) -> Option<DataType> {
    items.first().map(Value::data_type)
}

/// Element type a collection gets when no item produced a value to take it
/// from: the body's static output for `element`, or `element` itself.
fn mapped_type(inner: &Expression, element: &DataType) -> DataType {
    if let Some(created) = inner.created_output_type().filter(DataType::is_resolved) {
        return created;
    }
    let no_fields = DocumentSchema::new();
    let ctx = VerificationContext::new(&no_fields);
    match inner.set_input_type(Some(element), &ctx) {
        Ok(Some(ty)) if ty.is_resolved() => ty,
        _ => element.clone(),
    }
}

/// Concatenate evaluated parts. Collections of one shape with compatible
/// elements merge into one collection; anything else joins as text.
fn concatenate(parts: &[Value]) -> Value {
    let types: Vec<DataType> = parts.iter().map(Value::data_type).collect();
    match concat_type(&types) {
        DataType::Array(element) => {
            let items = parts
                .iter()
                .filter_map(Value::as_array)
                .flat_map(|a| a.items().iter().cloned())
                .collect();
            ArrayValue::new(*element, items).into()
        }
        DataType::WeightedSet(element) => {
            let mut out = WeightedSetValue::new(*element);
            for set in parts.iter().filter_map(Value::as_weighted_set) {
                for (item, weight) in set.entries() {
                    out.insert(item.clone(), *weight);
                }
            }
            out.into()
        }
        _ => Value::string(parts.iter().map(ToString::to_string).collect::<String>()),
    }
}

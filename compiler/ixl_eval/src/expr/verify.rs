//! Verification: one static pass over the current type.

use ixl_types::DataType;

use super::propagate::{accepts, arithmetic_type};
use super::{concat_type, merge_branches, merge_resolved_outputs, Expression};
use crate::context::VerificationContext;
use crate::errors::{
    concatenate_null, conflicting_variable_types, missing_input, missing_output, not_iterable,
    output_field_mismatch, struct_field_mismatch, type_mismatch, unknown_field, unknown_variable,
    unresolved_input, unresolved_output, VerificationError, VerificationErrorKind, VerifyResult,
};
use crate::stack::ensure_sufficient_stack;

impl Expression {
    /// Verify this node against the current type of `ctx`. On success the
    /// current type is the node's output type.
    pub fn verify(&self, ctx: &mut VerificationContext<'_>) -> VerifyResult<()> {
        ensure_sufficient_stack(|| {
            tracing::trace!(expression = %self, input = ?ctx.current_type(), "verify");
            let owned = self.owns_type_checks();
            if owned {
                self.verify_input(ctx.current_type())
                    .map_err(|kind| VerificationError::new(self, kind))?;
            }
            self.verify_node(ctx)?;
            if owned {
                self.verify_output(ctx.current_type())
                    .map_err(|kind| VerificationError::new(self, kind))?;
            }
            Ok(())
        })
    }

    fn verify_input(&self, input: Option<&DataType>) -> Result<(), VerificationErrorKind> {
        let Some(required) = self.required_input_type() else {
            return Ok(());
        };
        let Some(input) = input else {
            return Err(missing_input(&required));
        };
        if !input.is_resolved() {
            return Err(unresolved_input());
        }
        if !accepts(&required, input) {
            return Err(type_mismatch(&required, input));
        }
        Ok(())
    }

    fn verify_output(&self, output: Option<&DataType>) -> Result<(), VerificationErrorKind> {
        let Some(created) = self.created_output_type() else {
            return Ok(());
        };
        let Some(output) = output else {
            return Err(missing_output());
        };
        if !output.is_resolved() {
            return Err(unresolved_output());
        }
        if created.is_resolved() && !created.is_assignable_from(output) {
            return Err(type_mismatch(&created, output));
        }
        Ok(())
    }

    fn verify_node(&self, ctx: &mut VerificationContext<'_>) -> VerifyResult<()> {
        let fail = |kind| VerificationError::new(self, kind);
        match self {
            Expression::Constant(value) => ctx.set_current_type(Some(value.data_type())),
            Expression::This => {}
            Expression::Input(field) => {
                let ty = ctx
                    .input_type(field)
                    .ok_or_else(|| fail(unknown_field(field)))?;
                ctx.set_current_type(Some(ty));
            }
            Expression::Output { field, .. } => {
                let ty = ctx
                    .output_type(field)
                    .ok_or_else(|| fail(unknown_field(field)))?;
                if let Some(current) = ctx.current_type() {
                    if !accepts(&ty, current) {
                        return Err(fail(output_field_mismatch(field, &ty, current)));
                    }
                }
            }
            Expression::GetVar(name) => {
                let ty = ctx
                    .variable_type(name)
                    .cloned()
                    .ok_or_else(|| fail(unknown_variable(name)))?;
                ctx.set_current_type(Some(ty));
            }
            Expression::SetVar(name) => {
                if let Some(current) = ctx.current_type().cloned() {
                    if let Some(existing) = ctx.variable_type(name) {
                        if *existing != current {
                            return Err(fail(conflicting_variable_types(
                                name, existing, &current,
                            )));
                        }
                    }
                    ctx.set_variable_type(name, current);
                }
            }
            Expression::Operation(call) => {
                if let Some(created) = call.created_output_type() {
                    let output = match ctx.current_type() {
                        Some(input) => call.output_type_for(input).map_err(fail)?,
                        None => Some(created),
                    };
                    ctx.set_current_type(output);
                }
            }
            Expression::Statement(s) => {
                for child in &s.children {
                    child.verify(ctx)?;
                }
            }
            Expression::Script(s) => {
                let input = ctx.current_type().cloned();
                let mut outputs = Vec::with_capacity(s.statements.len());
                for statement in &s.statements {
                    ctx.set_current_type(input.clone());
                    for child in &statement.children {
                        child.verify(ctx)?;
                    }
                    outputs.push(ctx.current_type().cloned());
                }
                let merged = outputs
                    .iter()
                    .map(Option::as_ref)
                    .collect::<Option<Vec<_>>>()
                    .and_then(|types| merge_resolved_outputs(types.into_iter()));
                ctx.set_current_type(merged.or(input));
            }
            Expression::ForEach(inner) => {
                let output = match ctx.current_type().cloned() {
                    Some(collection @ (DataType::Array(_) | DataType::WeightedSet(_))) => {
                        let element = collection.element_type().cloned();
                        let produced = verify_from(inner, element.clone(), ctx)?;
                        produced
                            .or(element)
                            .and_then(|e| collection.with_element_type(e))
                    }
                    Some(DataType::Map(key, value)) => {
                        let value = *value;
                        let produced = verify_from(inner, Some(value.clone()), ctx)?;
                        Some(DataType::map(*key, produced.unwrap_or(value)))
                    }
                    Some(DataType::Struct(st)) => {
                        for field in st.fields() {
                            let expected = field.data_type();
                            let produced = verify_from(inner, Some(expected.clone()), ctx)?;
                            if produced.as_ref() != Some(expected) {
                                return Err(fail(struct_field_mismatch(
                                    field.name(),
                                    expected,
                                    produced.as_ref(),
                                )));
                            }
                        }
                        Some(DataType::Struct(st))
                    }
                    // The element type is only known once a value arrives.
                    Some(wildcard) if wildcard.is_wildcard() => Some(wildcard),
                    Some(other) => return Err(fail(not_iterable(&other))),
                    None => None,
                };
                ctx.set_current_type(output);
            }
            Expression::IfThen(s) => {
                let input = ctx.current_type().cloned();
                verify_from(&s.left, input.clone(), ctx)?;
                verify_from(&s.right, input.clone(), ctx)?;
                let t = verify_from(&s.if_true, input.clone(), ctx)?;
                let output = match &s.if_false {
                    None => t,
                    Some(if_false) => {
                        let f = verify_from(if_false, input, ctx)?;
                        merge_branches(t, f).map_err(fail)?
                    }
                };
                ctx.set_current_type(output);
            }
            Expression::Switch(s) => {
                let input = ctx.current_type().cloned();
                let branches = s.cases.iter().map(|(_, exp)| exp).chain(s.default.as_deref());
                for exp in branches {
                    verify_from(exp, Some(DataType::String), ctx)?;
                }
                ctx.set_current_type(input);
            }
            Expression::SelectInput(s) => {
                let input = ctx.current_type().cloned();
                for (field, exp) in &s.cases {
                    let ty = ctx
                        .input_type(field)
                        .ok_or_else(|| fail(unknown_field(field)))?;
                    verify_from(exp, Some(ty), ctx)?;
                }
                ctx.set_current_type(input);
            }
            Expression::Guard(s) => s.inner.verify(ctx)?,
            Expression::Paren(inner) => inner.verify(ctx)?,
            Expression::Cat(s) => {
                let input = ctx.current_type().cloned();
                let mut types = Vec::with_capacity(s.children.len());
                for child in &s.children {
                    let ty = verify_from(child, input.clone(), ctx)?
                        .ok_or_else(|| fail(concatenate_null(child)))?;
                    types.push(ty);
                }
                ctx.set_current_type(Some(concat_type(&types)));
            }
            Expression::Arithmetic(s) => {
                let input = ctx.current_type().cloned();
                let left = verify_from(&s.left, input.clone(), ctx)?;
                let right = verify_from(&s.right, input, ctx)?;
                let ty = arithmetic_type(left.as_ref(), right.as_ref()).map_err(fail)?;
                ctx.set_current_type(Some(ty));
            }
            Expression::Choice(s) => {
                let input = ctx.current_type().cloned();
                let mut merged = None;
                for alt in &s.alternatives {
                    let ty = verify_from(alt, input.clone(), ctx)?;
                    merged = merge_branches(merged, ty).map_err(fail)?;
                }
                ctx.set_current_type(merged);
            }
        }
        Ok(())
    }
}

/// Verify `exp` starting from `input`, returning its output type.
fn verify_from(
    exp: &Expression,
    input: Option<DataType>,
    ctx: &mut VerificationContext<'_>,
) -> VerifyResult<Option<DataType>> {
    ctx.set_current_type(input);
    exp.verify(ctx)?;
    Ok(ctx.current_type().cloned())
}

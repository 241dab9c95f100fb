//! Static type propagation.
//!
//! [`Expression::set_input_type`] pushes a candidate input type forward and
//! returns the type the node hands downstream. [`Expression::set_output_type`]
//! pulls a downstream requirement backward and returns what the node needs
//! on its input. Neither touches the current type of the context; both only
//! consult its field and variable declarations.
//!
//! `None` means "no type flows here". An `Unresolved` type is treated as
//! unknown and never reported as a mismatch.

use ixl_types::DataType;

use super::{concat_type, merge_branches, merge_resolved_outputs, Expression};
use crate::context::VerificationContext;
use crate::errors::{
    concatenate_null, not_iterable, not_numeric, type_mismatch, unknown_field, VerificationError,
    VerificationErrorKind, VerifyResult,
};

impl Expression {
    /// Forward propagation: the output type for `input`.
    pub fn set_input_type(
        &self,
        input: Option<&DataType>,
        ctx: &VerificationContext<'_>,
    ) -> VerifyResult<Option<DataType>> {
        let fail = |kind| VerificationError::new(self, kind);
        match self {
            Expression::Statement(s) => pipe_forward(&s.children, input, ctx),
            Expression::Script(s) => {
                let mut results = Vec::with_capacity(s.statements.len());
                for statement in &s.statements {
                    results.push(pipe_forward(&statement.children, input, ctx)?);
                }
                let merged = results
                    .iter()
                    .map(Option::as_ref)
                    .collect::<Option<Vec<_>>>()
                    .and_then(|types| merge_resolved_outputs(types.into_iter()));
                Ok(merged.or_else(|| input.cloned()))
            }
            Expression::Paren(inner) => inner.set_input_type(input, ctx),
            Expression::Guard(s) => s.inner.set_input_type(input, ctx),
            Expression::ForEach(inner) => {
                check_input(self.required_input_type().as_ref(), input).map_err(fail)?;
                let Some(input) = input else {
                    return Ok(None);
                };
                match input {
                    DataType::Array(element) | DataType::WeightedSet(element) => {
                        let produced = inner.set_input_type(Some(&**element), ctx)?;
                        let element = produced.unwrap_or_else(|| (**element).clone());
                        Ok(input.with_element_type(element))
                    }
                    DataType::Map(key, value) => {
                        let produced = inner.set_input_type(Some(&**value), ctx)?;
                        let value = produced.unwrap_or_else(|| (**value).clone());
                        Ok(Some(DataType::map((**key).clone(), value)))
                    }
                    DataType::Struct(_) | DataType::Any | DataType::Unresolved => {
                        Ok(Some(input.clone()))
                    }
                    other => Err(fail(not_iterable(other))),
                }
            }
            Expression::IfThen(s) => {
                s.left.set_input_type(input, ctx)?;
                s.right.set_input_type(input, ctx)?;
                let t = s.if_true.set_input_type(input, ctx)?;
                let Some(if_false) = &s.if_false else {
                    return Ok(t);
                };
                let f = if_false.set_input_type(input, ctx)?;
                merge_branches(t, f).map_err(fail)
            }
            Expression::Switch(s) => {
                check_input(self.required_input_type().as_ref(), input).map_err(fail)?;
                for (_, exp) in &s.cases {
                    exp.set_input_type(Some(&DataType::String), ctx)?;
                }
                if let Some(default) = &s.default {
                    default.set_input_type(Some(&DataType::String), ctx)?;
                }
                Ok(input.cloned())
            }
            Expression::SelectInput(s) => {
                for (field, exp) in &s.cases {
                    let ty = ctx
                        .input_type(field)
                        .ok_or_else(|| fail(unknown_field(field)))?;
                    exp.set_input_type(Some(&ty), ctx)?;
                }
                Ok(input.cloned())
            }
            Expression::Cat(s) => {
                let mut types = Vec::with_capacity(s.children.len());
                for child in &s.children {
                    let ty = child
                        .set_input_type(input, ctx)?
                        .ok_or_else(|| fail(concatenate_null(child)))?;
                    if !ty.is_resolved() {
                        return Ok(Some(DataType::Unresolved));
                    }
                    types.push(ty);
                }
                Ok(Some(concat_type(&types)))
            }
            Expression::Arithmetic(s) => {
                let l = s.left.set_input_type(input, ctx)?;
                let r = s.right.set_input_type(input, ctx)?;
                arithmetic_type(l.as_ref(), r.as_ref()).map(Some).map_err(fail)
            }
            Expression::Choice(s) => {
                let mut merged = None;
                for alt in &s.alternatives {
                    let ty = alt.set_input_type(input, ctx)?;
                    merged = merge_branches(merged, ty).map_err(fail)?;
                }
                Ok(merged)
            }
            Expression::Constant(_)
            | Expression::This
            | Expression::Input(_)
            | Expression::Output { .. }
            | Expression::GetVar(_)
            | Expression::SetVar(_)
            | Expression::Operation(_) => self.forward_leaf(input, ctx).map_err(fail),
        }
    }

    /// Backward propagation: the input type needed to produce `output`.
    pub fn set_output_type(
        &self,
        output: Option<&DataType>,
        ctx: &VerificationContext<'_>,
    ) -> VerifyResult<Option<DataType>> {
        match self {
            Expression::Statement(s) => pipe_backward(&s.children, output, ctx),
            Expression::Script(s) => {
                for statement in &s.statements {
                    pipe_backward(&statement.children, output, ctx)?;
                }
                Ok(s.required.clone())
            }
            Expression::Paren(inner) => inner.set_output_type(output, ctx),
            Expression::Guard(s) => s.inner.set_output_type(output, ctx),
            Expression::IfThen(s) => {
                s.if_true.set_output_type(output, ctx)?;
                if let Some(if_false) = &s.if_false {
                    if_false.set_output_type(output, ctx)?;
                }
                Ok(s.required.clone())
            }
            _ => self
                .backward_leaf(output)
                .map_err(|kind| VerificationError::new(self, kind)),
        }
    }

    fn forward_leaf(
        &self,
        input: Option<&DataType>,
        ctx: &VerificationContext<'_>,
    ) -> Result<Option<DataType>, VerificationErrorKind> {
        check_input(self.required_input_type().as_ref(), input)?;
        match self {
            Expression::Input(field) => ctx
                .input_type(field)
                .map(Some)
                .ok_or_else(|| unknown_field(field)),
            Expression::GetVar(name) => Ok(Some(
                ctx.variable_type(name)
                    .cloned()
                    .unwrap_or(DataType::Unresolved),
            )),
            Expression::Operation(call) => match (call.created_output_type(), input) {
                (Some(DataType::Unresolved), Some(input)) if input.is_resolved() => {
                    call.output_type_for(input)
                }
                (Some(created), _) => Ok(Some(created)),
                (None, input) => Ok(input.cloned()),
            },
            _ => Ok(self.created_output_type().or_else(|| input.cloned())),
        }
    }

    /// Backward rule for nodes that do not forward the requirement to a
    /// child. A node creating its own output checks that output and needs
    /// only its own input; a pass-through node needs both its own
    /// requirement and the downstream one.
    fn backward_leaf(
        &self,
        output: Option<&DataType>,
    ) -> Result<Option<DataType>, VerificationErrorKind> {
        let required = self.required_input_type();
        match self.created_output_type() {
            Some(created) => {
                if let Some(output) = output {
                    let comparable = output.is_resolved() && created.is_resolved();
                    if comparable && !output.is_assignable_from(&created) {
                        return Err(type_mismatch(output, &created));
                    }
                }
                Ok(required)
            }
            None => match (required, output) {
                (Some(r), Some(o)) if r.is_resolved() && o.is_resolved() => {
                    if r.is_assignable_from(o) {
                        Ok(Some(o.clone()))
                    } else if o.is_assignable_from(&r) {
                        Ok(Some(r))
                    } else {
                        Err(type_mismatch(&r, o))
                    }
                }
                (Some(r), _) => Ok(Some(r)),
                (None, o) => Ok(o.cloned()),
            },
        }
    }
}

fn pipe_forward(
    children: &[Expression],
    input: Option<&DataType>,
    ctx: &VerificationContext<'_>,
) -> VerifyResult<Option<DataType>> {
    let mut ty = input.cloned();
    for child in children {
        ty = child.set_input_type(ty.as_ref(), ctx)?;
    }
    Ok(ty)
}

fn pipe_backward(
    children: &[Expression],
    output: Option<&DataType>,
    ctx: &VerificationContext<'_>,
) -> VerifyResult<Option<DataType>> {
    let mut ty = output.cloned();
    for child in children.iter().rev() {
        ty = child.set_output_type(ty.as_ref(), ctx)?;
    }
    Ok(ty)
}

/// Check a candidate input against a requirement. Absent and unresolved
/// inputs pass: propagation does not demand presence.
fn check_input(
    required: Option<&DataType>,
    input: Option<&DataType>,
) -> Result<(), VerificationErrorKind> {
    match (required, input) {
        (Some(r), Some(i)) if i.is_resolved() && !accepts(r, i) => Err(type_mismatch(r, i)),
        _ => Ok(()),
    }
}

/// Whether a node requiring `required` accepts a value typed `input`.
///
/// A wildcard input that could hold a `required` value is accepted; the
/// concrete value is checked at run time.
pub(super) fn accepts(required: &DataType, input: &DataType) -> bool {
    required.is_assignable_from(input)
        || (input.is_wildcard() && input.is_assignable_from(required))
}

/// Result type of an arithmetic node over operand types. Unresolved
/// operands give an unresolved result, a wildcard operand a wildcard one.
pub(super) fn arithmetic_type(
    left: Option<&DataType>,
    right: Option<&DataType>,
) -> Result<DataType, VerificationErrorKind> {
    let numeric = |ty: Option<&DataType>| {
        ty.is_some_and(|t| t.is_numeric() || *t == DataType::AnyNumeric || !t.is_resolved())
    };
    if !numeric(left) {
        return Err(not_numeric("first", left));
    }
    if !numeric(right) {
        return Err(not_numeric("second", right));
    }
    match (left, right) {
        (Some(l), Some(r)) if l.is_resolved() && r.is_resolved() => {
            Ok(l.promote(r).unwrap_or(DataType::AnyNumeric))
        }
        _ => Ok(DataType::Unresolved),
    }
}

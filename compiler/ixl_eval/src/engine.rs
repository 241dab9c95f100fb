//! Verified expression handles.
//!
//! A tree is verified once, against the field types of a document schema,
//! and then executed for every document that flows through the pipeline.
//! [`VerifiedExpression`] is the only way to get from the first step to the
//! second, so an unverified tree never reaches execution.

use std::sync::Arc;

use ixl_types::DataType;
use ixl_value::Value;

use crate::adapter::{FieldTypeAdapter, FieldValueAdapter};
use crate::context::{ExecutionContext, VerificationContext};
use crate::errors::{ExecResult, VerifyResult};
use crate::expr::Expression;

/// An expression tree that passed verification.
///
/// Cloning shares the tree. The handle holds no per-call state, so one
/// instance can be executed from many threads at once, each call with its
/// own adapter.
#[derive(Clone, Debug)]
pub struct VerifiedExpression {
    expression: Arc<Expression>,
    input_type: Option<DataType>,
    output_type: Option<DataType>,
}

impl VerifiedExpression {
    /// Verify `expression` against `field_types`, starting from
    /// `input_type` (`None` when the expression receives no value).
    #[tracing::instrument(level = "debug", skip_all, fields(expression = %expression))]
    pub fn verify(
        expression: Expression,
        field_types: &dyn FieldTypeAdapter,
        input_type: Option<DataType>,
    ) -> VerifyResult<Self> {
        let mut ctx = VerificationContext::new(field_types).with_input_type(input_type.clone());
        if let Err(err) = expression.verify(&mut ctx) {
            tracing::debug!(%err, "expression rejected");
            return Err(err);
        }
        let output_type = ctx.current_type().cloned();
        tracing::debug!(output = ?output_type, "expression admitted");
        Ok(VerifiedExpression {
            expression: Arc::new(expression),
            input_type,
            output_type,
        })
    }

    pub fn expression(&self) -> &Expression {
        &self.expression
    }

    pub fn input_type(&self) -> Option<&DataType> {
        self.input_type.as_ref()
    }

    /// Type of the value [`execute`](Self::execute) returns.
    pub fn output_type(&self) -> Option<&DataType> {
        self.output_type.as_ref()
    }

    /// Evaluate against one document or update, returning the final value.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn execute(&self, adapter: &mut dyn FieldValueAdapter) -> ExecResult<Option<Value>> {
        let mut ctx = ExecutionContext::new(adapter);
        self.execute_in(&mut ctx)
    }

    /// Evaluate in a caller-built context, e.g. one with a fixed language
    /// or a starting value.
    pub fn execute_in(&self, ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
        self.expression.execute(ctx)?;
        Ok(ctx.value().cloned())
    }
}

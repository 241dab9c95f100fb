//! Leaf operations.
//!
//! Leaf transformations (case conversion, codecs, type conversion, ...) are
//! not expression kinds of their own. Each is an [`Operation`] in an
//! [`OperationRegistry`]; an `Expression::Operation` node holds a shared
//! handle to it plus the literal arguments it was written with.

mod convert;
mod encoding;
mod language;
mod string;
mod time;

use std::fmt;
use std::sync::Arc;

use ixl_types::DataType;
use ixl_value::Value;
use rustc_hash::FxHashMap;

use crate::context::ExecutionContext;
use crate::errors::{
    arity_mismatch, invalid_argument, type_mismatch, unexpected_input, unknown_operation,
    ExecResult, VerificationError, VerificationErrorKind, VerifyResult,
};
use crate::expr::Expression;

/// Runtime body of an operation: reads the current value from the context
/// and returns the new one.
pub type ExecuteFn = fn(&[Value], &mut ExecutionContext<'_>) -> ExecResult<Option<Value>>;

/// Output type for a given input type, for operations whose output depends
/// on their input (`to_array` produces `array<input>`).
pub type VerifyFn = fn(&[Value], &DataType) -> Result<DataType, VerificationErrorKind>;

/// Extra validation of literal arguments, run when a call is constructed.
pub type ArgsFn = fn(&str, &[Value]) -> Result<(), VerificationErrorKind>;

/// A registered leaf operation.
#[derive(Clone, Debug)]
pub struct Operation {
    name: String,
    required: Option<DataType>,
    created: Option<DataType>,
    arg_types: Vec<DataType>,
    execute: ExecuteFn,
    verify: Option<VerifyFn>,
    check_args: Option<ArgsFn>,
}

impl Operation {
    /// A pass-through operation that needs no input.
    pub fn new(name: impl Into<String>, execute: ExecuteFn) -> Self {
        Operation {
            name: name.into(),
            required: None,
            created: None,
            arg_types: Vec::new(),
            execute,
            verify: None,
            check_args: None,
        }
    }

    /// Require an input of type `ty`.
    #[must_use]
    pub fn requires(mut self, ty: DataType) -> Self {
        self.required = Some(ty);
        self
    }

    /// Produce a value of type `ty`. `Unresolved` defers the type to the
    /// verify hook.
    #[must_use]
    pub fn creates(mut self, ty: DataType) -> Self {
        self.created = Some(ty);
        self
    }

    /// Declare the literal arguments, one type per argument.
    #[must_use]
    pub fn args(mut self, arg_types: Vec<DataType>) -> Self {
        self.arg_types = arg_types;
        self
    }

    #[must_use]
    pub fn verify_with(mut self, verify: VerifyFn) -> Self {
        self.verify = Some(verify);
        self
    }

    #[must_use]
    pub fn check_args_with(mut self, check: ArgsFn) -> Self {
        self.check_args = Some(check);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn required_input_type(&self) -> Option<&DataType> {
        self.required.as_ref()
    }

    pub fn created_output_type(&self) -> Option<&DataType> {
        self.created.as_ref()
    }

    pub fn arity(&self) -> usize {
        self.arg_types.len()
    }
}

/// An operation applied to its literal arguments.
#[derive(Clone, Debug)]
pub struct OperationCall {
    op: Arc<Operation>,
    args: Vec<Value>,
}

impl OperationCall {
    /// Bind `args` to `op`, checking count, types and any operation-specific
    /// constraints.
    pub fn new(op: Arc<Operation>, args: Vec<Value>) -> VerifyResult<Self> {
        let call = OperationCall { op, args };
        call.check_args()
            .map_err(|kind| VerificationError::new(&call, kind))?;
        Ok(call)
    }

    fn check_args(&self) -> Result<(), VerificationErrorKind> {
        let op = &self.op;
        if self.args.len() != op.arity() {
            return Err(arity_mismatch(&op.name, op.arity(), self.args.len()));
        }
        for (arg, ty) in self.args.iter().zip(&op.arg_types) {
            if !arg.conforms_to(ty) {
                return Err(type_mismatch(ty, &arg.data_type()));
            }
        }
        match op.check_args {
            Some(check) => check(&op.name, &self.args),
            None => Ok(()),
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.op
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn required_input_type(&self) -> Option<DataType> {
        self.op.required.clone()
    }

    pub fn created_output_type(&self) -> Option<DataType> {
        self.op.created.clone()
    }

    /// Output type for a known input type.
    pub fn output_type_for(
        &self,
        input: &DataType,
    ) -> Result<Option<DataType>, VerificationErrorKind> {
        match self.op.verify {
            Some(verify) => verify(&self.args, input).map(Some),
            None => Ok(self.op.created.clone()),
        }
    }

    pub fn execute(&self, ctx: &mut ExecutionContext<'_>) -> ExecResult<Option<Value>> {
        (self.op.execute)(&self.args, ctx)
    }
}

impl PartialEq for OperationCall {
    fn eq(&self, other: &Self) -> bool {
        (Arc::ptr_eq(&self.op, &other.op) || self.op.name == other.op.name)
            && self.args == other.args
    }
}

impl fmt::Display for OperationCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.op.name)?;
        for arg in &self.args {
            match arg {
                Value::Str(s) => write!(f, " \"{}\"", s.as_str())?,
                other => write!(f, " {other}")?,
            }
        }
        Ok(())
    }
}

/// Named leaf operations available to expression trees.
///
/// Built once at startup, then shared read-only.
#[derive(Clone, Debug, Default)]
pub struct OperationRegistry {
    ops: FxHashMap<String, Arc<Operation>>,
}

impl OperationRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in operation.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        string::register(&mut registry);
        convert::register(&mut registry);
        encoding::register(&mut registry);
        time::register(&mut registry);
        language::register(&mut registry);
        registry
    }

    /// Add an operation, returning the one it replaces.
    pub fn register(&mut self, op: Operation) -> Option<Arc<Operation>> {
        self.ops.insert(op.name.clone(), Arc::new(op))
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Operation>> {
        self.ops.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ops.contains_key(name)
    }

    /// Build an operation node.
    pub fn call(&self, name: &str, args: Vec<Value>) -> VerifyResult<Expression> {
        let Some(op) = self.ops.get(name) else {
            return Err(VerificationError::new(name, unknown_operation(name)));
        };
        OperationCall::new(Arc::clone(op), args).map(Expression::Operation)
    }
}

// Shared helpers for the built-in bodies

/// The current value as a string slice.
fn expect_str(value: &Value) -> ExecResult<&str> {
    value
        .as_str()
        .ok_or_else(|| unexpected_input("string", &value.data_type()))
}

/// A non-negative integer argument.
fn index_arg(name: &str, value: &Value) -> Result<usize, VerificationErrorKind> {
    value
        .as_i64()
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| {
            invalid_argument(name, format!("expected a non-negative index, got {value}"))
        })
}

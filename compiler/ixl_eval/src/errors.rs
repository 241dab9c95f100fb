//! Error types for verification and execution.
//!
//! The two classes never mix: a [`VerificationError`] rejects a whole
//! expression tree before any document is seen, an [`ExecutionError`] fails a
//! single document evaluation of an already verified tree.
//!
//! Factory functions (e.g. `type_mismatch()`) are the public construction API.
//! Each kind carries the type names, field names or literals involved so the
//! rendered message never loses context.

use ixl_types::DataType;

/// Result of a verification step.
pub type VerifyResult<T> = Result<T, VerificationError>;

/// Result of an execution step.
pub type ExecResult<T> = Result<T, ExecutionError>;

// Verification

/// Typed category of a verification failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum VerificationErrorKind {
    // Input/output contract
    #[error("expected type {expected}, got type {got}")]
    TypeMismatch { expected: DataType, got: DataType },
    #[error("expected input, but no input is specified")]
    MissingInput,
    #[error("expected type {expected}, but no input is specified")]
    MissingTypedInput { expected: DataType },
    #[error("expected output, but no output is specified")]
    MissingOutput,
    #[error("failed to resolve input type")]
    UnresolvedInput,
    #[error("failed to resolve output type")]
    UnresolvedOutput,

    // Composite consistency
    #[error("operands require conflicting input types, {left} vs {right}")]
    ConflictingOperandTypes { left: DataType, right: DataType },
    #[error("statements require conflicting input types, {first} vs {second}")]
    ConflictingStatementTypes { first: DataType, second: DataType },
    #[error("branches produce conflicting output types, {first} vs {second}")]
    ConflictingOutputTypes { first: DataType, second: DataType },
    #[error("struct field '{field}' has type {expected} but expression produces {got}")]
    StructFieldMismatch {
        field: String,
        expected: DataType,
        got: String,
    },
    #[error("expected array, struct, weighted-set, or map input, got {got}")]
    NotIterable { got: DataType },
    #[error("attempting to concatenate a null value ({child})")]
    ConcatenateNull { child: String },
    #[error("the {position} argument must be a number, but has type {got}")]
    NotNumeric { position: &'static str, got: String },

    // Names
    #[error("field '{name}' not found")]
    UnknownField { name: String },
    #[error("can not assign {got} to field '{field}' which is {expected}")]
    OutputFieldMismatch {
        field: String,
        expected: DataType,
        got: DataType,
    },
    #[error("variable '{name}' not found")]
    UnknownVariable { name: String },
    #[error("attempting to assign conflicting types to variable '{name}', {existing} vs {new}")]
    ConflictingVariableTypes {
        name: String,
        existing: DataType,
        new: DataType,
    },

    // Operations
    #[error("unknown operation '{name}'")]
    UnknownOperation { name: String },
    #[error("operation '{name}' expects {expected} argument(s), got {got}")]
    ArityMismatch {
        name: String,
        expected: usize,
        got: usize,
    },
    #[error("invalid argument to '{name}': {message}")]
    InvalidArgument { name: String, message: String },
}

/// A verification failure, naming the smallest failing sub-expression.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("invalid expression '{expression}': {kind}")]
pub struct VerificationError {
    /// Textual form of the failing expression.
    pub expression: String,
    pub kind: VerificationErrorKind,
}

impl VerificationError {
    pub fn new(expression: impl ToString, kind: VerificationErrorKind) -> Self {
        VerificationError {
            expression: expression.to_string(),
            kind,
        }
    }
}

#[cold]
pub fn type_mismatch(expected: &DataType, got: &DataType) -> VerificationErrorKind {
    VerificationErrorKind::TypeMismatch {
        expected: expected.clone(),
        got: got.clone(),
    }
}

/// Missing input for a node requiring `required`.
///
/// `Any` reports the generic message, a concrete type names itself.
#[cold]
pub fn missing_input(required: &DataType) -> VerificationErrorKind {
    if *required == DataType::Any {
        VerificationErrorKind::MissingInput
    } else {
        VerificationErrorKind::MissingTypedInput {
            expected: required.clone(),
        }
    }
}

#[cold]
pub fn missing_output() -> VerificationErrorKind {
    VerificationErrorKind::MissingOutput
}

#[cold]
pub fn unresolved_input() -> VerificationErrorKind {
    VerificationErrorKind::UnresolvedInput
}

#[cold]
pub fn unresolved_output() -> VerificationErrorKind {
    VerificationErrorKind::UnresolvedOutput
}

#[cold]
pub fn conflicting_input_types(left: &DataType, right: &DataType) -> VerificationErrorKind {
    VerificationErrorKind::ConflictingOperandTypes {
        left: left.clone(),
        right: right.clone(),
    }
}

#[cold]
pub fn conflicting_statement_types(first: &DataType, second: &DataType) -> VerificationErrorKind {
    VerificationErrorKind::ConflictingStatementTypes {
        first: first.clone(),
        second: second.clone(),
    }
}

#[cold]
pub fn conflicting_output_types(first: &DataType, second: &DataType) -> VerificationErrorKind {
    VerificationErrorKind::ConflictingOutputTypes {
        first: first.clone(),
        second: second.clone(),
    }
}

/// A struct field whose value the for-each body does not map back to the
/// field's own type. `got` is `None` when the body produces nothing.
#[cold]
pub fn struct_field_mismatch(
    field: &str,
    expected: &DataType,
    got: Option<&DataType>,
) -> VerificationErrorKind {
    VerificationErrorKind::StructFieldMismatch {
        field: field.to_string(),
        expected: expected.clone(),
        got: type_name(got),
    }
}

#[cold]
pub fn not_iterable(got: &DataType) -> VerificationErrorKind {
    VerificationErrorKind::NotIterable { got: got.clone() }
}

#[cold]
pub fn concatenate_null(child: &impl ToString) -> VerificationErrorKind {
    VerificationErrorKind::ConcatenateNull {
        child: child.to_string(),
    }
}

/// `position` is "first" or "second".
#[cold]
pub fn not_numeric(position: &'static str, got: Option<&DataType>) -> VerificationErrorKind {
    VerificationErrorKind::NotNumeric {
        position,
        got: type_name(got),
    }
}

#[cold]
pub fn unknown_field(name: &str) -> VerificationErrorKind {
    VerificationErrorKind::UnknownField {
        name: name.to_string(),
    }
}

#[cold]
pub fn output_field_mismatch(
    field: &str,
    expected: &DataType,
    got: &DataType,
) -> VerificationErrorKind {
    VerificationErrorKind::OutputFieldMismatch {
        field: field.to_string(),
        expected: expected.clone(),
        got: got.clone(),
    }
}

#[cold]
pub fn unknown_variable(name: &str) -> VerificationErrorKind {
    VerificationErrorKind::UnknownVariable {
        name: name.to_string(),
    }
}

#[cold]
pub fn conflicting_variable_types(
    name: &str,
    existing: &DataType,
    new: &DataType,
) -> VerificationErrorKind {
    VerificationErrorKind::ConflictingVariableTypes {
        name: name.to_string(),
        existing: existing.clone(),
        new: new.clone(),
    }
}

#[cold]
pub fn unknown_operation(name: &str) -> VerificationErrorKind {
    VerificationErrorKind::UnknownOperation {
        name: name.to_string(),
    }
}

#[cold]
pub fn arity_mismatch(name: &str, expected: usize, got: usize) -> VerificationErrorKind {
    VerificationErrorKind::ArityMismatch {
        name: name.to_string(),
        expected,
        got,
    }
}

#[cold]
pub fn invalid_argument(name: &str, message: impl Into<String>) -> VerificationErrorKind {
    VerificationErrorKind::InvalidArgument {
        name: name.to_string(),
        message: message.into(),
    }
}

fn type_name(ty: Option<&DataType>) -> String {
    ty.map_or_else(|| "null".to_string(), ToString::to_string)
}

// Execution

/// Typed category of an execution failure.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionErrorKind {
    #[error("expected {expected} input, got {got}")]
    UnexpectedInput { expected: String, got: DataType },
    #[error("struct field '{field}' expects {expected}, got {got}")]
    StructFieldMismatch {
        field: String,
        expected: DataType,
        got: DataType,
    },
    #[error("no document adapter is attached to the execution context")]
    NoAdapter,
    #[error("field '{field}' not found")]
    UnknownField { field: String },
    #[error("can not write {got} to field '{field}' which is {expected}")]
    OutputFieldMismatch {
        field: String,
        expected: DataType,
        got: DataType,
    },

    // Arithmetic
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
    #[error("integer overflow in {operation}")]
    IntegerOverflow { operation: &'static str },

    // Leaf operations
    #[error("can not convert '{literal}' to {target}")]
    ConversionFailed { literal: String, target: DataType },
    #[error("invalid {encoding} input '{literal}'")]
    InvalidEncoding {
        encoding: &'static str,
        literal: String,
    },
    #[error("{message}")]
    OutOfRange { message: String },
}

/// A runtime failure while evaluating one document.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{kind}")]
pub struct ExecutionError {
    pub kind: ExecutionErrorKind,
}

impl From<ExecutionErrorKind> for ExecutionError {
    fn from(kind: ExecutionErrorKind) -> Self {
        ExecutionError { kind }
    }
}

/// A value of the wrong shape for a node, e.g. a non-string reaching a
/// switch. `expected` describes the accepted shapes.
#[cold]
pub fn unexpected_input(expected: &str, got: &DataType) -> ExecutionError {
    ExecutionErrorKind::UnexpectedInput {
        expected: expected.to_string(),
        got: got.clone(),
    }
    .into()
}

#[cold]
pub fn struct_field_rejected(field: &str, expected: &DataType, got: &DataType) -> ExecutionError {
    ExecutionErrorKind::StructFieldMismatch {
        field: field.to_string(),
        expected: expected.clone(),
        got: got.clone(),
    }
    .into()
}

#[cold]
pub fn no_adapter() -> ExecutionError {
    ExecutionErrorKind::NoAdapter.into()
}

#[cold]
pub fn unknown_output_field(field: &str) -> ExecutionError {
    ExecutionErrorKind::UnknownField {
        field: field.to_string(),
    }
    .into()
}

#[cold]
pub fn output_value_rejected(field: &str, expected: &DataType, got: &DataType) -> ExecutionError {
    ExecutionErrorKind::OutputFieldMismatch {
        field: field.to_string(),
        expected: expected.clone(),
        got: got.clone(),
    }
    .into()
}

#[cold]
pub fn division_by_zero() -> ExecutionError {
    ExecutionErrorKind::DivisionByZero.into()
}

#[cold]
pub fn modulo_by_zero() -> ExecutionError {
    ExecutionErrorKind::ModuloByZero.into()
}

#[cold]
pub fn integer_overflow(operation: &'static str) -> ExecutionError {
    ExecutionErrorKind::IntegerOverflow { operation }.into()
}

#[cold]
pub fn conversion_failed(literal: impl ToString, target: &DataType) -> ExecutionError {
    ExecutionErrorKind::ConversionFailed {
        literal: literal.to_string(),
        target: target.clone(),
    }
    .into()
}

#[cold]
pub fn invalid_encoding(encoding: &'static str, literal: &str) -> ExecutionError {
    ExecutionErrorKind::InvalidEncoding {
        encoding,
        literal: literal.to_string(),
    }
    .into()
}

#[cold]
pub fn out_of_range(message: impl Into<String>) -> ExecutionError {
    ExecutionErrorKind::OutOfRange {
        message: message.into(),
    }
    .into()
}

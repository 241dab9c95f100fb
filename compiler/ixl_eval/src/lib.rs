//! Ixl Eval - verification and execution of document expressions.
//!
//! An expression is a tree of nodes that reads document fields, transforms
//! the value flowing through it and writes output fields. Trees are checked
//! once against a schema and then executed per document.
//!
//! # Architecture
//!
//! - [`Expression`]: closed enum of node kinds, built through checked
//!   constructors that derive composite types from their children
//! - [`VerificationContext`] / [`ExecutionContext`]: per-call state, the
//!   current type or value, variables and language
//! - [`FieldTypeAdapter`] / [`FieldValueAdapter`]: the document seam
//! - [`OperationRegistry`]: named leaf operations (`lowercase`, `to_int`, ...)
//! - [`VerifiedExpression`]: a tree that passed verification, shareable across
//!   worker threads
//!
//! # Errors
//!
//! [`VerificationError`] rejects a tree before use; [`ExecutionError`] fails a
//! single document. Constructors live in [`errors`].

pub mod adapter;
pub mod context;
mod engine;
pub mod errors;
pub mod expr;
pub mod language;
pub mod ops;
mod stack;

pub use adapter::{
    DocumentAdapter, DocumentSchema, FieldTypeAdapter, FieldValueAdapter, UpdateAdapter,
};
pub use context::{ExecutionContext, ExecutionContextBuilder, VerificationContext};
pub use engine::VerifiedExpression;
pub use errors::{
    ExecResult, ExecutionError, ExecutionErrorKind, VerificationError, VerificationErrorKind,
    VerifyResult,
};
pub use expr::{ArithmeticOp, Comparator, Expression, OutputKind};
pub use ixl_types::{DataType, Field, StructType};
pub use ixl_value::Value;
pub use language::{Language, LanguageDetector};
pub use ops::{Operation, OperationCall, OperationRegistry};
pub use stack::ensure_sufficient_stack;

use std::sync::Once;

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber for the engine's spans and events.
///
/// Only initializes if `RUST_LOG` is set, so embedding pipelines that
/// configure their own subscriber are left alone. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

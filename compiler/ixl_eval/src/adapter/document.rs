//! Adapter over a complete document.

use std::sync::Arc;

use ixl_value::Value;
use rustc_hash::FxHashMap;

use super::{DocumentSchema, FieldValueAdapter, OutputFields};
use crate::errors::ExecResult;

/// A full document being fed: every declared field is available, and writes
/// are collected for the caller to apply.
#[derive(Clone, Debug)]
pub struct DocumentAdapter {
    schema: Arc<DocumentSchema>,
    inputs: FxHashMap<String, Value>,
    outputs: OutputFields,
}

impl DocumentAdapter {
    pub fn new(schema: Arc<DocumentSchema>) -> Self {
        DocumentAdapter {
            schema,
            inputs: FxHashMap::default(),
            outputs: OutputFields::default(),
        }
    }

    /// Set a document field value.
    #[must_use]
    pub fn with_value(mut self, field: impl Into<String>, value: Value) -> Self {
        self.inputs.insert(field.into(), value);
        self
    }

    /// A value written by the expression.
    pub fn output(&self, field: &str) -> Option<&Value> {
        self.outputs.get(field)
    }

    /// Number of distinct fields written.
    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }
}

impl FieldValueAdapter for DocumentAdapter {
    fn input_value(&self, field: &str) -> Option<Value> {
        if !self.schema.has_field(field) {
            return None;
        }
        self.inputs.get(field).cloned()
    }

    fn has_input(&self, field: &str) -> bool {
        self.schema.has_field(field)
    }

    fn set_output_value(&mut self, field: &str, value: Value) -> ExecResult<()> {
        self.outputs.write(&self.schema, field, value)
    }
}

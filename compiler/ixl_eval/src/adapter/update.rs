//! Adapter over a partial document update.

use std::sync::Arc;

use ixl_value::Value;
use rustc_hash::FxHashMap;

use super::{DocumentSchema, FieldValueAdapter, OutputFields};
use crate::errors::ExecResult;

/// A partial update: only the fields it assigns are available.
///
/// Expressions that depend on untouched fields are skipped rather than run
/// against absent values, so an update never writes derived fields it has no
/// inputs for.
#[derive(Clone, Debug)]
pub struct UpdateAdapter {
    schema: Arc<DocumentSchema>,
    assigned: FxHashMap<String, Value>,
    outputs: OutputFields,
}

impl UpdateAdapter {
    pub fn new(schema: Arc<DocumentSchema>) -> Self {
        UpdateAdapter {
            schema,
            assigned: FxHashMap::default(),
            outputs: OutputFields::default(),
        }
    }

    /// Add a field assignment to the update.
    #[must_use]
    pub fn with_assignment(mut self, field: impl Into<String>, value: Value) -> Self {
        self.assigned.insert(field.into(), value);
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

impl FieldValueAdapter for UpdateAdapter {
    fn input_value(&self, field: &str) -> Option<Value> {
        if !self.schema.has_field(field) {
            return None;
        }
        self.assigned.get(field).cloned()
    }

    fn set_output_value(&mut self, field: &str, value: Value) -> ExecResult<()> {
        self.outputs.write(&self.schema, field, value)
    }

    fn is_complete(&self) -> bool {
        false
    }
}

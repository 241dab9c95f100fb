//! The document seam: how expressions see field types and field values.
//!
//! Verification asks a [`FieldTypeAdapter`] for declared types. Execution
//! reads and writes values through a [`FieldValueAdapter`], supplied fresh for
//! every document or update by the caller.

mod document;
mod schema;
mod update;

pub use document::DocumentAdapter;
pub use schema::DocumentSchema;
pub use update::UpdateAdapter;

use ixl_types::DataType;
use ixl_value::Value;
use rustc_hash::FxHashMap;

use crate::errors::{output_value_rejected, unknown_output_field, ExecResult};

/// Declared field types, consulted during verification.
pub trait FieldTypeAdapter {
    /// Type of a readable field, or `None` if no such field exists.
    fn input_type(&self, field: &str) -> Option<DataType>;

    /// Type of a writable field, or `None` if no such field exists.
    fn output_type(&self, field: &str) -> Option<DataType>;
}

/// Field values of the document being processed.
pub trait FieldValueAdapter {
    /// Current value of a field. Unset and unknown fields are both `None`.
    fn input_value(&self, field: &str) -> Option<Value>;

    /// Whether `field` can be read in this operation.
    ///
    /// A complete document makes every declared field available, even unset
    /// ones. A partial update makes available only the fields it touches.
    fn has_input(&self, field: &str) -> bool {
        self.input_value(field).is_some()
    }

    /// Write an output field.
    fn set_output_value(&mut self, field: &str, value: Value) -> ExecResult<()>;

    /// `true` for a full document, `false` for a partial update.
    fn is_complete(&self) -> bool {
        true
    }
}

/// Output values collected by the concrete adapters.
#[derive(Clone, Debug, Default)]
struct OutputFields {
    values: FxHashMap<String, Value>,
}

impl OutputFields {
    /// Check `value` against the schema and store it, replacing any earlier
    /// write to the same field.
    fn write(&mut self, schema: &DocumentSchema, field: &str, value: Value) -> ExecResult<()> {
        let Some(expected) = schema.output_type(field) else {
            return Err(unknown_output_field(field));
        };
        if !value.conforms_to(&expected) {
            return Err(output_value_rejected(field, &expected, &value.data_type()));
        }
        self.values.insert(field.to_string(), value);
        Ok(())
    }

    fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    fn len(&self) -> usize {
        self.values.len()
    }
}

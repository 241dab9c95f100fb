//! Declared document layout.

use ixl_types::DataType;
use rustc_hash::FxHashMap;

use super::FieldTypeAdapter;

/// The fields of a document type.
///
/// Document fields are readable and writable. Synthetic fields (derived
/// index or summary fields) are write-only: expressions produce them but can
/// never read them back.
#[derive(Clone, Debug, Default)]
pub struct DocumentSchema {
    fields: FxHashMap<String, DataType>,
    synthetic: FxHashMap<String, DataType>,
}

impl DocumentSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a document field.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.fields.insert(name.into(), data_type);
        self
    }

    /// Declare a write-only synthetic field.
    #[must_use]
    pub fn with_synthetic_field(mut self, name: impl Into<String>, data_type: DataType) -> Self {
        self.synthetic.insert(name.into(), data_type);
        self
    }

    /// Whether `name` is a readable document field.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }
}

impl FieldTypeAdapter for DocumentSchema {
    fn input_type(&self, field: &str) -> Option<DataType> {
        self.fields.get(field).cloned()
    }

    fn output_type(&self, field: &str) -> Option<DataType> {
        self.fields
            .get(field)
            .or_else(|| self.synthetic.get(field))
            .cloned()
    }
}

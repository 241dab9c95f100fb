//! Static context: the current type instead of the current value.

use ixl_types::DataType;
use rustc_hash::FxHashMap;

use crate::adapter::FieldTypeAdapter;

/// State of one verification pass over an expression tree.
///
/// The current type is `None` when no value flows at that point.
pub struct VerificationContext<'a> {
    field_types: &'a dyn FieldTypeAdapter,
    current: Option<DataType>,
    variables: FxHashMap<String, DataType>,
}

impl<'a> VerificationContext<'a> {
    pub fn new(field_types: &'a dyn FieldTypeAdapter) -> Self {
        VerificationContext {
            field_types,
            current: None,
            variables: FxHashMap::default(),
        }
    }

    /// Start verification from `input_type` instead of no input.
    #[must_use]
    pub fn with_input_type(mut self, input_type: Option<DataType>) -> Self {
        self.current = input_type;
        self
    }

    pub fn current_type(&self) -> Option<&DataType> {
        self.current.as_ref()
    }

    pub fn set_current_type(&mut self, ty: Option<DataType>) {
        self.current = ty;
    }

    pub fn variable_type(&self, name: &str) -> Option<&DataType> {
        self.variables.get(name)
    }

    pub fn set_variable_type(&mut self, name: &str, ty: DataType) {
        self.variables.insert(name.to_string(), ty);
    }

    pub fn input_type(&self, field: &str) -> Option<DataType> {
        self.field_types.input_type(field)
    }

    pub fn output_type(&self, field: &str) -> Option<DataType> {
        self.field_types.output_type(field)
    }

    /// Forget the current type and all variable types.
    pub fn clear(&mut self) {
        self.current = None;
        self.variables.clear();
    }
}

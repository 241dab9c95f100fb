//! Runtime context for one document evaluation.

use std::fmt;
use std::sync::Arc;

use ixl_value::Value;
use rustc_hash::FxHashMap;

use crate::adapter::FieldValueAdapter;
use crate::errors::{no_adapter, ExecResult};
use crate::language::{Language, LanguageDetector};

/// State of one execution pass: the current value, variables and language.
///
/// Variables live for the whole evaluation. They are not scoped to the
/// statement or script that set them.
pub struct ExecutionContext<'a> {
    adapter: Option<&'a mut dyn FieldValueAdapter>,
    value: Option<Value>,
    variables: FxHashMap<String, Value>,
    language: Language,
    detector: Option<Arc<dyn LanguageDetector>>,
}

impl<'a> ExecutionContext<'a> {
    /// A context reading and writing fields through `adapter`.
    pub fn new(adapter: &'a mut dyn FieldValueAdapter) -> Self {
        ExecutionContextBuilder::new().adapter(adapter).build()
    }

    pub fn builder() -> ExecutionContextBuilder<'a> {
        ExecutionContextBuilder::new()
    }

    // Current value

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn set_value(&mut self, value: Option<Value>) {
        self.value = value;
    }

    pub fn take_value(&mut self) -> Option<Value> {
        self.value.take()
    }

    // Variables

    pub fn variable(&self, name: &str) -> Option<&Value> {
        self.variables.get(name)
    }

    /// Bind a variable. `None` unbinds it.
    pub fn set_variable(&mut self, name: &str, value: Option<Value>) {
        match value {
            Some(value) => {
                self.variables.insert(name.to_string(), value);
            }
            None => {
                self.variables.remove(name);
            }
        }
    }

    // Language

    /// The explicitly set or previously resolved language.
    pub fn language(&self) -> &Language {
        &self.language
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
    }

    /// The language of the text being processed.
    ///
    /// An explicit language wins. Otherwise the detector, if any, is asked
    /// about the current string value and a successful guess is remembered
    /// for the rest of the evaluation.
    pub fn resolve_language(&mut self) -> &Language {
        if self.language.is_unknown() {
            let detected = match (&self.detector, &self.value) {
                (Some(detector), Some(Value::Str(text))) => detector.detect(text),
                _ => None,
            };
            if let Some(language) = detected {
                tracing::trace!(%language, "detected language");
                self.language = language;
            }
        }
        &self.language
    }

    /// Reset the current value and variables. The language is kept.
    pub fn clear(&mut self) {
        self.value = None;
        self.variables.clear();
    }

    // Document access

    /// Whether the adapter holds a complete document. Without an adapter
    /// there is no partial update to guard against, so this is `true`.
    pub fn is_complete(&self) -> bool {
        self.adapter.as_ref().map_or(true, |a| a.is_complete())
    }

    pub fn input_value(&self, field: &str) -> ExecResult<Option<Value>> {
        let adapter = self.adapter.as_ref().ok_or_else(no_adapter)?;
        Ok(adapter.input_value(field))
    }

    pub fn has_input(&self, field: &str) -> ExecResult<bool> {
        let adapter = self.adapter.as_ref().ok_or_else(no_adapter)?;
        Ok(adapter.has_input(field))
    }

    pub fn set_output_value(&mut self, field: &str, value: Value) -> ExecResult<()> {
        let adapter = self.adapter.as_mut().ok_or_else(no_adapter)?;
        adapter.set_output_value(field, value)
    }
}

impl Default for ExecutionContext<'_> {
    fn default() -> Self {
        ExecutionContextBuilder::new().build()
    }
}

impl fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("value", &self.value)
            .field("variables", &self.variables)
            .field("language", &self.language)
            .field("has_adapter", &self.adapter.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`ExecutionContext`].
#[derive(Default)]
pub struct ExecutionContextBuilder<'a> {
    adapter: Option<&'a mut dyn FieldValueAdapter>,
    language: Option<Language>,
    detector: Option<Arc<dyn LanguageDetector>>,
}

impl<'a> ExecutionContextBuilder<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document adapter.
    #[must_use]
    pub fn adapter(mut self, adapter: &'a mut dyn FieldValueAdapter) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Fix the language instead of detecting it.
    #[must_use]
    pub fn language(mut self, language: Language) -> Self {
        self.language = Some(language);
        self
    }

    /// Set the detector used by [`ExecutionContext::resolve_language`].
    #[must_use]
    pub fn detector(mut self, detector: Arc<dyn LanguageDetector>) -> Self {
        self.detector = Some(detector);
        self
    }

    pub fn build(self) -> ExecutionContext<'a> {
        ExecutionContext {
            adapter: self.adapter,
            value: None,
            variables: FxHashMap::default(),
            language: self.language.unwrap_or_default(),
            detector: self.detector,
        }
    }
}

//! Language tags and detection.

use std::fmt;

/// The language of the text being processed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    Unknown,
    /// A lower-cased language tag such as `en` or `zh-hans`.
    Tag(String),
}

impl Language {
    /// Parse a tag. Empty input and `un` map to [`Language::Unknown`].
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim().to_ascii_lowercase();
        if tag.is_empty() || tag == "un" {
            Language::Unknown
        } else {
            Language::Tag(tag)
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            Language::Unknown => "un",
            Language::Tag(tag) => tag,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Language::Unknown)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Guesses the language of a piece of text.
///
/// Implementations are shared between worker threads.
pub trait LanguageDetector: Send + Sync {
    /// The detected language, or `None` if the text gives no signal.
    fn detect(&self, text: &str) -> Option<Language>;
}

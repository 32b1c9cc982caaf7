//! The environment a session runs in.

pub mod locale;

pub use locale::{Country, Language, Locale};

use serde::{Deserialize, Serialize};

/// Default limit on stored text values (names, field values, results).
pub const DEFAULT_MAX_VALUE_LENGTH: usize = 640;

/// Session-wide settings. Every field has a default, so `{}` is a valid
/// environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub default_language: Language,
    #[serde(default)]
    pub allowed_languages: Vec<Language>,
    #[serde(default)]
    pub default_country: Country,
    #[serde(default = "default_max_value_length")]
    pub max_value_length: usize,
}

fn default_max_value_length() -> usize {
    DEFAULT_MAX_VALUE_LENGTH
}

impl Default for Environment {
    fn default() -> Self {
        Environment {
            default_language: Language::default(),
            allowed_languages: Vec::new(),
            default_country: Country::default(),
            max_value_length: DEFAULT_MAX_VALUE_LENGTH,
        }
    }
}

impl Environment {
    pub fn default_locale(&self) -> Locale {
        Locale::new(&self.default_language, &self.default_country)
    }

    /// Truncates `text` to `max_value_length` characters.
    pub fn truncate(&self, text: &str) -> String {
        truncate(text, self.max_value_length)
    }
}

/// Truncates to at most `max` characters.
pub fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

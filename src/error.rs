/// Error types for loading, parsing and formatting translations
use std::path::PathBuf;

use serde::Serialize;

/// Failure to turn one locale source into a table.
///
/// Load errors are collected per source and never abort a whole load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Source could not be read
    #[error("failed to read '{source_name}': {error}")]
    Io {
        source_name: String,
        #[source]
        error: std::io::Error,
    },
    /// Source is not valid UTF-8 or not a parseable document
    #[error("failed to decode '{source_name}': {reason}")]
    Decode { source_name: String, reason: String },
    /// Document parsed but an entry has the wrong shape (nested, non-string, duplicate)
    #[error("malformed entry '{key}' in '{source_name}': {reason}")]
    Malformed {
        source_name: String,
        key: String,
        reason: String,
    },
    /// Language document declares a version this crate cannot read
    #[error("'{source_name}' uses language version {found}, only version 1 is supported")]
    IncompatibleVersion { source_name: String, found: i64 },
    /// No decoder is registered for the source extension
    #[error("no decoder for '{source_name}'")]
    UnsupportedFormat { source_name: String },
    /// Locale identifier is empty or has characters outside [A-Za-z0-9_-]
    #[error("invalid locale '{locale}' for '{source_name}'")]
    InvalidLocale { source_name: String, locale: String },
    /// Another source already provided this locale
    #[error("locale '{locale}' from '{source_name}' was already loaded from '{first_source}'")]
    DuplicateLocale {
        source_name: String,
        locale: String,
        first_source: String,
    },
    /// The load deadline passed before this source finished
    #[error("timed out reading '{source_name}'")]
    TimedOut { source_name: String },
    /// Partial-result mode was satisfied before this source finished
    #[error("abandoned '{source_name}' after enough locales loaded")]
    Abandoned { source_name: String },
    /// The reading task panicked or was cancelled
    #[error("loader task for '{source_name}' failed: {reason}")]
    TaskFailed { source_name: String, reason: String },
    /// A path given for discovery does not exist
    #[error("path not found: {}", path.display())]
    NotFound { path: PathBuf },
}

impl LoadError {
    /// Name of the source (or path) this error is attributed to.
    pub fn source_name(&self) -> String {
        match self {
            LoadError::Io { source_name, .. }
            | LoadError::Decode { source_name, .. }
            | LoadError::Malformed { source_name, .. }
            | LoadError::IncompatibleVersion { source_name, .. }
            | LoadError::UnsupportedFormat { source_name }
            | LoadError::InvalidLocale { source_name, .. }
            | LoadError::DuplicateLocale { source_name, .. }
            | LoadError::TimedOut { source_name }
            | LoadError::Abandoned { source_name }
            | LoadError::TaskFailed { source_name, .. } => source_name.clone(),
            LoadError::NotFound { path } => path.display().to_string(),
        }
    }
}

/// Malformed placeholder syntax in a template. Offsets are byte positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParseError {
    #[error("unterminated placeholder opened at byte {offset}")]
    Unterminated { offset: usize },
    #[error("empty placeholder at byte {offset}")]
    EmptyName { offset: usize },
    #[error("unexpected '{{' inside placeholder opened at byte {offset}")]
    NestedOpen { offset: usize },
}

/// Failure of a single lookup/format call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("key '{key}' not found in '{requested}' or reference '{reference}'")]
    KeyNotFound {
        key: String,
        requested: String,
        reference: String,
    },
    #[error(
        "missing substitution for {} in '{key}' (resolved from '{resolved}', requested '{requested}')",
        missing.join(", ")
    )]
    MissingSubstitution {
        key: String,
        requested: String,
        resolved: String,
        fallback_used: bool,
        missing: Vec<String>,
    },
    #[error("template for '{key}' in '{resolved}' is malformed: {error}")]
    MalformedTemplate {
        key: String,
        resolved: String,
        error: ParseError,
    },
}

/// Result type for formatting calls
pub type FormatResult<T> = Result<T, FormatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_substitution_message_names_placeholders() {
        let err = FormatError::MissingSubstitution {
            key: "greet".to_string(),
            requested: "fr".to_string(),
            resolved: "en".to_string(),
            fallback_used: true,
            missing: vec!["name".to_string(), "count".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("name, count"));
        assert!(msg.contains("'en'"));
    }

    #[test]
    fn test_load_error_source_name() {
        let err = LoadError::TimedOut {
            source_name: "fr.json".to_string(),
        };
        assert_eq!(err.source_name(), "fr.json");
        assert_eq!(err.to_string(), "timed out reading 'fr.json'");
    }

    #[test]
    fn test_parse_error_display_escapes_brace() {
        let err = ParseError::NestedOpen { offset: 3 };
        assert_eq!(
            err.to_string(),
            "unexpected '{' inside placeholder opened at byte 3"
        );
    }
}

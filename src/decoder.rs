//! Decoders turning raw locale sources into flat key → template tables
//!
//! Every supported on-disk format has a [`Decoder`] implementation. All of them
//! produce the same [`DecodedTable`], so the rest of the crate never needs to
//! know where a table came from.
//!
//! | Format | Extensions | Shape |
//! |---|---|---|
//! | [`SourceFormat::LanguageV1`] | `.json` | `{"name", "code", "version": 1, "revision", "authors", "contributors", "translations": {..}}` |
//! | [`SourceFormat::FlatJson`] | `.json` | `{"@metadata": {..}, "key": "template", ..}` |
//! | [`SourceFormat::KeyValue`] | `.properties`, `.lang`, `.kv`, `.txt` | `key = template`, one per line |
//!
//! `.json` files are sniffed: documents carrying both `version` and
//! `translations` are language files, anything else is read as flat JSON.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::LoadError;

/// The only language document version this crate reads.
pub const LANGUAGE_VERSION: i64 = 1;

/// Descriptive fields carried by language documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageMetadata {
    pub name: String,
    pub revision: i64,
    pub authors: Vec<String>,
    pub contributors: Vec<String>,
}

/// Result of decoding one source.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DecodedTable {
    /// Locale declared inside the document, if the format has one
    pub locale: Option<String>,
    pub metadata: Option<LanguageMetadata>,
    pub entries: BTreeMap<String, String>,
}

/// Format selection for a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceFormat {
    /// Pick from the file extension
    #[default]
    Auto,
    /// JSON, sniffing between language documents and flat objects
    Json,
    FlatJson,
    LanguageV1,
    KeyValue,
}

impl SourceFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "json" => Some(SourceFormat::Json),
            "properties" | "lang" | "kv" | "txt" => Some(SourceFormat::KeyValue),
            _ => None,
        }
    }

    /// Decoder for a concrete format; `None` for [`SourceFormat::Auto`].
    pub fn decoder(self) -> Option<&'static dyn Decoder> {
        match self {
            SourceFormat::Auto => None,
            SourceFormat::Json => Some(&JsonDecoder),
            SourceFormat::FlatJson => Some(&FlatJsonDecoder),
            SourceFormat::LanguageV1 => Some(&LanguageFileDecoder),
            SourceFormat::KeyValue => Some(&KeyValueDecoder),
        }
    }
}

/// A capability that decodes the text of one source.
pub trait Decoder: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    fn decode(&self, source_name: &str, text: &str) -> Result<DecodedTable, LoadError>;
}

/// Decode raw bytes using `format`, falling back to the extension when `format` is `Auto`.
pub fn decode_source(
    format: SourceFormat,
    source_name: &str,
    extension: Option<&str>,
    bytes: &[u8],
) -> Result<DecodedTable, LoadError> {
    let format = match format {
        SourceFormat::Auto => extension
            .and_then(SourceFormat::from_extension)
            .ok_or_else(|| LoadError::UnsupportedFormat {
                source_name: source_name.to_string(),
            })?,
        explicit => explicit,
    };
    let decoder = format.decoder().ok_or_else(|| LoadError::UnsupportedFormat {
        source_name: source_name.to_string(),
    })?;

    let text = std::str::from_utf8(bytes).map_err(|e| LoadError::Decode {
        source_name: source_name.to_string(),
        reason: format!("invalid UTF-8: {}", e),
    })?;
    // A BOM is common in files saved by Windows editors
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    tracing::trace!(source = source_name, decoder = decoder.name(), "decoding");
    decoder.decode(source_name, text)
}

fn parse_json(source_name: &str, text: &str) -> Result<Value, LoadError> {
    serde_json::from_str(text).map_err(|e| LoadError::Decode {
        source_name: source_name.to_string(),
        reason: e.to_string(),
    })
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a nested object",
    }
}

/// Collect a JSON object into string entries, rejecting nested and non-string values.
fn string_entries(
    source_name: &str,
    object: &Map<String, Value>,
    skip_metadata: bool,
) -> Result<BTreeMap<String, String>, LoadError> {
    let mut entries = BTreeMap::new();
    for (key, value) in object {
        if skip_metadata && key.starts_with('@') {
            continue;
        }
        let Some(template) = value.as_str() else {
            return Err(LoadError::Malformed {
                source_name: source_name.to_string(),
                key: key.clone(),
                reason: format!("expected a string, found {}", describe(value)),
            });
        };
        entries.insert(key.clone(), template.to_string());
    }
    Ok(entries)
}

/// Flat JSON object of key → template. Keys starting with `@` are metadata.
pub struct FlatJsonDecoder;

impl FlatJsonDecoder {
    fn decode_value(source_name: &str, json: &Value) -> Result<DecodedTable, LoadError> {
        let object = json.as_object().ok_or_else(|| LoadError::Decode {
            source_name: source_name.to_string(),
            reason: "root must be an object".to_string(),
        })?;
        Ok(DecodedTable {
            locale: None,
            metadata: None,
            entries: string_entries(source_name, object, true)?,
        })
    }
}

impl Decoder for FlatJsonDecoder {
    fn name(&self) -> &'static str {
        "flat-json"
    }

    fn decode(&self, source_name: &str, text: &str) -> Result<DecodedTable, LoadError> {
        Self::decode_value(source_name, &parse_json(source_name, text)?)
    }
}

#[derive(Deserialize)]
struct LanguageDocument {
    name: String,
    code: String,
    revision: i64,
    authors: Vec<String>,
    contributors: Vec<String>,
    translations: Map<String, Value>,
}

const REQUIRED_FIELDS: [&str; 6] = [
    "name",
    "code",
    "revision",
    "authors",
    "contributors",
    "translations",
];

/// `1` and `1.0` are the same version.
fn integral(value: &Value) -> Option<i64> {
    value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64)
            .map(|v| v as i64)
    })
}

/// Version 1 language document with descriptive metadata and a `translations` object.
pub struct LanguageFileDecoder;

impl LanguageFileDecoder {
    fn decode_value(source_name: &str, json: Value) -> Result<DecodedTable, LoadError> {
        let version = json
            .get("version")
            .map(integral)
            .ok_or_else(|| LoadError::Decode {
                source_name: source_name.to_string(),
                reason: "language document has no 'version'".to_string(),
            })?
            .ok_or_else(|| LoadError::Decode {
                source_name: source_name.to_string(),
                reason: "'version' must be an integral number".to_string(),
            })?;
        if version != LANGUAGE_VERSION {
            return Err(LoadError::IncompatibleVersion {
                source_name: source_name.to_string(),
                found: version,
            });
        }

        if let Some(field) = REQUIRED_FIELDS.iter().find(|field| json.get(**field).is_none()) {
            return Err(LoadError::Malformed {
                source_name: source_name.to_string(),
                key: field.to_string(),
                reason: "required language field is missing".to_string(),
            });
        }

        let document: LanguageDocument =
            serde_json::from_value(json).map_err(|e| LoadError::Decode {
                source_name: source_name.to_string(),
                reason: e.to_string(),
            })?;
        let entries = string_entries(source_name, &document.translations, false)?;

        Ok(DecodedTable {
            locale: Some(document.code),
            metadata: Some(LanguageMetadata {
                name: document.name,
                revision: document.revision,
                authors: document.authors,
                contributors: document.contributors,
            }),
            entries,
        })
    }
}

impl Decoder for LanguageFileDecoder {
    fn name(&self) -> &'static str {
        "language-v1"
    }

    fn decode(&self, source_name: &str, text: &str) -> Result<DecodedTable, LoadError> {
        Self::decode_value(source_name, parse_json(source_name, text)?)
    }
}

/// JSON of either shape, told apart by the presence of `version` and `translations`.
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn name(&self) -> &'static str {
        "json"
    }

    fn decode(&self, source_name: &str, text: &str) -> Result<DecodedTable, LoadError> {
        let json = parse_json(source_name, text)?;
        let is_language_document = json
            .as_object()
            .is_some_and(|o| o.contains_key("version") && o.contains_key("translations"));
        if is_language_document {
            LanguageFileDecoder::decode_value(source_name, json)
        } else {
            FlatJsonDecoder::decode_value(source_name, &json)
        }
    }
}

static KEY_VALUE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^=\s][^=]*?)\s*=\s*(.*)$").expect("key-value line pattern is valid")
});

/// Line-oriented `key = template` files. `#` and `;` start comment lines.
pub struct KeyValueDecoder;

impl Decoder for KeyValueDecoder {
    fn name(&self) -> &'static str {
        "key-value"
    }

    fn decode(&self, source_name: &str, text: &str) -> Result<DecodedTable, LoadError> {
        let mut entries = BTreeMap::new();
        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let captures = KEY_VALUE_LINE
                .captures(line)
                .ok_or_else(|| LoadError::Malformed {
                    source_name: source_name.to_string(),
                    key: format!("line {}", index + 1),
                    reason: "expected `key = value`".to_string(),
                })?;
            let key = captures[1].to_string();
            let value = captures[2].to_string();
            if entries.contains_key(&key) {
                return Err(LoadError::Malformed {
                    source_name: source_name.to_string(),
                    key,
                    reason: format!("duplicate key on line {}", index + 1),
                });
            }
            entries.insert(key, value);
        }
        Ok(DecodedTable {
            locale: None,
            metadata: None,
            entries,
        })
    }
}

//! Message lookup with reference-locale fallback, and placeholder substitution
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use globalprogram::{Catalog, LocaleId, LocaleTable, format};
//!
//! let en = LocaleId::parse("en").unwrap();
//! let fr = LocaleId::parse("fr").unwrap();
//! let mut en_messages = LocaleTable::new();
//! en_messages.with_message("greet", "Hi {name}").with_message("bye", "Goodbye");
//! let mut fr_messages = LocaleTable::new();
//! fr_messages.with_message("greet", "Salut {name}");
//!
//! let catalog = Catalog::builder(en.clone())
//!     .with_locale(en, en_messages)
//!     .with_locale(fr.clone(), fr_messages)
//!     .build();
//!
//! let values = HashMap::from([("name".to_string(), "Ana".to_string())]);
//! assert_eq!(format(&catalog, &fr, "greet", &values).unwrap().text, "Salut Ana");
//!
//! let bye = format(&catalog, &fr, "bye", &HashMap::new()).unwrap();
//! assert_eq!(bye.text, "Goodbye");
//! assert!(bye.used_fallback());
//! ```

use std::collections::HashMap;

use crate::catalog::{Catalog, LocaleId, SharedCatalog};
use crate::error::{FormatError, FormatResult};
use crate::placeholder::{Segment, Template};

/// Placeholder name → substitution value.
pub type Substitutions = HashMap<String, String>;

/// A successfully formatted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatted {
    pub text: String,
    /// Locale whose template was used
    pub locale: LocaleId,
    /// The originally requested locale when the reference had to stand in for it
    pub fallback_from: Option<LocaleId>,
}

impl Formatted {
    pub fn used_fallback(&self) -> bool {
        self.fallback_from.is_some()
    }
}

/// Resolve the template for `key`: `locale` first, then the reference locale.
///
/// Returns the template and the locale it came from.
pub fn resolve<'a>(
    catalog: &'a Catalog,
    locale: &LocaleId,
    key: &str,
) -> FormatResult<(&'a str, &'a LocaleId)> {
    if let Some((id, table)) = catalog.locale_entry(locale) {
        if let Some(template) = table.get_message(key) {
            return Ok((template, id));
        }
    }

    let reference = catalog.reference();
    if reference != locale {
        if let Some(template) = catalog.get_message(reference, key) {
            tracing::debug!(
                key,
                requested = %locale,
                fallback = %reference,
                "using message from reference locale"
            );
            return Ok((template, reference));
        }
    }

    Err(FormatError::KeyNotFound {
        key: key.to_string(),
        requested: locale.to_string(),
        reference: reference.to_string(),
    })
}

fn parse_resolved(key: &str, template: &str, resolved: &LocaleId) -> FormatResult<Template> {
    Template::parse(template).map_err(|error| FormatError::MalformedTemplate {
        key: key.to_string(),
        resolved: resolved.to_string(),
        error,
    })
}

fn render(template: &Template, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::new();
    for segment in template.segments() {
        match segment {
            Segment::Text(text) => result.push_str(text),
            Segment::Placeholder(name) => {
                if let Some(value) = lookup(name) {
                    result.push_str(&value);
                }
            }
        }
    }
    result
}

fn formatted(resolved: &LocaleId, requested: &LocaleId, text: String) -> Formatted {
    Formatted {
        text,
        locale: resolved.clone(),
        fallback_from: (resolved != requested).then(|| requested.clone()),
    }
}

/// Format the message `key` for `locale` with named substitutions.
///
/// Every placeholder of the resolved template needs a value; values the
/// template does not use are ignored.
pub fn format(
    catalog: &Catalog,
    locale: &LocaleId,
    key: &str,
    substitutions: &Substitutions,
) -> FormatResult<Formatted> {
    let (template, resolved) = resolve(catalog, locale, key)?;
    let template = parse_resolved(key, template, resolved)?;

    let missing: Vec<String> = template
        .placeholders()
        .into_iter()
        .filter(|name| !substitutions.contains_key(*name))
        .map(str::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(FormatError::MissingSubstitution {
            key: key.to_string(),
            requested: locale.to_string(),
            resolved: resolved.to_string(),
            fallback_used: resolved != locale,
            missing,
        });
    }

    let text = render(&template, |name| substitutions.get(name).cloned());
    Ok(formatted(resolved, locale, text))
}

/// Format with positional values bound to placeholders in order of first appearance.
///
/// `"{user} sent {count} files to {user}"` binds `values[0]` to `user` and
/// `values[1]` to `count`. Surplus values are ignored.
pub fn format_positional(
    catalog: &Catalog,
    locale: &LocaleId,
    key: &str,
    values: &[&str],
) -> FormatResult<Formatted> {
    let (template, resolved) = resolve(catalog, locale, key)?;
    let template = parse_resolved(key, template, resolved)?;

    let names = template.placeholders();
    if names.len() > values.len() {
        return Err(FormatError::MissingSubstitution {
            key: key.to_string(),
            requested: locale.to_string(),
            resolved: resolved.to_string(),
            fallback_used: resolved != locale,
            missing: names[values.len()..].iter().map(|n| n.to_string()).collect(),
        });
    }

    let bound: HashMap<&str, &str> = names.into_iter().zip(values.iter().copied()).collect();
    let text = render(&template, |name| bound.get(name).map(|v| v.to_string()));
    Ok(formatted(resolved, locale, text))
}

/// The raw template for `key` with reference fallback, or the key itself when absent.
pub fn text_or_key(catalog: &Catalog, locale: &LocaleId, key: &str) -> String {
    match resolve(catalog, locale, key) {
        Ok((template, _)) => template.to_string(),
        Err(error) => {
            tracing::debug!("{}", error);
            key.to_string()
        }
    }
}

/// A selected locale bound to a shared catalog.
///
/// Each call takes a fresh catalog snapshot, so a reload is picked up by the
/// next call without disturbing one in flight.
#[derive(Debug, Clone)]
pub struct Localizer {
    catalog: SharedCatalog,
    selected: LocaleId,
}

impl Localizer {
    pub fn new(catalog: SharedCatalog, selected: LocaleId) -> Self {
        Localizer { catalog, selected }
    }

    pub fn with_locale(&mut self, selected: LocaleId) -> &mut Self {
        self.selected = selected;
        self
    }

    pub fn selected(&self) -> &LocaleId {
        &self.selected
    }

    pub fn format(&self, key: &str, substitutions: &Substitutions) -> FormatResult<Formatted> {
        format(&self.catalog.current(), &self.selected, key, substitutions)
    }

    pub fn format_positional(&self, key: &str, values: &[&str]) -> FormatResult<Formatted> {
        format_positional(&self.catalog.current(), &self.selected, key, values)
    }

    pub fn text_or_key(&self, key: &str) -> String {
        text_or_key(&self.catalog.current(), &self.selected, key)
    }

    pub fn is_translatable(&self, key: &str) -> bool {
        resolve(&self.catalog.current(), &self.selected, key).is_ok()
    }
}

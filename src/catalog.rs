use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use serde::Serialize;

use crate::decoder::LanguageMetadata;

/// A case-normalized locale identifier such as `en` or `pt-br`.
///
/// Normalization trims whitespace, lowercases, and turns `_` into `-`, so
/// `pt_BR`, `PT-br` and `pt-BR` are the same locale.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct LocaleId(String);

impl LocaleId {
    /// Normalize and validate a locale code.
    ///
    /// Returns `None` when the code is empty or contains characters other than
    /// ASCII alphanumerics, `-` and `_`.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        if code.is_empty()
            || !code
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return None;
        }
        Some(LocaleId(code.to_ascii_lowercase().replace('_', "-")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocaleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocaleId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The key → template table of one locale.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleTable {
    messages: BTreeMap<String, String>,
    metadata: Option<LanguageMetadata>,
}

impl LocaleTable {
    pub fn new() -> Self {
        LocaleTable::default()
    }

    pub fn from_messages(messages: BTreeMap<String, String>) -> Self {
        LocaleTable {
            messages,
            metadata: None,
        }
    }

    pub fn with_message(&mut self, key: &str, template: &str) -> &mut Self {
        self.messages.insert(key.to_owned(), template.to_owned());
        self
    }

    pub fn with_metadata(&mut self, metadata: LanguageMetadata) -> &mut Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn get_message(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.messages.contains_key(key)
    }

    pub fn get_messages(&self) -> &BTreeMap<String, String> {
        &self.messages
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.messages.keys().map(String::as_str)
    }

    pub fn metadata(&self) -> Option<&LanguageMetadata> {
        self.metadata.as_ref()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// All loaded locales plus the reference locale they are checked against.
///
/// A catalog is immutable once built. Use [`CatalogBuilder`] to assemble one and
/// [`SharedCatalog`] to swap in a freshly loaded instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    // Keyed by locale and then by message key
    // e.g. locales["en"]["greeting"] = "Hello {name}"
    //      locales["fr"]["greeting"] = "Bonjour {name}"
    locales: BTreeMap<LocaleId, LocaleTable>,
    reference: LocaleId,
}

impl Catalog {
    pub fn builder(reference: LocaleId) -> CatalogBuilder {
        CatalogBuilder::new(reference)
    }

    pub fn reference(&self) -> &LocaleId {
        &self.reference
    }

    /// Table of the reference locale, `None` if it was never loaded.
    pub fn reference_table(&self) -> Option<&LocaleTable> {
        self.locales.get(&self.reference)
    }

    pub fn locale(&self, locale: &LocaleId) -> Option<&LocaleTable> {
        self.locales.get(locale)
    }

    /// The stored identifier together with its table.
    pub fn locale_entry(&self, locale: &LocaleId) -> Option<(&LocaleId, &LocaleTable)> {
        self.locales.get_key_value(locale)
    }

    pub fn contains_locale(&self, locale: &LocaleId) -> bool {
        self.locales.contains_key(locale)
    }

    /// Loaded locales in identifier order.
    pub fn locales(&self) -> impl Iterator<Item = (&LocaleId, &LocaleTable)> {
        self.locales.iter()
    }

    pub fn len(&self) -> usize {
        self.locales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locales.is_empty()
    }

    /// Template for `key` in exactly `locale`, without fallback.
    pub fn get_message(&self, locale: &LocaleId, key: &str) -> Option<&str> {
        self.locales.get(locale)?.get_message(key)
    }
}

/// Assembles a [`Catalog`]. Each locale slot is written once.
#[derive(Debug)]
pub struct CatalogBuilder {
    locales: BTreeMap<LocaleId, LocaleTable>,
    reference: LocaleId,
}

impl CatalogBuilder {
    pub fn new(reference: LocaleId) -> Self {
        CatalogBuilder {
            locales: BTreeMap::new(),
            reference,
        }
    }

    /// Insert a table. Returns the table back if the locale is already taken.
    pub fn insert(&mut self, locale: LocaleId, table: LocaleTable) -> Result<(), LocaleTable> {
        if self.locales.contains_key(&locale) {
            return Err(table);
        }
        self.locales.insert(locale, table);
        Ok(())
    }

    /// Builder-style insert that replaces any previous table for the locale.
    pub fn with_locale(mut self, locale: LocaleId, table: LocaleTable) -> Self {
        self.locales.insert(locale, table);
        self
    }

    pub fn contains(&self, locale: &LocaleId) -> bool {
        self.locales.contains_key(locale)
    }

    pub fn build(self) -> Catalog {
        Catalog {
            locales: self.locales,
            reference: self.reference,
        }
    }
}

/// A catalog reference that can be replaced while readers hold the old one.
///
/// Readers take an `Arc<Catalog>` snapshot and keep using it for as long as they
/// like; [`SharedCatalog::replace`] only swaps the pointer.
#[derive(Debug, Clone)]
pub struct SharedCatalog {
    current: Arc<RwLock<Arc<Catalog>>>,
}

impl SharedCatalog {
    pub fn new(catalog: Catalog) -> Self {
        SharedCatalog {
            current: Arc::new(RwLock::new(Arc::new(catalog))),
        }
    }

    /// Snapshot of the current catalog.
    pub fn current(&self) -> Arc<Catalog> {
        // The lock only guards a pointer copy, so a poisoned lock still holds a valid Arc
        match self.current.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => Arc::clone(&poisoned.into_inner()),
        }
    }

    /// Install `catalog` and return the one it replaced.
    pub fn replace(&self, catalog: Catalog) -> Arc<Catalog> {
        let next = Arc::new(catalog);
        let mut guard = match self.current.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::replace(&mut *guard, next)
    }
}

//! Translation catalogs for multilingual applications
//!
//! Locale files are loaded concurrently into an immutable [`Catalog`], which can
//! then be checked for coverage against a reference locale with [`validate`] or
//! used to format messages with [`format`].
//!
//! ```no_run
//! use globalprogram::{LoadOptions, LocaleId, LocaleSource, load, validate};
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = LoadOptions::new(LocaleId::parse("en").unwrap());
//!     let sources = vec![
//!         LocaleSource::file("locales/en.json"),
//!         LocaleSource::file("locales/fr.json"),
//!     ];
//!     let outcome = load(sources, &options).await;
//!     for error in &outcome.errors {
//!         eprintln!("{}", error);
//!     }
//!     let report = validate(&outcome.catalog);
//!     println!("fully covered: {}", report.is_fully_covered());
//! }
//! ```

pub mod catalog;
pub mod coverage;
pub mod decoder;
pub mod error;
pub mod format;
pub mod loader;
pub mod placeholder;
pub mod render;
pub mod source;

#[cfg(test)]
mod integration_tests;

pub use catalog::{Catalog, CatalogBuilder, LocaleId, LocaleTable, SharedCatalog};
pub use coverage::{
    CoverageReport, CoverageStatus, LocaleCoverage, PlaceholderMismatch, validate,
    validate_locale,
};
pub use decoder::{Decoder, DecodedTable, LanguageMetadata, SourceFormat, decode_source};
pub use error::{FormatError, FormatResult, LoadError, ParseError};
pub use format::{
    Formatted, Localizer, Substitutions, format, format_positional, resolve, text_or_key,
};
pub use loader::{LoadOptions, LoadOutcome, SourceStatus, check_sources, load};
pub use placeholder::{Parser, Segment, Template, extract_placeholders};
pub use render::{render_json, render_text};
pub use source::{FileSource, LocaleSource, MemorySource, SourceReader, discover_sources};

//! End-to-end tests: locale files on disk through loading, validation and formatting

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::catalog::{Catalog, LocaleId, LocaleTable};
use crate::coverage::{CoverageStatus, validate};
use crate::error::FormatError;
use crate::format::{Substitutions, format};
use crate::loader::{LoadOptions, load};
use crate::placeholder::Template;
use crate::source::{LocaleSource, SourceReader, discover_sources};

fn locale(code: &str) -> LocaleId {
    LocaleId::parse(code).unwrap()
}

/// Build a catalog with reference `en` from (locale, key, template) rows.
fn catalog_of(rows: &[(&str, &str, &str)]) -> Catalog {
    let mut tables: BTreeMap<LocaleId, LocaleTable> = BTreeMap::new();
    for (code, key, template) in rows {
        tables
            .entry(locale(code))
            .or_default()
            .with_message(key, template);
    }
    tables
        .into_iter()
        .fold(Catalog::builder(locale("en")), |builder, (id, table)| {
            builder.with_locale(id, table)
        })
        .build()
}

/// Sets its flag when dropped
struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Source whose read never completes; `dropped` is set once the read is torn down
struct PendingSource {
    dropped: Arc<AtomicBool>,
}

#[async_trait]
impl SourceReader for PendingSource {
    fn name(&self) -> String {
        "pending.json".to_string()
    }
    fn extension(&self) -> Option<String> {
        Some("json".to_string())
    }
    fn implied_locale(&self) -> Option<String> {
        Some("pending".to_string())
    }
    async fn read(&self) -> std::io::Result<Vec<u8>> {
        let _guard = DropFlag(Arc::clone(&self.dropped));
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_directory_load_then_validate() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("en.json"),
        r#"{"name": "English", "code": "en", "version": 1, "revision": 1,
            "authors": ["Team"], "contributors": [],
            "translations": {"hello": "Hello {name}", "bye": "Goodbye", "count": "{n} items"}}"#,
    )
    .unwrap();
    fs::write(
        dir.path().join("fr.json"),
        r#"{"@metadata": {}, "hello": "Bonjour {name}", "count": "{nombre} articles"}"#,
    )
    .unwrap();
    fs::write(dir.path().join("pt_BR.properties"), "hello = Olá {name}\nbye = Tchau\ncount = {n} itens\n")
        .unwrap();
    fs::write(dir.path().join("de.json"), r#"{"hello": ["Hallo"]}"#).unwrap();

    let (files, discovery_errors) = discover_sources(&[dir.path().to_path_buf()]);
    assert!(discovery_errors.is_empty());
    let sources = files.into_iter().map(LocaleSource::new).collect();
    let outcome = load(sources, &LoadOptions::new(locale("en"))).await;

    assert_eq!(outcome.errors.len(), 1);
    assert!(outcome.errors[0].source_name().ends_with("de.json"));
    assert_eq!(outcome.catalog.len(), 3);

    let report = validate(&outcome.catalog);
    assert_eq!(report.status, CoverageStatus::Incomplete);
    assert_eq!(report.reference_keys, 3);

    let fr = &report.locales[&locale("fr")];
    assert_eq!(fr.missing.iter().collect::<Vec<_>>(), vec!["bye"]);
    assert!(fr.mismatched.contains_key("count"));

    let pt = &report.locales[&locale("pt-br")];
    assert!(pt.is_fully_covered());
    assert!(!report.passes(false));
}

#[tokio::test]
async fn test_caller_can_cancel_a_stalled_load() {
    let dropped = Arc::new(AtomicBool::new(false));
    let sources = vec![
        LocaleSource::memory("en.json", r#"{"hello": "Hello"}"#),
        LocaleSource::new(PendingSource {
            dropped: Arc::clone(&dropped),
        }),
    ];
    let options = LoadOptions::new(locale("en"));
    let cancelled = tokio::time::timeout(Duration::from_millis(50), load(sources, &options)).await;
    assert!(cancelled.is_err());

    // Aborted tasks are torn down the next time the runtime gets to them
    for _ in 0..100 {
        if dropped.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(dropped.load(Ordering::SeqCst));
}

#[test]
fn test_scenario_missing_key() {
    let catalog = catalog_of(&[
        ("en", "hello", "Hello"),
        ("en", "bye", "Bye"),
        ("fr", "hello", "Bonjour"),
    ]);
    let report = validate(&catalog);
    let fr = &report.locales[&locale("fr")];
    assert_eq!(fr.missing.len(), 1);
    assert!(fr.missing.contains("bye"));
}

#[test]
fn test_scenario_placeholder_mismatch() {
    let catalog = catalog_of(&[("en", "greet", "Hi {name}"), ("es", "greet", "Hola {nombre}")]);
    let report = validate(&catalog);
    let mismatch = &report.locales[&locale("es")].mismatched["greet"];
    assert!(mismatch.only_in_reference.contains("name"));
    assert!(mismatch.only_in_locale.contains("nombre"));
}

#[test]
fn test_scenario_fallback_formatting() {
    let catalog = catalog_of(&[("en", "bye", "Goodbye"), ("fr", "hello", "Bonjour")]);
    let result = format(&catalog, &locale("fr"), "bye", &HashMap::new()).unwrap();
    assert_eq!(result.text, "Goodbye");
    assert!(result.used_fallback());
    assert_eq!(result.locale, locale("en"));
}

#[test]
fn test_scenario_missing_substitution() {
    let catalog = catalog_of(&[("en", "greet", "Hi {name}")]);
    let err = format(&catalog, &locale("en"), "greet", &HashMap::new()).unwrap_err();
    assert!(matches!(
        err,
        FormatError::MissingSubstitution { ref missing, .. } if missing == &vec!["name".to_string()]
    ));
}

#[test]
fn test_scenario_empty_catalog() {
    let report = validate(&catalog_of(&[]));
    assert_eq!(report.status, CoverageStatus::NoData);
    assert!(!report.is_fully_covered());
}

#[test]
fn test_escaped_delimiter_round_trip() {
    let template = "{{";
    assert!(Template::parse(template).unwrap().placeholders().is_empty());
    let catalog = catalog_of(&[("en", "brace", template)]);
    let result = format(&catalog, &locale("en"), "brace", &HashMap::new()).unwrap();
    assert_eq!(result.text, "{");
}

#[test]
fn test_format_succeeds_iff_substitutions_cover_placeholders() {
    let catalog = catalog_of(&[("en", "m", "{a} {b} {a} {c}")]);
    let names = ["a", "b", "c"];
    // Every subset of the three names; only the full set may succeed
    for mask in 0u8..8 {
        let substitutions: Substitutions = names
            .iter()
            .enumerate()
            .filter(|(i, _)| mask & (1u8 << *i) != 0)
            .map(|(_, n)| (n.to_string(), n.to_uppercase()))
            .chain([("unused".to_string(), "x".to_string())])
            .collect();
        let result = format(&catalog, &locale("en"), "m", &substitutions);
        assert_eq!(result.is_ok(), mask == 0b111, "mask {:03b}", mask);
        if let Ok(formatted) = result {
            assert_eq!(formatted.text, "A B A C");
        }
    }
}

#[test]
fn test_reference_locale_reports_nothing_for_itself() {
    let catalog = catalog_of(&[("en", "a", "{x}"), ("en", "b", "plain"), ("fr", "a", "{x}")]);
    let report = validate(&catalog);
    assert!(!report.locales.contains_key(&locale("en")));
    let coverage = crate::coverage::validate_locale(&catalog, &locale("en")).unwrap();
    assert!(coverage.missing.is_empty());
    assert!(coverage.extraneous.is_empty());
    assert!(coverage.mismatched.is_empty());
}

//! Coverage validation of every locale against the reference locale
//!
//! # Algorithm
//!
//! With `R` the reference key set and `K` the key set of a locale:
//!
//! 1. missing = `R - K`, extraneous = `K - R`
//! 2. for each key in `R ∩ K`, compare placeholder *sets*; a difference is recorded
//!    as the names only in the reference and the names only in the locale
//! 3. templates that fail to parse go to a separate parse-error category and are
//!    left out of the mismatch comparison
//!
//! Validation always completes. Everything in the report is kept in ordered maps
//! so two runs over the same catalog serialize identically.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::catalog::{Catalog, LocaleId, LocaleTable};
use crate::error::ParseError;
use crate::placeholder::Template;

/// Overall state of a coverage report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// No locale was loaded at all
    NoData,
    /// Locales were loaded but the reference locale is not among them
    MissingReference,
    /// Only the reference locale was loaded, so nothing was compared
    ReferenceOnly,
    /// Every locale matches the reference
    Complete,
    /// At least one locale has a problem
    Incomplete,
}

/// Placeholder names that differ between the reference and a locale for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlaceholderMismatch {
    pub only_in_reference: BTreeSet<String>,
    pub only_in_locale: BTreeSet<String>,
}

/// Coverage of one locale.
///
/// `missing`, `extraneous` and `mismatched` are disjoint. A key in `parse_errors`
/// may also be extraneous, but never mismatched.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocaleCoverage {
    /// Reference keys this locale translates
    pub translated: usize,
    pub coverage_percent: f64,
    pub missing: BTreeSet<String>,
    pub extraneous: BTreeSet<String>,
    pub mismatched: BTreeMap<String, PlaceholderMismatch>,
    pub parse_errors: BTreeMap<String, ParseError>,
}

impl LocaleCoverage {
    pub fn is_fully_covered(&self) -> bool {
        self.missing.is_empty()
            && self.extraneous.is_empty()
            && self.mismatched.is_empty()
            && self.parse_errors.is_empty()
    }

    /// Whether this locale fails a coverage gate.
    ///
    /// Missing keys and placeholder mismatches always fail; with `strict`,
    /// extraneous keys and malformed templates fail too.
    pub fn fails(&self, strict: bool) -> bool {
        !self.missing.is_empty()
            || !self.mismatched.is_empty()
            || (strict && (!self.extraneous.is_empty() || !self.parse_errors.is_empty()))
    }
}

/// Result of [`validate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    pub status: CoverageStatus,
    pub reference: LocaleId,
    /// Number of keys in the reference locale
    pub reference_keys: usize,
    /// Malformed reference templates; these keys are not compared for placeholders
    pub reference_parse_errors: BTreeMap<String, ParseError>,
    /// Every non-reference locale, ordered by identifier
    pub locales: BTreeMap<LocaleId, LocaleCoverage>,
    /// Loaded locales that could not be compared because the reference is absent
    pub unreferenced_locales: Vec<LocaleId>,
    /// Mean coverage over the non-reference locales
    pub average_coverage_percent: Option<f64>,
}

impl CoverageReport {
    pub fn is_fully_covered(&self) -> bool {
        self.status == CoverageStatus::Complete
    }

    /// Whether the catalog passes a coverage gate.
    ///
    /// A report without data or without the reference locale never passes.
    /// A reference-only catalog passes, since nothing can be missing.
    pub fn passes(&self, strict: bool) -> bool {
        match self.status {
            CoverageStatus::NoData | CoverageStatus::MissingReference => false,
            _ => {
                !self.locales.values().any(|coverage| coverage.fails(strict))
                    && !(strict && !self.reference_parse_errors.is_empty())
            }
        }
    }

    /// Locales with at least one problem.
    pub fn failing_locales(&self, strict: bool) -> impl Iterator<Item = &LocaleId> {
        self.locales
            .iter()
            .filter(move |(_, coverage)| coverage.fails(strict))
            .map(|(locale, _)| locale)
    }
}

type ParsedPlaceholders = Result<BTreeSet<String>, ParseError>;

fn placeholder_sets(table: &LocaleTable) -> BTreeMap<&str, ParsedPlaceholders> {
    table
        .get_messages()
        .iter()
        .map(|(key, template)| {
            (
                key.as_str(),
                Template::parse(template).map(|t| t.placeholder_set()),
            )
        })
        .collect()
}

fn compare(
    reference: &BTreeMap<&str, ParsedPlaceholders>,
    table: &LocaleTable,
) -> LocaleCoverage {
    let mut missing = BTreeSet::new();
    let mut mismatched = BTreeMap::new();
    let mut parse_errors = BTreeMap::new();

    for (&key, reference_placeholders) in reference {
        let Some(template) = table.get_message(key) else {
            missing.insert(key.to_string());
            continue;
        };
        let locale_placeholders = match Template::parse(template) {
            Ok(parsed) => parsed.placeholder_set(),
            Err(error) => {
                parse_errors.insert(key.to_string(), error);
                continue;
            }
        };
        // Malformed reference templates are reported once, on the report itself
        let Ok(reference_placeholders) = reference_placeholders else {
            continue;
        };
        if *reference_placeholders != locale_placeholders {
            mismatched.insert(
                key.to_string(),
                PlaceholderMismatch {
                    only_in_reference: reference_placeholders
                        .difference(&locale_placeholders)
                        .cloned()
                        .collect(),
                    only_in_locale: locale_placeholders
                        .difference(reference_placeholders)
                        .cloned()
                        .collect(),
                },
            );
        }
    }

    let mut extraneous = BTreeSet::new();
    for (key, template) in table.get_messages() {
        if reference.contains_key(key.as_str()) {
            continue;
        }
        extraneous.insert(key.clone());
        if let Err(error) = Template::parse(template) {
            parse_errors.insert(key.clone(), error);
        }
    }

    let translated = reference.len() - missing.len();
    let coverage_percent = if reference.is_empty() {
        100.0
    } else {
        translated as f64 * 100.0 / reference.len() as f64
    };

    LocaleCoverage {
        translated,
        coverage_percent,
        missing,
        extraneous,
        mismatched,
        parse_errors,
    }
}

/// Compare one locale against the reference, `None` if either is not loaded.
pub fn validate_locale(catalog: &Catalog, locale: &LocaleId) -> Option<LocaleCoverage> {
    let reference = placeholder_sets(catalog.reference_table()?);
    Some(compare(&reference, catalog.locale(locale)?))
}

/// Build a coverage report for every locale of `catalog`.
pub fn validate(catalog: &Catalog) -> CoverageReport {
    let reference_id = catalog.reference().clone();

    let Some(reference_table) = catalog.reference_table() else {
        let status = if catalog.is_empty() {
            CoverageStatus::NoData
        } else {
            CoverageStatus::MissingReference
        };
        tracing::warn!(reference = %reference_id, ?status, "coverage check has no reference locale");
        return CoverageReport {
            status,
            reference: reference_id,
            reference_keys: 0,
            reference_parse_errors: BTreeMap::new(),
            locales: BTreeMap::new(),
            unreferenced_locales: catalog.locales().map(|(id, _)| id.clone()).collect(),
            average_coverage_percent: None,
        };
    };

    let reference = placeholder_sets(reference_table);
    let reference_parse_errors: BTreeMap<String, ParseError> = reference
        .iter()
        .filter_map(|(key, parsed)| match parsed {
            Err(error) => Some((key.to_string(), error.clone())),
            Ok(_) => None,
        })
        .collect();

    let locales: BTreeMap<LocaleId, LocaleCoverage> = catalog
        .locales()
        .filter(|(id, _)| **id != reference_id)
        .map(|(id, table)| (id.clone(), compare(&reference, table)))
        .collect();

    let status = if locales.is_empty() {
        tracing::warn!(reference = %reference_id, "only the reference locale is loaded");
        CoverageStatus::ReferenceOnly
    } else if reference_parse_errors.is_empty()
        && locales.values().all(LocaleCoverage::is_fully_covered)
    {
        CoverageStatus::Complete
    } else {
        CoverageStatus::Incomplete
    };

    let average_coverage_percent = (!locales.is_empty()).then(|| {
        locales
            .values()
            .map(|coverage| coverage.coverage_percent)
            .sum::<f64>()
            / locales.len() as f64
    });

    CoverageReport {
        status,
        reference: reference_id,
        reference_keys: reference.len(),
        reference_parse_errors,
        locales,
        unreferenced_locales: Vec::new(),
        average_coverage_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locale(code: &str) -> LocaleId {
        LocaleId::parse(code).unwrap()
    }

    fn table(entries: &[(&str, &str)]) -> LocaleTable {
        let mut table = LocaleTable::new();
        for (key, template) in entries {
            table.with_message(key, template);
        }
        table
    }

    fn set(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_missing_key() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), table(&[("hello", "Hello"), ("bye", "Bye")]))
            .with_locale(locale("fr"), table(&[("hello", "Bonjour")]))
            .build();
        let report = validate(&catalog);

        let fr = &report.locales[&locale("fr")];
        assert_eq!(fr.missing, set(&["bye"]));
        assert!(fr.extraneous.is_empty());
        assert_eq!(fr.translated, 1);
        assert_eq!(fr.coverage_percent, 50.0);
        assert_eq!(report.status, CoverageStatus::Incomplete);
        assert!(!report.passes(false));
    }

    #[test]
    fn test_placeholder_mismatch() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), table(&[("greet", "Hi {name}")]))
            .with_locale(locale("es"), table(&[("greet", "Hola {nombre}")]))
            .build();
        let report = validate(&catalog);

        let mismatch = &report.locales[&locale("es")].mismatched["greet"];
        assert_eq!(mismatch.only_in_reference, set(&["name"]));
        assert_eq!(mismatch.only_in_locale, set(&["nombre"]));
        assert!(report.locales[&locale("es")].missing.is_empty());
    }

    #[test]
    fn test_placeholder_order_does_not_matter() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), table(&[("m", "{a} then {b}")]))
            .with_locale(locale("ja"), table(&[("m", "{b} {a} {b}")]))
            .build();
        let report = validate(&catalog);
        assert_eq!(report.status, CoverageStatus::Complete);
        assert!(report.is_fully_covered());
    }

    #[test]
    fn test_extraneous_keys() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), table(&[("hello", "Hello")]))
            .with_locale(locale("de"), table(&[("hello", "Hallo"), ("old", "Alt")]))
            .build();
        let report = validate(&catalog);

        let de = &report.locales[&locale("de")];
        assert_eq!(de.extraneous, set(&["old"]));
        assert_eq!(de.coverage_percent, 100.0);
        assert!(report.passes(false));
        assert!(!report.passes(true));
    }

    #[test]
    fn test_parse_errors_are_separate_category() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(
                locale("en"),
                table(&[("greet", "Hi {name}"), ("broken", "Oops {x")]),
            )
            .with_locale(
                locale("fr"),
                table(&[("greet", "Salut {name"), ("broken", "Oups {y}")]),
            )
            .build();
        let report = validate(&catalog);

        assert_eq!(
            report.reference_parse_errors["broken"],
            ParseError::Unterminated { offset: 5 }
        );
        let fr = &report.locales[&locale("fr")];
        assert!(fr.parse_errors.contains_key("greet"));
        assert!(fr.mismatched.is_empty());
        assert!(fr.missing.is_empty());
        assert_eq!(report.status, CoverageStatus::Incomplete);
        assert!(report.passes(false));
        assert!(!report.passes(true));
    }

    #[test]
    fn test_malformed_extraneous_key_stays_extraneous() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), table(&[("hello", "Hello")]))
            .with_locale(
                locale("fr"),
                table(&[("hello", "Bonjour"), ("stale", "Vieux {x")]),
            )
            .build();
        let fr = validate_locale(&catalog, &locale("fr")).unwrap();

        assert_eq!(fr.extraneous, set(&["stale"]));
        assert_eq!(fr.parse_errors["stale"], ParseError::Unterminated { offset: 6 });
        assert!(fr.mismatched.is_empty());
        assert_eq!(fr.coverage_percent, 100.0);
    }

    #[test]
    fn test_empty_catalog_is_no_data() {
        let report = validate(&Catalog::builder(locale("en")).build());
        assert_eq!(report.status, CoverageStatus::NoData);
        assert!(!report.is_fully_covered());
        assert!(!report.passes(false));
        assert!(report.locales.is_empty());
    }

    #[test]
    fn test_reference_only() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), table(&[("hello", "Hello")]))
            .build();
        let report = validate(&catalog);
        assert_eq!(report.status, CoverageStatus::ReferenceOnly);
        assert!(report.locales.is_empty());
        assert_eq!(report.average_coverage_percent, None);
        assert!(report.passes(true));
    }

    #[test]
    fn test_missing_reference() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("fr"), table(&[("hello", "Bonjour")]))
            .build();
        let report = validate(&catalog);
        assert_eq!(report.status, CoverageStatus::MissingReference);
        assert_eq!(report.unreferenced_locales, vec![locale("fr")]);
        assert!(!report.passes(false));
    }

    #[test]
    fn test_reference_against_itself_is_clean() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(
                locale("en"),
                table(&[("greet", "Hi {name}"), ("bye", "Bye {{x}}")]),
            )
            .build();
        let coverage = validate_locale(&catalog, &locale("en")).unwrap();
        assert!(coverage.is_fully_covered());
        assert_eq!(coverage.coverage_percent, 100.0);
    }

    #[test]
    fn test_empty_reference_table() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), LocaleTable::new())
            .with_locale(locale("fr"), LocaleTable::new())
            .build();
        let report = validate(&catalog);
        assert_eq!(report.status, CoverageStatus::Complete);
        assert_eq!(report.locales[&locale("fr")].coverage_percent, 100.0);
    }

    #[test]
    fn test_average_and_failing_locales() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(locale("en"), table(&[("a", "A"), ("b", "B")]))
            .with_locale(locale("fr"), table(&[("a", "A"), ("b", "B")]))
            .with_locale(locale("pt"), table(&[]))
            .build();
        let report = validate(&catalog);
        assert_eq!(report.average_coverage_percent, Some(50.0));
        let failing: Vec<&LocaleId> = report.failing_locales(false).collect();
        assert_eq!(failing, vec![&locale("pt")]);
    }

    #[test]
    fn test_validate_is_deterministic() {
        let catalog = Catalog::builder(locale("en"))
            .with_locale(
                locale("en"),
                table(&[("z", "{a}"), ("a", "x"), ("m", "{b} {c}")]),
            )
            .with_locale(locale("fr"), table(&[("m", "{c}"), ("q", "?")]))
            .with_locale(locale("de"), table(&[("z", "{y}")]))
            .build();
        let first = serde_json::to_string(&validate(&catalog)).unwrap();
        let second = serde_json::to_string(&validate(&catalog)).unwrap();
        assert_eq!(first, second);
        let de = first.find("\"de\"").unwrap();
        let fr = first.find("\"fr\"").unwrap();
        assert!(de < fr);
    }
}

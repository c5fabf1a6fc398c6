use std::fmt::Write;

use crate::catalog::Catalog;
use crate::coverage::{CoverageReport, CoverageStatus};
use crate::error::LoadError;

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a report for people. `catalog` supplies the language metadata.
pub fn render_text(report: &CoverageReport, catalog: &Catalog) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_text(&mut out, report, catalog);
    out
}

fn write_text(out: &mut String, report: &CoverageReport, catalog: &Catalog) -> std::fmt::Result {
    writeln!(out, "Coverage report (reference: {})", report.reference)?;

    match report.status {
        CoverageStatus::NoData => {
            writeln!(out, "  No locales were loaded; nothing to check.")?;
            return Ok(());
        }
        CoverageStatus::MissingReference => {
            writeln!(
                out,
                "  Reference locale '{}' was not loaded; cannot compare {} locale(s): {}",
                report.reference,
                report.unreferenced_locales.len(),
                report
                    .unreferenced_locales
                    .iter()
                    .map(|l| l.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )?;
            return Ok(());
        }
        _ => {}
    }

    writeln!(out)?;
    writeln!(out, "Present languages")?;
    for (locale, table) in catalog.locales() {
        match table.metadata() {
            Some(metadata) => writeln!(
                out,
                "  {} ({}), revision {}, {} translations",
                locale,
                metadata.name,
                metadata.revision,
                table.len()
            )?,
            None => writeln!(out, "  {}, {} translations", locale, table.len())?,
        }
        if let Some(metadata) = table.metadata() {
            if !metadata.authors.is_empty() {
                writeln!(out, "    authors: {}", join(&metadata.authors))?;
            }
            if !metadata.contributors.is_empty() {
                writeln!(out, "    contributors: {}", join(&metadata.contributors))?;
            }
        }
    }

    if !report.reference_parse_errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "Malformed reference templates")?;
        for (key, error) in &report.reference_parse_errors {
            writeln!(out, "  {}: {}", key, error)?;
        }
    }

    for (locale, coverage) in &report.locales {
        writeln!(out)?;
        let state = if coverage.is_fully_covered() {
            "fully covered"
        } else {
            "incomplete"
        };
        writeln!(
            out,
            "[{}] {:.1}% ({}/{} keys), {}",
            locale, coverage.coverage_percent, coverage.translated, report.reference_keys, state
        )?;
        for key in &coverage.missing {
            writeln!(out, "  missing: {}", key)?;
        }
        for key in &coverage.extraneous {
            writeln!(out, "  extraneous: {}", key)?;
        }
        for (key, mismatch) in &coverage.mismatched {
            writeln!(
                out,
                "  placeholder mismatch: {} (only in reference: [{}], only in {}: [{}])",
                key,
                join(&mismatch.only_in_reference),
                locale,
                join(&mismatch.only_in_locale)
            )?;
        }
        for (key, error) in &coverage.parse_errors {
            writeln!(out, "  malformed: {}: {}", key, error)?;
        }
    }

    writeln!(out)?;
    match report.status {
        CoverageStatus::ReferenceOnly => {
            writeln!(out, "Only the reference locale is loaded; no translations to compare.")?;
        }
        CoverageStatus::Complete => writeln!(out, "All locales are fully covered.")?,
        _ => {
            if let Some(average) = report.average_coverage_percent {
                writeln!(
                    out,
                    "Average coverage {:.1}% across {} locale(s).",
                    average,
                    report.locales.len()
                )?;
            }
        }
    }
    Ok(())
}

/// Render a report as pretty-printed JSON: `{"load_errors": [..], "coverage": {..}}`.
pub fn render_json(
    report: &CoverageReport,
    load_errors: &[LoadError],
) -> serde_json::Result<String> {
    let load_errors: Vec<_> = load_errors
        .iter()
        .map(|error| {
            serde_json::json!({
                "source": error.source_name(),
                "error": error.to_string(),
            })
        })
        .collect();
    let document = serde_json::json!({
        "load_errors": load_errors,
        "coverage": serde_json::to_value(report)?,
    });
    serde_json::to_string_pretty(&document)
}

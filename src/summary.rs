//! Run counters, the printed summary block and the validation report.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use uuid::Uuid;

use crate::error::CollateError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub total_rows: usize,
    pub successful_inserts: usize,
    /// Rows rejected by the validator (identifier, metadata or pricing).
    pub validation_failures: usize,
    pub duplicate_failures: usize,
    pub existing_products: usize,
    pub skipped_missing_identifier: usize,
    pub skipped_no_metadata: usize,
    pub skipped_no_pricing: usize,
    /// Accepted rows whose chunk insert was rolled back.
    pub failed_insert_rows: usize,
    pub normalization_notes: usize,
    pub ambiguous_price_codes: usize,
    pub rejections_written: u64,
    pub rejection_file: Option<PathBuf>,
    pub validation_report: Option<PathBuf>,
    /// Run-level (non-row) errors, e.g. failed chunk inserts.
    pub errors: Vec<String>,
}

impl RunSummary {
    /// Rows that passed validation, whether or not their chunk committed.
    pub fn accepted(&self) -> usize {
        self.successful_inserts + self.failed_insert_rows
    }

    /// Every input row ends up in exactly one bucket.
    pub fn is_balanced(&self) -> bool {
        self.accepted() + self.validation_failures + self.duplicate_failures + self.existing_products
            == self.total_rows
    }

    pub fn render(&self, fatal: Option<&CollateError>) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "\n{rule}");
        let _ = writeln!(out, "COLLATION AND MIGRATION SUMMARY");
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Run: {}", self.run_id);
        let _ = writeln!(out, "Total rows in CSV: {}", self.total_rows);
        let _ = writeln!(out, "Successfully inserted: {}", self.successful_inserts);
        let _ = writeln!(out, "Validation failures: {}", self.validation_failures);
        let _ = writeln!(out, "Duplicate products: {}", self.duplicate_failures);
        let _ = writeln!(out, "Existing products skipped: {}", self.existing_products);
        let _ = writeln!(out, "Products skipped (missing identifier): {}", self.skipped_missing_identifier);
        let _ = writeln!(out, "Products skipped (no metadata): {}", self.skipped_no_metadata);
        let _ = writeln!(out, "Products skipped (no pricing): {}", self.skipped_no_pricing);
        if self.failed_insert_rows > 0 {
            let _ = writeln!(out, "Rows lost to failed batch inserts: {}", self.failed_insert_rows);
        }
        if self.normalization_notes > 0 {
            let _ = writeln!(out, "Normalization notes: {}", self.normalization_notes);
        }
        if self.ambiguous_price_codes > 0 {
            let _ = writeln!(out, "Item codes matching several price records: {}", self.ambiguous_price_codes);
        }
        if let Some(fatal) = fatal {
            let _ = writeln!(out, "\nRun aborted: {fatal}");
        }
        if !self.errors.is_empty() {
            let _ = writeln!(out, "\nCritical Errors:");
            for error in &self.errors {
                let _ = writeln!(out, "  - {error}");
            }
        }
        if let Some(report) = &self.validation_report {
            let _ = writeln!(out, "\nCheck '{}' for validation error details", report.display());
        }
        if let Some(file) = &self.rejection_file {
            let _ = writeln!(
                out,
                "Check '{}' for skipped products details ({} rows)",
                file.display(),
                self.rejections_written
            );
        }
        out
    }
}

/// One row's entry in the validation report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub line: u64,
    pub product_id: String,
    pub messages: Vec<String>,
}

pub fn write_validation_report(path: &Path, issues: &[ValidationIssue]) -> Result<()> {
    let mut out = String::new();
    let _ = writeln!(out, "COLLATION VALIDATION ERROR REPORT");
    let _ = writeln!(out, "{}\n", "=".repeat(50));
    for issue in issues {
        let _ = writeln!(out, "Row Index: {}", issue.line);
        let _ = writeln!(out, "Product ID: {}", issue.product_id);
        let _ = writeln!(out, "Errors:");
        for msg in &issue.messages {
            let _ = writeln!(out, "  - {msg}");
        }
        let _ = writeln!(out, "\n{}\n", "-".repeat(30));
    }
    fs::write(path, out).with_context(|| format!("failed to write validation report {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balance_counts_failed_inserts_as_accepted() {
        let summary = RunSummary {
            total_rows: 10,
            successful_inserts: 4,
            failed_insert_rows: 2,
            validation_failures: 2,
            duplicate_failures: 1,
            existing_products: 1,
            ..RunSummary::default()
        };
        assert!(summary.is_balanced());
        assert!(!RunSummary { total_rows: 11, ..summary }.is_balanced());
    }

    #[test]
    fn render_lists_counters_and_errors() {
        let summary = RunSummary {
            total_rows: 3,
            successful_inserts: 1,
            skipped_no_metadata: 1,
            errors: vec!["chunk 2: insert failed".into()],
            rejection_file: Some(PathBuf::from("skipped.csv")),
            rejections_written: 1,
            ..RunSummary::default()
        };
        let text = summary.render(None);
        assert!(text.contains("COLLATION AND MIGRATION SUMMARY"));
        assert!(text.contains("Total rows in CSV: 3"));
        assert!(text.contains("Products skipped (no metadata): 1"));
        assert!(text.contains("  - chunk 2: insert failed"));
        assert!(text.contains("'skipped.csv'"));
        assert!(!text.contains("Run aborted"));

        let fatal = CollateError::Config("bad".into());
        assert!(summary.render(Some(&fatal)).contains("Run aborted: configuration: bad"));
    }

    #[test]
    fn validation_report_layout() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("report.log");
        write_validation_report(
            &path,
            &[ValidationIssue {
                line: 4,
                product_id: "P4".into(),
                messages: vec!["Missing Metadata".into(), "inventory '-1' is negative".into()],
            }],
        )
        .unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("COLLATION VALIDATION ERROR REPORT\n"));
        assert!(text.contains("Row Index: 4\nProduct ID: P4\nErrors:\n  - Missing Metadata\n"));
    }
}

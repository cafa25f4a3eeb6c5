//! End-to-end collation run: load, dedupe, skip existing, then resolve,
//! validate and write one chunk at a time.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::collate::{collate_row, RowOutcome};
use crate::config::CollateConfig;
use crate::database_ops::{CatalogueStore, MetadataSource, PriceSource};
use crate::error::CollateError;
use crate::input;
use crate::model::{InputRow, RejectionKind};
use crate::recorder::{RejectionRecorder, RejectionSender};
use crate::resolve::{normalize_keys, resolve_metadata, resolve_prices, PriceResolution};
use crate::summary::{write_validation_report, RunSummary, ValidationIssue};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    SourceLoaded,
    DuplicatesResolved,
    ExistingFiltered,
    /// 1-based chunk number.
    Processing(usize),
    Completed,
}

#[derive(Debug)]
pub struct RunReport {
    pub summary: RunSummary,
    pub fatal: Option<CollateError>,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.fatal.as_ref().map_or(0, CollateError::exit_code)
    }
}

pub struct Orchestrator {
    cfg: CollateConfig,
    metadata: Arc<dyn MetadataSource>,
    prices: Arc<dyn PriceSource>,
    catalogue: Arc<dyn CatalogueStore>,
    state: RunState,
}

impl Orchestrator {
    pub fn new(
        cfg: CollateConfig,
        metadata: Arc<dyn MetadataSource>,
        prices: Arc<dyn PriceSource>,
        catalogue: Arc<dyn CatalogueStore>,
    ) -> Self {
        Self {
            cfg,
            metadata,
            prices,
            catalogue,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "run state");
        self.state = next;
    }

    /// Read the configured input file and run the pipeline over it.
    pub async fn run(&mut self) -> RunReport {
        let path = self.cfg.input_path.clone();
        match input::read_rows(&path) {
            Ok(rows) => self.run_rows(rows).await,
            Err(source) => {
                let fatal = CollateError::InputUnreadable {
                    path: path.display().to_string(),
                    source,
                };
                error!(error = %fatal, "collation aborted");
                RunReport {
                    summary: RunSummary::default(),
                    fatal: Some(fatal),
                }
            }
        }
    }

    /// Run the pipeline over rows that are already loaded.
    pub async fn run_rows(&mut self, rows: Vec<InputRow>) -> RunReport {
        let run_id = Uuid::new_v4();
        self.execute(run_id, rows)
            .instrument(info_span!("collation_run", %run_id))
            .await
    }

    async fn execute(&mut self, run_id: Uuid, rows: Vec<InputRow>) -> RunReport {
        self.advance(RunState::SourceLoaded);
        let mut summary = RunSummary {
            run_id,
            total_rows: rows.len(),
            ..RunSummary::default()
        };
        let mut issues = Vec::new();

        let recorder = RejectionRecorder::spawn(self.cfg.recorder());
        let sender = recorder.sender();
        let fatal = self.process(rows, &sender, &mut summary, &mut issues).await.err();
        drop(sender);

        // Every queued rejection is on disk once shutdown returns.
        match recorder.shutdown().await {
            Ok(report) => {
                summary.rejections_written = report.written;
                summary.rejection_file = report.path;
            }
            Err(e) => {
                error!(error = %format!("{e:#}"), "rejection recorder did not finish cleanly");
                summary.errors.push(format!("rejection recorder: {e:#}"));
            }
        }

        if !issues.is_empty() {
            if let Some(path) = self.cfg.validation_report.clone() {
                match write_validation_report(&path, &issues) {
                    Ok(()) => {
                        info!(path = %path.display(), rows = issues.len(), "validation report saved");
                        summary.validation_report = Some(path);
                    }
                    Err(e) => {
                        warn!(error = %format!("{e:#}"), "validation report not written");
                        summary.errors.push(format!("validation report: {e:#}"));
                    }
                }
            }
        }

        match &fatal {
            None => {
                self.advance(RunState::Completed);
                info!(
                    total_rows = summary.total_rows,
                    successful_inserts = summary.successful_inserts,
                    validation_failures = summary.validation_failures,
                    duplicate_failures = summary.duplicate_failures,
                    existing_products = summary.existing_products,
                    skipped_no_metadata = summary.skipped_no_metadata,
                    skipped_no_pricing = summary.skipped_no_pricing,
                    batch_errors = summary.errors.len(),
                    "collation complete"
                );
            }
            Some(e) => error!(error = %e, state = ?self.state, "collation aborted"),
        }
        RunReport { summary, fatal }
    }

    async fn process(
        &mut self,
        rows: Vec<InputRow>,
        sender: &RejectionSender,
        summary: &mut RunSummary,
        issues: &mut Vec<ValidationIssue>,
    ) -> Result<(), CollateError> {
        let (rows, removed) = dedupe_rows(rows);
        summary.duplicate_failures = removed;
        self.advance(RunState::DuplicatesResolved);

        let ids = normalize_keys(rows.iter().filter_map(InputRow::product_key));
        let existing = if ids.is_empty() {
            HashSet::new()
        } else {
            self.catalogue
                .existing_product_ids(&ids)
                .await
                .map_err(CollateError::ExistingCheckFailed)?
        };
        let before = rows.len();
        let rows: Vec<InputRow> = rows
            .into_iter()
            .filter(|r| r.product_key().map_or(true, |id| !existing.contains(id)))
            .collect();
        summary.existing_products = before - rows.len();
        if summary.existing_products > 0 {
            info!(count = summary.existing_products, "skipping existing products");
        }
        self.advance(RunState::ExistingFiltered);

        let chunk_size = self.cfg.chunk_size.max(1);
        let chunks = rows.len().div_ceil(chunk_size);
        for (idx, chunk) in rows.chunks(chunk_size).enumerate() {
            let n = idx + 1;
            self.advance(RunState::Processing(n));
            info!(chunk = n, of = chunks, rows = chunk.len(), "processing chunk");
            self.process_chunk(n, chunk, sender, summary, issues).await;
        }
        Ok(())
    }

    async fn process_chunk(
        &self,
        n: usize,
        chunk: &[InputRow],
        sender: &RejectionSender,
        summary: &mut RunSummary,
        issues: &mut Vec<ValidationIssue>,
    ) {
        let metadata = resolve_metadata(self.metadata.as_ref(), chunk.iter().filter_map(InputRow::product_key)).await;
        let PriceResolution {
            prices,
            ambiguous_codes,
        } = resolve_prices(
            self.prices.as_ref(),
            chunk.iter().filter_map(InputRow::item_key),
            self.cfg.price_match_policy,
        )
        .await;
        summary.ambiguous_price_codes += ambiguous_codes;

        let now = Utc::now();
        let mut accepted = Vec::with_capacity(chunk.len());
        for row in chunk {
            match collate_row(row, &metadata, &prices, now) {
                RowOutcome::Accepted(record) => {
                    if !record.notes.is_empty() {
                        summary.normalization_notes += record.notes.len();
                        issues.push(ValidationIssue {
                            line: row.line,
                            product_id: record.product_id.clone(),
                            messages: record.notes.clone(),
                        });
                    }
                    accepted.push(record);
                }
                RowOutcome::Rejected(rejection) => {
                    summary.validation_failures += 1;
                    match rejection.kind {
                        RejectionKind::MissingIdentifier => summary.skipped_missing_identifier += 1,
                        RejectionKind::MissingMetadata => summary.skipped_no_metadata += 1,
                        RejectionKind::MissingPricing => summary.skipped_no_pricing += 1,
                    }
                    debug!(line = rejection.line, product_id = %rejection.product_id, reason = rejection.kind.reason(), "row rejected");
                    issues.push(ValidationIssue {
                        line: rejection.line,
                        product_id: rejection.product_id.clone(),
                        messages: vec![format!("{}: {}", rejection.kind.error_type(), rejection.details)],
                    });
                    sender.record(rejection.to_record());
                }
            }
        }

        if accepted.is_empty() {
            info!(chunk = n, "no valid records in chunk");
            return;
        }
        // insert_batch is all-or-nothing, so the whole chunk lands in one bucket.
        match self.catalogue.insert_batch(&accepted).await {
            Ok(_) => {
                summary.successful_inserts += accepted.len();
                info!(chunk = n, records = accepted.len(), "completed chunk");
            }
            Err(e) => {
                summary.failed_insert_rows += accepted.len();
                summary.errors.push(format!("batch {n}: {e:#}"));
                error!(chunk = n, records = accepted.len(), error = %format!("{e:#}"), "chunk insert failed; continuing");
            }
        }
    }
}

/// Keep the first row per trimmed product id, in input order. Rows without
/// a product id are left for the validator. Returns the kept rows and the
/// number removed.
pub fn dedupe_rows(rows: Vec<InputRow>) -> (Vec<InputRow>, usize) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut duplicated: Vec<String> = Vec::new();
    let mut kept = Vec::with_capacity(rows.len());
    let mut removed = 0;
    for row in rows {
        match row.product_key() {
            Some(id) if seen.contains(id) => {
                if !duplicated.iter().any(|d| d == id) {
                    duplicated.push(id.to_string());
                }
                removed += 1;
            }
            Some(id) => {
                seen.insert(id.to_string());
                kept.push(row);
            }
            None => kept.push(row),
        }
    }
    if removed > 0 {
        warn!(removed, product_ids = ?duplicated, "duplicate product ids in input; keeping first occurrence");
    }
    (kept, removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LocationInput, MergedRecord, MetadataRecord, PriceRecord};
    use anyhow::{anyhow, Result};
    use indexmap::IndexMap;
    use serde_json::json;
    use std::collections::HashMap;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    struct MemMetadata {
        records: HashMap<String, MetadataRecord>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl MetadataSource for MemMetadata {
        async fn fetch_metadata(&self, product_ids: &[String]) -> Result<Vec<MetadataRecord>> {
            if self.fail {
                return Err(anyhow!("metadata source offline"));
            }
            Ok(product_ids.iter().filter_map(|id| self.records.get(id).cloned()).collect())
        }
    }

    struct MemPrices {
        records: Vec<PriceRecord>,
    }

    #[async_trait::async_trait]
    impl PriceSource for MemPrices {
        async fn fetch_prices(&self, codes: &[String]) -> Result<Vec<PriceRecord>> {
            Ok(self
                .records
                .iter()
                .filter(|r| r.match_codes().any(|c| codes.contains(&c)))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct MemCatalogue {
        rows: Mutex<IndexMap<String, MergedRecord>>,
        preexisting: Vec<String>,
        calls: AtomicUsize,
        fail_on_call: Option<usize>,
        fail_existing: bool,
    }

    impl MemCatalogue {
        fn stored(&self) -> IndexMap<String, MergedRecord> {
            self.rows.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl CatalogueStore for MemCatalogue {
        async fn existing_product_ids(&self, product_ids: &[String]) -> Result<HashSet<String>> {
            if self.fail_existing {
                return Err(anyhow!("catalogue offline"));
            }
            let rows = self.rows.lock().unwrap();
            Ok(product_ids
                .iter()
                .filter(|id| rows.contains_key(*id) || self.preexisting.contains(*id))
                .cloned()
                .collect())
        }

        async fn insert_batch(&self, records: &[MergedRecord]) -> Result<u64> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.fail_on_call == Some(call) {
                return Err(anyhow!("duplicate key value violates unique constraint \"catalogue_pkey\""));
            }
            let mut rows = self.rows.lock().unwrap();
            if records.iter().any(|r| rows.contains_key(&r.product_id)) {
                return Err(anyhow!("unique violation"));
            }
            for r in records {
                rows.insert(r.product_id.clone(), r.clone());
            }
            Ok(records.len() as u64)
        }
    }

    fn meta(ids: &[&str]) -> Arc<MemMetadata> {
        Arc::new(MemMetadata {
            records: ids
                .iter()
                .map(|id| (id.to_string(), MetadataRecord::from_document(*id, &json!({ "name": format!("Name {id}") }))))
                .collect(),
            fail: false,
        })
    }

    fn prices(codes: &[&str]) -> Arc<MemPrices> {
        Arc::new(MemPrices {
            records: codes
                .iter()
                .map(|c| PriceRecord {
                    item_code: Some(c.to_string()),
                    distributor: Some("Acme".into()),
                    ..PriceRecord::default()
                })
                .collect(),
        })
    }

    fn config(dir: &TempDir, chunk_size: usize) -> CollateConfig {
        CollateConfig {
            chunk_size,
            rejections_dir: dir.path().to_path_buf(),
            recorder_poll_interval: Duration::from_millis(10),
            validation_report: Some(dir.path().join("report.log")),
            ..CollateConfig::default()
        }
    }

    fn orchestrator(
        cfg: CollateConfig,
        metadata: Arc<MemMetadata>,
        prices: Arc<MemPrices>,
        catalogue: Arc<MemCatalogue>,
    ) -> Orchestrator {
        Orchestrator::new(cfg, metadata, prices, catalogue)
    }

    fn rows(pairs: &[(&str, &str)]) -> Vec<InputRow> {
        pairs
            .iter()
            .enumerate()
            .map(|(i, (pid, code))| InputRow::new(i as u64 + 1, pid, code))
            .collect()
    }

    fn rejection_rows(path: &Path) -> Vec<Vec<String>> {
        csv::Reader::from_path(path)
            .unwrap()
            .records()
            .map(|r| r.unwrap().iter().map(str::to_string).collect())
            .collect()
    }

    #[tokio::test]
    async fn every_row_lands_in_exactly_one_bucket() {
        let dir = TempDir::new().unwrap();
        let catalogue = Arc::new(MemCatalogue {
            preexisting: vec!["P2".into()],
            ..MemCatalogue::default()
        });
        let mut orch = orchestrator(
            config(&dir, 2),
            meta(&["P1", "P2", "P4", "P5"]),
            prices(&["X1"]),
            catalogue.clone(),
        );
        let input = rows(&[
            ("P1", "X1"),
            ("P1", "X2"),
            ("P2", "X1"),
            ("P3", "X1"),
            ("P4", "NOPE"),
            ("", "X1"),
            ("P5", "x1"),
        ]);
        let report = orch.run_rows(input).await;
        let s = &report.summary;

        assert!(report.fatal.is_none());
        assert_eq!(orch.state(), RunState::Completed);
        assert!(s.is_balanced(), "{s:?}");
        assert_eq!(s.total_rows, 7);
        assert_eq!(s.successful_inserts, 2);
        assert_eq!(s.duplicate_failures, 1);
        assert_eq!(s.existing_products, 1);
        assert_eq!(s.validation_failures, 3);
        assert_eq!(s.skipped_no_metadata, 1);
        assert_eq!(s.skipped_no_pricing, 1);
        assert_eq!(s.skipped_missing_identifier, 1);
        assert_eq!(s.rejections_written, 3);
        assert!(s.errors.is_empty());

        let stored = catalogue.stored();
        assert_eq!(stored.keys().collect::<Vec<_>>(), vec!["P1", "P5"]);
        assert_eq!(stored["P5"].dist_item_code, "x1");

        let rejected = rejection_rows(s.rejection_file.as_ref().unwrap());
        let types: Vec<&str> = rejected.iter().map(|r| r[4].as_str()).collect();
        assert_eq!(types, vec!["Missing Metadata", "Missing Price Details", "Missing Identifier"]);
        assert_eq!(rejected[1][2], "Name P4");
    }

    #[tokio::test]
    async fn rerun_on_same_input_inserts_nothing() {
        let dir = TempDir::new().unwrap();
        let catalogue = Arc::new(MemCatalogue::default());
        let input = rows(&[("P1", "X1"), ("P2", "X2")]);

        let first = orchestrator(config(&dir, 50), meta(&["P1", "P2"]), prices(&["X1", "X2"]), catalogue.clone())
            .run_rows(input.clone())
            .await;
        assert_eq!(first.summary.successful_inserts, 2);

        let second = orchestrator(config(&dir, 50), meta(&["P1", "P2"]), prices(&["X1", "X2"]), catalogue.clone())
            .run_rows(input)
            .await;
        assert!(second.fatal.is_none());
        assert_eq!(second.summary.successful_inserts, 0);
        assert_eq!(second.summary.existing_products, 2);
        assert!(second.summary.errors.is_empty());
        assert_eq!(catalogue.stored().len(), 2);
    }

    #[tokio::test]
    async fn duplicate_product_keeps_first_row_only() {
        let dir = TempDir::new().unwrap();
        let catalogue = Arc::new(MemCatalogue::default());
        let report = orchestrator(config(&dir, 50), meta(&["P1"]), prices(&["X1", "X2"]), catalogue.clone())
            .run_rows(rows(&[("P1", "X1"), (" P1 ", "X2")]))
            .await;
        assert_eq!(report.summary.duplicate_failures, 1);
        assert_eq!(report.summary.validation_failures, 0);
        assert_eq!(report.summary.rejections_written, 0);
        assert_eq!(report.summary.rejection_file, None);
        assert_eq!(catalogue.stored()["P1"].dist_item_code, "X1");
    }

    #[tokio::test]
    async fn missing_metadata_is_recorded_not_inserted() {
        let dir = TempDir::new().unwrap();
        let catalogue = Arc::new(MemCatalogue::default());
        let report = orchestrator(config(&dir, 50), meta(&[]), prices(&["X1"]), catalogue.clone())
            .run_rows(rows(&[("P1", "X1")]))
            .await;
        let s = &report.summary;
        assert_eq!(s.successful_inserts, 0);
        assert_eq!(s.skipped_no_metadata, 1);
        let rejected = rejection_rows(s.rejection_file.as_ref().unwrap());
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0][0], "P1");
        assert_eq!(rejected[0][1], "X1");
        assert_eq!(rejected[0][4], "Missing Metadata");
        assert!(catalogue.stored().is_empty());
    }

    #[tokio::test]
    async fn blank_store_inventory_is_written_as_zero() {
        let dir = TempDir::new().unwrap();
        let catalogue = Arc::new(MemCatalogue::default());
        let mut row = InputRow::new(1, "P1", "X1");
        row.inventory = Some(String::new());
        row.location = LocationInput::Text("A, B".into());
        let report = orchestrator(config(&dir, 50), meta(&["P1"]), prices(&["X1"]), catalogue.clone())
            .run_rows(vec![row])
            .await;
        assert_eq!(report.summary.successful_inserts, 1);
        assert_eq!(report.summary.validation_failures, 0);
        assert_eq!(report.summary.normalization_notes, 1);
        let stored = catalogue.stored();
        assert_eq!(stored["P1"].inventory_quantity, 0);
        assert_eq!(stored["P1"].location, Some(vec!["A".to_string(), "B".to_string()]));
    }

    #[tokio::test]
    async fn failed_chunk_rolls_back_and_run_continues() {
        let dir = TempDir::new().unwrap();
        let catalogue = Arc::new(MemCatalogue {
            fail_on_call: Some(2),
            ..MemCatalogue::default()
        });
        let ids = ["P1", "P2", "P3", "P4", "P5"];
        let input: Vec<InputRow> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| InputRow::new(i as u64 + 1, id, "X1"))
            .collect();
        let report = orchestrator(config(&dir, 2), meta(&ids), prices(&["X1"]), catalogue.clone())
            .run_rows(input)
            .await;
        let s = &report.summary;

        assert!(report.fatal.is_none());
        assert_eq!(report.exit_code(), 0);
        assert_eq!(s.errors.len(), 1);
        assert!(s.errors[0].starts_with("batch 2:"));
        assert_eq!(s.successful_inserts, 3);
        assert_eq!(s.failed_insert_rows, 2);
        assert!(s.is_balanced());
        let stored = catalogue.stored();
        assert_eq!(stored.keys().collect::<Vec<_>>(), vec!["P1", "P2", "P5"]);
    }

    #[tokio::test]
    async fn reference_outage_rejects_rows_instead_of_aborting() {
        let dir = TempDir::new().unwrap();
        let metadata = Arc::new(MemMetadata {
            records: HashMap::new(),
            fail: true,
        });
        let report = orchestrator(config(&dir, 50), metadata, prices(&["X1"]), Arc::new(MemCatalogue::default()))
            .run_rows(rows(&[("P1", "X1"), ("P2", "X1")]))
            .await;
        assert!(report.fatal.is_none());
        assert_eq!(report.summary.skipped_no_metadata, 2);
        assert_eq!(report.summary.rejections_written, 2);
    }

    #[tokio::test]
    async fn existing_check_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let catalogue = Arc::new(MemCatalogue {
            fail_existing: true,
            ..MemCatalogue::default()
        });
        let mut orch = orchestrator(config(&dir, 50), meta(&["P1"]), prices(&["X1"]), catalogue.clone());
        let report = orch.run_rows(rows(&[("P1", "X1")])).await;
        assert!(matches!(report.fatal, Some(CollateError::ExistingCheckFailed(_))));
        assert_eq!(report.exit_code(), 1);
        assert_eq!(orch.state(), RunState::DuplicatesResolved);
        assert!(catalogue.stored().is_empty());
    }

    #[tokio::test]
    async fn unreadable_input_is_fatal() {
        let dir = TempDir::new().unwrap();
        let cfg = CollateConfig {
            input_path: dir.path().join("missing.csv"),
            ..config(&dir, 50)
        };
        let mut orch = orchestrator(cfg, meta(&[]), prices(&[]), Arc::new(MemCatalogue::default()));
        let report = orch.run().await;
        assert!(matches!(report.fatal, Some(CollateError::InputUnreadable { .. })));
        assert_eq!(orch.state(), RunState::Idle);
        assert_eq!(report.summary, RunSummary::default());
    }

    #[tokio::test]
    async fn short_input_rows_are_rejected_not_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ragged.csv");
        std::fs::write(&path, "product_id,item_code,Store Inventory,Location\nP1,X1,3,A\nP2\nP3,X3\n").unwrap();
        let cfg = CollateConfig {
            input_path: path,
            ..config(&dir, 50)
        };
        let catalogue = Arc::new(MemCatalogue::default());
        let mut orch = orchestrator(cfg, meta(&["P1", "P2", "P3"]), prices(&["X1", "X3"]), catalogue.clone());
        let report = orch.run().await;
        assert!(report.fatal.is_none());
        assert_eq!(report.summary.total_rows, 3);
        assert_eq!(report.summary.successful_inserts, 2);
        assert_eq!(report.summary.skipped_missing_identifier, 1);
        assert!(report.summary.is_balanced());
        assert_eq!(catalogue.stored()["P3"].inventory_quantity, 0);
    }

    #[tokio::test]
    async fn validation_report_lists_rejections_and_notes() {
        let dir = TempDir::new().unwrap();
        let mut noted = InputRow::new(2, "P1", "X1");
        noted.inventory = Some("lots".into());
        let input = vec![InputRow::new(1, "P9", "X1"), noted];
        let report = orchestrator(config(&dir, 50), meta(&["P1"]), prices(&["X1"]), Arc::new(MemCatalogue::default()))
            .run_rows(input)
            .await;
        assert_eq!(report.summary.normalization_notes, 1);
        let path = report.summary.validation_report.clone().unwrap();
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("Row Index: 1\nProduct ID: P9\n"));
        assert!(text.contains("Missing Metadata: "));
        assert!(text.contains("Row Index: 2\nProduct ID: P1\n"));
    }

    #[test]
    fn dedupe_leaves_rows_without_id_alone() {
        let (kept, removed) = dedupe_rows(rows(&[("", "X1"), ("", "X2"), ("P1", "X1"), ("P1", "X1")]));
        assert_eq!(kept.len(), 3);
        assert_eq!(removed, 1);
    }
}

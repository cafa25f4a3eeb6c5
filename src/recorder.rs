//! Side-channel for rejected rows.
//!
//! Producers hold a cloneable [`RejectionSender`] and never wait on I/O: a
//! record goes onto an unbounded channel and a single background task hands
//! queued records to a CSV sink on the blocking pool. [`RejectionRecorder::shutdown`] raises the stop signal,
//! lets the task drain whatever is still queued and waits for the final flush.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::model::RejectionRecord;

#[derive(Debug, Clone)]
pub struct RecorderConfig {
    pub dir: PathBuf,
    pub prefix: String,
    /// Upper bound on how long the worker waits for a record before
    /// re-checking the stop signal.
    pub poll_interval: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            prefix: "collation_skipped_rows".to_string(),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// What the recorder persisted over its lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecorderReport {
    pub written: u64,
    pub failed: u64,
    /// Set only when at least one record reached the sink.
    pub path: Option<PathBuf>,
}

#[derive(Clone)]
pub struct RejectionSender {
    tx: mpsc::UnboundedSender<RejectionRecord>,
}

impl RejectionSender {
    /// Enqueue a record. Returns false if the recorder has already shut down.
    pub fn record(&self, record: RejectionRecord) -> bool {
        match self.tx.send(record) {
            Ok(()) => true,
            Err(mpsc::error::SendError(rec)) => {
                warn!(product_id = %rec.product_id, error_type = %rec.error_type, "rejection recorder closed; record dropped");
                false
            }
        }
    }
}

pub struct RejectionRecorder {
    tx: mpsc::UnboundedSender<RejectionRecord>,
    stop: watch::Sender<bool>,
    worker: JoinHandle<RecorderReport>,
    path: PathBuf,
}

impl RejectionRecorder {
    /// Start the background worker. The sink file is named
    /// `<prefix>_<YYYYmmdd_HHMMSS>.csv` and only created on the first record.
    pub fn spawn(cfg: RecorderConfig) -> Self {
        let stamp = Local::now().format("%Y%m%d_%H%M%S");
        let path = cfg.dir.join(format!("{}_{}.csv", cfg.prefix, stamp));
        let (tx, rx) = mpsc::unbounded_channel();
        let (stop, stop_rx) = watch::channel(false);
        let sink = CsvSink::new(path.clone());
        let worker = tokio::spawn(run_worker(rx, stop_rx, sink, cfg.poll_interval));
        info!(path = %path.display(), "rejection recorder started");
        Self { tx, stop, worker, path }
    }

    pub fn sender(&self) -> RejectionSender {
        RejectionSender { tx: self.tx.clone() }
    }

    /// Where rejections go (the file may not exist yet).
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Signal stop, wait until every queued record is persisted, and report.
    pub async fn shutdown(self) -> Result<RecorderReport> {
        let Self { tx, stop, worker, path } = self;
        drop(tx);
        // The worker may already have exited because every sender is gone.
        let _ = stop.send(true);
        let report = worker
            .await
            .map_err(|e| anyhow!("rejection recorder task failed: {e}"))?;
        if report.written > 0 {
            info!(written = report.written, path = %path.display(), "all skipped rows have been written");
        }
        if report.failed > 0 {
            return Err(anyhow!(
                "{} rejection record(s) could not be written to {}",
                report.failed,
                path.display()
            ));
        }
        Ok(report)
    }
}

async fn run_worker(
    mut rx: mpsc::UnboundedReceiver<RejectionRecord>,
    stop: watch::Receiver<bool>,
    mut sink: CsvSink,
    poll_interval: Duration,
) -> RecorderReport {
    loop {
        let mut batch = Vec::new();
        let mut closed = false;
        match tokio::time::timeout(poll_interval, rx.recv()).await {
            Ok(Some(record)) => batch.push(record),
            Ok(None) => closed = true,
            Err(_elapsed) => {}
        }
        let stopping = closed || *stop.borrow();
        while let Ok(record) = rx.try_recv() {
            batch.push(record);
        }
        if !batch.is_empty() {
            sink = match persist(sink, batch).await {
                Ok(sink) => sink,
                Err(report) => return report,
            };
        }
        if stopping {
            break;
        }
    }
    debug!(written = sink.written, failed = sink.failed, "rejection recorder drained");
    let (written, failed, path) = (sink.written, sink.failed, sink.path.clone());
    tokio::task::spawn_blocking(move || sink.finish())
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "rejection sink task failed during final flush");
            RecorderReport {
                written,
                failed,
                path: (written > 0).then_some(path),
            }
        })
}

/// Write a batch on the blocking pool so file I/O never runs on an executor thread.
async fn persist(mut sink: CsvSink, batch: Vec<RejectionRecord>) -> Result<CsvSink, RecorderReport> {
    let written = sink.written;
    let failed = sink.failed + batch.len() as u64;
    let path = sink.path.clone();
    tokio::task::spawn_blocking(move || {
        for record in &batch {
            sink.append(record);
        }
        sink
    })
    .await
    .map_err(|e| {
        error!(error = %e, path = %path.display(), "rejection sink task failed");
        RecorderReport {
            written,
            failed,
            path: (written > 0).then_some(path),
        }
    })
}

/// Append-only CSV file with the rejection column order. Created lazily;
/// the header is written only when the file starts out empty.
struct CsvSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    written: u64,
    failed: u64,
}

impl CsvSink {
    fn new(path: PathBuf) -> Self {
        Self {
            path,
            writer: None,
            written: 0,
            failed: 0,
        }
    }

    fn append(&mut self, record: &RejectionRecord) {
        match self.try_append(record) {
            Ok(()) => self.written += 1,
            Err(e) => {
                self.failed += 1;
                error!(
                    error = %format!("{e:#}"),
                    product_id = %record.product_id,
                    path = %self.path.display(),
                    "failed to persist rejection record"
                );
            }
        }
    }

    fn try_append(&mut self, record: &RejectionRecord) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(self.open()?);
        }
        let Some(writer) = self.writer.as_mut() else {
            return Err(anyhow!("rejection sink unavailable"));
        };
        writer.serialize(record)?;
        // Flush per record so the file is inspectable while the run is going.
        writer.flush()?;
        Ok(())
    }

    fn open(&self) -> Result<csv::Writer<File>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        let is_new = file.metadata().map(|m| m.len() == 0).unwrap_or(true);
        Ok(csv::WriterBuilder::new()
            .has_headers(is_new)
            .from_writer(file))
    }

    fn finish(mut self) -> RecorderReport {
        if let Some(writer) = self.writer.as_mut() {
            if let Err(e) = writer.flush() {
                error!(error = %e, path = %self.path.display(), "final flush of rejection sink failed");
            }
        }
        RecorderReport {
            written: self.written,
            failed: self.failed,
            path: self.writer.as_ref().map(|_| self.path.clone()),
        }
    }
}

use std::sync::Arc;

use tracing::info;

use crate::config::{CollateConfig, ConfigOverrides};
use crate::database_ops::{PgCatalogueStore, PgMetadataSource, PgPriceSource};
use crate::error::CollateError;
use crate::orchestrator::{Orchestrator, RunReport};
use crate::summary::RunSummary;
use crate::util::db::Db;

#[derive(Debug, Clone, Default)]
pub struct MigrateConfig {
    pub overrides: ConfigOverrides,
    /// Print the summary as JSON instead of the text block.
    pub json: bool,
}

/// Resolve config, connect both stores, run the pipeline and print the summary.
/// The summary is printed on every path, including fatal ones.
pub async fn run(cfg: MigrateConfig) -> RunReport {
    let report = execute(cfg.overrides).await;
    print_summary(&report, cfg.json);
    report
}

async fn execute(overrides: ConfigOverrides) -> RunReport {
    let aborted = |fatal: CollateError| RunReport {
        summary: RunSummary::default(),
        fatal: Some(fatal),
    };

    let cfg = match CollateConfig::resolve(overrides) {
        Ok(cfg) => cfg,
        Err(e) => return aborted(e),
    };
    cfg.log_snapshot();

    let ssl_root_cert = cfg.ssl_root_cert.as_deref();
    let catalogue_db = match Db::connect("catalogue", &cfg.catalogue_db_url, cfg.max_connections, ssl_root_cert).await {
        Ok(db) => db,
        Err(source) => {
            return aborted(CollateError::StoreUnreachable {
                store: "catalogue",
                source,
            })
        }
    };
    let erp_db = match Db::connect("erp", &cfg.erp_db_url, cfg.max_connections, ssl_root_cert).await {
        Ok(db) => db,
        Err(source) => {
            catalogue_db.close().await;
            return aborted(CollateError::StoreUnreachable { store: "erp", source });
        }
    };

    let metadata = Arc::new(PgMetadataSource::new(catalogue_db.clone(), cfg.metadata_table.clone()));
    let prices = Arc::new(PgPriceSource::new(erp_db.clone(), cfg.price_table.clone()));
    let catalogue = Arc::new(PgCatalogueStore::new(catalogue_db.clone(), cfg.catalogue_table.clone()));

    let mut orchestrator = Orchestrator::new(cfg, metadata, prices, catalogue);
    let report = orchestrator.run().await;

    catalogue_db.close().await;
    erp_db.close().await;
    info!(state = ?orchestrator.state(), "migrate done");
    report
}

fn print_summary(report: &RunReport, json: bool) {
    if json {
        let out = serde_json::json!({
            "summary": &report.summary,
            "fatal": report.fatal.as_ref().map(|e| e.to_string()),
        });
        match serde_json::to_string_pretty(&out) {
            Ok(text) => println!("{text}"),
            Err(e) => eprintln!("failed to encode summary: {e}"),
        }
    } else {
        print!("{}", report.summary.render(report.fatal.as_ref()));
    }
}

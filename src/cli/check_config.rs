use anyhow::Result;
use serde_json::json;
use tracing::info;

use crate::config::{CollateConfig, ConfigOverrides};
use crate::error::CollateError;
use crate::util::db::Db;
use crate::util::env as env_util;

#[derive(Debug, Clone, Default)]
pub struct CheckConfigConfig {
    pub overrides: ConfigOverrides,
    /// Also open both pools and run `SELECT 1`.
    pub connect: bool,
}

pub async fn run(cfg: CheckConfigConfig) -> Result<(), CollateError> {
    let resolved = CollateConfig::resolve(cfg.overrides)?;
    resolved.log_snapshot();

    let mut out = json!({
        "input": resolved.input_path.display().to_string(),
        "catalogue_db": env_util::redact_value("CATALOGUE_DATABASE_URL", &resolved.catalogue_db_url),
        "erp_db": env_util::redact_value("ERP_DATABASE_URL", &resolved.erp_db_url),
        "batch_size": resolved.chunk_size,
        "tables": {
            "catalogue": resolved.catalogue_table.to_string(),
            "metadata": resolved.metadata_table.to_string(),
            "prices": resolved.price_table.to_string(),
        },
        "price_match": resolved.price_match_policy.to_string(),
        "rejections_dir": resolved.rejections_dir.display().to_string(),
    });

    if cfg.connect {
        let cert = resolved.ssl_root_cert.as_deref();
        for (store, url) in [("catalogue", &resolved.catalogue_db_url), ("erp", &resolved.erp_db_url)] {
            let db = Db::connect(store, url, 1, cert)
                .await
                .map_err(|source| CollateError::StoreUnreachable { store, source })?;
            db.close().await;
            out[format!("{store}_connection").as_str()] = json!("ok");
        }
    }

    match serde_json::to_string_pretty(&out) {
        Ok(text) => println!("{text}"),
        Err(e) => eprintln!("failed to encode config: {e}"),
    }
    info!("check-config done");
    Ok(())
}

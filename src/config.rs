//! Run configuration. Resolved once from CLI flags and the environment and
//! then passed by value into the orchestrator.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::info;

use crate::database_ops::TableName;
use crate::error::CollateError;
use crate::recorder::RecorderConfig;
use crate::resolve::PriceMatchPolicy;
use crate::util::env as env_util;

pub const DEFAULT_INPUT: &str = "single_product_test.csv";
pub const DEFAULT_CHUNK_SIZE: usize = 50;
pub const DEFAULT_VALIDATION_REPORT: &str = "collation_validation_errors.log";

#[derive(Debug, Clone)]
pub struct CollateConfig {
    pub input_path: PathBuf,
    pub catalogue_db_url: String,
    pub erp_db_url: String,
    pub ssl_root_cert: Option<PathBuf>,
    pub max_connections: u32,
    pub chunk_size: usize,
    pub catalogue_table: TableName,
    pub metadata_table: TableName,
    pub price_table: TableName,
    pub price_match_policy: PriceMatchPolicy,
    pub rejections_dir: PathBuf,
    pub rejections_prefix: String,
    pub recorder_poll_interval: Duration,
    /// `None` disables the report.
    pub validation_report: Option<PathBuf>,
}

impl Default for CollateConfig {
    fn default() -> Self {
        let recorder = RecorderConfig::default();
        Self {
            input_path: PathBuf::from(DEFAULT_INPUT),
            catalogue_db_url: String::new(),
            erp_db_url: String::new(),
            ssl_root_cert: None,
            max_connections: 2,
            chunk_size: DEFAULT_CHUNK_SIZE,
            catalogue_table: TableName::builtin("catalogue"),
            metadata_table: TableName::builtin("original_all_products"),
            price_table: TableName::builtin("distributor_master_list"),
            price_match_policy: PriceMatchPolicy::default(),
            rejections_dir: recorder.dir,
            rejections_prefix: recorder.prefix,
            recorder_poll_interval: recorder.poll_interval,
            validation_report: Some(PathBuf::from(DEFAULT_VALIDATION_REPORT)),
        }
    }
}

/// Values supplied on the command line; each one wins over its env var.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub input_path: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub catalogue_db_url: Option<String>,
    pub erp_db_url: Option<String>,
    pub rejections_dir: Option<PathBuf>,
    pub price_match_policy: Option<PriceMatchPolicy>,
    pub validation_report: Option<PathBuf>,
    pub no_validation_report: bool,
}

impl CollateConfig {
    /// Resolve from overrides, then the process environment (`.env` included).
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self, CollateError> {
        env_util::init_env();
        let catalogue_db_url = match overrides.catalogue_db_url.clone() {
            Some(url) => url,
            None => env_util::catalogue_db_url().map_err(|e| CollateError::Config(format!("{e:#}")))?,
        };
        let erp_db_url = match overrides.erp_db_url.clone() {
            Some(url) => url,
            None => env_util::erp_db_url().map_err(|e| CollateError::Config(format!("{e:#}")))?,
        };
        let overrides = ConfigOverrides {
            catalogue_db_url: Some(catalogue_db_url),
            erp_db_url: Some(erp_db_url),
            ..overrides
        };
        Self::resolve_with(overrides, env_util::env_opt)
    }

    /// Same as [`CollateConfig::resolve`] but reads settings through `lookup`.
    /// DSNs must already be present in `overrides`.
    pub fn resolve_with(
        overrides: ConfigOverrides,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CollateError> {
        let defaults = Self::default();

        let chunk_size = match overrides.chunk_size {
            Some(n) => n,
            None => parse_setting(&lookup, "COLLATE_BATCH_SIZE")?.unwrap_or(defaults.chunk_size),
        };
        if chunk_size == 0 {
            return Err(CollateError::Config("batch size must be at least 1".into()));
        }

        let table = |key: &str, fallback: TableName| -> Result<TableName, CollateError> {
            match lookup(key) {
                Some(raw) => TableName::parse(raw.trim()).map_err(|e| CollateError::Config(format!("{key}: {e}"))),
                None => Ok(fallback),
            }
        };

        let price_match_policy = match overrides.price_match_policy {
            Some(p) => p,
            None => parse_setting(&lookup, "COLLATE_PRICE_MATCH")?.unwrap_or(defaults.price_match_policy),
        };

        let recorder_poll_interval = parse_setting::<u64>(&lookup, "COLLATE_RECORDER_POLL_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.recorder_poll_interval);
        if recorder_poll_interval.is_zero() {
            return Err(CollateError::Config("COLLATE_RECORDER_POLL_MS must be positive".into()));
        }

        let validation_report = if overrides.no_validation_report {
            None
        } else {
            overrides
                .validation_report
                .or_else(|| lookup("COLLATE_VALIDATION_REPORT").map(PathBuf::from))
                .or(defaults.validation_report)
        };

        let catalogue_db_url = overrides
            .catalogue_db_url
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CollateError::Config("catalogue database URL is empty".into()))?;
        let erp_db_url = overrides
            .erp_db_url
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| CollateError::Config("erp database URL is empty".into()))?;

        Ok(Self {
            input_path: overrides
                .input_path
                .or_else(|| lookup("COLLATE_INPUT").map(PathBuf::from))
                .unwrap_or(defaults.input_path),
            catalogue_db_url,
            erp_db_url,
            ssl_root_cert: lookup("PG_SSL_ROOT_CERT").map(PathBuf::from),
            max_connections: parse_setting(&lookup, "DB_MAX_CONNECTIONS")?.unwrap_or(defaults.max_connections),
            chunk_size,
            catalogue_table: table("CATALOGUE_TABLE", defaults.catalogue_table)?,
            metadata_table: table("METADATA_TABLE", defaults.metadata_table)?,
            price_table: table("PRICE_TABLE", defaults.price_table)?,
            price_match_policy,
            rejections_dir: overrides
                .rejections_dir
                .or_else(|| lookup("COLLATE_REJECTIONS_DIR").map(PathBuf::from))
                .unwrap_or(defaults.rejections_dir),
            rejections_prefix: lookup("COLLATE_REJECTIONS_PREFIX").unwrap_or(defaults.rejections_prefix),
            recorder_poll_interval,
            validation_report,
        })
    }

    pub fn recorder(&self) -> RecorderConfig {
        RecorderConfig {
            dir: self.rejections_dir.clone(),
            prefix: self.rejections_prefix.clone(),
            poll_interval: self.recorder_poll_interval,
        }
    }

    /// Log the effective settings with credentials masked.
    pub fn log_snapshot(&self) {
        info!(
            input = %self.input_path.display(),
            catalogue_db = %env_util::redact_value("CATALOGUE_DATABASE_URL", &self.catalogue_db_url),
            erp_db = %env_util::redact_value("ERP_DATABASE_URL", &self.erp_db_url),
            ssl_root_cert = ?self.ssl_root_cert,
            max_connections = self.max_connections,
            chunk_size = self.chunk_size,
            catalogue_table = %self.catalogue_table,
            metadata_table = %self.metadata_table,
            price_table = %self.price_table,
            price_match = %self.price_match_policy,
            rejections_dir = %self.rejections_dir.display(),
            validation_report = ?self.validation_report,
            "collation config"
        );
    }
}

fn parse_setting<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>, CollateError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| CollateError::Config(format!("{key}={raw:?}: {e}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn with_dsns() -> ConfigOverrides {
        ConfigOverrides {
            catalogue_db_url: Some("postgres://app:pw@db/catalogue".into()),
            erp_db_url: Some("postgres://erp:pw@erp/erp".into()),
            ..ConfigOverrides::default()
        }
    }

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let cfg = CollateConfig::resolve_with(with_dsns(), env(&[])).unwrap();
        assert_eq!(cfg.chunk_size, 50);
        assert_eq!(cfg.input_path, PathBuf::from("single_product_test.csv"));
        assert_eq!(cfg.catalogue_table.to_string(), "catalogue");
        assert_eq!(cfg.price_table.to_string(), "distributor_master_list");
        assert_eq!(cfg.price_match_policy, PriceMatchPolicy::LastMatch);
        assert_eq!(cfg.recorder().prefix, "collation_skipped_rows");
        assert_eq!(cfg.validation_report, Some(PathBuf::from(DEFAULT_VALIDATION_REPORT)));
    }

    #[test]
    fn flags_win_over_env() {
        let overrides = ConfigOverrides {
            chunk_size: Some(7),
            price_match_policy: Some(PriceMatchPolicy::FirstMatch),
            ..with_dsns()
        };
        let cfg = CollateConfig::resolve_with(
            overrides,
            env(&[("COLLATE_BATCH_SIZE", "100"), ("COLLATE_PRICE_MATCH", "last-match"), ("METADATA_TABLE", "ref.products")]),
        )
        .unwrap();
        assert_eq!(cfg.chunk_size, 7);
        assert_eq!(cfg.price_match_policy, PriceMatchPolicy::FirstMatch);
        assert_eq!(cfg.metadata_table.quoted(), "\"ref\".\"products\"");
    }

    #[test]
    fn invalid_settings_are_config_errors() {
        let zero = ConfigOverrides { chunk_size: Some(0), ..with_dsns() };
        assert!(matches!(CollateConfig::resolve_with(zero, env(&[])), Err(CollateError::Config(_))));

        for pairs in [
            [("COLLATE_BATCH_SIZE", "fifty")],
            [("CATALOGUE_TABLE", "catalogue; drop table x")],
            [("COLLATE_PRICE_MATCH", "random")],
            [("COLLATE_RECORDER_POLL_MS", "0")],
        ] {
            let err = CollateConfig::resolve_with(with_dsns(), env(&pairs)).unwrap_err();
            assert_eq!(err.exit_code(), 2, "{pairs:?}");
        }

        let no_dsn = ConfigOverrides { erp_db_url: Some("  ".into()), ..with_dsns() };
        assert!(CollateConfig::resolve_with(no_dsn, env(&[])).is_err());
    }

    #[test]
    fn validation_report_can_be_disabled() {
        let overrides = ConfigOverrides { no_validation_report: true, ..with_dsns() };
        let cfg = CollateConfig::resolve_with(overrides, env(&[("COLLATE_VALIDATION_REPORT", "x.log")])).unwrap();
        assert_eq!(cfg.validation_report, None);
    }
}

use anyhow::{Context, Result};
use sqlx::{
    postgres::{PgConnectOptions, PgPoolOptions, PgSslMode},
    PgPool,
};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, instrument};

#[derive(Clone)]
pub struct Db {
    pub pool: PgPool,
}

impl Db {
    // SECURITY: never include raw DSNs in tracing spans (they may contain credentials).
    #[instrument(skip(database_url, ssl_root_cert))]
    pub async fn connect(
        label: &str,
        database_url: &str,
        max_connections: u32,
        ssl_root_cert: Option<&Path>,
    ) -> Result<Self> {
        let mut connect_options = PgConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid {label} database URL"))?;

        if database_url.contains("sslmode=require") && !database_url.contains("sslmode=disable") {
            connect_options = connect_options.ssl_mode(PgSslMode::Require);
        }
        if let Some(cert) = ssl_root_cert {
            connect_options = connect_options.ssl_root_cert(cert);
        }
        // PgBouncer txn mode safe
        connect_options = connect_options.statement_cache_capacity(0);

        let pool = PgPoolOptions::new()
            .max_connections(max_connections.max(1))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(600))
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to connect to {label} database"))?;

        // Fail fast on credentials/network problems instead of at the first chunk.
        sqlx::query("SELECT 1")
            .persistent(false)
            .execute(&pool)
            .await
            .with_context(|| format!("{label} database did not answer SELECT 1"))?;

        info!(store = label, max_connections, "connected to db");
        Ok(Self { pool })
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

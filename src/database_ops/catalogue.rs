use std::collections::HashSet;

use anyhow::{anyhow, Context, Result};
use sqlx::types::Json;
use sqlx::QueryBuilder;
use tracing::{info, instrument, warn};

use super::{CatalogueStore, TableName};
use crate::model::{catalogue_columns, MergedRecord};
use crate::util::db::Db;

/// The destination catalogue table. Single owner: only the orchestrator's
/// pipeline writes through it.
#[derive(Clone)]
pub struct PgCatalogueStore {
    db: Db,
    table: TableName,
}

impl PgCatalogueStore {
    pub fn new(db: Db, table: TableName) -> Self {
        Self { db, table }
    }
}

#[async_trait::async_trait]
impl CatalogueStore for PgCatalogueStore {
    #[instrument(skip(self, product_ids), fields(table = %self.table, ids = product_ids.len()))]
    async fn existing_product_ids(&self, product_ids: &[String]) -> Result<HashSet<String>> {
        if product_ids.is_empty() {
            return Ok(HashSet::new());
        }
        let sql = format!(
            "SELECT product_id::text FROM {} WHERE product_id = ANY($1)",
            self.table.quoted()
        );
        let existing: Vec<String> = sqlx::query_scalar(&sql)
            .persistent(false)
            .bind(product_ids)
            .fetch_all(&self.db.pool)
            .await
            .with_context(|| format!("existence check on {} failed", self.table))?;
        Ok(existing.into_iter().collect())
    }

    #[instrument(skip(self, records), fields(table = %self.table, rows = records.len()))]
    async fn insert_batch(&self, records: &[MergedRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }
        let table = self.table.quoted();
        let columns = catalogue_columns().join(", ");

        // jsonb_populate_recordset lets the destination's own column types
        // drive conversion (numeric, text[], jsonb, timestamps).
        let mut qb: QueryBuilder<'_, sqlx::Postgres> =
            QueryBuilder::new(format!("INSERT INTO {table} ({columns}) SELECT {columns} FROM jsonb_populate_recordset(NULL::{table}, "));
        qb.push_bind(Json(records));
        qb.push(")");

        let mut tx = self.db.pool.begin().await?;
        let result = qb.build().persistent(false).execute(&mut *tx).await;
        match result {
            Ok(done) if done.rows_affected() == records.len() as u64 => {
                tx.commit().await.context("commit of catalogue batch failed")?;
                info!(inserted = done.rows_affected(), "catalogue batch committed");
                Ok(done.rows_affected())
            }
            Ok(done) => {
                rollback(tx).await;
                Err(anyhow!(
                    "catalogue insert wrote {} of {} rows; rolled back",
                    done.rows_affected(),
                    records.len()
                ))
            }
            Err(e) => {
                rollback(tx).await;
                Err(anyhow::Error::new(e).context(format!("insert into {} failed; rolled back", self.table)))
            }
        }
    }
}

async fn rollback(tx: sqlx::Transaction<'_, sqlx::Postgres>) {
    if let Err(e) = tx.rollback().await {
        warn!(error = %e, "rollback failed; transaction is discarded with the connection");
    }
}

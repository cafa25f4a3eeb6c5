use anyhow::{Context, Result};
use sqlx::Row;
use tracing::{debug, instrument};

use super::{MetadataSource, PriceSource, TableName};
use crate::model::{MetadataRecord, PriceRecord};
use crate::util::db::Db;

/// Product metadata rows (`original_all_products` by default) on the catalogue database.
#[derive(Clone)]
pub struct PgMetadataSource {
    db: Db,
    table: TableName,
}

impl PgMetadataSource {
    pub fn new(db: Db, table: TableName) -> Self {
        Self { db, table }
    }
}

#[async_trait::async_trait]
impl MetadataSource for PgMetadataSource {
    #[instrument(skip(self, product_ids), fields(table = %self.table, ids = product_ids.len()))]
    async fn fetch_metadata(&self, product_ids: &[String]) -> Result<Vec<MetadataRecord>> {
        if product_ids.is_empty() {
            return Ok(Vec::new());
        }
        // Whole-row JSON keeps the source's native column types; the record
        // projects it onto the catalogue's descriptive columns.
        let sql = format!(
            "SELECT t.product_id::text AS product_id, to_jsonb(t) AS doc
             FROM {} t
             WHERE t.product_id = ANY($1)",
            self.table.quoted()
        );
        let rows = sqlx::query(&sql)
            .persistent(false)
            .bind(product_ids)
            .fetch_all(&self.db.pool)
            .await
            .with_context(|| format!("metadata lookup on {} failed", self.table))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let product_id: String = row.try_get("product_id")?;
            let doc: serde_json::Value = row.try_get("doc")?;
            out.push(MetadataRecord::from_document(product_id, &doc));
        }
        debug!(found = out.len(), "metadata rows fetched");
        Ok(out)
    }
}

/// Distributor price list (`distributor_master_list` by default) on the ERP database.
#[derive(Clone)]
pub struct PgPriceSource {
    db: Db,
    table: TableName,
}

impl PgPriceSource {
    pub fn new(db: Db, table: TableName) -> Self {
        Self { db, table }
    }
}

#[async_trait::async_trait]
impl PriceSource for PgPriceSource {
    #[instrument(skip(self, codes), fields(table = %self.table, codes = codes.len()))]
    async fn fetch_prices(&self, codes: &[String]) -> Result<Vec<PriceRecord>> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        // ORDER BY keeps "which record wins" stable when a code maps to several rows.
        let sql = format!(
            "SELECT item_code::text AS item_code,
                    original_item_code::text AS original_item_code,
                    product_name::text AS product_name,
                    manufacturer::text AS manufacturer,
                    mrp::numeric AS mrp,
                    purchase_rate::numeric AS purchase_rate,
                    gst_rate::numeric AS gst_rate,
                    plazza_selling_price_incl_gst::numeric AS plazza_selling_price_incl_gst,
                    effective_customer_discount::numeric AS effective_customer_discount,
                    distributor::text AS distributor,
                    hsn_code::text AS hsn_code
             FROM {}
             WHERE LOWER(item_code) = ANY($1) OR LOWER(original_item_code) = ANY($1)
             ORDER BY item_code NULLS FIRST, original_item_code NULLS FIRST, ctid",
            self.table.quoted()
        );
        let rows = sqlx::query_as::<_, PriceRecord>(&sql)
            .persistent(false)
            .bind(codes)
            .fetch_all(&self.db.pool)
            .await
            .with_context(|| format!("price lookup on {} failed", self.table))?;
        debug!(found = rows.len(), "price rows fetched");
        Ok(rows)
    }
}

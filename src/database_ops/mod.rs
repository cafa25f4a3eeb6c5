//! Store seams used by the pipeline and their Postgres implementations.

pub mod catalogue;
pub mod reference;
pub mod table;

use std::collections::HashSet;

use anyhow::Result;

use crate::model::{MergedRecord, MetadataRecord, PriceRecord};

pub use catalogue::PgCatalogueStore;
pub use reference::{PgMetadataSource, PgPriceSource};
pub use table::TableName;

/// Read-only product metadata reference source.
#[async_trait::async_trait]
pub trait MetadataSource: Send + Sync {
    /// One round trip for the whole id set. Unknown ids are simply absent.
    async fn fetch_metadata(&self, product_ids: &[String]) -> Result<Vec<MetadataRecord>>;
}

/// Read-only distributor pricing reference source.
#[async_trait::async_trait]
pub trait PriceSource: Send + Sync {
    /// `codes` are lowercased. Returns every record whose canonical or
    /// alternate code matches one of them (case-insensitively), in an order
    /// that is stable for identical input.
    async fn fetch_prices(&self, codes: &[String]) -> Result<Vec<PriceRecord>>;
}

/// Destination catalogue.
#[async_trait::async_trait]
pub trait CatalogueStore: Send + Sync {
    async fn existing_product_ids(&self, product_ids: &[String]) -> Result<HashSet<String>>;

    /// Insert every record or none of them. Returns the number of rows written.
    async fn insert_batch(&self, records: &[MergedRecord]) -> Result<u64>;
}

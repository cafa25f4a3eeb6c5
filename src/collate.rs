//! Row-level validation and merge.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::model::{
    InputRow, MergedRecord, MetadataRecord, PriceRecord, RejectionKind, RejectionRecord,
    ReservedFields, DEFAULT_FULFILLED_BY,
};
use crate::normalization::{normalize_inventory, normalize_location};
use crate::resolve::{Lookup, Resolved};

/// A row kept out of the catalogue, with whatever was known about it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowRejection {
    pub line: u64,
    pub kind: RejectionKind,
    pub product_id: String,
    pub item_code: String,
    pub name: String,
    pub details: String,
}

impl RowRejection {
    pub fn to_record(&self) -> RejectionRecord {
        RejectionRecord::new(self.kind, &self.product_id, &self.item_code, &self.name, self.details.clone())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Accepted(MergedRecord),
    Rejected(RowRejection),
}

/// Validate one row against the chunk's resolved reference data and merge it.
///
/// Only a missing identifier, metadata or price match rejects; inventory and
/// location problems are normalized to safe defaults and kept as notes.
pub fn collate_row(
    row: &InputRow,
    metadata: &Resolved<MetadataRecord>,
    prices: &Resolved<PriceRecord>,
    now: DateTime<Utc>,
) -> RowOutcome {
    let product_id = row.product_key().unwrap_or_default();
    let item_code = row.item_key().unwrap_or_default();

    if product_id.is_empty() || item_code.is_empty() {
        let missing = match (product_id.is_empty(), item_code.is_empty()) {
            (true, true) => "product_id and item_code are required",
            (true, false) => "product_id is required",
            _ => "item_code is required",
        };
        return RowOutcome::Rejected(RowRejection {
            line: row.line,
            kind: RejectionKind::MissingIdentifier,
            product_id: product_id.to_string(),
            item_code: item_code.to_string(),
            name: String::new(),
            details: missing.to_string(),
        });
    }

    let Lookup::Found(meta) = metadata.lookup(product_id) else {
        return RowOutcome::Rejected(RowRejection {
            line: row.line,
            kind: RejectionKind::MissingMetadata,
            product_id: product_id.to_string(),
            item_code: item_code.to_string(),
            name: String::new(),
            details: format!("Product metadata not found for product_id: {product_id}"),
        });
    };

    let Lookup::Found(price) = prices.lookup(item_code) else {
        return RowOutcome::Rejected(RowRejection {
            line: row.line,
            kind: RejectionKind::MissingPricing,
            product_id: product_id.to_string(),
            item_code: item_code.to_string(),
            name: meta.name().unwrap_or_default().to_string(),
            details: format!("Price details not found for item_code: {item_code}"),
        });
    };

    let mut notes = Vec::new();
    let inventory_quantity = normalize_inventory(row.inventory.as_deref(), &mut notes);
    let location = normalize_location(&row.location, &mut notes);

    let mut descriptive = meta.attributes.clone();
    if let Some(slot) = descriptive.get_mut("fulfilled_by") {
        if slot.is_null() {
            *slot = Value::String(DEFAULT_FULFILLED_BY.to_string());
        }
    }

    RowOutcome::Accepted(MergedRecord {
        product_id: product_id.to_string(),
        dist_item_code: item_code.to_string(),
        metadata: descriptive,
        inventory_quantity,
        location,
        distributor_mrp: price.mrp.clone(),
        plazza_selling_price_incl_gst: price.plazza_selling_price_incl_gst.clone(),
        effective_customer_discount: price.effective_customer_discount.clone(),
        distributor: price.distributor.clone(),
        gst_rate: price.gst_rate.clone(),
        hsn_code: price.hsn_code.clone(),
        updated_at: now,
        created_at: now,
        reserved: ReservedFields::default(),
        notes,
    })
}

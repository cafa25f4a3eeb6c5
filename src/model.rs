//! Row, reference and output record types shared across the pipeline.

use bigdecimal::BigDecimal;
use chrono::{DateTime, Local, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

/// Descriptive product attributes copied from the metadata source into the
/// catalogue, in insert order.
pub const METADATA_COLUMNS: [&str; 46] = [
    "name",
    "manufacturers",
    "salt_composition",
    "medicine_type",
    "introduction",
    "benefits",
    "description",
    "how_to_use",
    "safety_advise",
    "if_miss",
    "packaging_detail",
    "package",
    "qty",
    "product_form",
    "mrp",
    "prescription_required",
    "fact_box",
    "primary_use",
    "storage",
    "use_of",
    "common_side_effect",
    "alcohol_interaction",
    "pregnancy_interaction",
    "lactation_interaction",
    "driving_interaction",
    "kidney_interaction",
    "liver_interaction",
    "manufacturer_address",
    "q_a",
    "how_it_works",
    "interaction",
    "manufacturer_details",
    "marketer_details",
    "reference",
    "normalized_name",
    "image_url",
    "plazza_price_pack",
    "fulfilled_by",
    "name_search_words",
    "directions_for_use",
    "information",
    "key_benefits",
    "key_ingredients",
    "safety_information",
    "breadcrumbs",
    "country_of_origin",
];

pub const DEFAULT_FULFILLED_BY: &str = "Fulfilled by Plazza";

const IDENTITY_COLUMNS: [&str; 2] = ["product_id", "dist_item_code"];

const OPERATIONAL_COLUMNS: [&str; 10] = [
    "inventory_quantity",
    "location",
    "distributor_mrp",
    "plazza_selling_price_incl_gst",
    "effective_customer_discount",
    "distributor",
    "gst_rate",
    "hsn_code",
    "updated_at",
    "created_at",
];

const RESERVED_COLUMNS: [&str; 11] = [
    "c1",
    "c2",
    "c3",
    "c4",
    "c5",
    "product_category_name",
    "product_category_id",
    "product_use_case_name",
    "product_use_case_id",
    "product_sub_category_id",
    "product_sub_category_name",
];

/// Full catalogue column list written for every merged record.
pub fn catalogue_columns() -> Vec<&'static str> {
    IDENTITY_COLUMNS
        .iter()
        .chain(METADATA_COLUMNS.iter())
        .chain(OPERATIONAL_COLUMNS.iter())
        .chain(RESERVED_COLUMNS.iter())
        .copied()
        .collect()
}

/// Location cell as it arrives from the input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LocationInput {
    #[default]
    Absent,
    Text(String),
    List(Vec<String>),
}

/// One candidate product entry from the flat file. Null tokens are already
/// mapped to `None`, except a blank inventory cell which is kept as `Some("")`
/// so the quantity default can be noted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputRow {
    /// 1-based data line (header excluded).
    pub line: u64,
    pub product_id: Option<String>,
    pub item_code: Option<String>,
    pub inventory: Option<String>,
    pub location: LocationInput,
}

impl InputRow {
    pub fn new(line: u64, product_id: &str, item_code: &str) -> Self {
        Self {
            line,
            product_id: Some(product_id.to_string()),
            item_code: Some(item_code.to_string()),
            ..Self::default()
        }
    }

    /// Trimmed product id, `None` when absent or blank.
    pub fn product_key(&self) -> Option<&str> {
        trimmed(self.product_id.as_deref())
    }

    /// Trimmed item code, `None` when absent or blank.
    pub fn item_key(&self) -> Option<&str> {
        trimmed(self.item_code.as_deref())
    }
}

fn trimmed(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// Product metadata keyed by `product_id`. `attributes` always holds exactly
/// [`METADATA_COLUMNS`], in order, with `Null` for anything the source lacks.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub product_id: String,
    pub attributes: IndexMap<String, Value>,
}

impl MetadataRecord {
    /// Project a whole-row JSON document (e.g. `to_jsonb(row)`) onto the
    /// catalogue's descriptive columns.
    pub fn from_document(product_id: impl Into<String>, doc: &Value) -> Self {
        let attributes = METADATA_COLUMNS
            .iter()
            .map(|col| (col.to_string(), doc.get(*col).cloned().unwrap_or(Value::Null)))
            .collect();
        Self {
            product_id: product_id.into(),
            attributes,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").and_then(Value::as_str)
    }
}

/// Distributor price/cost record. A record is reachable under either code.
#[derive(Debug, Clone, Default, PartialEq, sqlx::FromRow)]
pub struct PriceRecord {
    pub item_code: Option<String>,
    pub original_item_code: Option<String>,
    pub product_name: Option<String>,
    pub manufacturer: Option<String>,
    pub mrp: Option<BigDecimal>,
    pub purchase_rate: Option<BigDecimal>,
    pub gst_rate: Option<BigDecimal>,
    pub plazza_selling_price_incl_gst: Option<BigDecimal>,
    pub effective_customer_discount: Option<BigDecimal>,
    pub distributor: Option<String>,
    pub hsn_code: Option<String>,
}

impl PriceRecord {
    /// Lowercased, trimmed codes this record answers to.
    pub fn match_codes(&self) -> impl Iterator<Item = String> + '_ {
        [self.item_code.as_deref(), self.original_item_code.as_deref()]
            .into_iter()
            .flatten()
            .map(|c| c.trim().to_lowercase())
            .filter(|c| !c.is_empty())
    }
}

/// Extension slots kept for forward compatibility; never populated here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReservedFields {
    pub c1: Option<Value>,
    pub c2: Option<Value>,
    pub c3: Option<Value>,
    pub c4: Option<Value>,
    pub c5: Option<Value>,
    pub product_category_name: Option<String>,
    pub product_category_id: Option<String>,
    pub product_use_case_name: Option<String>,
    pub product_use_case_id: Option<String>,
    pub product_sub_category_id: Option<String>,
    pub product_sub_category_name: Option<String>,
}

/// Fully joined row ready for the catalogue. Serializes to one JSON object
/// whose keys are exactly [`catalogue_columns`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedRecord {
    pub product_id: String,
    pub dist_item_code: String,
    #[serde(flatten)]
    pub metadata: IndexMap<String, Value>,
    pub inventory_quantity: i64,
    pub location: Option<Vec<String>>,
    pub distributor_mrp: Option<BigDecimal>,
    pub plazza_selling_price_incl_gst: Option<BigDecimal>,
    pub effective_customer_discount: Option<BigDecimal>,
    pub distributor: Option<String>,
    pub gst_rate: Option<BigDecimal>,
    pub hsn_code: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub reserved: ReservedFields,
    /// Normalization notes; reported, never written.
    #[serde(skip)]
    pub notes: Vec<String>,
}

/// Why a row was kept out of the catalogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RejectionKind {
    MissingIdentifier,
    MissingMetadata,
    MissingPricing,
}

impl RejectionKind {
    /// Value written to the `error_type` column.
    pub fn error_type(self) -> &'static str {
        match self {
            Self::MissingIdentifier => "Missing Identifier",
            Self::MissingMetadata => "Missing Metadata",
            Self::MissingPricing => "Missing Price Details",
        }
    }

    pub fn reason(self) -> &'static str {
        match self {
            Self::MissingIdentifier => "missing required identifier",
            Self::MissingMetadata => "missing metadata",
            Self::MissingPricing => "missing pricing",
        }
    }
}

/// Column order of the rejection sink.
pub const REJECTION_COLUMNS: [&str; 7] = [
    "product_id",
    "item_code",
    "name",
    "error_timestamp",
    "error_type",
    "error_details",
    "status",
];

pub const REJECTION_STATUS: &str = "Skipped";

/// One line of the rejection sink. Field order is the sink's column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectionRecord {
    pub product_id: String,
    pub item_code: String,
    pub name: String,
    pub error_timestamp: String,
    pub error_type: String,
    pub error_details: String,
    pub status: String,
}

impl RejectionRecord {
    pub fn new(
        kind: RejectionKind,
        product_id: &str,
        item_code: &str,
        name: &str,
        details: impl Into<String>,
    ) -> Self {
        Self {
            product_id: product_id.to_string(),
            item_code: item_code.to_string(),
            name: name.to_string(),
            error_timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            error_type: kind.error_type().to_string(),
            error_details: details.into(),
            status: REJECTION_STATUS.to_string(),
        }
    }
}

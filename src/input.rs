//! Flat-file input: a headered CSV where every cell is read as a string.

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use tracing::info;

use crate::model::{InputRow, LocationInput};
use crate::normalization::is_null_token;

pub const PRODUCT_ID_COLUMN: &str = "product_id";
pub const ITEM_CODE_COLUMN: &str = "item_code";
pub const INVENTORY_COLUMN: &str = "Store Inventory";
pub const LOCATION_COLUMN: &str = "Location";

struct Columns {
    product_id: usize,
    item_code: usize,
    inventory: Option<usize>,
    location: Option<usize>,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| find(name).ok_or_else(|| anyhow!("required column '{name}' is missing"));
        Ok(Self {
            product_id: required(PRODUCT_ID_COLUMN)?,
            item_code: required(ITEM_CODE_COLUMN)?,
            inventory: find(INVENTORY_COLUMN),
            location: find(LOCATION_COLUMN),
        })
    }
}

pub fn read_rows(path: &Path) -> Result<Vec<InputRow>> {
    let file = std::fs::File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let rows = parse_rows(file).with_context(|| format!("failed to parse {}", path.display()))?;
    info!(path = %path.display(), rows = rows.len(), "input loaded");
    Ok(rows)
}

/// Parse CSV text into rows. Null tokens become absent values and short rows
/// are padded with absent cells.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<InputRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::locate(rdr.headers()?)?;

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let line = idx as u64 + 1;
        let record = record.with_context(|| format!("row {line} is malformed"))?;
        let cell = |i: usize| record.get(i).filter(|v| !is_null_token(v)).map(str::to_string);
        rows.push(InputRow {
            line,
            product_id: cell(columns.product_id),
            item_code: cell(columns.item_code),
            // A present but blank inventory cell stays `Some("")` so it can be noted.
            inventory: columns.inventory.map(|i| cell(i).unwrap_or_default()),
            location: match columns.location.and_then(cell) {
                Some(text) => LocationInput::Text(text),
                None => LocationInput::Absent,
            },
        });
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reads_required_and_optional_columns() {
        let csv = "product_id,item_code,Store Inventory,Location,extra\n\
                   P1,X1,12,\"[\"\"A\"\",\"\"B\"\"]\",ignored\n\
                   P2, x2 ,,nan,\n\
                   NULL,X3,N/A,{C},\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 3);

        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[0].product_key(), Some("P1"));
        assert_eq!(rows[0].inventory.as_deref(), Some("12"));
        assert_eq!(rows[0].location, LocationInput::Text("[\"A\",\"B\"]".into()));

        assert_eq!(rows[1].item_code.as_deref(), Some(" x2 "));
        assert_eq!(rows[1].item_key(), Some("x2"));
        assert_eq!(rows[1].inventory.as_deref(), Some(""));
        assert_eq!(rows[1].location, LocationInput::Absent);

        assert_eq!(rows[2].product_id, None);
        assert_eq!(rows[2].inventory.as_deref(), Some(""));
        assert_eq!(rows[2].line, 3);
    }

    #[test]
    fn optional_columns_may_be_missing() {
        let rows = parse_rows("item_code,product_id\nX1,P1\n".as_bytes()).unwrap();
        assert_eq!(rows[0].product_key(), Some("P1"));
        assert_eq!(rows[0].item_key(), Some("X1"));
        assert_eq!(rows[0].inventory, None);
        assert_eq!(rows[0].location, LocationInput::Absent);
    }

    #[test]
    fn ragged_rows_are_padded_not_fatal() {
        let csv = "product_id,item_code,Store Inventory,Location\n\
                   P1,X1,3,A\n\
                   P2,X2\n\
                   P3\n\
                   P4,X4,1,B\n";
        let rows = parse_rows(csv.as_bytes()).unwrap();
        assert_eq!(rows.len(), 4);

        assert_eq!(rows[1].product_key(), Some("P2"));
        assert_eq!(rows[1].item_key(), Some("X2"));
        assert_eq!(rows[1].inventory.as_deref(), Some(""));
        assert_eq!(rows[1].location, LocationInput::Absent);

        assert_eq!(rows[2].product_key(), Some("P3"));
        assert_eq!(rows[2].item_code, None);

        assert_eq!(rows[3].line, 4);
        assert_eq!(rows[3].inventory.as_deref(), Some("1"));
    }

    #[test]
    fn missing_required_header_is_an_error() {
        let err = parse_rows("product_id,Location\nP1,A\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("item_code"));
    }

    #[test]
    fn read_rows_reports_unreadable_path() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(read_rows(&dir.path().join("absent.csv")).is_err());

        let path = dir.path().join("rows.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "product_id,item_code").unwrap();
        writeln!(f, "P1,X1").unwrap();
        drop(f);
        assert_eq!(read_rows(&path).unwrap().len(), 1);
    }
}

use super::is_null_token;

/// Normalize the `Store Inventory` cell into a non-negative whole quantity.
///
/// `None` means the file has no inventory column and yields 0 quietly. A
/// blank, unparseable, non-finite or negative cell becomes 0 and pushes a
/// note; fractional values are floored.
pub fn normalize_inventory(raw: Option<&str>, notes: &mut Vec<String>) -> i64 {
    let value = match raw.map(str::trim) {
        None => return 0,
        Some(v) if v.is_empty() || is_null_token(v) => {
            notes.push("Blank inventory quantity; defaulted to 0".to_string());
            return 0;
        }
        Some(v) => v,
    };

    let parsed = match value.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => {
            notes.push(format!("Invalid inventory quantity format: {value}"));
            return 0;
        }
    };

    if parsed < 0.0 {
        notes.push(format!("Inventory quantity cannot be negative: {value}"));
        return 0;
    }
    if parsed >= i64::MAX as f64 {
        notes.push(format!("Inventory quantity out of range: {value}"));
        return 0;
    }
    parsed.floor() as i64
}

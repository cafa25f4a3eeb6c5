pub mod inventory;
pub mod location;

pub use inventory::normalize_inventory;
pub use location::normalize_location;

/// Spellings treated as "no value" in the input file.
pub const NULL_TOKENS: [&str; 13] = [
    "", "NULL", "null", "None", "nan", "NaN", "NA", "N/A", "n/a", "#N/A", "<NA>", "-nan", "-NaN",
];

/// True when `raw` (after trimming) is one of [`NULL_TOKENS`].
pub fn is_null_token(raw: &str) -> bool {
    let v = raw.trim();
    NULL_TOKENS.contains(&v)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_common_null_spellings() {
        for token in ["", "  ", "NULL", "None", "nan", " NaN ", "N/A", "<NA>"] {
            assert!(is_null_token(token), "{token:?} should be null");
        }
        for token in ["0", "P1", "nil", "Nancy"] {
            assert!(!is_null_token(token), "{token:?} should not be null");
        }
    }
}

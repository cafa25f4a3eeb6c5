use serde_json::Value;

use super::is_null_token;
use crate::model::LocationInput;

/// Normalize a location cell into an ordered list of trimmed, non-empty names.
///
/// Accepted encodings: an already structured list, a JSON array literal
/// (optionally wrapped in `{}`), a brace-delimited list (`{A,B}`), a
/// comma-separated string, or a single bare token. Null-like or empty input
/// yields `None`; an empty list is never returned.
pub fn normalize_location(input: &LocationInput, notes: &mut Vec<String>) -> Option<Vec<String>> {
    match input {
        LocationInput::Absent => None,
        LocationInput::List(items) => non_empty(items.iter().map(String::as_str)),
        LocationInput::Text(raw) => parse_text(raw, notes),
    }
}

fn parse_text(raw: &str, notes: &mut Vec<String>) -> Option<Vec<String>> {
    if is_null_token(raw) || raw.trim().eq_ignore_ascii_case("nan") {
        return None;
    }
    let value = raw.trim().trim_matches(|c| c == '{' || c == '}').trim();

    if value.starts_with('[') && value.ends_with(']') {
        match serde_json::from_str::<Value>(value) {
            Ok(Value::Array(items)) => {
                let names: Vec<String> = items
                    .iter()
                    .filter_map(|item| match item {
                        Value::Null => None,
                        Value::String(s) => Some(s.clone()),
                        other => Some(other.to_string()),
                    })
                    .collect();
                return non_empty(names.iter().map(String::as_str));
            }
            _ => {
                notes.push(format!("Invalid location format: {raw}"));
                let inner = &value[1..value.len() - 1];
                return split_list(inner);
            }
        }
    }

    split_list(value)
}

fn split_list(value: &str) -> Option<Vec<String>> {
    non_empty(value.split(',').map(|s| s.trim().trim_matches('"')))
}

fn non_empty<'a>(items: impl Iterator<Item = &'a str>) -> Option<Vec<String>> {
    let out: Vec<String> = items
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_null_token(s))
        .map(str::to_string)
        .collect();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

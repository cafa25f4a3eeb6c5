use std::fmt;
use std::str::FromStr;

/// A validated, optionally schema-qualified table name (`catalogue` or
/// `public.catalogue`). Renders double-quoted so it can be spliced into SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    parts: Vec<String>,
}

impl TableName {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let parts: Vec<String> = raw.trim().split('.').map(str::to_string).collect();
        if parts.len() > 2 {
            return Err(format!("table name '{raw}' has more than one schema qualifier"));
        }
        for part in &parts {
            validate_pg_identifier(part)?;
        }
        Ok(Self { parts })
    }

    /// Built-in default names; these are known-valid identifiers.
    pub(crate) fn builtin(name: &'static str) -> Self {
        Self {
            parts: vec![name.to_string()],
        }
    }

    /// Quoted form for SQL text.
    pub fn quoted(&self) -> String {
        self.parts
            .iter()
            .map(|p| format!("\"{p}\""))
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.parts.join("."))
    }
}

fn validate_pg_identifier(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("identifier must not be empty".to_string());
    }
    if name.len() > 63 {
        return Err(format!(
            "identifier '{name}' exceeds PostgreSQL maximum length of 63 bytes"
        ));
    }
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !first.is_ascii_alphabetic() && first != '_' {
            return Err(format!(
                "identifier must start with a letter or underscore, got '{first}'"
            ));
        }
    }
    if let Some(bad) = chars.find(|c| !c.is_ascii_alphanumeric() && *c != '_') {
        return Err(format!("identifier contains invalid character '{bad}'"));
    }
    Ok(())
}

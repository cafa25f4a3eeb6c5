//! Batched cross-source lookups: metadata by product id, pricing by item code.
//!
//! Both resolvers take an arbitrary key list, normalize it (trim, drop blanks,
//! dedupe), make exactly one round trip to their source and return a
//! [`Resolved`] map. Source failures are logged and yield an empty map so the
//! caller still classifies every row of the chunk.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use indexmap::{IndexMap, IndexSet};
use tracing::{error, info, warn};

use crate::database_ops::{MetadataSource, PriceSource};
use crate::model::{MetadataRecord, PriceRecord};

/// Result of looking one key up in a [`Resolved`] map.
#[derive(Debug, PartialEq)]
pub enum Lookup<'a, T> {
    Found(&'a T),
    NotFound,
}

/// Records resolved for one chunk, keyed by the caller's key.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    entries: HashMap<String, T>,
}

impl<T> Default for Resolved<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> Resolved<T> {
    pub fn lookup(&self, key: &str) -> Lookup<'_, T> {
        match self.entries.get(key) {
            Some(record) => Lookup::Found(record),
            None => Lookup::NotFound,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> FromIterator<(String, T)> for Resolved<T> {
    fn from_iter<I: IntoIterator<Item = (String, T)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Which record wins when one item code matches several price rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriceMatchPolicy {
    FirstMatch,
    #[default]
    LastMatch,
}

impl FromStr for PriceMatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first" | "first-match" => Ok(Self::FirstMatch),
            "last" | "last-match" => Ok(Self::LastMatch),
            other => Err(format!("unknown price match policy '{other}' (expected first-match or last-match)")),
        }
    }
}

impl fmt::Display for PriceMatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::FirstMatch => "first-match",
            Self::LastMatch => "last-match",
        })
    }
}

/// Price map plus the number of caller keys that matched more than one record.
#[derive(Debug, Clone, Default)]
pub struct PriceResolution {
    pub prices: Resolved<PriceRecord>,
    pub ambiguous_codes: usize,
}

/// Trim, drop blanks and dedupe, keeping first-seen order.
pub fn normalize_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let set: IndexSet<&str> = keys
        .into_iter()
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .collect();
    set.into_iter().map(str::to_string).collect()
}

pub async fn resolve_metadata<'a>(
    source: &dyn MetadataSource,
    product_ids: impl IntoIterator<Item = &'a str>,
) -> Resolved<MetadataRecord> {
    let keys = normalize_keys(product_ids);
    if keys.is_empty() {
        return Resolved::default();
    }
    match source.fetch_metadata(&keys).await {
        Ok(records) => {
            let resolved: Resolved<MetadataRecord> = records
                .into_iter()
                .filter(|r| keys.contains(&r.product_id))
                .map(|r| (r.product_id.clone(), r))
                .collect();
            info!(found = resolved.len(), requested = keys.len(), "metadata resolved");
            resolved
        }
        Err(e) => {
            error!(error = %format!("{e:#}"), requested = keys.len(), "metadata lookup failed; treating batch as unmatched");
            Resolved::default()
        }
    }
}

pub async fn resolve_prices<'a>(
    source: &dyn PriceSource,
    item_codes: impl IntoIterator<Item = &'a str>,
    policy: PriceMatchPolicy,
) -> PriceResolution {
    let keys = normalize_keys(item_codes);
    if keys.is_empty() {
        return PriceResolution::default();
    }

    // lowercase -> every original-cased caller key sharing it
    let mut by_lower: IndexMap<String, Vec<&str>> = IndexMap::new();
    for key in &keys {
        by_lower.entry(key.to_lowercase()).or_default().push(key.as_str());
    }
    let lowered: Vec<String> = by_lower.keys().cloned().collect();

    let records = match source.fetch_prices(&lowered).await {
        Ok(records) => records,
        Err(e) => {
            error!(error = %format!("{e:#}"), requested = keys.len(), "price lookup failed; treating batch as unmatched");
            return PriceResolution::default();
        }
    };

    let mut matched: HashMap<String, PriceRecord> = HashMap::new();
    let mut hits: HashMap<String, usize> = HashMap::new();
    for record in &records {
        let mut codes: Vec<String> = record.match_codes().collect();
        codes.dedup();
        for code in codes {
            let Some(originals) = by_lower.get(&code) else {
                continue;
            };
            for original in originals {
                *hits.entry(original.to_string()).or_default() += 1;
                match policy {
                    PriceMatchPolicy::LastMatch => {
                        matched.insert(original.to_string(), record.clone());
                    }
                    PriceMatchPolicy::FirstMatch => {
                        matched
                            .entry(original.to_string())
                            .or_insert_with(|| record.clone());
                    }
                }
            }
        }
    }

    let mut ambiguous: Vec<&String> = hits.iter().filter(|(_, n)| **n > 1).map(|(k, _)| k).collect();
    ambiguous.sort();
    if !ambiguous.is_empty() {
        warn!(
            codes = ?ambiguous,
            policy = %policy,
            "item codes matched several price records"
        );
    }

    let resolution = PriceResolution {
        ambiguous_codes: ambiguous.len(),
        prices: matched.into_iter().collect(),
    };
    info!(found = resolution.prices.len(), requested = keys.len(), "prices resolved");
    resolution
}

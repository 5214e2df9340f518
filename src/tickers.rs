//! Ticker alias resolution for incoming allocations.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TickerMapError {
    #[error("failed to read ticker mapping: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid ticker mapping JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Alias → canonical ticker table, loaded once at startup and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickerMap {
    aliases: HashMap<String, String>,
}

impl TickerMap {
    pub fn new(aliases: HashMap<String, String>) -> Self {
        let aliases = aliases
            .into_iter()
            .map(|(alias, ticker)| (clean(&alias), ticker.trim().to_string()))
            .collect();
        Self { aliases }
    }

    /// Reads a JSON object of `"alias": "TICKER"` pairs.
    pub fn from_json_file(path: &Path) -> Result<Self, TickerMapError> {
        let raw = fs::read_to_string(path)?;
        let aliases: HashMap<String, String> = serde_json::from_str(&raw)?;
        Ok(Self::new(aliases))
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Trims and upper-cases `name`, then swaps in the canonical ticker if it is a
    /// known alias. Unknown names pass through.
    pub fn resolve(&self, name: &str) -> String {
        let cleaned = clean(name);
        match self.aliases.get(&cleaned) {
            Some(ticker) => ticker.clone(),
            None => cleaned,
        }
    }

    /// Resolves every allocation key. Weights of keys that land on the same ticker
    /// are summed.
    pub fn normalize_allocations<'a, I>(&self, allocations: I) -> BTreeMap<String, f64>
    where
        I: IntoIterator<Item = (&'a String, &'a f64)>,
    {
        let mut normalized = BTreeMap::new();
        for (name, weight) in allocations {
            *normalized.entry(self.resolve(name)).or_insert(0.0) += *weight;
        }
        normalized
    }
}

fn clean(name: &str) -> String {
    name.trim().to_uppercase()
}

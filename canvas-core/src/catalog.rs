//! Read-only plant, terrain and structure catalogs.
//!
//! The canvas never owns catalog data. Elements carry a copy of the display
//! attributes of the entry they were placed from; lookups go through [`Catalog`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::CanvasResult;
use crate::metrics::{parse_spacing, RealSize};

/// A catalog entry as the canvas sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Catalog identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Grouping, e.g. `"fruit tree"` or `"water"`.
    pub category: String,
    /// Fill colour as hex.
    pub color: String,
    /// Spacing (plants) or footprint (terrain), e.g. `"30x30cm"`.
    #[serde(alias = "spacing")]
    pub size: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    /// Footprint in metres, parsed from [`CatalogEntry::size`].
    #[must_use]
    pub fn real_size(&self) -> RealSize {
        parse_spacing(&self.size)
    }
}

/// Id-based lookup into a catalog.
pub trait Catalog {
    /// Look up an entry by id.
    fn get(&self, id: &str) -> Option<&CatalogEntry>;
}

/// A catalog held in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: HashMap<String, CatalogEntry>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is not an array of entries.
    pub fn from_json(json: &str) -> CanvasResult<Self> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(json)?;
        Ok(entries.into_iter().collect())
    }

    /// Add or replace an entry.
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<CatalogEntry> for MemoryCatalog {
    fn from_iter<I: IntoIterator<Item = CatalogEntry>>(iter: I) -> Self {
        let mut catalog = Self::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}

impl Catalog for MemoryCatalog {
    fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }
}

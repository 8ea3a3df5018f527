//! Farm canonicalization map (§4.2), loaded from the single
//! `farm_mappings.json` artifact produced by the Farm Deduplication Core
//! (§4.9 / [`crate::dedup`]). Structure: country -> region_slug ->
//! farm_normalized -> canonical_farm_name.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::canon::normalize::normalize_farm_name;
use crate::error::Result;

/// One cluster entry from `farm_mappings.json`, as produced by
/// [`crate::dedup`] and consumed here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmClusterMapping {
    pub country: String,
    pub region: String,
    pub canonical_farm_name: String,
    #[serde(default)]
    pub normalized_farm_names: Vec<String>,
    #[serde(default)]
    pub original_farm_names: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct FarmMap {
    // country -> region_slug -> farm_normalized -> canonical name
    by_country: HashMap<String, HashMap<String, HashMap<String, String>>>,
}

impl FarmMap {
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            tracing::info!(
                "farm mappings file not found ({}), farm canonicalization is a no-op",
                path.display()
            );
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let entries: Vec<FarmClusterMapping> = serde_json::from_str(&text)?;
        Ok(Self::from_entries(entries))
    }

    pub fn from_entries(entries: Vec<FarmClusterMapping>) -> Self {
        let mut by_country: HashMap<String, HashMap<String, HashMap<String, String>>> =
            HashMap::new();
        let mut count = 0;
        for entry in entries {
            let country = entry.country.to_uppercase();
            let region_map = by_country.entry(country).or_default();
            let farm_map = region_map.entry(entry.region.clone()).or_default();

            let mut names_to_map = entry.normalized_farm_names.clone();
            if names_to_map.is_empty() && !entry.original_farm_names.is_empty() {
                names_to_map = entry
                    .original_farm_names
                    .iter()
                    .map(|n| normalize_farm_name(n))
                    .collect();
            }
            for normalized in names_to_map {
                farm_map.insert(normalized, entry.canonical_farm_name.clone());
                count += 1;
            }
        }
        tracing::info!("loaded {} farm name mappings", count);
        Self { by_country }
    }

    /// `canonical_farm(country, region_slug, farm_normalized)`: the
    /// canonical display name, or `None` so the caller can
    /// `coalesce(canonical_farm(...), farm)`.
    pub fn canonical_farm(
        &self,
        country: &str,
        region_slug: &str,
        farm_normalized: &str,
    ) -> Option<String> {
        if farm_normalized.is_empty() || country.is_empty() || region_slug.is_empty() {
            return None;
        }
        let country = country.to_uppercase();
        self.by_country
            .get(&country)
            .and_then(|regions| regions.get(region_slug))
            .and_then(|farms| farms.get(farm_normalized))
            .cloned()
    }
}

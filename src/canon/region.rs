//! Region canonicalization map (§4.2, §6): one JSON file per country under
//! `region_mappings/<ALPHA2>.json`, `{ original_region: { canonical_state,
//! confidence, reasoning, ...geo } }`. A `canonical_state: null` entry marks
//! the region invalid — excluded from browse, preserved to short-circuit
//! re-resolution.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct RegionMapping {
    pub canonical_state: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// country (ISO alpha-2) -> original region name -> mapping.
#[derive(Debug, Clone, Default)]
pub struct RegionMap {
    by_country: HashMap<String, HashMap<String, RegionMapping>>,
}

impl RegionMap {
    /// Load every `<COUNTRY>.json` file in `dir`. Missing directory is not
    /// an error: an empty map falls back to "region as-is" everywhere.
    pub fn load_dir(dir: &Path) -> Result<Self> {
        let mut by_country = HashMap::new();
        if !dir.is_dir() {
            tracing::warn!("region mappings directory not found: {}", dir.display());
            return Ok(Self { by_country });
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let country_code = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_uppercase();
            let text = std::fs::read_to_string(&path)?;
            match serde_json::from_str::<HashMap<String, RegionMapping>>(&text) {
                Ok(mappings) => {
                    tracing::info!(
                        "loaded {} region mappings for {}",
                        mappings.len(),
                        country_code
                    );
                    by_country.insert(country_code, mappings);
                }
                Err(e) => tracing::error!("failed to parse {}: {}", path.display(), e),
            }
        }
        Ok(Self { by_country })
    }

    /// `canonical_state(country, region)`: returns `None` when the mapping
    /// records an explicit `canonical_state: null` (invalid region), the
    /// canonical name when mapped, or `region` unchanged as fallback.
    pub fn canonical_state(&self, country: &str, region: &str) -> Option<String> {
        let country = country.to_uppercase();
        let Some(country_map) = self.by_country.get(&country) else {
            return Some(region.to_string());
        };
        match country_map.get(region) {
            Some(mapping) => mapping.canonical_state.clone(),
            None => Some(region.to_string()),
        }
    }
}

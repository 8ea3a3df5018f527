//! Varietal canonicalization (§3, §4.2, §6). Compound varieties (e.g.
//! `"Yellow Catuai, Mundo Novo"`) are exploded into multiple canonical
//! names; lookup is case-insensitive on the original spelling.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct VarietalMappingEntry {
    pub original_name: String,
    pub canonical_names: Vec<String>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    #[serde(default)]
    pub is_compound: bool,
    #[serde(default)]
    pub separator: Option<String>,
}

fn default_confidence() -> f64 {
    1.0
}

#[derive(Debug, Clone, Default)]
pub struct VarietalMap {
    // lowercased original name -> entry
    entries: HashMap<String, VarietalMappingEntry>,
}

impl VarietalMap {
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let list: Vec<VarietalMappingEntry> = serde_json::from_str(&text)?;
        Ok(Self::from_entries(list))
    }

    pub fn from_entries(list: Vec<VarietalMappingEntry>) -> Self {
        let mut entries = HashMap::new();
        for entry in list {
            entries.insert(entry.original_name.to_lowercase(), entry);
        }
        Self { entries }
    }

    /// Canonical names for `original`, exploding compounds. Falls back to
    /// `[original]` unchanged when there's no mapping, so every variety
    /// still produces at least one canonical entry.
    pub fn canonical_names(&self, original: &str) -> Vec<String> {
        match self.entries.get(&original.to_lowercase()) {
            Some(entry) if !entry.canonical_names.is_empty() => entry.canonical_names.clone(),
            _ => vec![original.to_string()],
        }
    }

    pub fn get(&self, original: &str) -> Option<&VarietalMappingEntry> {
        self.entries.get(&original.to_lowercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarietalMappingEntry)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explodes_compound_variety() {
        let map = VarietalMap::from_entries(vec![VarietalMappingEntry {
            original_name: "Yellow Catuai, Mundo Novo".to_string(),
            canonical_names: vec!["Yellow Catuai".to_string(), "Mundo Novo".to_string()],
            confidence: 0.95,
            is_compound: true,
            separator: Some(", ".to_string()),
        }]);
        assert_eq!(
            map.canonical_names("Yellow Catuai, Mundo Novo"),
            vec!["Yellow Catuai", "Mundo Novo"]
        );
        // case-insensitive
        assert_eq!(
            map.canonical_names("yellow catuai, mundo novo"),
            vec!["Yellow Catuai", "Mundo Novo"]
        );
    }

    #[test]
    fn unmapped_variety_passes_through() {
        let map = VarietalMap::default();
        assert_eq!(map.canonical_names("Geisha"), vec!["Geisha"]);
    }
}

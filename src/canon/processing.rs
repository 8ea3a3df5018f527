//! Processing-method canonicalization (§3, §4.2, §6): original name -> common
//! name, e.g. "Fully Washed" -> "Washed".

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct ProcessingMappingEntry {
    pub original_name: String,
    pub common_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessingMap {
    entries: HashMap<String, String>,
}

impl ProcessingMap {
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)?;
        let list: Vec<ProcessingMappingEntry> = serde_json::from_str(&text)?;
        Ok(Self::from_entries(list))
    }

    pub fn from_entries(list: Vec<ProcessingMappingEntry>) -> Self {
        let mut entries = HashMap::new();
        for entry in list {
            entries.insert(entry.original_name.to_lowercase(), entry.common_name);
        }
        Self { entries }
    }

    /// The canonical common name, or `process` unchanged when unmapped
    /// (§4.3 step 9: "fill process_common_name ... else copy process").
    pub fn common_name(&self, process: &str) -> String {
        self.entries
            .get(&process.to_lowercase())
            .cloned()
            .unwrap_or_else(|| process.to_string())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_known_process() {
        let map = ProcessingMap::from_entries(vec![ProcessingMappingEntry {
            original_name: "Fully Washed".to_string(),
            common_name: "Washed".to_string(),
        }]);
        assert_eq!(map.common_name("Fully Washed"), "Washed");
        assert_eq!(map.common_name("fully washed"), "Washed");
    }

    #[test]
    fn unmapped_process_passes_through() {
        let map = ProcessingMap::default();
        assert_eq!(map.common_name("Anaerobic Natural"), "Anaerobic Natural");
    }
}

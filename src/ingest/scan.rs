//! Directory tree discovery for the warehouse loader (§4.3 step 4, §6).
//!
//! Walks `<data_root>/roasters/<slug>/<YYYYMMDD>/*.{json,diffjson}`, tagging
//! each file with its roaster directory and scrape date (derived from path
//! segments, not file content) plus a cheap peek at its `url` field so later
//! passes don't need a full parse just to know what a file is about.

use std::path::Path;

use walkdir::WalkDir;

use crate::error::Result;
use crate::ledger::{CandidateFile, FileType};

#[derive(Debug, Clone)]
pub struct DiscoveredFile {
    pub candidate: CandidateFile,
    pub roaster_directory: String,
    pub scrape_date: String,
    /// Cheap peek at the `url` field, when the file parses as JSON at all.
    pub url: Option<String>,
}

/// Scan `data_root` for bean snapshot and diff files.
pub fn discover(data_root: &Path) -> Result<Vec<DiscoveredFile>> {
    let roasters_dir = data_root.join("roasters");
    if !roasters_dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&roasters_dir)
        .min_depth(3)
        .max_depth(3)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let file_type = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => FileType::Json,
            Some("diffjson") => FileType::DiffJson,
            _ => continue,
        };

        let scrape_date = match path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
            Some(s) => s.to_string(),
            None => continue,
        };
        let roaster_directory = match path
            .parent()
            .and_then(|p| p.parent())
            .and_then(|p| p.file_name())
            .and_then(|n| n.to_str())
        {
            Some(s) => s.to_string(),
            None => continue,
        };

        let relative_path = path
            .strip_prefix(data_root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/");

        let url = peek_url(path);

        files.push(DiscoveredFile {
            candidate: CandidateFile {
                relative_path,
                absolute_path: path.to_path_buf(),
                file_type,
            },
            roaster_directory,
            scrape_date,
            url,
        });
    }

    files.sort_by(|a, b| {
        (&a.scrape_date, &a.candidate.relative_path).cmp(&(&b.scrape_date, &b.candidate.relative_path))
    });

    Ok(files)
}

fn peek_url(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let value: serde_json::Value = serde_json::from_str(&text).ok()?;
    value.get("url")?.as_str().map(|s| s.to_string())
}

/// Filename stem with a trailing `_HHMMSS` stripped, used as the dedupe key
/// across re-scrapes (§3 "Clean URL slug").
pub fn clean_url_slug(relative_path: &str) -> String {
    let stem = Path::new(relative_path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(relative_path);
    match stem.rfind('_') {
        Some(idx) => {
            let suffix = &stem[idx + 1..];
            if suffix.len() == 6 && suffix.chars().all(|c| c.is_ascii_digit()) {
                stem[..idx].to_string()
            } else {
                stem.to_string()
            }
        }
        None => stem.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discovers_json_and_diffjson_with_roaster_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let day_dir = dir.path().join("roasters/sey-coffee/20250908");
        fs::create_dir_all(&day_dir).unwrap();
        fs::write(day_dir.join("ethiopia-gesha_101500.json"), r#"{"url":"https://x/a"}"#).unwrap();
        fs::write(day_dir.join("ethiopia-gesha_101500.diffjson"), r#"{"url":"https://x/a"}"#).unwrap();

        let found = discover(dir.path()).unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|f| f.roaster_directory == "sey-coffee"));
        assert!(found.iter().all(|f| f.scrape_date == "20250908"));
        assert!(found.iter().all(|f| f.url.as_deref() == Some("https://x/a")));
    }

    #[test]
    fn clean_url_slug_strips_trailing_timestamp() {
        assert_eq!(clean_url_slug("ethiopia-gesha_101500.json"), "ethiopia-gesha");
        assert_eq!(clean_url_slug("no-timestamp.json"), "no-timestamp");
    }
}

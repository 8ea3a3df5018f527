//! Farm Deduplication Core (§4.9): runs clustering per (country, region
//! slug) scope against the warehouse, routes low-confidence clusters
//! through a [`ClusterReviewer`], and writes the Farm Canonicalization
//! JSON consumed by [`crate::canon::farm`].

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use rusqlite::Connection;

use crate::canon::farm::FarmClusterMapping;
use crate::canon::normalize::normalize_region_name;
use crate::dedup::clustering::{cluster, FarmCluster, DEFAULT_SIMILARITY_THRESHOLD, REVIEW_THRESHOLD};
use crate::dedup::reviewer::{apply_decision, ClusterReviewer, ReviewDecision};
use crate::error::Result;

/// Enumerate (farm_normalized, representative display name, producers,
/// total_beans) groups, scoped per (country, region slug), per §4.9 step 1.
fn gather_scopes(conn: &Connection) -> Result<BTreeMap<(String, String), Vec<super::clustering::FarmEntry>>> {
    let mut stmt = conn.prepare(
        "SELECT o.country, COALESCE(o.region_normalized, ''), o.farm_normalized, o.farm, o.producer,
                COUNT(DISTINCT o.bean_id) AS total_beans
         FROM origins o
         WHERE o.country IS NOT NULL AND o.farm_normalized IS NOT NULL AND o.farm_normalized != ''
         GROUP BY o.country, o.region_normalized, o.farm_normalized",
    )?;

    let mut scopes: BTreeMap<(String, String), HashMap<String, super::clustering::FarmEntry>> =
        BTreeMap::new();

    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, String>(1)?,
            row.get::<_, String>(2)?,
            row.get::<_, Option<String>>(3)?,
            row.get::<_, Option<String>>(4)?,
            row.get::<_, i64>(5)?,
        ))
    })?;

    for row in rows {
        let (country, region, farm_normalized, display_name, producer, total_beans) = row?;
        let key = (country.to_uppercase(), normalize_region_name(&region));
        let entries = scopes.entry(key).or_default();
        let entry = entries
            .entry(farm_normalized.clone())
            .or_insert_with(|| super::clustering::FarmEntry {
                farm_normalized: farm_normalized.clone(),
                display_name: display_name.clone().unwrap_or(farm_normalized.clone()),
                producers: Vec::new(),
                total_beans: 0,
            });
        entry.total_beans += total_beans;
        if let Some(p) = producer {
            if !entry.producers.contains(&p) {
                entry.producers.push(p);
            }
        }
    }

    Ok(scopes
        .into_iter()
        .map(|(k, v)| (k, v.into_values().collect()))
        .collect())
}

/// Run the full pipeline: gather per-region groups, cluster, route
/// low-confidence clusters through `reviewer`, and return every cluster
/// keyed by its (country, region slug) scope.
pub fn run(
    conn: &Connection,
    reviewer: &dyn ClusterReviewer,
    similarity_threshold: f64,
) -> Result<Vec<(String, String, FarmCluster)>> {
    let scopes = gather_scopes(conn)?;
    let mut out = Vec::new();

    for ((country, region_slug), entries) in scopes {
        let clusters = cluster(entries, similarity_threshold);
        for c in clusters {
            if c.confidence < REVIEW_THRESHOLD && c.members.len() > 1 {
                let decision = reviewer.review(&c);
                for resolved in apply_decision(c, decision) {
                    out.push((country.clone(), region_slug.clone(), resolved));
                }
            } else {
                out.push((country.clone(), region_slug.clone(), c));
            }
        }
    }

    Ok(out)
}

pub fn run_default(conn: &Connection, reviewer: &dyn ClusterReviewer) -> Result<Vec<(String, String, FarmCluster)>> {
    run(conn, reviewer, DEFAULT_SIMILARITY_THRESHOLD)
}

/// Merge freshly computed clusters into the existing `farm_mappings.json`,
/// replacing only the (country, region) scopes just processed so clusters
/// from regions not touched this run are preserved (§4.9: "must not
/// discard clusters from regions not being processed").
pub fn export(
    path: &Path,
    processed_scopes: &[(String, String)],
    clusters: &[(String, String, FarmCluster)],
) -> Result<()> {
    let mut existing: Vec<FarmClusterMapping> = if path.is_file() {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text).unwrap_or_default()
    } else {
        Vec::new()
    };

    existing.retain(|entry| {
        let key = (entry.country.to_uppercase(), normalize_region_name(&entry.region));
        !processed_scopes.contains(&key)
    });

    for (country, region_slug, c) in clusters {
        existing.push(FarmClusterMapping {
            country: country.clone(),
            region: region_slug.clone(),
            canonical_farm_name: c.canonical_name.clone(),
            normalized_farm_names: c.members.iter().map(|m| m.farm_normalized.clone()).collect(),
            original_farm_names: c.members.iter().map(|m| m.display_name.clone()).collect(),
        });
    }

    existing.sort_by(|a, b| (a.country.as_str(), a.region.as_str()).cmp(&(b.country.as_str(), b.region.as_str())));

    let text = serde_json::to_string_pretty(&existing)?;
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::dedup::reviewer::AutoApprove;

    fn seed(conn: &Connection, url: &str, country: &str, region: &str, farm: &str, farm_norm: &str, producer: &str) {
        conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, scraped_at,
                source_filename, clean_url_slug, bean_url_path, date_added)
             VALUES (?1, 'r', 'n', 'Roaster', 't', 'f', ?1, '/r/f', 't')",
            [url],
        )
        .unwrap();
        let bean_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO origins (bean_id, country, region, region_normalized, farm, farm_normalized, producer)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![bean_id, country, region, normalize_region_name(region), farm, farm_norm, producer],
        )
        .unwrap();
    }

    #[test]
    fn pipeline_clusters_similar_farms_in_same_region() {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        seed(&conn, "u1", "CO", "Huila", "Finca El Paraiso", "finca-el-paraiso", "Carlos Mendoza");
        seed(&conn, "u2", "CO", "Huila", "Finca El Paraíso", "finca-el-paraiso-alt", "Ana Mendoza");

        let reviewer = AutoApprove;
        let clusters = run_default(&conn, &reviewer).unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].2.members.len(), 2);
    }

    #[test]
    fn export_preserves_untouched_region_scopes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("farm_mappings.json");

        let untouched = vec![FarmClusterMapping {
            country: "BR".to_string(),
            region: "cerrado".to_string(),
            canonical_farm_name: "Fazenda Rio Verde".to_string(),
            normalized_farm_names: vec!["fazenda-rio-verde".to_string()],
            original_farm_names: vec!["Fazenda Rio Verde".to_string()],
        }];
        std::fs::write(&path, serde_json::to_string(&untouched).unwrap()).unwrap();

        let processed = vec![("CO".to_string(), "huila".to_string())];
        export(&path, &processed, &[]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let after: Vec<FarmClusterMapping> = serde_json::from_str(&text).unwrap();
        assert_eq!(after.len(), 1);
        assert_eq!(after[0].country, "BR");
    }
}

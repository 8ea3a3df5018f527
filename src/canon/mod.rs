//! Canonicalization Tables (§4.2): static and semi-static lookups for
//! region, farm, varietal, processing-method, and country normalization,
//! loaded once at loader startup and either kept in-memory (region, farm) or
//! materialized into warehouse tables (varietal, processing) so they can be
//! joined during ingest.

pub mod country;
pub mod farm;
pub mod normalize;
pub mod processing;
pub mod region;
pub mod varietal;

use std::path::Path;

use rusqlite::functions::FunctionFlags;
use rusqlite::Connection;
use std::sync::Arc;

use crate::error::Result;
pub use farm::FarmMap;
pub use normalize::{normalize_farm_name, normalize_region_name};
pub use processing::ProcessingMap;
pub use region::RegionMap;
pub use varietal::VarietalMap;

/// All canonicalization inputs loaded for one ingest run, per §4.2/§4.3
/// step 2. Held for the lifetime of a loader or server process — a reload
/// requires a restart or an explicit refresh (§5).
#[derive(Debug, Clone, Default)]
pub struct CanonTables {
    pub regions: Arc<RegionMap>,
    pub farms: Arc<FarmMap>,
    pub varietals: Arc<VarietalMap>,
    pub processing: Arc<ProcessingMap>,
}

/// Layout of the directory that holds the mapping files described in §6.
pub struct CanonPaths<'a> {
    pub region_mappings_dir: &'a Path,
    pub farm_mappings_file: &'a Path,
    pub varietal_mappings_file: &'a Path,
    pub processing_mappings_file: &'a Path,
}

impl CanonTables {
    pub fn load(paths: &CanonPaths) -> Result<Self> {
        Ok(Self {
            regions: Arc::new(RegionMap::load_dir(paths.region_mappings_dir)?),
            farms: Arc::new(FarmMap::load_file(paths.farm_mappings_file)?),
            varietals: Arc::new(VarietalMap::load_file(paths.varietal_mappings_file)?),
            processing: Arc::new(ProcessingMap::load_file(paths.processing_mappings_file)?),
        })
    }

    /// Persist the varietal and processing maps into ordinary warehouse
    /// tables so ingest can `LEFT JOIN` against them (§4.2: "loaded into
    /// ordinary tables"), rather than invoking a Rust callback per row.
    pub fn materialize_lookup_tables(&self, conn: &Connection) -> Result<()> {
        conn.execute("DELETE FROM varietal_map", [])?;
        conn.execute("DELETE FROM processing_map", [])?;

        {
            let mut stmt = conn.prepare(
                "INSERT INTO varietal_map (original_name, canonical_names, confidence, is_compound, separator)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(original_name) DO UPDATE SET
                    canonical_names = excluded.canonical_names,
                    confidence = excluded.confidence,
                    is_compound = excluded.is_compound,
                    separator = excluded.separator",
            )?;
            for (_, entry) in self.varietals.iter() {
                stmt.execute(rusqlite::params![
                    entry.original_name.to_lowercase(),
                    serde_json::to_string(&entry.canonical_names).unwrap_or_default(),
                    entry.confidence,
                    entry.is_compound,
                    entry.separator,
                ])?;
            }
        }

        {
            let mut stmt = conn.prepare(
                "INSERT INTO processing_map (original_name, common_name) VALUES (?1, ?2)
                 ON CONFLICT(original_name) DO UPDATE SET common_name = excluded.common_name",
            )?;
            for (key, common_name) in self.processing.iter() {
                stmt.execute(rusqlite::params![key, common_name])?;
            }
        }

        Ok(())
    }

    /// Register the SQL-callable functions named in §4.2:
    /// `canonical_state`, `canonical_farm`, `normalize_farm_name`,
    /// `normalize_region_name`.
    pub fn register_sql_functions(&self, conn: &Connection) -> Result<()> {
        let regions = self.regions.clone();
        conn.create_scalar_function(
            "canonical_state",
            2,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let country: String = ctx.get(0)?;
                let region: String = ctx.get(1)?;
                Ok(regions.canonical_state(&country, &region))
            },
        )?;

        let farms = self.farms.clone();
        conn.create_scalar_function(
            "canonical_farm",
            3,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            move |ctx| {
                let country: String = ctx.get(0)?;
                let region_slug: String = ctx.get(1)?;
                let farm_normalized: String = ctx.get(2)?;
                Ok(farms.canonical_farm(&country, &region_slug, &farm_normalized))
            },
        )?;

        conn.create_scalar_function(
            "normalize_region_name",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let region: String = ctx.get(0)?;
                Ok(normalize_region_name(&region))
            },
        )?;

        conn.create_scalar_function(
            "normalize_farm_name",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let farm: String = ctx.get(0)?;
                Ok(normalize_farm_name(&farm))
            },
        )?;

        Ok(())
    }
}

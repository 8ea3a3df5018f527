//! Row-level data models for the warehouse tables.
//!
//! Structs mirror the `Bean`/`Origin`/`Roaster` entities from the data model
//! (§3). Each struct carries its own `insert`/`find_*`/`from_row` methods;
//! bulk operations used by the loader (§4.3) live in [`crate::ingest`]
//! instead, since those are expressed as set operations rather than
//! per-row CRUD.

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoastLevel {
    Light,
    MediumLight,
    Medium,
    MediumDark,
    Dark,
}

impl RoastLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoastLevel::Light => "Light",
            RoastLevel::MediumLight => "Medium-Light",
            RoastLevel::Medium => "Medium",
            RoastLevel::MediumDark => "Medium-Dark",
            RoastLevel::Dark => "Dark",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Light" => Some(RoastLevel::Light),
            "Medium-Light" => Some(RoastLevel::MediumLight),
            "Medium" => Some(RoastLevel::Medium),
            "Medium-Dark" => Some(RoastLevel::MediumDark),
            "Dark" => Some(RoastLevel::Dark),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoastProfile {
    Espresso,
    Filter,
    Omni,
}

impl RoastProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoastProfile::Espresso => "Espresso",
            RoastProfile::Filter => "Filter",
            RoastProfile::Omni => "Omni",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "Espresso" => Some(RoastProfile::Espresso),
            "Filter" => Some(RoastProfile::Filter),
            "Omni" => Some(RoastProfile::Omni),
            _ => None,
        }
    }
}

/// A product record, as described in §3. `tasting_notes` and origins'
/// `variety_canonical` are stored as JSON text columns and (de)serialized at
/// the model boundary.
#[derive(Debug, Clone)]
pub struct Bean {
    pub id: Option<i64>,
    pub url: String,
    pub roaster_directory: String,
    pub name: String,
    pub roaster_name: String,
    pub image_url: Option<String>,
    pub is_single_origin: bool,
    pub price_paid_for_green: Option<f64>,
    pub price_paid_currency: Option<String>,
    pub roast_level: Option<String>,
    pub roast_profile: Option<String>,
    pub weight_grams: Option<i64>,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub is_decaf: bool,
    pub cupping_score: Option<f64>,
    pub tasting_notes: Vec<String>,
    pub description: Option<String>,
    pub in_stock: bool,
    pub scraped_at: String,
    pub scraper_version: Option<String>,
    pub source_filename: String,
    pub clean_url_slug: String,
    pub bean_url_path: String,
    pub date_added: String,
    pub price_usd: Option<f64>,
}

impl Bean {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let notes_json: String = row.get("tasting_notes")?;
        Ok(Self {
            id: row.get("id")?,
            url: row.get("url")?,
            roaster_directory: row.get("roaster_directory")?,
            name: row.get("name")?,
            roaster_name: row.get("roaster_name")?,
            image_url: row.get("image_url")?,
            is_single_origin: row.get("is_single_origin")?,
            price_paid_for_green: row.get("price_paid_for_green")?,
            price_paid_currency: row.get("price_paid_currency")?,
            roast_level: row.get("roast_level")?,
            roast_profile: row.get("roast_profile")?,
            weight_grams: row.get("weight_grams")?,
            price: row.get("price")?,
            currency: row.get("currency")?,
            is_decaf: row.get("is_decaf")?,
            cupping_score: row.get("cupping_score")?,
            tasting_notes: serde_json::from_str(&notes_json).unwrap_or_default(),
            description: row.get("description")?,
            in_stock: row.get("in_stock")?,
            scraped_at: row.get("scraped_at")?,
            scraper_version: row.get("scraper_version")?,
            source_filename: row.get("source_filename")?,
            clean_url_slug: row.get("clean_url_slug")?,
            bean_url_path: row.get("bean_url_path")?,
            date_added: row.get("date_added")?,
            price_usd: row.get("price_usd")?,
        })
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM beans WHERE id = ?1")?;
        Ok(stmt.query_row([id], Self::from_row).optional()?)
    }

    pub fn find_by_url_path(conn: &Connection, path: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM beans WHERE bean_url_path = ?1")?;
        Ok(stmt.query_row([path], Self::from_row).optional()?)
    }
}

/// One farm-level sourcing record for a [`Bean`] (§3).
#[derive(Debug, Clone)]
pub struct Origin {
    pub id: Option<i64>,
    pub bean_id: i64,
    pub country: Option<String>,
    pub region: Option<String>,
    pub region_normalized: Option<String>,
    pub producer: Option<String>,
    pub farm: Option<String>,
    pub farm_normalized: Option<String>,
    pub elevation_min: Option<i64>,
    pub elevation_max: Option<i64>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub process: Option<String>,
    pub process_common_name: Option<String>,
    pub variety: Option<String>,
    pub variety_canonical: Vec<String>,
    pub harvest_date: Option<String>,
}

impl Origin {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let canonical_json: String = row.get("variety_canonical")?;
        Ok(Self {
            id: row.get("id")?,
            bean_id: row.get("bean_id")?,
            country: row.get("country")?,
            region: row.get("region")?,
            region_normalized: row.get("region_normalized")?,
            producer: row.get("producer")?,
            farm: row.get("farm")?,
            farm_normalized: row.get("farm_normalized")?,
            elevation_min: row.get("elevation_min")?,
            elevation_max: row.get("elevation_max")?,
            lat: row.get("lat")?,
            lon: row.get("lon")?,
            process: row.get("process")?,
            process_common_name: row.get("process_common_name")?,
            variety: row.get("variety")?,
            variety_canonical: serde_json::from_str(&canonical_json).unwrap_or_default(),
            harvest_date: row.get("harvest_date")?,
        })
    }

    pub fn find_by_bean(conn: &Connection, bean_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM origins WHERE bean_id = ?1")?;
        let rows = stmt
            .query_map([bean_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

/// A roaster registry entry (§3). Unique by `slug`.
#[derive(Debug, Clone)]
pub struct Roaster {
    pub slug: String,
    pub display_name: String,
    pub website: Option<String>,
    pub location: Option<String>,
    pub active: bool,
    pub last_scraped: Option<String>,
    pub total_beans_scraped: i64,
}

impl Roaster {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            slug: row.get("slug")?,
            display_name: row.get("display_name")?,
            website: row.get("website")?,
            location: row.get("location")?,
            active: row.get("active")?,
            last_scraped: row.get("last_scraped")?,
            total_beans_scraped: row.get("total_beans_scraped")?,
        })
    }

    /// Insert or update the registry entry for `slug`, overriding the
    /// display name as §4.3 step 10 requires.
    pub fn upsert(conn: &Connection, slug: &str, display_name: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO roasters (slug, display_name) VALUES (?1, ?2)
             ON CONFLICT(slug) DO UPDATE SET display_name = excluded.display_name",
            params![slug, display_name],
        )?;
        Ok(())
    }

    pub fn find_by_slug(conn: &Connection, slug: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM roasters WHERE slug = ?1")?;
        Ok(stmt.query_row([slug], Self::from_row).optional()?)
    }

    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM roasters ORDER BY display_name")?;
        let rows = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

//! SQLite schema and migrations for the Kissaten warehouse.
//!
//! A `schema_version` table tracks the highest applied migration, and
//! `migrate` is idempotent and re-entrant so the loader can call it on
//! every startup regardless of mode.

use crate::error::Result;
use rusqlite::Connection;
use tracing::{debug, info};

pub const SCHEMA_VERSION: i32 = 1;

fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;
    let version = conn
        .query_row(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations. Safe to call on every process start.
pub fn migrate(conn: &Connection) -> Result<()> {
    let current = get_schema_version(conn)?;
    info!("current warehouse schema version: {}", current);
    if current >= SCHEMA_VERSION {
        return Ok(());
    }
    for version in (current + 1)..=SCHEMA_VERSION {
        debug!("applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }
    info!("warehouse schema now at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Drop and recreate all warehouse tables (full-refresh mode). The ledger is
/// recreated too, but the caller repopulates it from the files it re-applies
/// so incremental runs afterwards still see an accurate record (§4.1).
pub fn reset(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        DROP TABLE IF EXISTS origins;
        DROP TABLE IF EXISTS beans;
        DROP TABLE IF EXISTS roasters;
        DROP TABLE IF EXISTS ledger;
        DROP TABLE IF EXISTS currency_rates;
        DROP TABLE IF EXISTS varietal_map;
        DROP TABLE IF EXISTS processing_map;
        DROP TABLE IF EXISTS ai_cache;
        DROP TABLE IF EXISTS schema_version;
        ",
    )?;
    migrate(conn)
}

fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        _ => unreachable!("unknown migration version: {}", version),
    }
}

/// Initial schema: roasters, beans, origins, the file-tracking ledger,
/// currency rate history, the varietal/processing lookup tables, and the
/// AI translation cache.
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE roasters (
            slug TEXT PRIMARY KEY,
            display_name TEXT NOT NULL,
            website TEXT,
            location TEXT,
            active INTEGER NOT NULL DEFAULT 1,
            last_scraped TEXT,
            total_beans_scraped INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE beans (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            url TEXT NOT NULL,
            roaster_directory TEXT NOT NULL,
            name TEXT NOT NULL,
            roaster_name TEXT NOT NULL,
            image_url TEXT,
            is_single_origin INTEGER NOT NULL DEFAULT 0,
            price_paid_for_green REAL,
            price_paid_currency TEXT,
            roast_level TEXT,
            roast_profile TEXT,
            weight_grams INTEGER,
            price REAL,
            currency TEXT,
            is_decaf INTEGER NOT NULL DEFAULT 0,
            cupping_score REAL,
            tasting_notes TEXT NOT NULL DEFAULT '[]',
            description TEXT,
            in_stock INTEGER NOT NULL DEFAULT 1,
            scraped_at TEXT NOT NULL,
            scraper_version TEXT,
            source_filename TEXT NOT NULL,
            clean_url_slug TEXT NOT NULL,
            bean_url_path TEXT NOT NULL,
            date_added TEXT NOT NULL,
            price_usd REAL,
            UNIQUE(url, roaster_directory)
        );

        CREATE INDEX idx_beans_roaster_directory ON beans(roaster_directory);
        CREATE INDEX idx_beans_clean_url_slug ON beans(clean_url_slug);
        CREATE INDEX idx_beans_in_stock ON beans(in_stock);
        CREATE INDEX idx_beans_name ON beans(name);

        CREATE TABLE origins (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            bean_id INTEGER NOT NULL,
            country TEXT,
            region TEXT,
            region_normalized TEXT,
            producer TEXT,
            farm TEXT,
            farm_normalized TEXT,
            elevation_min INTEGER,
            elevation_max INTEGER,
            lat REAL,
            lon REAL,
            process TEXT,
            process_common_name TEXT,
            variety TEXT,
            variety_canonical TEXT NOT NULL DEFAULT '[]',
            harvest_date TEXT,
            FOREIGN KEY (bean_id) REFERENCES beans(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_origins_bean_id ON origins(bean_id);
        CREATE INDEX idx_origins_country ON origins(country);
        CREATE INDEX idx_origins_region_normalized ON origins(region_normalized);
        CREATE INDEX idx_origins_farm_normalized ON origins(farm_normalized);

        CREATE TABLE ledger (
            relative_path TEXT PRIMARY KEY,
            sha256 TEXT NOT NULL,
            file_type TEXT NOT NULL CHECK(file_type IN ('json', 'diffjson')),
            processed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE currency_rates (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            base_currency TEXT NOT NULL,
            target_currency TEXT NOT NULL,
            rate REAL NOT NULL,
            fetched_at TEXT NOT NULL,
            data_timestamp INTEGER
        );

        CREATE INDEX idx_currency_rates_lookup
            ON currency_rates(base_currency, target_currency, fetched_at);

        CREATE TABLE varietal_map (
            original_name TEXT PRIMARY KEY,
            canonical_names TEXT NOT NULL,
            confidence REAL NOT NULL DEFAULT 1.0,
            is_compound INTEGER NOT NULL DEFAULT 0,
            separator TEXT
        );

        CREATE TABLE processing_map (
            original_name TEXT PRIMARY KEY,
            common_name TEXT NOT NULL
        );

        CREATE TABLE ai_cache (
            query_hash TEXT PRIMARY KEY,
            query_type TEXT NOT NULL CHECK(query_type IN ('text', 'image')),
            original_query TEXT,
            params_json TEXT NOT NULL,
            hit_count INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_accessed TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at TEXT NOT NULL
        );
        ",
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn migrate_creates_all_tables() {
        let conn = open();
        migrate(&conn).unwrap();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in [
            "beans",
            "origins",
            "roasters",
            "ledger",
            "currency_rates",
            "varietal_map",
            "processing_map",
            "ai_cache",
            "schema_version",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn migrate_is_idempotent() {
        let conn = open();
        migrate(&conn).unwrap();
        let v1 = get_schema_version(&conn).unwrap();
        migrate(&conn).unwrap();
        let v2 = get_schema_version(&conn).unwrap();
        assert_eq!(v1, v2);
        assert_eq!(v1, SCHEMA_VERSION);
    }

    #[test]
    fn reset_truncates_and_recreates() {
        let conn = open();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO roasters (slug, display_name) VALUES ('foo', 'Foo')",
            [],
        )
        .unwrap();
        reset(&conn).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM roasters", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn bean_unique_per_url_and_roaster() {
        let conn = open();
        migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, scraped_at,
                source_filename, clean_url_slug, bean_url_path, date_added)
             VALUES ('u', 'r', 'n', 'rn', 't', 'f', 'f', '/r/f', 't')",
            [],
        )
        .unwrap();
        let result = conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, scraped_at,
                source_filename, clean_url_slug, bean_url_path, date_added)
             VALUES ('u', 'r', 'n2', 'rn', 't', 'f2', 'f2', '/r/f2', 't')",
            [],
        );
        assert!(result.is_err());
    }
}

//! Warehouse Loader (§4.3): the full ingest algorithm, driven by the
//! ledger, canonicalization tables, and the scanned directory tree.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::{info, warn};

use crate::canon::{normalize_farm_name, normalize_region_name, CanonTables};
use crate::canon::country::normalize_country;
use crate::currency::CurrencyService;
use crate::db::schema;
use crate::error::Result;
use crate::ledger::{self, FileType};

use super::bean_json::{self, RawBean};
use super::diff::{self, DiffUpdate};
use super::scan::{self, DiscoveredFile};

pub struct LoaderOptions<'a> {
    pub data_root: &'a Path,
    pub incremental: bool,
    pub check_for_changes: bool,
}

#[derive(Debug, Default, Clone)]
pub struct LoadReport {
    pub beans_upserted: usize,
    pub diffs_applied: usize,
    pub diffs_skipped: usize,
    pub files_deleted: usize,
    pub recoverable_errors: Vec<String>,
}

/// Run one full pass of the algorithm in §4.3 over `conn`.
pub fn run(conn: &mut Connection, canon: &CanonTables, options: &LoaderOptions) -> Result<LoadReport> {
    // Steps 1-3: schema, canon tables, SQL functions. The SQL functions are
    // already registered on the connection by `db::open`; here we only
    // handle the full-refresh-vs-incremental schema choice and materialize
    // the varietal/processing lookup tables.
    if !options.incremental {
        schema::reset(conn)?;
    } else {
        schema::migrate(conn)?;
    }
    canon.materialize_lookup_tables(conn)?;

    // Step 4: discover the directory tree.
    let discovered = scan::discover(options.data_root)?;
    let (json_files, diff_files): (Vec<_>, Vec<_>) = discovered
        .into_iter()
        .partition(|f| f.candidate.file_type == FileType::Json);

    let mut report = LoadReport::default();

    // Step 5a: deletion sweep for files removed from disk.
    let deleted = ledger::find_deleted(conn, options.data_root)?;
    for relative_path in &deleted {
        cascade_delete_by_source_filename(conn, relative_path)?;
        ledger::remove(conn, relative_path)?;
        report.files_deleted += 1;
    }

    // Step 5b: checksum-changed detection and ledger-driven new/changed set.
    let json_candidates: Vec<_> = json_files.iter().map(|f| f.candidate.clone()).collect();
    let diff_candidates: Vec<_> = diff_files.iter().map(|f| f.candidate.clone()).collect();

    let unprocessed_json_paths: HashSet<String> = ledger::filter_unprocessed(
        conn,
        &json_candidates,
        options.check_for_changes,
    )?
    .into_iter()
    .map(|c| c.relative_path)
    .collect();

    for file in json_files.iter().filter(|f| unprocessed_json_paths.contains(&f.candidate.relative_path)) {
        if already_ledgered(conn, &file.candidate.relative_path)? {
            cascade_delete_by_source_filename(conn, &file.candidate.relative_path)?;
        }
    }

    // Step 6-7: latest scrape_date per roaster, and the authoritative url
    // set present at that date (json or diffjson), for stock derivation.
    let all_files: Vec<&DiscoveredFile> = json_files.iter().chain(diff_files.iter()).collect();
    let latest_date_by_roaster = latest_scrape_dates(&all_files);
    let present_at_latest = urls_present_at_latest(&all_files, &latest_date_by_roaster);

    // Steps 8-11: parse, validate, and upsert every new/changed bean in
    // ascending (scrape_date, relative_path) order — `scan::discover`
    // already returns files in that order, so the last upsert per
    // (roaster_directory, url) naturally holds the newest field values,
    // while date_added accumulates the minimum scraped_at seen.
    for file in &json_files {
        if !unprocessed_json_paths.contains(&file.candidate.relative_path) {
            continue;
        }
        match std::fs::read_to_string(&file.candidate.absolute_path) {
            Ok(text) => match bean_json::parse_and_validate(&text) {
                Ok(bean) => {
                    upsert_bean(conn, canon, file, &bean)?;
                    report.beans_upserted += 1;
                }
                Err(e) => {
                    warn!(file = %file.candidate.relative_path, error = %e, "skipping invalid bean record");
                    report.recoverable_errors.push(format!("{}: {e}", file.candidate.relative_path));
                    continue;
                }
            },
            Err(e) => {
                warn!(file = %file.candidate.relative_path, error = %e, "could not read file");
                report.recoverable_errors.push(format!("{}: {e}", file.candidate.relative_path));
                continue;
            }
        }
        ledger::mark_processed(conn, &file.candidate)?;
    }

    // Step 7 (continued): apply derived in_stock per roaster now that rows
    // exist for this run.
    apply_stock_status(conn, &present_at_latest)?;

    // Step 10: override roaster display name.
    // (handled inside upsert_bean via Roaster::upsert)

    // Step 12 already folded into the mark_processed calls above.

    // Step 13: diff-JSON updates, ascending by scraped_at.
    let unprocessed_diff_paths: HashSet<String> =
        ledger::filter_unprocessed(conn, &diff_candidates, options.check_for_changes)?
            .into_iter()
            .map(|c| c.relative_path)
            .collect();

    let mut pending_diffs: Vec<(DiscoveredFile, DiffUpdate)> = Vec::new();
    for file in &diff_files {
        if !unprocessed_diff_paths.contains(&file.candidate.relative_path) {
            continue;
        }
        let text = match std::fs::read_to_string(&file.candidate.absolute_path) {
            Ok(t) => t,
            Err(e) => {
                warn!(file = %file.candidate.relative_path, error = %e, "could not read diff file");
                report.recoverable_errors.push(format!("{}: {e}", file.candidate.relative_path));
                continue;
            }
        };
        match diff::parse(&text) {
            Ok(update) => pending_diffs.push((file.clone(), update)),
            Err(e) => {
                warn!(file = %file.candidate.relative_path, error = %e, "skipping malformed diff file");
                report.recoverable_errors.push(format!("{}: {e}", file.candidate.relative_path));
            }
        }
    }
    pending_diffs.sort_by(|a, b| a.1.scraped_at.cmp(&b.1.scraped_at));

    for (file, update) in &pending_diffs {
        match diff::apply(conn, update) {
            Ok(true) => {
                report.diffs_applied += 1;
                ledger::mark_processed(conn, &file.candidate)?;
            }
            Ok(false) => {
                // Target bean not found yet (diff arrived before its full
                // JSON, or the bean was deleted). Leave unledgered so a
                // later pass, once the bean exists, re-applies it.
                report.diffs_skipped += 1;
            }
            Err(e) => {
                warn!(file = %file.candidate.relative_path, error = %e, "diff application failed");
                report.recoverable_errors.push(format!("{}: {e}", file.candidate.relative_path));
            }
        }
    }

    // Step 14: recompute price_usd for every bean with a known price.
    recompute_price_usd(conn)?;

    info!(
        beans_upserted = report.beans_upserted,
        diffs_applied = report.diffs_applied,
        diffs_skipped = report.diffs_skipped,
        files_deleted = report.files_deleted,
        "ingest pass complete"
    );
    Ok(report)
}

fn already_ledgered(conn: &Connection, relative_path: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ledger WHERE relative_path = ?1",
        [relative_path],
        |row| row.get(0),
    )?;
    Ok(count > 0)
}

fn cascade_delete_by_source_filename(conn: &Connection, relative_path: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM origins WHERE bean_id IN (SELECT id FROM beans WHERE source_filename = ?1)",
        [relative_path],
    )?;
    conn.execute("DELETE FROM beans WHERE source_filename = ?1", [relative_path])?;
    Ok(())
}

fn latest_scrape_dates(files: &[&DiscoveredFile]) -> HashMap<String, String> {
    let mut latest: HashMap<String, String> = HashMap::new();
    for file in files {
        latest
            .entry(file.roaster_directory.clone())
            .and_modify(|d| {
                if file.scrape_date > *d {
                    *d = file.scrape_date.clone();
                }
            })
            .or_insert_with(|| file.scrape_date.clone());
    }
    latest
}

fn urls_present_at_latest(
    files: &[&DiscoveredFile],
    latest_date_by_roaster: &HashMap<String, String>,
) -> HashMap<String, HashSet<String>> {
    let mut present: HashMap<String, HashSet<String>> = HashMap::new();
    for file in files {
        let Some(latest) = latest_date_by_roaster.get(&file.roaster_directory) else {
            continue;
        };
        if &file.scrape_date != latest {
            continue;
        }
        if let Some(url) = &file.url {
            present
                .entry(file.roaster_directory.clone())
                .or_default()
                .insert(url.clone());
        }
    }
    present
}

fn apply_stock_status(conn: &Connection, present_at_latest: &HashMap<String, HashSet<String>>) -> Result<()> {
    let roasters: Vec<String> = {
        let mut stmt = conn.prepare("SELECT DISTINCT roaster_directory FROM beans")?;
        stmt.query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };

    for roaster_directory in roasters {
        let present = present_at_latest.get(&roaster_directory).cloned().unwrap_or_default();
        let mut stmt = conn.prepare("SELECT id, url FROM beans WHERE roaster_directory = ?1")?;
        let rows: Vec<(i64, String)> = stmt
            .query_map([&roaster_directory], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (id, url) in rows {
            let in_stock = present.contains(&url);
            conn.execute(
                "UPDATE beans SET in_stock = ?1 WHERE id = ?2",
                params![in_stock, id],
            )?;
        }
    }
    Ok(())
}

fn upsert_bean(conn: &Connection, canon: &CanonTables, file: &DiscoveredFile, bean: &RawBean) -> Result<()> {
    crate::db::models::Roaster::upsert(conn, &file.roaster_directory, &bean.roaster)?;

    let clean_url_slug = scan::clean_url_slug(&file.candidate.relative_path);
    let bean_url_path = format!("/{}/{}", file.roaster_directory, clean_url_slug);
    let tasting_notes = serde_json::to_string(&bean.normalized_tasting_notes()).unwrap_or_default();
    let image_url = bean.image_url.as_ref().filter(|s| !s.is_empty()).cloned();

    conn.execute(
        "INSERT INTO beans (
            url, roaster_directory, name, roaster_name, image_url, is_single_origin,
            price_paid_for_green, price_paid_currency, roast_level, roast_profile,
            weight_grams, price, currency, is_decaf, cupping_score, tasting_notes,
            description, in_stock, scraped_at, scraper_version, source_filename,
            clean_url_slug, bean_url_path, date_added
         ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?19
         )
         ON CONFLICT(url, roaster_directory) DO UPDATE SET
            name = excluded.name,
            roaster_name = excluded.roaster_name,
            image_url = excluded.image_url,
            is_single_origin = excluded.is_single_origin,
            price_paid_for_green = excluded.price_paid_for_green,
            price_paid_currency = excluded.price_paid_currency,
            roast_level = excluded.roast_level,
            roast_profile = excluded.roast_profile,
            weight_grams = excluded.weight_grams,
            price = excluded.price,
            currency = excluded.currency,
            is_decaf = excluded.is_decaf,
            cupping_score = excluded.cupping_score,
            tasting_notes = excluded.tasting_notes,
            description = excluded.description,
            in_stock = excluded.in_stock,
            scraped_at = excluded.scraped_at,
            scraper_version = excluded.scraper_version,
            source_filename = excluded.source_filename,
            clean_url_slug = excluded.clean_url_slug,
            bean_url_path = excluded.bean_url_path,
            date_added = MIN(beans.date_added, excluded.date_added)",
        params![
            bean.url,
            file.roaster_directory,
            bean.name,
            bean.roaster,
            image_url,
            bean.is_single_origin,
            bean.price_paid_for_green,
            bean.price_paid_currency,
            bean.roast_level,
            bean.roast_profile,
            bean.weight_grams,
            bean.price,
            bean.currency,
            bean.is_decaf,
            bean.cupping_score,
            tasting_notes,
            bean.description,
            bean.resolved_in_stock(),
            bean.scraped_at,
            bean.scraper_version,
            file.candidate.relative_path,
            clean_url_slug,
            bean_url_path,
        ],
    )?;

    let bean_id: i64 = conn.query_row(
        "SELECT id FROM beans WHERE url = ?1 AND roaster_directory = ?2",
        params![bean.url, file.roaster_directory],
        |row| row.get(0),
    )?;

    conn.execute("DELETE FROM origins WHERE bean_id = ?1", [bean_id])?;
    for origin in &bean.origins {
        insert_origin(conn, canon, bean_id, origin)?;
    }

    Ok(())
}

fn insert_origin(
    conn: &Connection,
    canon: &CanonTables,
    bean_id: i64,
    origin: &super::bean_json::RawOrigin,
) -> Result<()> {
    let country = origin.country.as_deref().map(normalize_country);
    let region_normalized = origin.region.as_deref().map(normalize_region_name);
    let farm_normalized = origin.farm.as_deref().map(normalize_farm_name);

    let process_common_name = origin
        .process
        .as_ref()
        .map(|p| canon.processing.common_name(p));

    let variety_canonical = origin
        .variety
        .as_ref()
        .map(|v| canon.varietals.canonical_names(v))
        .unwrap_or_default();

    conn.execute(
        "INSERT INTO origins (
            bean_id, country, region, region_normalized, producer, farm, farm_normalized,
            elevation_min, elevation_max, lat, lon, process, process_common_name,
            variety, variety_canonical, harvest_date
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            bean_id,
            country,
            origin.region,
            region_normalized,
            origin.producer,
            origin.farm,
            farm_normalized,
            origin.elevation_min,
            origin.elevation_max,
            origin.lat,
            origin.lon,
            origin.process,
            process_common_name,
            origin.variety,
            serde_json::to_string(&variety_canonical).unwrap_or_default(),
            origin.harvest_date,
        ],
    )?;
    Ok(())
}

fn recompute_price_usd(conn: &Connection) -> Result<()> {
    let beans: Vec<(i64, f64, String)> = {
        let mut stmt = conn.prepare("SELECT id, price, currency FROM beans WHERE price IS NOT NULL AND currency IS NOT NULL")?;
        stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?
    };
    for (id, price, currency) in beans {
        let price_usd = CurrencyService::convert(conn, price, &currency, "USD")?;
        conn.execute(
            "UPDATE beans SET price_usd = ?1 WHERE id = ?2",
            params![price_usd, id],
        )?;
    }
    Ok(())
}

#[allow(dead_code)]
fn bean_id_for_url(conn: &Connection, url: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM beans WHERE url = ?1", [url], |r| r.get(0))
        .optional()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_bean(dir: &Path, roaster: &str, date: &str, file_stem: &str, body: &serde_json::Value) {
        let day_dir = dir.join("roasters").join(roaster).join(date);
        fs::create_dir_all(&day_dir).unwrap();
        fs::write(day_dir.join(format!("{file_stem}.json")), body.to_string()).unwrap();
    }

    fn bean_json(url: &str, scraped_at: &str) -> serde_json::Value {
        serde_json::json!({
            "url": url,
            "name": "Ethiopia Gesha",
            "roaster": "Sey Coffee",
            "scraped_at": scraped_at,
            "price": 22.0,
            "currency": "USD",
            "origins": [{"country": "ET", "region": "Yirgacheffe"}]
        })
    }

    #[test]
    fn stock_derivation_across_two_scrape_dates() {
        let dir = tempfile::tempdir().unwrap();
        write_bean(dir.path(), "sey", "20250908", "bean-a_100000", &bean_json("https://x/a", "2025-09-08T10:00:00Z"));
        write_bean(dir.path(), "sey", "20250908", "bean-b_100000", &bean_json("https://x/b", "2025-09-08T10:00:00Z"));
        write_bean(dir.path(), "sey", "20250911", "bean-a_100000", &bean_json("https://x/a", "2025-09-11T10:00:00Z"));

        let mut conn = Connection::open_in_memory().unwrap();
        let canon = CanonTables::default();
        schema::migrate(&conn).unwrap();
        canon.register_sql_functions(&conn).unwrap();

        let options = LoaderOptions {
            data_root: dir.path(),
            incremental: false,
            check_for_changes: false,
        };
        let report = run(&mut conn, &canon, &options).unwrap();
        assert_eq!(report.beans_upserted, 2);

        let a_in_stock: bool = conn
            .query_row("SELECT in_stock FROM beans WHERE url = 'https://x/a'", [], |r| r.get(0))
            .unwrap();
        let b_in_stock: bool = conn
            .query_row("SELECT in_stock FROM beans WHERE url = 'https://x/b'", [], |r| r.get(0))
            .unwrap();
        assert!(a_in_stock);
        assert!(!b_in_stock);

        let date_added: String = conn
            .query_row("SELECT date_added FROM beans WHERE url = 'https://x/a'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(date_added, "2025-09-08T10:00:00Z");
    }

    #[test]
    fn idempotent_full_refresh() {
        let dir = tempfile::tempdir().unwrap();
        write_bean(dir.path(), "sey", "20250908", "bean-a_100000", &bean_json("https://x/a", "2025-09-08T10:00:00Z"));

        let canon = CanonTables::default();
        let options = LoaderOptions {
            data_root: dir.path(),
            incremental: false,
            check_for_changes: false,
        };

        let mut conn1 = Connection::open_in_memory().unwrap();
        schema::migrate(&conn1).unwrap();
        canon.register_sql_functions(&conn1).unwrap();
        run(&mut conn1, &canon, &options).unwrap();
        run(&mut conn1, &canon, &options).unwrap();

        let count: i64 = conn1.query_row("SELECT COUNT(*) FROM beans", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }
}

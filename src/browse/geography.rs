//! Country/region/farm aggregate endpoints (§4.7).

use rusqlite::Connection;
use serde::Serialize;

use crate::canon::normalize_region_name;
use crate::error::Result;
use crate::search::filters;
use crate::search::SearchParams;

#[derive(Debug, Clone, Serialize)]
pub struct CountryDetail {
    pub country: String,
    pub bean_count: i64,
    pub roaster_count: i64,
    pub region_count: i64,
    pub farm_count: i64,
    pub avg_elevation: Option<f64>,
    pub avg_price_usd: Option<f64>,
    pub top_roasters: Vec<(String, i64)>,
    pub common_tasting_notes: Vec<(String, i64)>,
    pub top_varietals: Vec<(String, i64)>,
    pub processing_methods: Vec<(String, i64)>,
    pub elevation_distribution: Vec<(String, i64)>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FarmSummary {
    pub farm_normalized: String,
    pub display_name: String,
    pub bean_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RegionDetail {
    pub country: String,
    pub region_slug: String,
    pub total_beans: i64,
    pub farms: Vec<FarmSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FarmDetail {
    pub country: String,
    pub region_slug: String,
    pub farm_normalized: String,
    pub display_name: String,
    pub total_beans: i64,
    pub producers: Vec<String>,
}

fn scoped_where(params: &SearchParams, country: &str) -> Result<(String, Vec<rusqlite::types::Value>)> {
    let mut scoped = params.clone();
    scoped.origin = vec![country.to_string()];
    filters::build(&scoped)
}

pub fn country_detail(conn: &Connection, country: &str, params: &SearchParams) -> Result<CountryDetail> {
    let (where_sql, binds) = scoped_where(params, country)?;

    let bean_count: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM beans b WHERE {where_sql}"),
        rusqlite::params_from_iter(binds.iter()),
        |row| row.get(0),
    )?;

    let roaster_count: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT roaster_directory) FROM beans b WHERE {where_sql}"
        ),
        rusqlite::params_from_iter(binds.iter()),
        |row| row.get(0),
    )?;

    let (region_count, farm_count, avg_elevation): (i64, i64, Option<f64>) = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT o.region_normalized), COUNT(DISTINCT o.farm_normalized), AVG((o.elevation_min + o.elevation_max) / 2.0)
             FROM origins o JOIN beans b ON b.id = o.bean_id
             WHERE o.country = ?1 AND ({where_sql})"
        ),
        rusqlite::params_from_iter(std::iter::once(rusqlite::types::Value::Text(country.to_string())).chain(binds.iter().cloned())),
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
    )?;

    let avg_price_usd: Option<f64> = conn.query_row(
        &format!("SELECT AVG(price_usd) FROM beans b WHERE {where_sql}"),
        rusqlite::params_from_iter(binds.iter()),
        |row| row.get(0),
    )?;

    let top_roasters = top_n(
        conn,
        &format!("SELECT roaster_name, COUNT(*) c FROM beans b WHERE {where_sql} GROUP BY roaster_name ORDER BY c DESC LIMIT 10"),
        &binds,
    )?;
    let processing_methods = top_n(
        conn,
        &format!(
            "SELECT o.process_common_name, COUNT(*) c FROM origins o JOIN beans b ON b.id = o.bean_id
             WHERE o.country = ?1 AND o.process_common_name IS NOT NULL AND ({where_sql})
             GROUP BY o.process_common_name ORDER BY c DESC LIMIT 10"
        ),
        &prepend(country, &binds),
    )?;
    let common_tasting_notes = top_n(
        conn,
        &format!(
            "SELECT je.value, COUNT(*) c FROM beans b, json_each(b.tasting_notes) je
             WHERE {where_sql}
             GROUP BY je.value ORDER BY c DESC LIMIT 10"
        ),
        &binds,
    )?;
    let top_varietals = top_n(
        conn,
        &format!(
            "SELECT je.value, COUNT(DISTINCT b.id) c
             FROM origins o JOIN beans b ON b.id = o.bean_id, json_each(o.variety_canonical) je
             WHERE o.country = ?1 AND ({where_sql})
             GROUP BY je.value ORDER BY c DESC LIMIT 10"
        ),
        &prepend(country, &binds),
    )?;
    let elevation_distribution = elevation_distribution(conn, &where_sql, country, &binds)?;

    Ok(CountryDetail {
        country: country.to_string(),
        bean_count,
        roaster_count,
        region_count,
        farm_count,
        avg_elevation,
        avg_price_usd,
        top_roasters,
        common_tasting_notes,
        top_varietals,
        processing_methods,
        elevation_distribution,
    })
}

/// Buckets beans into the specialty-coffee trade's standard elevation
/// grades (low grown / standard / high grown / strictly high grown), by
/// each bean's average elevation across its origins. A bean with no
/// elevation data on any origin falls into "unknown".
fn elevation_distribution(
    conn: &Connection,
    where_sql: &str,
    country: &str,
    binds: &[rusqlite::types::Value],
) -> Result<Vec<(String, i64)>> {
    let sql = format!(
        "SELECT
            CASE
                WHEN avg_elev IS NULL THEN 'unknown'
                WHEN avg_elev < 1000 THEN 'low grown (<1000m)'
                WHEN avg_elev < 1500 THEN 'standard (1000-1500m)'
                WHEN avg_elev < 1900 THEN 'high grown (1500-1900m)'
                ELSE 'strictly high grown (1900m+)'
            END AS bucket,
            COUNT(*) AS c
         FROM (
            SELECT b.id, AVG((o.elevation_min + o.elevation_max) / 2.0) AS avg_elev
            FROM origins o JOIN beans b ON b.id = o.bean_id
            WHERE o.country = ?1 AND ({where_sql})
            GROUP BY b.id
         )
         GROUP BY bucket ORDER BY c DESC"
    );
    top_n(conn, &sql, &prepend(country, binds))
}

fn prepend(country: &str, binds: &[rusqlite::types::Value]) -> Vec<rusqlite::types::Value> {
    let mut v = vec![rusqlite::types::Value::Text(country.to_string())];
    v.extend(binds.iter().cloned());
    v
}

fn top_n(conn: &Connection, sql: &str, binds: &[rusqlite::types::Value]) -> Result<Vec<(String, i64)>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(rusqlite::params_from_iter(binds.iter()), |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Region identified by (country, region_slug), where region_slug is the
/// normalized canonical state. Matches both raw `region_normalized` and the
/// canonicalized `canonical_state` per §4.7's consistency requirement.
pub fn region_detail(
    conn: &Connection,
    country: &str,
    region_slug: &str,
    params: &SearchParams,
) -> Result<RegionDetail> {
    let (base_where, base_binds) = scoped_where(params, country)?;

    let region_match = "(o.region_normalized = ?2 OR normalize_region_name(COALESCE(canonical_state(o.country, o.region), '')) = ?2)";

    let total_beans: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT b.id) FROM origins o JOIN beans b ON b.id = o.bean_id
             WHERE o.country = ?1 AND {region_match} AND ({base_where})"
        ),
        rusqlite::params_from_iter(
            [
                rusqlite::types::Value::Text(country.to_string()),
                rusqlite::types::Value::Text(region_slug.to_string()),
            ]
            .into_iter()
            .chain(base_binds.iter().cloned()),
        ),
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT o.farm_normalized, COALESCE(canonical_farm(o.country, ?2, o.farm_normalized), o.farm), COUNT(DISTINCT b.id)
         FROM origins o JOIN beans b ON b.id = o.bean_id
         WHERE o.country = ?1 AND {region_match} AND o.farm_normalized IS NOT NULL AND ({base_where})
         GROUP BY o.farm_normalized
         ORDER BY 3 DESC"
    ))?;
    let farms = stmt
        .query_map(
            rusqlite::params_from_iter(
                [
                    rusqlite::types::Value::Text(country.to_string()),
                    rusqlite::types::Value::Text(region_slug.to_string()),
                ]
                .into_iter()
                .chain(base_binds.iter().cloned()),
            ),
            |row| {
                Ok(FarmSummary {
                    farm_normalized: row.get(0)?,
                    display_name: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    bean_count: row.get(2)?,
                })
            },
        )?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(RegionDetail {
        country: country.to_string(),
        region_slug: region_slug.to_string(),
        total_beans,
        farms,
    })
}

pub fn farm_detail(
    conn: &Connection,
    country: &str,
    region_slug: &str,
    farm_normalized: &str,
    params: &SearchParams,
) -> Result<FarmDetail> {
    let (base_where, base_binds) = scoped_where(params, country)?;
    let region_match = "(o.region_normalized = ?2 OR normalize_region_name(COALESCE(canonical_state(o.country, o.region), '')) = ?2)";

    let binds: Vec<rusqlite::types::Value> = [
        rusqlite::types::Value::Text(country.to_string()),
        rusqlite::types::Value::Text(region_slug.to_string()),
        rusqlite::types::Value::Text(farm_normalized.to_string()),
    ]
    .into_iter()
    .chain(base_binds.iter().cloned())
    .collect();

    let total_beans: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(DISTINCT b.id) FROM origins o JOIN beans b ON b.id = o.bean_id
             WHERE o.country = ?1 AND {region_match} AND o.farm_normalized = ?3 AND ({base_where})"
        ),
        rusqlite::params_from_iter(binds.iter()),
        |row| row.get(0),
    )?;

    let display_name: Option<String> = conn.query_row(
        "SELECT canonical_farm(?1, ?2, ?3)",
        [country, region_slug, farm_normalized],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT DISTINCT o.producer FROM origins o JOIN beans b ON b.id = o.bean_id
         WHERE o.country = ?1 AND {region_match} AND o.farm_normalized = ?3 AND o.producer IS NOT NULL AND ({base_where})"
    ))?;
    let producers = stmt
        .query_map(rusqlite::params_from_iter(binds.iter()), |row| row.get(0))?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(FarmDetail {
        country: country.to_string(),
        region_slug: region_slug.to_string(),
        farm_normalized: farm_normalized.to_string(),
        display_name: display_name.unwrap_or_else(|| farm_normalized.to_string()),
        total_beans,
        producers,
    })
}

#[derive(Debug, Clone, Serialize)]
pub struct OriginHit {
    pub kind: String,
    pub value: String,
    pub country: Option<String>,
}

/// Free-text typeahead across countries, regions, and farms (§4.7).
pub fn origin_search(conn: &Connection, query: &str) -> Result<Vec<OriginHit>> {
    let pattern = format!("%{}%", normalize_region_name(query));
    let mut hits = Vec::new();

    let mut stmt = conn.prepare(
        "SELECT DISTINCT country FROM origins WHERE country IS NOT NULL AND LOWER(country) LIKE LOWER(?1) LIMIT 10",
    )?;
    for row in stmt.query_map([format!("%{query}%")], |r| r.get::<_, String>(0))? {
        hits.push(OriginHit {
            kind: "country".to_string(),
            value: row?,
            country: None,
        });
    }

    let mut stmt = conn.prepare(
        "SELECT DISTINCT region, country FROM origins WHERE region_normalized LIKE ?1 LIMIT 10",
    )?;
    for row in stmt.query_map([&pattern], |r| Ok((r.get::<_, Option<String>>(0)?, r.get::<_, Option<String>>(1)?)))? {
        let (region, country) = row?;
        if let Some(region) = region {
            hits.push(OriginHit {
                kind: "region".to_string(),
                value: region,
                country,
            });
        }
    }

    let mut stmt = conn.prepare(
        "SELECT DISTINCT farm, country FROM origins WHERE farm_normalized LIKE ?1 LIMIT 10",
    )?;
    for row in stmt.query_map([&pattern], |r| Ok((r.get::<_, Option<String>>(0)?, r.get::<_, Option<String>>(1)?)))? {
        let (farm, country) = row?;
        if let Some(farm) = farm {
            hits.push(OriginHit {
                kind: "farm".to_string(),
                value: farm,
                country,
            });
        }
    }

    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use crate::canon::CanonTables;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        CanonTables::default().register_sql_functions(&conn).unwrap();
        conn
    }

    fn seed_bean(conn: &Connection, url: &str, country: &str, region: &str) -> i64 {
        conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, scraped_at,
                source_filename, clean_url_slug, bean_url_path, date_added)
             VALUES (?1, 'r', 'n', 'Roaster', 't', 'f', ?1, '/r/f', 't')",
            [url],
        )
        .unwrap();
        let bean_id = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO origins (bean_id, country, region, region_normalized, farm, farm_normalized)
             VALUES (?1, ?2, ?3, ?4, 'La Esperanza', 'la-esperanza')",
            rusqlite::params![bean_id, country, region, normalize_region_name(region)],
        )
        .unwrap();
        bean_id
    }

    #[test]
    fn region_detail_matches_search_by_raw_normalized_region() {
        let conn = open();
        seed_bean(&conn, "u1", "CO", "Huila");
        seed_bean(&conn, "u2", "CO", "Nariño");

        let params = SearchParams::default();
        let detail = region_detail(&conn, "CO", "huila", &params).unwrap();
        assert_eq!(detail.total_beans, 1);
        assert_eq!(detail.farms.len(), 1);
    }

    #[test]
    fn origin_search_finds_countries_and_regions() {
        let conn = open();
        seed_bean(&conn, "u1", "CO", "Huila");
        let hits = origin_search(&conn, "Huila").unwrap();
        assert!(hits.iter().any(|h| h.kind == "region" && h.value == "Huila"));
    }
}

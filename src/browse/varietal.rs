//! Varietal listing and detail (§4.7, consistent with `variety`/`variety_canonical`
//! filtering in [`crate::search::filters`]).

use rusqlite::Connection;
use serde::Serialize;

use crate::error::Result;
use crate::search::{self, filters, SearchParams};

#[derive(Debug, Clone, Serialize)]
pub struct VarietalSummary {
    pub name: String,
    pub bean_count: i64,
}

/// Every canonical varietal in use, most-common first. Counts distinct
/// beans, not distinct origins, so a bean with two origins sharing a
/// varietal is only counted once.
pub fn list(conn: &Connection) -> Result<Vec<VarietalSummary>> {
    let mut stmt = conn.prepare(
        "SELECT je.value, COUNT(DISTINCT o.bean_id)
         FROM origins o, json_each(o.variety_canonical) je
         WHERE je.value != ''
         GROUP BY je.value
         ORDER BY 2 DESC, 1 ASC",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(VarietalSummary {
                name: row.get(0)?,
                bean_count: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(rows)
}

#[derive(Debug, Clone, Serialize)]
pub struct VarietalDetail {
    pub name: String,
    pub total_beans: i64,
}

/// Beans carrying `name` as an original or canonical variety, using the
/// exact same compiled predicate `search` uses for `variety=` requests so
/// the two totals agree (§8's consistency requirement).
pub fn detail(conn: &Connection, name: &str) -> Result<VarietalDetail> {
    let mut params = SearchParams::default();
    params.variety = Some(format!("\"{name}\""));
    let (where_sql, binds) = filters::build(&params)?;

    let total_beans: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM beans b WHERE {where_sql}"),
        rusqlite::params_from_iter(binds.iter()),
        |row| row.get(0),
    )?;

    let _ = search::MAX_POSSIBLE_SCORE;
    Ok(VarietalDetail {
        name: name.to_string(),
        total_beans,
    })
}

//! AI Translation Cache (§4.8): persistent keyed store mapping a
//! natural-language query (or image hash) to a previously computed
//! structured filter set.

use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::hash::sha256_hex;

const DEFAULT_TTL_HOURS: i64 = 168;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Text,
    Image,
}

impl QueryKind {
    fn as_str(&self) -> &'static str {
        match self {
            QueryKind::Text => "text",
            QueryKind::Image => "image",
        }
    }
}

/// Normalize whitespace and case before hashing a text query, so
/// "Fruity Ethiopian" and "fruity   ethiopian" collide (§4.8).
pub fn normalize_text_query(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

fn text_key(text: &str) -> String {
    sha256_hex(normalize_text_query(text).as_bytes())
}

fn image_key(bytes: &[u8]) -> String {
    sha256_hex(bytes)
}

/// Look up a cached, still-valid entry by normalized text query. Returns
/// `None` when absent or expired (the row itself is left in place, per
/// §4.8's "indefinite retention for dataset building").
pub fn get_text<T: DeserializeOwned>(conn: &Connection, text: &str) -> Result<Option<T>> {
    get(conn, &text_key(text))
}

pub fn get_image<T: DeserializeOwned>(conn: &Connection, bytes: &[u8]) -> Result<Option<T>> {
    get(conn, &image_key(bytes))
}

fn get<T>(conn: &Connection, query_hash: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    let row: Option<(String, String)> = conn
        .query_row(
            "SELECT params_json, expires_at FROM ai_cache WHERE query_hash = ?1",
            [query_hash],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    let Some((params_json, expires_at)) = row else {
        return Ok(None);
    };

    let expires_at = chrono::DateTime::parse_from_rfc3339(&expires_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(Utc::now());
    if expires_at < Utc::now() {
        return Ok(None);
    }

    conn.execute(
        "UPDATE ai_cache SET hit_count = hit_count + 1, last_accessed = ?1 WHERE query_hash = ?2",
        params![Utc::now().to_rfc3339(), query_hash],
    )?;

    Ok(Some(serde_json::from_str(&params_json)?))
}

/// Upsert a cache entry keyed on a normalized text query.
pub fn put_text<T: Serialize>(
    conn: &Connection,
    text: &str,
    original_query: Option<&str>,
    params: &T,
) -> Result<()> {
    put(
        conn,
        &text_key(text),
        QueryKind::Text,
        original_query,
        params,
    )
}

/// Upsert a cache entry keyed on image bytes.
pub fn put_image<T: Serialize>(conn: &Connection, bytes: &[u8], params: &T) -> Result<()> {
    put(conn, &image_key(bytes), QueryKind::Image, None, params)
}

fn put<T: Serialize>(
    conn: &Connection,
    query_hash: &str,
    kind: QueryKind,
    original_query: Option<&str>,
    params: &T,
) -> Result<()> {
    let params_json = serde_json::to_string(params)?;
    let now = Utc::now();
    let expires_at = now + Duration::hours(DEFAULT_TTL_HOURS);
    conn.execute(
        "INSERT INTO ai_cache (query_hash, query_type, original_query, params_json, expires_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(query_hash) DO UPDATE SET
            params_json = excluded.params_json,
            expires_at = excluded.expires_at,
            last_accessed = excluded.last_accessed",
        params![
            query_hash,
            kind.as_str(),
            original_query,
            params_json,
            expires_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Count of expired rows, without deleting them (§4.8).
pub fn cleanup(conn: &Connection) -> Result<i64> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM ai_cache WHERE expires_at < ?1",
        [Utc::now().to_rfc3339()],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// Delete every cache row. The only operation in this module that deletes.
pub fn clear(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM ai_cache", [])?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;
    use serde_json::json;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    #[test]
    fn put_then_get_round_trips() {
        let conn = open();
        let value = json!({"origin": ["ET"], "max_price": 25});
        put_text(&conn, "fruity Ethiopian under £25", None, &value).unwrap();
        let got: serde_json::Value = get_text(&conn, "fruity Ethiopian under £25").unwrap().unwrap();
        assert_eq!(got, value);
    }

    #[test]
    fn whitespace_and_case_variants_hit_same_entry() {
        let conn = open();
        let value = json!({"origin": ["ET"]});
        put_text(&conn, "Fruity Ethiopian", None, &value).unwrap();
        let got: Option<serde_json::Value> = get_text(&conn, "fruity   ethiopian").unwrap();
        assert!(got.is_some());

        let count: i64 = conn
            .query_row("SELECT hit_count FROM ai_cache", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn cleanup_counts_without_deleting() {
        let conn = open();
        let value = json!({});
        put_text(&conn, "stale", None, &value).unwrap();
        conn.execute(
            "UPDATE ai_cache SET expires_at = '2000-01-01T00:00:00Z'",
            [],
        )
        .unwrap();

        let got: Option<serde_json::Value> = get_text(&conn, "stale").unwrap();
        assert!(got.is_none());

        let expired = cleanup(&conn).unwrap();
        assert_eq!(expired, 1);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM ai_cache", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1, "cleanup must not delete rows");
    }

    #[test]
    fn clear_deletes_everything() {
        let conn = open();
        put_text(&conn, "a", None, &json!({})).unwrap();
        put_text(&conn, "b", None, &json!({})).unwrap();
        let deleted = clear(&conn).unwrap();
        assert_eq!(deleted, 2);
    }
}

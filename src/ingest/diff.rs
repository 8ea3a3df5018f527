//! Diff-JSON partial update application (§4.3.1): a diff names a target bean
//! by url and carries any subset of mutable fields. Unknown fields (e.g.
//! `origins`, `image_url`) are silently dropped — `serde_json` already
//! ignores fields that aren't named on [`DiffUpdate`], so no
//! `deny_unknown_fields` is used here.

use rusqlite::{params, Connection};
use serde::Deserialize;

use crate::error::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct DiffUpdate {
    pub url: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub price_usd: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub in_stock: Option<bool>,
    /// Some scrapers emit `stock` instead of `in_stock`; both are accepted.
    #[serde(default)]
    pub stock: Option<bool>,
    #[serde(default)]
    pub roast_level: Option<String>,
    #[serde(default)]
    pub roast_profile: Option<String>,
    #[serde(default)]
    pub tasting_notes: Option<Vec<String>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub weight_grams: Option<i64>,
    #[serde(default)]
    pub is_decaf: Option<bool>,
    #[serde(default)]
    pub cupping_score: Option<f64>,
    pub scraped_at: Option<String>,
}

impl DiffUpdate {
    fn resolved_in_stock(&self) -> Option<bool> {
        self.in_stock.or(self.stock)
    }
}

pub fn parse(text: &str) -> Result<DiffUpdate> {
    Ok(serde_json::from_str(text)?)
}

/// Apply `update` to the bean identified by its url, if one exists. Returns
/// `true` when a row was found (and thus the diff counts as applied),
/// `false` when there was no matching bean (diffs never insert, §4.3.1).
pub fn apply(conn: &Connection, update: &DiffUpdate) -> Result<bool> {
    let bean_id: Option<i64> = conn
        .query_row(
            "SELECT id FROM beans WHERE url = ?1",
            [&update.url],
            |row| row.get(0),
        )
        .ok();
    let Some(bean_id) = bean_id else {
        return Ok(false);
    };

    if let Some(name) = &update.name {
        conn.execute("UPDATE beans SET name = ?1 WHERE id = ?2", params![name, bean_id])?;
    }
    if let Some(price) = update.price {
        conn.execute("UPDATE beans SET price = ?1 WHERE id = ?2", params![price, bean_id])?;
    }
    if let Some(price_usd) = update.price_usd {
        conn.execute(
            "UPDATE beans SET price_usd = ?1 WHERE id = ?2",
            params![price_usd, bean_id],
        )?;
    }
    if let Some(currency) = &update.currency {
        conn.execute(
            "UPDATE beans SET currency = ?1 WHERE id = ?2",
            params![currency, bean_id],
        )?;
    }
    if let Some(in_stock) = update.resolved_in_stock() {
        conn.execute(
            "UPDATE beans SET in_stock = ?1 WHERE id = ?2",
            params![in_stock, bean_id],
        )?;
    }
    if let Some(roast_level) = &update.roast_level {
        conn.execute(
            "UPDATE beans SET roast_level = ?1 WHERE id = ?2",
            params![roast_level, bean_id],
        )?;
    }
    if let Some(roast_profile) = &update.roast_profile {
        conn.execute(
            "UPDATE beans SET roast_profile = ?1 WHERE id = ?2",
            params![roast_profile, bean_id],
        )?;
    }
    if let Some(notes) = &update.tasting_notes {
        conn.execute(
            "UPDATE beans SET tasting_notes = ?1 WHERE id = ?2",
            params![serde_json::to_string(notes).unwrap_or_default(), bean_id],
        )?;
    }
    if let Some(description) = &update.description {
        conn.execute(
            "UPDATE beans SET description = ?1 WHERE id = ?2",
            params![description, bean_id],
        )?;
    }
    if let Some(weight) = update.weight_grams {
        conn.execute(
            "UPDATE beans SET weight_grams = ?1 WHERE id = ?2",
            params![weight, bean_id],
        )?;
    }
    if let Some(is_decaf) = update.is_decaf {
        conn.execute(
            "UPDATE beans SET is_decaf = ?1 WHERE id = ?2",
            params![is_decaf, bean_id],
        )?;
    }
    if let Some(score) = update.cupping_score {
        conn.execute(
            "UPDATE beans SET cupping_score = ?1 WHERE id = ?2",
            params![score, bean_id],
        )?;
    }
    if let Some(scraped_at) = &update.scraped_at {
        conn.execute(
            "UPDATE beans SET scraped_at = ?1 WHERE id = ?2",
            params![scraped_at, bean_id],
        )?;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    fn open_with_bean(url: &str) -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, price, in_stock,
                scraped_at, source_filename, clean_url_slug, bean_url_path, date_added)
             VALUES (?1, 'r', 'Original Name', 'rn', 20.0, 1, 't0', 'f', 'f', '/r/f', 't0')",
            [url],
        )
        .unwrap();
        conn
    }

    #[test]
    fn unknown_fields_are_silently_dropped() {
        let text = r#"{"url": "u", "price": 10.0, "origins": [{"country": "XX"}], "image_url": "y"}"#;
        let update = parse(text).unwrap();
        assert_eq!(update.price, Some(10.0));
    }

    #[test]
    fn applies_only_present_fields() {
        let conn = open_with_bean("u");
        let update = parse(r#"{"url": "u", "in_stock": false, "price": 36.5}"#).unwrap();
        assert!(apply(&conn, &update).unwrap());

        let (name, price, in_stock): (String, f64, bool) = conn
            .query_row("SELECT name, price, in_stock FROM beans WHERE url = 'u'", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .unwrap();
        assert_eq!(name, "Original Name");
        assert_eq!(price, 36.5);
        assert!(!in_stock);
    }

    #[test]
    fn missing_bean_is_skipped_not_inserted() {
        let conn = open_with_bean("u");
        let update = parse(r#"{"url": "does-not-exist", "price": 1.0}"#).unwrap();
        assert!(!apply(&conn, &update).unwrap());
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM beans", [], |r| r.get(0)).unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn stock_alias_is_accepted() {
        let conn = open_with_bean("u");
        let update = parse(r#"{"url": "u", "stock": false}"#).unwrap();
        apply(&conn, &update).unwrap();
        let in_stock: bool = conn
            .query_row("SELECT in_stock FROM beans WHERE url = 'u'", [], |r| r.get(0))
            .unwrap();
        assert!(!in_stock);
    }
}

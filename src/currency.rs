//! Currency Service (§4.4): fetches a USD-base rate table on a daily
//! cadence, keeps a bounded history, and answers synchronous conversions via
//! USD pivot.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::CurrencySection;
use crate::error::{Error, Result};

const STALE_AFTER_HOURS: i64 = 23;
const RETENTION_DAYS: i64 = 7;

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderResponse {
    #[allow(dead_code)]
    base: String,
    rates: std::collections::HashMap<String, f64>,
    timestamp: Option<i64>,
}

/// Process-wide currency state: the provider configuration, shared across
/// concurrent readers. `refresh` is the only method that writes.
#[derive(Debug, Clone)]
pub struct CurrencyService {
    client: reqwest::Client,
    provider_url: String,
    api_key: Option<String>,
}

impl CurrencyService {
    pub fn new(section: &CurrencySection) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider_url: section.provider_url.clone(),
            api_key: section.api_key.clone(),
        }
    }

    /// True when a row fetched within the last 23 hours already exists.
    pub fn is_fresh(&self, conn: &Connection) -> Result<bool> {
        let cutoff = (Utc::now() - Duration::hours(STALE_AFTER_HOURS)).to_rfc3339();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM currency_rates WHERE fetched_at > ?1",
            [cutoff],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Fetch rates and persist them unless already fresh, per §4.4. `force`
    /// bypasses the staleness check (used by the explicit refresh endpoint).
    ///
    /// Holds `conn` across the network `.await`, which is fine for
    /// single-threaded CLI callers (`block_on`, never `tokio::spawn`ed) but
    /// makes the returned future `!Send`; HTTP handlers use
    /// [`Self::fetch_rates`] and [`Self::apply_rates`] separately instead so
    /// no borrow of `Connection` (which is `!Sync`) spans an await point.
    pub async fn refresh(&self, conn: &Connection, force: bool) -> Result<usize> {
        if !force && self.is_fresh(conn)? {
            info!("currency rates are fresh, skipping fetch");
            return Ok(0);
        }
        let body = self.fetch_rates().await?;
        Self::apply_rates(conn, &body)
    }

    /// The network half of a refresh: fetch the provider's rate table.
    /// Takes no `Connection`, so its future is `Send` and safe to `.await`
    /// inside an HTTP handler while no database lock is held.
    pub async fn fetch_rates(&self) -> Result<ProviderResponse> {
        let mut request = self.client.get(&self.provider_url);
        if let Some(key) = &self.api_key {
            request = request.query(&[("app_id", key.as_str())]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| Error::UpstreamUnavailable(e.to_string()))
    }

    /// The storage half of a refresh: persist a fetched rate table and
    /// purge old history. Synchronous, so a caller can take the warehouse
    /// lock only for the duration of this call.
    pub fn apply_rates(conn: &Connection, body: &ProviderResponse) -> Result<usize> {
        let fetched_at = Utc::now();
        Self::store(conn, body, fetched_at)?;
        Self::purge_old(conn, fetched_at)?;
        Ok(body.rates.len())
    }

    /// Atomically replace today's rows: delete, then reinsert inside one
    /// transaction (§4.4: "refresh replaces today's rows atomically").
    fn store(conn: &Connection, body: &ProviderResponse, fetched_at: DateTime<Utc>) -> Result<()> {
        let today = fetched_at.date_naive();
        let tx = conn.unchecked_transaction()?;
        tx.execute(
            "DELETE FROM currency_rates WHERE base_currency = 'USD' AND date(fetched_at) = date(?1)",
            [fetched_at.to_rfc3339()],
        )?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO currency_rates (base_currency, target_currency, rate, fetched_at, data_timestamp)
                 VALUES ('USD', ?1, ?2, ?3, ?4)",
            )?;
            for (target, rate) in &body.rates {
                stmt.execute(params![target, rate, fetched_at.to_rfc3339(), body.timestamp])?;
            }
        }
        tx.commit()?;
        info!(rows = body.rates.len(), date = %today, "refreshed currency rates");
        Ok(())
    }

    fn purge_old(conn: &Connection, now: DateTime<Utc>) -> Result<()> {
        let cutoff = (now - Duration::days(RETENTION_DAYS)).to_rfc3339();
        let deleted = conn.execute(
            "DELETE FROM currency_rates WHERE fetched_at < ?1",
            [cutoff],
        )?;
        if deleted > 0 {
            warn!(deleted, "purged currency rate rows older than {} days", RETENTION_DAYS);
        }
        Ok(())
    }

    /// Newest known rate for `currency` against the USD base, if any.
    fn latest_rate(conn: &Connection, currency: &str) -> Result<Option<f64>> {
        if currency.eq_ignore_ascii_case("USD") {
            return Ok(Some(1.0));
        }
        let rate: Option<f64> = conn
            .query_row(
                "SELECT rate FROM currency_rates WHERE target_currency = ?1
                 ORDER BY fetched_at DESC LIMIT 1",
                [currency],
                |row| row.get(0),
            )
            .optional()?;
        Ok(rate)
    }

    /// Convert `amount` from `from` to `to` via USD pivot. Null (`None`)
    /// when either leg's rate is missing or the from-leg rate is zero.
    pub fn convert(conn: &Connection, amount: f64, from: &str, to: &str) -> Result<Option<f64>> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(Some(amount));
        }
        let from_rate = match Self::latest_rate(conn, from)? {
            Some(r) if r != 0.0 => r,
            _ => return Ok(None),
        };
        let to_rate = match Self::latest_rate(conn, to)? {
            Some(r) => r,
            None => return Ok(None),
        };
        let usd = amount / from_rate;
        Ok(Some(usd * to_rate))
    }

    /// All currently known currencies and their newest USD rate.
    pub fn list_currencies(conn: &Connection) -> Result<Vec<(String, f64)>> {
        let mut stmt = conn.prepare(
            "SELECT target_currency, rate FROM currency_rates cr
             WHERE fetched_at = (
                SELECT MAX(fetched_at) FROM currency_rates
                WHERE target_currency = cr.target_currency
             )
             ORDER BY target_currency",
        )?;
        let rows = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    fn open() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn
    }

    fn insert_rate(conn: &Connection, target: &str, rate: f64, fetched_at: DateTime<Utc>) {
        conn.execute(
            "INSERT INTO currency_rates (base_currency, target_currency, rate, fetched_at)
             VALUES ('USD', ?1, ?2, ?3)",
            params![target, rate, fetched_at.to_rfc3339()],
        )
        .unwrap();
    }

    #[test]
    fn convert_via_usd_pivot() {
        let conn = open();
        insert_rate(&conn, "JPY", 150.0, Utc::now());
        let converted = CurrencyService::convert(&conn, 3650.0, "JPY", "USD")
            .unwrap()
            .unwrap();
        assert!((converted - 24.333).abs() < 0.01);
    }

    #[test]
    fn convert_round_trips_within_rounding() {
        let conn = open();
        insert_rate(&conn, "EUR", 0.9, Utc::now());
        let usd = CurrencyService::convert(&conn, 100.0, "EUR", "USD")
            .unwrap()
            .unwrap();
        let back = CurrencyService::convert(&conn, usd, "USD", "EUR")
            .unwrap()
            .unwrap();
        assert!((back - 100.0).abs() < 0.001);
    }

    #[test]
    fn convert_returns_none_when_rate_missing() {
        let conn = open();
        let result = CurrencyService::convert(&conn, 10.0, "XYZ", "USD").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn is_fresh_detects_recent_row() {
        let conn = open();
        assert!(!CurrencyService::new(&CurrencySection::default())
            .is_fresh(&conn)
            .unwrap());
        insert_rate(&conn, "EUR", 0.9, Utc::now());
        assert!(CurrencyService::new(&CurrencySection::default())
            .is_fresh(&conn)
            .unwrap());
    }
}

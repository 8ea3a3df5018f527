//! Search & Scoring Engine (§4.6): structured filters, the wildcard
//! mini-language, relevance scoring, currency conversion, and pagination.

pub(crate) mod filters;
mod scoring;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::currency::CurrencyService;
use crate::db::models::Bean;
use crate::error::{Error, Result};

pub use scoring::MAX_POSSIBLE_SCORE;

fn comma_list() -> Vec<String> {
    Vec::new()
}

/// Request parameters recognized by `/v1/search` (§4.6). Multi-select
/// fields are accepted as comma-separated strings in the query string
/// (`roaster=sey,onyx`), split at the HTTP boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub tasting_notes_query: Option<String>,
    #[serde(default)]
    pub tasting_notes_only: bool,

    #[serde(default = "comma_list")]
    pub roaster: Vec<String>,
    #[serde(default = "comma_list")]
    pub roaster_location: Vec<String>,
    #[serde(default = "comma_list")]
    pub origin: Vec<String>,

    /// Restricts results to these exact `bean_url_path` values (§6's
    /// `/search/by-paths`); empty means "no restriction".
    #[serde(default)]
    pub bean_url_paths: Vec<String>,

    #[serde(default)]
    pub variety: Option<String>,
    #[serde(default)]
    pub process: Option<String>,
    #[serde(default)]
    pub roast_level: Option<String>,
    #[serde(default)]
    pub roast_profile: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub producer: Option<String>,
    #[serde(default)]
    pub farm: Option<String>,

    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub min_weight: Option<i64>,
    #[serde(default)]
    pub max_weight: Option<i64>,
    #[serde(default)]
    pub min_elevation: Option<i64>,
    #[serde(default)]
    pub max_elevation: Option<i64>,

    #[serde(default)]
    pub in_stock_only: bool,
    #[serde(default)]
    pub is_decaf: Option<bool>,
    #[serde(default)]
    pub is_single_origin: Option<bool>,

    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,

    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_per_page")]
    pub per_page: i64,

    #[serde(default)]
    pub convert_to_currency: Option<String>,
}

fn default_page() -> i64 {
    1
}

fn default_per_page() -> i64 {
    20
}

/// Hand-written rather than derived: `page`/`per_page` must match their
/// `#[serde(default = "..")]` values (1, 20), which a derived `Default`
/// would miss since it falls back to each field's own `Default::default()`
/// (`0`) regardless of the serde attribute.
impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            query: None,
            tasting_notes_query: None,
            tasting_notes_only: false,
            roaster: Vec::new(),
            roaster_location: Vec::new(),
            origin: Vec::new(),
            bean_url_paths: Vec::new(),
            variety: None,
            process: None,
            roast_level: None,
            roast_profile: None,
            region: None,
            producer: None,
            farm: None,
            min_price: None,
            max_price: None,
            min_weight: None,
            max_weight: None,
            min_elevation: None,
            max_elevation: None,
            in_stock_only: false,
            is_decaf: None,
            is_single_origin: None,
            sort_by: None,
            sort_order: None,
            page: default_page(),
            per_page: default_per_page(),
            convert_to_currency: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortBy {
    Name,
    Roaster,
    Price,
    Weight,
    ScrapedAt,
    Origin,
    Variety,
    RoastLevel,
    RoastProfile,
    Relevance,
    Random,
    DateAdded,
}

impl SortBy {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "name" => SortBy::Name,
            "roaster" => SortBy::Roaster,
            "price" => SortBy::Price,
            "weight" => SortBy::Weight,
            "scraped_at" => SortBy::ScrapedAt,
            "origin" => SortBy::Origin,
            "variety" => SortBy::Variety,
            "roast_level" => SortBy::RoastLevel,
            "roast_profile" => SortBy::RoastProfile,
            "relevance" => SortBy::Relevance,
            "random" => SortBy::Random,
            "date_added" => SortBy::DateAdded,
            other => return Err(Error::Validation(format!("unknown sort_by: {other}"))),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
    Random,
}

impl SortOrder {
    fn parse(s: &str) -> Result<Self> {
        Ok(match s {
            "asc" => SortOrder::Asc,
            "desc" => SortOrder::Desc,
            "random" => SortOrder::Random,
            other => return Err(Error::Validation(format!("unknown sort_order: {other}"))),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BeanHit {
    pub id: i64,
    pub url: String,
    pub name: String,
    pub roaster_name: String,
    pub roaster_directory: String,
    pub bean_url_path: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub original_price: Option<f64>,
    pub original_currency: Option<String>,
    pub price_converted: bool,
    pub weight_grams: Option<i64>,
    pub in_stock: bool,
    pub tasting_notes: Vec<String>,
    pub scraped_at: String,
    pub date_added: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchMetadata {
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub max_possible_score: f64,
    pub converted_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub beans: Vec<BeanHit>,
    pub metadata: SearchMetadata,
}

/// Validate pagination, sort field, and sort order up front (§4.6 failure
/// semantics: "invalid sort field / order / pagination -> 422").
fn validate(params: &SearchParams) -> Result<(SortBy, SortOrder)> {
    if params.page < 1 {
        return Err(Error::Validation("page must be >= 1".to_string()));
    }
    if !(1..=100).contains(&params.per_page) {
        return Err(Error::Validation("per_page must be in 1..=100".to_string()));
    }
    let sort_by = match &params.sort_by {
        Some(s) => SortBy::parse(s)?,
        None => {
            if params.query.is_some() {
                SortBy::Relevance
            } else {
                SortBy::ScrapedAt
            }
        }
    };
    let sort_order = match &params.sort_order {
        Some(s) => SortOrder::parse(s)?,
        None => SortOrder::Desc,
    };
    Ok((sort_by, sort_order))
}

/// Build one `BeanHit` from a warehouse row, scoring it but not yet
/// applying currency conversion (conversion is deferred to after
/// pagination so it only runs over the page actually returned).
fn score_hit(params: &SearchParams, bean: &Bean) -> BeanHit {
    let score = scoring::score(bean, params);
    BeanHit {
        id: bean.id.unwrap_or_default(),
        url: bean.url.clone(),
        name: bean.name.clone(),
        roaster_name: bean.roaster_name.clone(),
        roaster_directory: bean.roaster_directory.clone(),
        bean_url_path: bean.bean_url_path.clone(),
        price: bean.price,
        currency: bean.currency.clone(),
        original_price: None,
        original_currency: None,
        price_converted: false,
        weight_grams: bean.weight_grams,
        in_stock: bean.in_stock,
        tasting_notes: bean.tasting_notes.clone(),
        scraped_at: bean.scraped_at.clone(),
        date_added: bean.date_added.clone(),
        score,
    }
}

/// Apply currency conversion to one hit in place. Returns whether it was
/// converted, for the caller's `converted_count` tally.
fn apply_conversion(conn: &Connection, params: &SearchParams, hit: &mut BeanHit) -> Result<bool> {
    let (Some(target), Some(price), Some(currency)) =
        (&params.convert_to_currency, hit.price, &hit.currency)
    else {
        return Ok(false);
    };
    let Some(converted_price) = CurrencyService::convert(conn, price, currency, target)? else {
        return Ok(false);
    };
    hit.original_price = Some(price);
    hit.original_currency = Some(currency.clone());
    hit.price = Some(converted_price);
    hit.currency = Some(target.clone());
    hit.price_converted = true;
    Ok(true)
}

/// Answer one search request against the warehouse.
pub fn search(conn: &Connection, params: &SearchParams) -> Result<SearchResponse> {
    let (sort_by, sort_order) = validate(params)?;

    let (where_sql, binds) = filters::build(params)?;

    // Dedup by clean_url_slug, keeping the newest scraped_at (§4.6).
    let dedup_sql = format!(
        "SELECT * FROM (
            SELECT b.*, ROW_NUMBER() OVER (
                PARTITION BY b.clean_url_slug ORDER BY b.scraped_at DESC
            ) AS rn
            FROM beans b
            WHERE {where_sql}
        ) WHERE rn = 1"
    );

    let mut stmt = conn.prepare(&format!("SELECT COUNT(*) FROM ({dedup_sql})"))?;
    let total: i64 = stmt.query_row(rusqlite::params_from_iter(binds.iter()), |row| row.get(0))?;

    let mut hits = Vec::new();

    if matches!(sort_by, SortBy::Relevance) {
        // Relevance depends on a per-row score computed in Rust, not a SQL
        // column, so the whole matching set must be scored and ordered
        // before paginating — otherwise LIMIT/OFFSET would truncate to an
        // arbitrary (e.g. newest-scraped) slice first and re-sort only
        // that slice, making every page but the first meaningless (§4.6).
        let mut stmt = conn.prepare(&dedup_sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(binds.iter()))?;
        while let Some(row) = rows.next()? {
            let bean = Bean::from_row(row)?;
            hits.push(score_hit(params, &bean));
        }

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(b.in_stock.cmp(&a.in_stock))
                .then(a.name.cmp(&b.name))
        });

        let offset = ((params.page - 1) * params.per_page) as usize;
        let page_len = params.per_page as usize;
        hits = hits.into_iter().skip(offset).take(page_len).collect();
    } else {
        let offset = (params.page - 1) * params.per_page;
        let order_sql = order_by_clause(sort_by, sort_order);
        let paged_sql = format!("{dedup_sql} {order_sql} LIMIT {} OFFSET {}", params.per_page, offset);

        let mut stmt = conn.prepare(&paged_sql)?;
        let mut rows = stmt.query(rusqlite::params_from_iter(binds.iter()))?;
        while let Some(row) = rows.next()? {
            let bean = Bean::from_row(row)?;
            hits.push(score_hit(params, &bean));
        }
    }

    let mut converted_count = 0i64;
    for hit in &mut hits {
        if apply_conversion(conn, params, hit)? {
            converted_count += 1;
        }
    }

    Ok(SearchResponse {
        beans: hits,
        metadata: SearchMetadata {
            total,
            page: params.page,
            per_page: params.per_page,
            max_possible_score: MAX_POSSIBLE_SCORE,
            converted_count,
        },
    })
}

fn order_by_clause(sort_by: SortBy, sort_order: SortOrder) -> String {
    if matches!(sort_order, SortOrder::Random) || matches!(sort_by, SortBy::Random) {
        return "ORDER BY RANDOM()".to_string();
    }
    let dir = match sort_order {
        SortOrder::Asc => "ASC",
        _ => "DESC",
    };
    let column = match sort_by {
        SortBy::Name => "name",
        SortBy::Roaster => "roaster_name",
        // §9 open question: null weight sorts last within the direction.
        SortBy::Price => "CASE WHEN weight_grams IS NULL OR weight_grams = 0 THEN NULL ELSE price_usd * 1.0 / weight_grams END",
        SortBy::Weight => "weight_grams",
        SortBy::ScrapedAt => "scraped_at",
        SortBy::Origin => "roaster_directory",
        SortBy::Variety => "name",
        SortBy::RoastLevel => "roast_level",
        SortBy::RoastProfile => "roast_profile",
        SortBy::Relevance => "scraped_at",
        SortBy::Random => "RANDOM()",
        SortBy::DateAdded => "date_added",
    };
    format!("ORDER BY ({column}) IS NULL, {column} {dir}")
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

    fn insert(conn: &Connection, url: &str, name: &str, in_stock: bool, clean_slug: &str, scraped_at: &str) {
        conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, in_stock, scraped_at,
                source_filename, clean_url_slug, bean_url_path, date_added)
             VALUES (?1, 'r', ?2, 'Roaster', ?3, ?4, 'f', ?5, '/r/f', ?4)",
            rusqlite::params![url, name, in_stock, scraped_at, clean_slug],
        )
        .unwrap();
    }

    #[test]
    fn dedup_keeps_newest_scraped_at() {
        let conn = open();
        insert(&conn, "u1", "Bean", true, "bean", "2025-09-08T00:00:00Z");
        insert(&conn, "u2", "Bean", true, "bean", "2025-09-11T00:00:00Z");

        let params = SearchParams::default();
        let response = search(&conn, &params).unwrap();
        assert_eq!(response.metadata.total, 1);
        assert_eq!(response.beans[0].url, "u2");
    }

    #[test]
    fn invalid_pagination_is_rejected() {
        let conn = open();
        let mut params = SearchParams::default();
        params.per_page = 0;
        let err = search(&conn, &params).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn invalid_sort_field_is_rejected() {
        let conn = open();
        let mut params = SearchParams::default();
        params.sort_by = Some("nonsense".to_string());
        let err = search(&conn, &params).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}

//! Cross-component consistency and algebra properties from §8: region and
//! varietal totals agreeing with equivalent `search()` calls, wildcard
//! union/difference laws, and the currency conversion scenario.

use std::collections::HashSet;

use kissaten::canon::CanonTables;
use kissaten::currency::CurrencyService;
use kissaten::db::schema;
use kissaten::search::{self, SearchParams};
use kissaten::{browse, search as search_mod};
use rusqlite::{params, Connection};

fn open_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    schema::migrate(&conn).unwrap();
    CanonTables::default().register_sql_functions(&conn).unwrap();
    conn
}

#[allow(clippy::too_many_arguments)]
fn seed_bean(
    conn: &Connection,
    url: &str,
    name: &str,
    country: &str,
    region: &str,
    variety_canonical: &[&str],
    price: Option<f64>,
    currency: Option<&str>,
) -> i64 {
    conn.execute(
        "INSERT INTO beans (url, roaster_directory, name, roaster_name, price, currency,
            scraped_at, source_filename, clean_url_slug, bean_url_path, date_added)
         VALUES (?1, 'sey', ?2, 'Sey Coffee', ?3, ?4, '2025-09-08T10:00:00Z', ?1, ?1, ?1, '2025-09-08T10:00:00Z')",
        params![url, name, price, currency],
    )
    .unwrap();
    let bean_id = conn.last_insert_rowid();
    let variety_json = serde_json::to_string(variety_canonical).unwrap();
    conn.execute(
        "INSERT INTO origins (bean_id, country, region, region_normalized, variety_canonical)
         VALUES (?1, ?2, ?3, ?3, ?4)",
        params![bean_id, country, region, variety_json],
    )
    .unwrap();
    bean_id
}

/// `region_detail(...).total_beans == search(origin=country, region=region_slug).total`.
#[test]
fn region_detail_total_matches_equivalent_search() {
    let conn = open_conn();
    seed_bean(&conn, "https://x/1", "Huila Lot 1", "CO", "huila", &["Caturra"], None, None);
    seed_bean(&conn, "https://x/2", "Huila Lot 2", "CO", "huila", &["Caturra"], None, None);
    seed_bean(&conn, "https://x/3", "Narino Lot", "CO", "narino", &["Caturra"], None, None);

    let detail = browse::region_detail(&conn, "CO", "huila", &SearchParams::default()).unwrap();
    assert_eq!(detail.total_beans, 2);

    let params = SearchParams {
        origin: vec!["CO".to_string()],
        region: Some("huila".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };
    let response = search::search(&conn, &params).unwrap();
    assert_eq!(response.metadata.total, detail.total_beans);
}

/// `varietal(name).total_beans == search(variety="name").total`.
#[test]
fn varietal_detail_total_matches_equivalent_search() {
    let conn = open_conn();
    seed_bean(&conn, "https://x/1", "Gesha Lot", "ET", "yirgacheffe", &["Gesha"], None, None);
    seed_bean(&conn, "https://x/2", "Caturra Lot", "CO", "huila", &["Caturra"], None, None);

    let detail = browse::varietal_detail(&conn, "Gesha").unwrap();
    assert_eq!(detail.total_beans, 1);

    let params = SearchParams {
        variety: Some("\"Gesha\"".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };
    let response = search::search(&conn, &params).unwrap();
    assert_eq!(response.metadata.total, detail.total_beans);
}

/// `search(region="A|B") == search(region="A") ∪ search(region="B")` over bean ids.
#[test]
fn wildcard_or_is_union_of_individual_searches() {
    let conn = open_conn();
    seed_bean(&conn, "https://x/1", "Huila Lot", "CO", "huila", &[], None, None);
    seed_bean(&conn, "https://x/2", "Narino Lot", "CO", "narino", &[], None, None);
    seed_bean(&conn, "https://x/3", "Tolima Lot", "CO", "tolima", &[], None, None);

    let urls = |params: &SearchParams| -> HashSet<String> {
        search_mod::search(&conn, params)
            .unwrap()
            .beans
            .into_iter()
            .map(|b| b.url)
            .collect()
    };

    let union_query = SearchParams {
        region: Some("Huila|Nariño".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };
    let a_query = SearchParams {
        region: Some("Huila".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };
    let b_query = SearchParams {
        region: Some("Nariño".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };

    let union_result = urls(&union_query);
    let mut expected: HashSet<String> = urls(&a_query);
    expected.extend(urls(&b_query));

    assert_eq!(union_result, expected);
    assert!(union_result.contains("https://x/1"));
    assert!(!union_result.contains("https://x/3"));
}

/// `search(variety="A&!B") == search(variety="A") \ search(variety="B")`.
#[test]
fn wildcard_and_not_is_set_difference() {
    let conn = open_conn();
    seed_bean(&conn, "https://x/1", "Compound Lot", "CO", "huila", &["Yellow Catuai", "Mundo Novo"], None, None);
    seed_bean(&conn, "https://x/2", "Plain Catuai Lot", "CO", "huila", &["Yellow Catuai"], None, None);

    let urls = |params: &SearchParams| -> HashSet<String> {
        search_mod::search(&conn, params)
            .unwrap()
            .beans
            .into_iter()
            .map(|b| b.url)
            .collect()
    };

    let diff_query = SearchParams {
        variety: Some("\"Yellow Catuai\"&!\"Mundo Novo\"".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };
    let a_query = SearchParams {
        variety: Some("\"Yellow Catuai\"".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };
    let b_query = SearchParams {
        variety: Some("\"Mundo Novo\"".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };

    let diff_result = urls(&diff_query);
    let a_result = urls(&a_query);
    let b_result = urls(&b_query);
    let expected: HashSet<String> = a_result.difference(&b_result).cloned().collect();

    assert_eq!(diff_result, expected);
    assert!(diff_result.contains("https://x/2"));
    assert!(!diff_result.contains("https://x/1"));
}

/// Scenario 5 (§8): a bean priced 3650 JPY, converted to USD at rate
/// USD→JPY=150, returns price ≈ 24.33 with the original price/currency
/// preserved and `price_converted=true`.
#[test]
fn currency_conversion_scenario_preserves_original_and_converts_display_price() {
    let conn = open_conn();
    seed_bean(&conn, "https://x/1", "Yen Priced Lot", "JP", "okinawa", &[], Some(3650.0), Some("JPY"));
    conn.execute(
        "UPDATE beans SET price_usd = price / 150.0 WHERE url = 'https://x/1'",
        [],
    )
    .unwrap();
    conn.execute(
        "INSERT INTO currency_rates (base_currency, target_currency, rate, fetched_at)
         VALUES ('USD', 'JPY', 150.0, '2025-09-08T10:00:00Z')",
        [],
    )
    .unwrap();

    let converted = CurrencyService::convert(&conn, 3650.0, "JPY", "USD").unwrap().unwrap();
    assert!((converted - 24.33).abs() < 0.01);

    let params = SearchParams {
        convert_to_currency: Some("USD".to_string()),
        page: 1,
        per_page: 100,
        ..Default::default()
    };
    let response = search::search(&conn, &params).unwrap();
    let hit = response.beans.iter().find(|b| b.url == "https://x/1").unwrap();
    assert_eq!(hit.original_price, Some(3650.0));
    assert_eq!(hit.original_currency.as_deref(), Some("JPY"));
    assert!(hit.price_converted);
    assert!((hit.price.unwrap() - 24.33).abs() < 0.01);
}

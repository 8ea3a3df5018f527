//! End-to-end loader lifecycle properties (§8): incremental equivalence,
//! diff ordering, and deletion cascade, driven through the public
//! `kissaten::ingest::run` entry point rather than internal helpers.

use std::fs;
use std::path::Path;

use kissaten::canon::CanonTables;
use kissaten::db::schema;
use kissaten::ingest::{self, LoaderOptions};
use rusqlite::Connection;

fn write_bean(dir: &Path, roaster: &str, date: &str, file_stem: &str, body: &serde_json::Value) {
    let day_dir = dir.join("roasters").join(roaster).join(date);
    fs::create_dir_all(&day_dir).unwrap();
    fs::write(day_dir.join(format!("{file_stem}.json")), body.to_string()).unwrap();
}

fn write_diff(dir: &Path, roaster: &str, date: &str, file_stem: &str, body: &serde_json::Value) {
    let day_dir = dir.join("roasters").join(roaster).join(date);
    fs::create_dir_all(&day_dir).unwrap();
    fs::write(day_dir.join(format!("{file_stem}.diffjson")), body.to_string()).unwrap();
}

fn bean_json(url: &str, name: &str, scraped_at: &str) -> serde_json::Value {
    serde_json::json!({
        "url": url,
        "name": name,
        "roaster": "Sey Coffee",
        "scraped_at": scraped_at,
        "price": 22.0,
        "currency": "USD",
        "origins": [{"country": "ET", "region": "Yirgacheffe"}]
    })
}

fn open_conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    schema::migrate(&conn).unwrap();
    CanonTables::default().register_sql_functions(&conn).unwrap();
    conn
}

/// A full refresh followed by an incremental run over the same tree leaves
/// the same rows; adding a new file and re-running incrementally adds
/// exactly that bean and nothing else.
#[test]
fn incremental_equivalence_adds_exactly_one_new_bean() {
    let dir = tempfile::tempdir().unwrap();
    write_bean(dir.path(), "sey", "20250908", "bean-a_100000", &bean_json("https://x/a", "Ethiopia Gesha", "2025-09-08T10:00:00Z"));

    let canon = CanonTables::default();
    let mut conn = open_conn();

    let full = LoaderOptions {
        data_root: dir.path(),
        incremental: false,
        check_for_changes: false,
    };
    ingest::run(&mut conn, &canon, &full).unwrap();

    let incremental = LoaderOptions {
        data_root: dir.path(),
        incremental: true,
        check_for_changes: false,
    };
    let report = ingest::run(&mut conn, &canon, &incremental).unwrap();
    assert_eq!(report.beans_upserted, 0, "nothing new, incremental run should upsert nothing");

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM beans", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 1);

    write_bean(dir.path(), "sey", "20250909", "bean-b_100000", &bean_json("https://x/b", "Colombia Huila", "2025-09-09T10:00:00Z"));
    let report = ingest::run(&mut conn, &canon, &incremental).unwrap();
    assert_eq!(report.beans_upserted, 1);

    let count: i64 = conn.query_row("SELECT COUNT(*) FROM beans", [], |r| r.get(0)).unwrap();
    assert_eq!(count, 2);
}

/// Two diff-JSONs touching the same url with different `scraped_at` are
/// applied in ascending order, so the later one's fields win (§8).
#[test]
fn diff_ordering_applies_ascending_by_scraped_at() {
    let dir = tempfile::tempdir().unwrap();
    write_bean(dir.path(), "sey", "20250908", "bean-a_100000", &bean_json("https://x/a", "Ethiopia Gesha", "2025-09-08T10:00:00Z"));
    // Written to disk out of chronological order; the loader must still
    // apply the 09-12 diff after the 09-10 diff because it sorts by the
    // `scraped_at` field inside each file, not file discovery order.
    write_diff(
        dir.path(),
        "sey",
        "20250912",
        "bean-a_120000",
        &serde_json::json!({"url": "https://x/a", "price": 30.0, "scraped_at": "2025-09-12T10:00:00Z"}),
    );
    write_diff(
        dir.path(),
        "sey",
        "20250910",
        "bean-a_100000",
        &serde_json::json!({"url": "https://x/a", "price": 25.0, "scraped_at": "2025-09-10T10:00:00Z"}),
    );

    let canon = CanonTables::default();
    let mut conn = open_conn();
    let options = LoaderOptions {
        data_root: dir.path(),
        incremental: false,
        check_for_changes: false,
    };
    let report = ingest::run(&mut conn, &canon, &options).unwrap();
    assert_eq!(report.diffs_applied, 2);

    let price: f64 = conn.query_row("SELECT price FROM beans WHERE url = 'https://x/a'", [], |r| r.get(0)).unwrap();
    assert_eq!(price, 30.0, "the later diff (09-12) must win over the earlier one (09-10)");
}

/// Removing a JSON file from disk and re-ingesting drops the corresponding
/// bean and its origins and removes the ledger entry (§8).
#[test]
fn deletion_cascade_removes_bean_origins_and_ledger_entry() {
    let dir = tempfile::tempdir().unwrap();
    write_bean(dir.path(), "sey", "20250908", "bean-a_100000", &bean_json("https://x/a", "Ethiopia Gesha", "2025-09-08T10:00:00Z"));
    write_bean(dir.path(), "sey", "20250908", "bean-b_100000", &bean_json("https://x/b", "Colombia Huila", "2025-09-08T10:00:00Z"));

    let canon = CanonTables::default();
    let mut conn = open_conn();
    let full = LoaderOptions {
        data_root: dir.path(),
        incremental: false,
        check_for_changes: false,
    };
    ingest::run(&mut conn, &canon, &full).unwrap();

    let bean_count: i64 = conn.query_row("SELECT COUNT(*) FROM beans", [], |r| r.get(0)).unwrap();
    assert_eq!(bean_count, 2);

    fs::remove_file(dir.path().join("roasters/sey/20250908/bean-b_100000.json")).unwrap();

    let incremental = LoaderOptions {
        data_root: dir.path(),
        incremental: true,
        check_for_changes: false,
    };
    let report = ingest::run(&mut conn, &canon, &incremental).unwrap();
    assert_eq!(report.files_deleted, 1);

    let remaining: i64 = conn.query_row("SELECT COUNT(*) FROM beans", [], |r| r.get(0)).unwrap();
    assert_eq!(remaining, 1);
    let remaining_origins: i64 = conn.query_row("SELECT COUNT(*) FROM origins", [], |r| r.get(0)).unwrap();
    assert_eq!(remaining_origins, 1);
    let ledger_rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM ledger WHERE relative_path LIKE '%bean-b%'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(ledger_rows, 0);
}

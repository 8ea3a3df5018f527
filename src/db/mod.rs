//! Warehouse connection management: opening the SQLite file, applying
//! migrations, and wiring in the canonicalization SQL functions (§4.2/§4.3).

pub mod models;
pub mod schema;

use std::path::Path;

use rusqlite::Connection;
use tracing::info;

use crate::canon::CanonTables;
use crate::error::Result;

/// Open the warehouse at `path`, run pending migrations, and register the
/// canonicalization UDFs so ingest and query SQL can call them directly.
///
/// `read_only` mirrors `USE_RW_DB=0` (§6): the server binary opens read-only
/// by default so a concurrent ingest run can't be disturbed by readers.
pub fn open(path: &Path, read_only: bool, canon: &CanonTables) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let conn = if read_only {
        Connection::open_with_flags(path, rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY)?
    } else {
        Connection::open(path)?
    };
    conn.pragma_update(None, "foreign_keys", true)?;

    if !read_only {
        schema::migrate(&conn)?;
    }
    canon.register_sql_functions(&conn)?;
    info!(path = %path.display(), read_only, "opened warehouse");
    Ok(conn)
}

//! File-Tracking Ledger (§4.1): records which input files (by relative path
//! and content hash) have been folded into the warehouse, driving
//! incremental re-ingest.

use std::collections::HashSet;
use std::path::Path;

use rusqlite::{params, Connection};

use crate::error::Result;
use crate::hash::sha256_file;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Json,
    DiffJson,
}

impl FileType {
    fn as_str(&self) -> &'static str {
        match self {
            FileType::Json => "json",
            FileType::DiffJson => "diffjson",
        }
    }
}

/// One discovered input file, relative to the data root, paired with its
/// on-disk content hash.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    pub relative_path: String,
    pub absolute_path: std::path::PathBuf,
    pub file_type: FileType,
}

impl CandidateFile {
    fn checksum(&self) -> Result<String> {
        Ok(sha256_file(&self.absolute_path)?)
    }
}

/// Subset of `candidates` not yet recorded in the ledger, or whose stored
/// checksum differs when `check_checksum` is enabled. One query per call,
/// not per file, per §4.1.
pub fn filter_unprocessed(
    conn: &Connection,
    candidates: &[CandidateFile],
    check_checksum: bool,
) -> Result<Vec<CandidateFile>> {
    let mut stmt = conn.prepare("SELECT sha256 FROM ledger WHERE relative_path = ?1")?;
    let mut known: HashSet<String> = HashSet::new();
    {
        let mut all_stmt = conn.prepare("SELECT relative_path FROM ledger")?;
        let rows = all_stmt.query_map([], |r| r.get::<_, String>(0))?;
        for row in rows {
            known.insert(row?);
        }
    }

    let mut unprocessed = Vec::new();
    for candidate in candidates {
        if !known.contains(&candidate.relative_path) {
            unprocessed.push(candidate.clone());
            continue;
        }
        if check_checksum {
            let stored: Option<String> = stmt
                .query_row([&candidate.relative_path], |r| r.get(0))
                .ok();
            let current = candidate.checksum()?;
            if stored.as_deref() != Some(current.as_str()) {
                unprocessed.push(candidate.clone());
            }
        }
    }
    Ok(unprocessed)
}

/// Upsert a ledger row for `relative_path`, recomputing its checksum.
pub fn mark_processed(conn: &Connection, file: &CandidateFile) -> Result<()> {
    let checksum = file.checksum()?;
    conn.execute(
        "INSERT INTO ledger (relative_path, sha256, file_type) VALUES (?1, ?2, ?3)
         ON CONFLICT(relative_path) DO UPDATE SET
            sha256 = excluded.sha256,
            file_type = excluded.file_type,
            processed_at = CURRENT_TIMESTAMP",
        params![file.relative_path, checksum, file.file_type.as_str()],
    )?;
    Ok(())
}

/// Ledger entries whose physical file no longer exists under `data_root`.
pub fn find_deleted(conn: &Connection, data_root: &Path) -> Result<Vec<String>> {
    let mut stmt = conn.prepare("SELECT relative_path FROM ledger")?;
    let rows = stmt.query_map([], |r| r.get::<_, String>(0))?;
    let mut deleted = Vec::new();
    for row in rows {
        let relative_path = row?;
        if !data_root.join(&relative_path).exists() {
            deleted.push(relative_path);
        }
    }
    Ok(deleted)
}

/// Remove a ledger row by relative path (part of the deletion cascade, §4.1).
pub fn remove(conn: &Connection, relative_path: &str) -> Result<()> {
    conn.execute(
        "DELETE FROM ledger WHERE relative_path = ?1",
        [relative_path],
    )?;
    Ok(())
}

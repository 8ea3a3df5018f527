//! Tasting-note category listing (§4.7).

use rusqlite::Connection;
use serde::Serialize;
use std::collections::HashMap;

use crate::error::Result;

#[derive(Debug, Clone, Serialize)]
pub struct TastingNoteCount {
    pub note: String,
    pub bean_count: i64,
}

/// All distinct tasting notes in use, most-common first. Notes are stored
/// as a JSON array per bean (§4.2's normalization), so this aggregates in
/// Rust rather than with a single `GROUP BY` over `json_each`.
pub fn list(conn: &Connection) -> Result<Vec<TastingNoteCount>> {
    let mut stmt = conn.prepare("SELECT tasting_notes FROM beans WHERE tasting_notes != '[]'")?;
    let mut counts: HashMap<String, i64> = HashMap::new();

    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
    for row in rows {
        let raw = row?;
        let notes: Vec<String> = serde_json::from_str(&raw).unwrap_or_default();
        for note in notes {
            *counts.entry(note).or_insert(0) += 1;
        }
    }

    let mut list: Vec<TastingNoteCount> = counts
        .into_iter()
        .map(|(note, bean_count)| TastingNoteCount { note, bean_count })
        .collect();
    list.sort_by(|a, b| b.bean_count.cmp(&a.bean_count).then(a.note.cmp(&b.note)));
    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schema;

    #[test]
    fn counts_notes_across_beans() {
        let conn = Connection::open_in_memory().unwrap();
        schema::migrate(&conn).unwrap();
        conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, scraped_at,
                source_filename, clean_url_slug, bean_url_path, date_added, tasting_notes)
             VALUES ('u1', 'r', 'n', 'Roaster', 't', 'f', 'u1', '/r/f', 't', '[\"Cherry\",\"Floral\"]')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO beans (url, roaster_directory, name, roaster_name, scraped_at,
                source_filename, clean_url_slug, bean_url_path, date_added, tasting_notes)
             VALUES ('u2', 'r', 'n', 'Roaster', 't', 'f', 'u2', '/r/f', 't', '[\"Cherry\"]')",
            [],
        )
        .unwrap();

        let notes = list(&conn).unwrap();
        assert_eq!(notes[0].note, "Cherry");
        assert_eq!(notes[0].bean_count, 2);
    }
}

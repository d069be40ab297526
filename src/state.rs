use crate::config::get_app_data_prefix;
use crate::models::ReadingPosition;
use chrono::{DateTime, Utc};
use eyre::Result;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;

/// Local store of per-file reading positions. Writes apply last-write-wins
/// by timestamp so an import of remote positions can never regress a newer
/// local record.
pub struct State {
    conn: Connection,
}

impl State {
    pub fn new() -> Result<Self> {
        let prefix = get_app_data_prefix()?;
        std::fs::create_dir_all(&prefix)?;
        Self::open(&prefix.join("positions.db"))
    }

    pub fn open(filepath: &Path) -> Result<Self> {
        let conn = Connection::open(filepath)?;
        Self::init_db(&conn)?;
        Ok(Self { conn })
    }

    fn init_db(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS positions (
                file_name TEXT PRIMARY KEY,
                chapter_title TEXT NOT NULL,
                chapter_index INTEGER NOT NULL,
                updated_at TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }

    /// Insert or update a position. Returns `false` when the stored row is
    /// at least as new as the incoming one, in which case nothing changes.
    pub fn upsert_position(&self, position: &ReadingPosition) -> Result<bool> {
        let existing: Option<DateTime<Utc>> = self
            .conn
            .query_row(
                "SELECT updated_at FROM positions WHERE file_name=?",
                params![position.file_name],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(stored) = existing
            && stored >= position.timestamp
        {
            return Ok(false);
        }

        self.conn.execute(
            "INSERT OR REPLACE INTO positions (file_name, chapter_title, chapter_index, updated_at)
             VALUES (?, ?, ?, ?)",
            params![
                position.file_name,
                position.chapter_title,
                position.chapter_index,
                position.timestamp,
            ],
        )?;
        Ok(true)
    }

    pub fn get_position(&self, file_name: &str) -> Result<Option<ReadingPosition>> {
        let position = self
            .conn
            .query_row(
                "SELECT file_name, chapter_title, chapter_index, updated_at
                 FROM positions WHERE file_name=?",
                params![file_name],
                Self::row_to_position,
            )
            .optional()?;
        Ok(position)
    }

    /// All positions, most recently updated first.
    pub fn all_positions(&self) -> Result<Vec<ReadingPosition>> {
        let mut stmt = self.conn.prepare(
            "SELECT file_name, chapter_title, chapter_index, updated_at
             FROM positions ORDER BY updated_at DESC",
        )?;
        let rows = stmt.query_map([], Self::row_to_position)?;

        let mut positions = Vec::new();
        for row in rows {
            positions.push(row?);
        }
        Ok(positions)
    }

    /// Merge a batch of positions (typically fetched from the remote) into
    /// the local store. Returns how many rows were actually applied.
    pub fn import_positions(&self, positions: &[ReadingPosition]) -> Result<usize> {
        let mut applied = 0;
        for position in positions {
            if self.upsert_position(position)? {
                applied += 1;
            }
        }
        Ok(applied)
    }

    pub fn delete_position(&self, file_name: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM positions WHERE file_name=?", params![file_name])?;
        Ok(())
    }

    fn row_to_position(row: &rusqlite::Row) -> rusqlite::Result<ReadingPosition> {
        Ok(ReadingPosition {
            file_name: row.get(0)?,
            chapter_title: row.get(1)?,
            chapter_index: row.get::<_, i64>(2)? as usize,
            timestamp: row.get(3)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn setup_test_state() -> (State, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let state = State::open(&temp_dir.path().join("positions.db")).unwrap();
        (state, temp_dir)
    }

    fn position(file: &str, index: usize, timestamp: DateTime<Utc>) -> ReadingPosition {
        ReadingPosition {
            file_name: file.to_string(),
            chapter_title: format!("chapter-{index}"),
            chapter_index: index,
            timestamp,
        }
    }

    #[test]
    fn test_empty_store() {
        let (state, _dir) = setup_test_state();
        assert!(state.all_positions().unwrap().is_empty());
        assert!(state.get_position("missing.txt").unwrap().is_none());
    }

    #[test]
    fn test_upsert_and_get() {
        let (state, _dir) = setup_test_state();
        let pos = position("novel.txt", 4, Utc::now());
        assert!(state.upsert_position(&pos).unwrap());

        let stored = state.get_position("novel.txt").unwrap().unwrap();
        assert_eq!(stored.chapter_index, 4);
        assert_eq!(stored.chapter_title, "chapter-4");
    }

    #[test]
    fn test_newer_write_wins() {
        let (state, _dir) = setup_test_state();
        let now = Utc::now();
        state.upsert_position(&position("a.txt", 1, now)).unwrap();
        assert!(
            state
                .upsert_position(&position("a.txt", 2, now + Duration::seconds(5)))
                .unwrap()
        );
        assert_eq!(state.get_position("a.txt").unwrap().unwrap().chapter_index, 2);
    }

    #[test]
    fn test_older_write_is_ignored() {
        let (state, _dir) = setup_test_state();
        let now = Utc::now();
        state.upsert_position(&position("a.txt", 5, now)).unwrap();
        assert!(
            !state
                .upsert_position(&position("a.txt", 1, now - Duration::seconds(30)))
                .unwrap()
        );
        assert_eq!(state.get_position("a.txt").unwrap().unwrap().chapter_index, 5);
    }

    #[test]
    fn test_tie_keeps_existing() {
        let (state, _dir) = setup_test_state();
        let now = Utc::now();
        state.upsert_position(&position("a.txt", 5, now)).unwrap();
        assert!(!state.upsert_position(&position("a.txt", 9, now)).unwrap());
        assert_eq!(state.get_position("a.txt").unwrap().unwrap().chapter_index, 5);
    }

    #[test]
    fn test_import_counts_applied_rows() {
        let (state, _dir) = setup_test_state();
        let now = Utc::now();
        state.upsert_position(&position("a.txt", 1, now)).unwrap();

        let incoming = vec![
            position("a.txt", 2, now - Duration::seconds(10)), // stale
            position("b.txt", 3, now),                         // new file
        ];
        assert_eq!(state.import_positions(&incoming).unwrap(), 1);
        assert_eq!(state.all_positions().unwrap().len(), 2);
    }

    #[test]
    fn test_all_positions_sorted_most_recent_first() {
        let (state, _dir) = setup_test_state();
        let now = Utc::now();
        state.upsert_position(&position("old.txt", 1, now - Duration::minutes(5))).unwrap();
        state.upsert_position(&position("new.txt", 2, now)).unwrap();

        let all = state.all_positions().unwrap();
        assert_eq!(all[0].file_name, "new.txt");
        assert_eq!(all[1].file_name, "old.txt");
    }

    #[test]
    fn test_delete_position() {
        let (state, _dir) = setup_test_state();
        state.upsert_position(&position("a.txt", 1, Utc::now())).unwrap();
        state.delete_position("a.txt").unwrap();
        assert!(state.get_position("a.txt").unwrap().is_none());
    }
}

use anyhow::Result;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::BTreeMap;

pub const CLAIMS_KEY: &str = "webgis_claims";
pub const VILLAGES_KEY: &str = "webgis_villages";
pub const FEATURES_KEY: &str = "webgis_features";
pub const USER_SELECTIONS_KEY: &str = "webgis_user_selections";

pub const ALL_KEYS: [&str; 4] = [CLAIMS_KEY, VILLAGES_KEY, FEATURES_KEY, USER_SELECTIONS_KEY];

/// Synchronous, process-local text store keyed by string.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// One row per key in a local SQLite file. Writers in other processes are
/// not coordinated with; the last `set` wins.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    pub fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        init(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init(&conn)?;
        Ok(Self { conn })
    }
}

fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS kv_entries (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL,
          updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
        );
        "#,
    )?;
    Ok(())
}

impl KeyValueBackend for SqliteBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv_entries (key, value)
            VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
              value=excluded.value,
              updated_at=strftime('%Y-%m-%dT%H:%M:%fZ','now')
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(backend: &mut dyn KeyValueBackend) {
        assert_eq!(backend.get("k").unwrap(), None);
        backend.set("k", "one").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("one"));
        backend.set("k", "two").unwrap();
        assert_eq!(backend.get("k").unwrap().as_deref(), Some("two"));
        backend.remove("k").unwrap();
        assert_eq!(backend.get("k").unwrap(), None);
        // removing a missing key is not an error
        backend.remove("k").unwrap();
    }

    #[test]
    fn memory_backend_get_set_remove() {
        exercise(&mut MemoryBackend::new());
    }

    #[test]
    fn sqlite_backend_get_set_remove() {
        exercise(&mut SqliteBackend::open_in_memory().unwrap());
    }

    #[test]
    fn sqlite_backend_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atlas.db");
        let path = path.to_str().unwrap();
        {
            let mut backend = SqliteBackend::open(path).unwrap();
            backend.set(CLAIMS_KEY, "[]").unwrap();
        }
        let backend = SqliteBackend::open(path).unwrap();
        assert_eq!(backend.get(CLAIMS_KEY).unwrap().as_deref(), Some("[]"));
    }
}

//! SQLite-backed document storage.
//!
//! All documents live in one table keyed by (collection, kind, name). Every write
//! runs inside a transaction, which gives the same all-or-nothing guarantee as the
//! file store's temp-file rename.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, params};

use super::traits::{Collection, DocumentKey, DocumentStore};
use crate::domain::PoolKind;
use crate::error::{FairDrawError, Result};

/// SQLite document store.
///
/// `rusqlite::Connection` is not `Sync`, so it sits behind a `Mutex`; statements are
/// short and need exclusive access anyway.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::from_connection(conn)
    }

    /// In-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                kind TEXT NOT NULL,
                name TEXT NOT NULL,
                json_data TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, kind, name)
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| FairDrawError::Persistence(e.to_string()))
    }

    /// Upsert every document inside one transaction.
    fn upsert_all<'a>(&self, documents: impl IntoIterator<Item = (&'a DocumentKey, &'a serde_json::Value)>) -> Result<()> {
        let updated_at = crate::clock::format_timestamp(&crate::clock::now());
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        for (key, document) in documents {
            let json_data = serde_json::to_string(document)?;
            tx.execute(
                r#"
                INSERT OR REPLACE INTO documents (collection, kind, name, json_data, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
                params![key.collection.as_str(), key.kind.as_str(), key.name, json_data, updated_at],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}

impl DocumentStore for SqliteStore {
    fn get(&self, key: &DocumentKey) -> Result<Option<serde_json::Value>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT json_data FROM documents WHERE collection = ?1 AND kind = ?2 AND name = ?3",
                params![key.collection.as_str(), key.kind.as_str(), key.name],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &DocumentKey, document: &serde_json::Value) -> Result<()> {
        self.upsert_all([(key, document)])
    }

    fn put_many(&self, documents: &[(DocumentKey, serde_json::Value)]) -> Result<()> {
        self.upsert_all(documents.iter().map(|(key, document)| (key, document)))
    }

    fn remove(&self, key: &DocumentKey) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND kind = ?2 AND name = ?3",
            params![key.collection.as_str(), key.kind.as_str(), key.name],
        )?;
        Ok(deleted > 0)
    }

    fn names(&self, collection: Collection, kind: PoolKind) -> Result<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM documents WHERE collection = ?1 AND kind = ?2 ORDER BY name")?;
        let names = stmt
            .query_map(params![collection.as_str(), kind.as_str()], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn key(kind: PoolKind, name: &str) -> DocumentKey {
        DocumentKey::new(Collection::History, kind, name)
    }

    #[test]
    fn test_put_get_remove() {
        let store = SqliteStore::open_in_memory().unwrap();
        let k = key(PoolKind::Lottery, "Prizes");

        assert_eq!(store.get(&k).unwrap(), None);
        store.put(&k, &json!({"total_rounds": 1})).unwrap();
        assert_eq!(store.get(&k).unwrap(), Some(json!({"total_rounds": 1})));

        store.put(&k, &json!({"total_rounds": 2})).unwrap();
        assert_eq!(store.get(&k).unwrap(), Some(json!({"total_rounds": 2})));

        assert!(store.remove(&k).unwrap());
        assert!(!store.remove(&k).unwrap());
    }

    #[test]
    fn test_names_are_scoped() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.put(&key(PoolKind::RollCall, "b"), &json!({})).unwrap();
        store.put(&key(PoolKind::RollCall, "a"), &json!({})).unwrap();
        store.put(&key(PoolKind::Lottery, "c"), &json!({})).unwrap();

        assert_eq!(store.names(Collection::History, PoolKind::RollCall).unwrap(), vec!["a", "b"]);
        assert!(store.names(Collection::Cycles, PoolKind::RollCall).unwrap().is_empty());
    }

    #[test]
    fn test_put_many_is_one_transaction() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .lock()
            .unwrap()
            .execute_batch(
                "CREATE TRIGGER refuse_poison BEFORE INSERT ON documents WHEN NEW.name = 'poison'
                 BEGIN SELECT RAISE(ABORT, 'refused'); END;",
            )
            .unwrap();

        let documents = vec![
            (key(PoolKind::RollCall, "c"), json!({"total_rounds": 1})),
            (key(PoolKind::RollCall, "poison"), json!({})),
        ];
        assert!(store.put_many(&documents).is_err());
        assert_eq!(store.get(&key(PoolKind::RollCall, "c")).unwrap(), None);

        store.put_many(&documents[..1]).unwrap();
        assert_eq!(store.get(&key(PoolKind::RollCall, "c")).unwrap(), Some(json!({"total_rounds": 1})));
    }

    #[test]
    fn test_persistence_across_instances() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("fairdraw.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store.put(&key(PoolKind::RollCall, "c"), &json!({"v": 1})).unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(&key(PoolKind::RollCall, "c")).unwrap(), Some(json!({"v": 1})));
    }
}

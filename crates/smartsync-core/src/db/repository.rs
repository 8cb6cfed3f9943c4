//! libSQL-backed key/value store for cached collections

use libsql::params;
use tokio::sync::Mutex;

use crate::db::Database;
use crate::error::Result;
use crate::storage::LocalStore;

/// libSQL implementation of [`LocalStore`].
///
/// Each key is one row, so every save replaces a whole collection in a single
/// statement and is atomic.
pub struct LibSqlStore {
    db: Mutex<Database>,
}

impl LibSqlStore {
    /// Wrap an opened (and migrated) database
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open a file-backed store at the given path
    pub async fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory store (primarily for tests)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }
}

impl LocalStore for LibSqlStore {
    async fn load(&self, key: &str) -> Result<Option<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT value FROM cache_entries WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: String = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn save(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT OR REPLACE INTO cache_entries (key, value, saved_at) VALUES (?, ?, ?)",
                params![key, value, now],
            )
            .await?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool> {
        let db = self.db.lock().await;
        let rows = db
            .connection()
            .execute("DELETE FROM cache_entries WHERE key = ?", [key])
            .await?;
        Ok(rows > 0)
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT key FROM cache_entries ORDER BY key", ())
            .await?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    async fn setup() -> LibSqlStore {
        LibSqlStore::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_missing_key() {
        let store = setup().await;
        assert_eq!(store.load("students").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_load() {
        let store = setup().await;
        store.save("students", r#"[{"id":"1"}]"#).await.unwrap();

        assert_eq!(
            store.load("students").await.unwrap().as_deref(),
            Some(r#"[{"id":"1"}]"#)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_replaces_value() {
        let store = setup().await;
        store.save("students", "[]").await.unwrap();
        store.save("students", r#"[{"id":"2"}]"#).await.unwrap();

        assert_eq!(
            store.load("students").await.unwrap().as_deref(),
            Some(r#"[{"id":"2"}]"#)
        );
        assert_eq!(store.keys().await.unwrap(), vec!["students".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_and_keys() {
        let store = setup().await;
        store.save("officers", "[]").await.unwrap();
        store.save("__sync_metadata", "{}").await.unwrap();

        assert_eq!(
            store.keys().await.unwrap(),
            vec!["__sync_metadata".to_string(), "officers".to_string()]
        );
        assert!(store.remove("officers").await.unwrap());
        assert!(!store.remove("officers").await.unwrap());
        assert_eq!(store.load("officers").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_values_survive_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("cache.db");

        {
            let store = LibSqlStore::open(&db_path).await.unwrap();
            store.save("officers", r#"[{"id":"o-1"}]"#).await.unwrap();
        }

        let store = LibSqlStore::open(&db_path).await.unwrap();
        assert_eq!(
            store.load("officers").await.unwrap().as_deref(),
            Some(r#"[{"id":"o-1"}]"#)
        );
    }
}

//! SQLite adapter for the catalog repository.

use async_trait::async_trait;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::database::ports::CatalogRepository;
use crate::domain::{
    CatalogEntry, EntryId, EntrySummary, InsertOutcome, NewCatalogEntry,
};
use crate::error::StoreError;

const CREATE_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS images (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        url TEXT NOT NULL UNIQUE,
        labels TEXT NOT NULL
    )
"#;

#[derive(Debug, Clone)]
pub struct SqliteCatalogRepository {
    pool: SqlitePool,
}

impl SqliteCatalogRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if missing) the database behind `url`, e.g.
    /// `sqlite://database/collection.db` or `sqlite::memory:`.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(StoreError::Connect)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        if !in_memory {
            if let Some(parent) = options.get_filename().parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)?;
            }
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        // Every in-memory connection is its own database, so keep exactly one
        // alive for the lifetime of the pool.
        let pool = SqlitePoolOptions::new()
            .max_connections(if in_memory { 1 } else { 4 })
            .min_connections(if in_memory { 1 } else { 0 })
            .idle_timeout(if in_memory { None } else { Some(Duration::from_secs(600)) })
            .max_lifetime(if in_memory { None } else { Some(Duration::from_secs(1800)) })
            .connect_with(options)
            .await
            .map_err(StoreError::Connect)?;

        info!(database = %url, "catalog database opened");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    fn map_summary(row: &SqliteRow) -> Result<EntrySummary, StoreError> {
        Ok(EntrySummary {
            id: EntryId(
                row.try_get("id")
                    .map_err(StoreError::query("read entry id"))?,
            ),
            name: row
                .try_get("name")
                .map_err(StoreError::query("read entry name"))?,
            location: row
                .try_get("url")
                .map_err(StoreError::query("read entry location"))?,
        })
    }

    fn map_entry(row: &SqliteRow) -> Result<CatalogEntry, StoreError> {
        let summary = Self::map_summary(row)?;
        let labels: String = row
            .try_get("labels")
            .map_err(StoreError::query("read entry labels"))?;
        Ok(CatalogEntry {
            id: summary.id,
            name: summary.name,
            location: summary.location,
            labels,
        })
    }
}

/// Escape LIKE wildcards so the search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[async_trait]
impl CatalogRepository for SqliteCatalogRepository {
    async fn insert(&self, entry: &NewCatalogEntry) -> Result<InsertOutcome, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO images (name, url, labels)
            VALUES (?, ?, ?)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(&entry.name)
        .bind(&entry.location)
        .bind(entry.labels.as_str())
        .execute(&self.pool)
        .await
        .map_err(StoreError::query("insert catalog entry"))?;

        if result.rows_affected() == 0 {
            debug!(location = %entry.location, "location already catalogued");
            return Ok(InsertOutcome::Duplicate);
        }

        Ok(InsertOutcome::Inserted(EntryId(result.last_insert_rowid())))
    }

    async fn list(&self, filter: Option<&str>) -> Result<Vec<EntrySummary>, StoreError> {
        let rows = match filter {
            Some(term) => {
                // SQLite's LIKE folds ASCII case, which is the search contract.
                sqlx::query(
                    r#"
                    SELECT id, name, url
                    FROM images
                    WHERE labels LIKE ? ESCAPE '\'
                    ORDER BY id
                    "#,
                )
                .bind(format!("%{}%", escape_like(term)))
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query("SELECT id, name, url FROM images ORDER BY id")
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(StoreError::query("list catalog entries"))?;

        rows.iter().map(Self::map_summary).collect()
    }

    async fn get(&self, id: EntryId) -> Result<Option<CatalogEntry>, StoreError> {
        let row = sqlx::query("SELECT id, name, url, labels FROM images WHERE id = ?")
            .bind(id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(StoreError::query("load catalog entry"))?;

        row.as_ref().map(Self::map_entry).transpose()
    }

    async fn delete(&self, id: EntryId) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM images WHERE id = ?")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(StoreError::query("delete catalog entry"))?;

        Ok(result.rows_affected() > 0)
    }

    async fn ensure_schema(&self) -> Result<(), StoreError> {
        sqlx::query(CREATE_TABLE)
            .execute(&self.pool)
            .await
            .map_err(StoreError::query("create catalog table"))?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(StoreError::query("begin reset transaction"))?;

        sqlx::query("DROP TABLE IF EXISTS images")
            .execute(&mut *tx)
            .await
            .map_err(StoreError::query("drop catalog table"))?;
        sqlx::query(CREATE_TABLE)
            .execute(&mut *tx)
            .await
            .map_err(StoreError::query("create catalog table"))?;

        tx.commit()
            .await
            .map_err(StoreError::query("commit reset transaction"))?;

        info!("catalog table reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Labels;

    async fn repository() -> SqliteCatalogRepository {
        let repo = SqliteCatalogRepository::connect("sqlite::memory:")
            .await
            .expect("in-memory database");
        repo.reset().await.expect("reset schema");
        repo
    }

    fn entry(name: &str, location: &str, labels: &[&str]) -> NewCatalogEntry {
        NewCatalogEntry {
            name: name.to_string(),
            location: location.to_string(),
            labels: Labels::from_terms(labels.iter().copied()).unwrap(),
        }
    }

    #[tokio::test]
    async fn insert_then_list_and_get() {
        let repo = repository().await;

        let outcome = repo
            .insert(&entry("chicken", "http://x/y.jpg", &["chicken", "food"]))
            .await
            .unwrap();
        let id = outcome.inserted_id().expect("row inserted");

        let all = repo.list(None).await.unwrap();
        assert_eq!(
            all,
            vec![EntrySummary {
                id,
                name: "chicken".into(),
                location: "http://x/y.jpg".into(),
            }]
        );

        let stored = repo.get(id).await.unwrap().expect("entry exists");
        assert_eq!(stored.name, "chicken");
        assert_eq!(stored.location, "http://x/y.jpg");
        assert_eq!(stored.labels, "chicken, food");
    }

    #[tokio::test]
    async fn duplicate_location_keeps_first_insert() {
        let repo = repository().await;

        let first = repo
            .insert(&entry("first", "http://x/y.jpg", &["chicken"]))
            .await
            .unwrap();
        let second = repo
            .insert(&entry("second", "http://x/y.jpg", &["pizza"]))
            .await
            .unwrap();

        assert!(matches!(first, InsertOutcome::Inserted(_)));
        assert_eq!(second, InsertOutcome::Duplicate);

        let all = repo.list(None).await.unwrap();
        assert_eq!(all.len(), 1);
        let stored = repo.get(all[0].id).await.unwrap().unwrap();
        assert_eq!(stored.name, "first");
        assert_eq!(stored.labels, "chicken");
    }

    #[tokio::test]
    async fn search_is_case_insensitive_substring() {
        let repo = repository().await;
        repo.insert(&entry("lunch", "http://x/lunch.jpg", &["chicken", "food", "frying"]))
            .await
            .unwrap();
        repo.insert(&entry("pet", "http://x/cat.png", &["cat", "whiskers"]))
            .await
            .unwrap();

        let hits = repo.list(Some("chick")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "lunch");

        let upper = repo.list(Some("CHICK")).await.unwrap();
        assert_eq!(upper, hits);

        assert!(repo.list(Some("xyz")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_treats_wildcards_literally() {
        let repo = repository().await;
        repo.insert(&entry("plain", "http://x/a.jpg", &["food"]))
            .await
            .unwrap();
        repo.insert(&entry("odd", "http://x/b.jpg", &["100% juice"]))
            .await
            .unwrap();

        let hits = repo.list(Some("%")).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "odd");

        assert!(repo.list(Some("f_od")).await.unwrap().is_empty());
        assert!(repo.list(Some("' OR 1=1 --")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_preserves_insertion_order() {
        let repo = repository().await;
        for (i, name) in ["one", "two", "three", "four"].iter().enumerate() {
            repo.insert(&entry(name, &format!("http://x/{i}.png"), &["thing"]))
                .await
                .unwrap();
        }

        let names: Vec<_> = repo
            .list(None)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["one", "two", "three", "four"]);
    }

    #[tokio::test]
    async fn missing_id_is_none() {
        let repo = repository().await;
        assert!(repo.get(EntryId(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_removes_only_the_target() {
        let repo = repository().await;
        let keep = repo
            .insert(&entry("keep", "http://x/keep.jpg", &["a"]))
            .await
            .unwrap()
            .inserted_id()
            .unwrap();
        let gone = repo
            .insert(&entry("drop", "http://x/drop.jpg", &["b"]))
            .await
            .unwrap()
            .inserted_id()
            .unwrap();

        assert!(repo.delete(gone).await.unwrap());
        assert!(!repo.delete(gone).await.unwrap());
        assert!(repo.get(gone).await.unwrap().is_none());
        assert!(repo.get(keep).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn reset_empties_the_table() {
        let repo = repository().await;
        repo.insert(&entry("a", "http://x/a.jpg", &["a"]))
            .await
            .unwrap();

        repo.reset().await.unwrap();
        assert!(repo.list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_schema_keeps_existing_rows() {
        let repo = repository().await;
        repo.insert(&entry("a", "http://x/a.jpg", &["a"]))
            .await
            .unwrap();

        repo.ensure_schema().await.unwrap();
        assert_eq!(repo.list(None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_database_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("collection.db");
        let url = format!("sqlite://{}", path.display());

        let repo = SqliteCatalogRepository::connect(&url).await.unwrap();
        repo.ensure_schema().await.unwrap();

        assert!(path.exists());
    }

    #[test]
    fn escape_like_escapes_wildcards() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("chick"), "chick");
    }
}

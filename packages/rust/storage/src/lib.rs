//! libSQL-backed docset search index.
//!
//! The [`SearchIndex`] struct wraps the `docSet.dsidx` SQLite file that
//! documentation viewers query directly. It owns schema creation and batched
//! record insertion; the `(name, type, path)` uniqueness constraint lives in
//! the schema, so a duplicate insert surfaces as [`DocsetError::Integrity`].
//!
//! **Access rules:**
//! - One writer per build, opened with [`SearchIndex::create`] and closed
//!   before the package is archived.

mod migrations;

use std::path::{Path, PathBuf};

use libsql::{Connection, Database, params};
use tracing::{debug, info, instrument, warn};

use docsetkit_shared::{Category, DocsetError, IndexRecord, Result};

/// Message fragment SQLite uses for UNIQUE index violations.
const UNIQUE_VIOLATION: &str = "UNIQUE constraint failed";

/// Handle to an open search index.
pub struct SearchIndex {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    path: PathBuf,
}

impl SearchIndex {
    /// Create (or open) the index at `path` and apply the schema.
    ///
    /// The parent directory must already exist; it is never created here.
    #[instrument(skip(path), fields(path = %path.display()))]
    pub async fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.is_dir() {
                return Err(DocsetError::io(
                    parent,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "index parent directory does not exist",
                    ),
                ));
            }
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocsetError::Storage(e.to_string()))?;

        let index = Self {
            db,
            conn,
            path: path.to_path_buf(),
        };
        index.run_migrations().await?;
        info!("search index ready");
        Ok(index)
    }

    /// Path of the backing database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DocsetError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Schema version recorded in the database header (0 for a fresh file).
    async fn schema_version(&self) -> Result<u32> {
        let mut rows = self
            .conn
            .query("PRAGMA user_version", params![])
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|v| v.clamp(0, u32::MAX as i64) as u32)
                .map_err(|e| DocsetError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(DocsetError::Storage(e.to_string())),
        }
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Insert a batch of records in one transaction.
    ///
    /// Either every record is committed or none is. A record that repeats an
    /// existing `(name, type, path)` triple aborts the batch with
    /// [`DocsetError::Integrity`].
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn insert_batch(&self, records: &[IndexRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let tx = self
            .conn
            .transaction()
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?;

        match insert_rows(&tx, records).await {
            Ok(count) => {
                tx.commit()
                    .await
                    .map_err(|e| DocsetError::Storage(format!("commit failed: {e}")))?;
                debug!(count, "batch committed");
                Ok(count)
            }
            Err(e) => {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback after failed batch also failed");
                }
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    /// Total number of records.
    pub async fn count(&self) -> Result<u64> {
        let mut rows = self
            .conn
            .query("SELECT COUNT(*) FROM searchIndex", params![])
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => row
                .get::<i64>(0)
                .map(|n| n.max(0) as u64)
                .map_err(|e| DocsetError::Storage(e.to_string())),
            Ok(None) => Ok(0),
            Err(e) => Err(DocsetError::Storage(e.to_string())),
        }
    }

    /// Record counts per `type`, ordered by type name.
    pub async fn count_by_type(&self) -> Result<Vec<(String, u64)>> {
        let mut rows = self
            .conn
            .query(
                "SELECT type, COUNT(*) FROM searchIndex GROUP BY type ORDER BY type",
                params![],
            )
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?
        {
            results.push((
                row.get::<String>(0)
                    .map_err(|e| DocsetError::Storage(e.to_string()))?,
                row.get::<i64>(1)
                    .map(|n| n.max(0) as u64)
                    .map_err(|e| DocsetError::Storage(e.to_string()))?,
            ));
        }
        Ok(results)
    }

    /// All records in insertion order.
    pub async fn records(&self) -> Result<Vec<IndexRecord>> {
        let mut rows = self
            .conn
            .query("SELECT name, type, path FROM searchIndex ORDER BY id", params![])
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DocsetError::Storage(e.to_string()))?
        {
            let category: String = row
                .get(1)
                .map_err(|e| DocsetError::Storage(e.to_string()))?;
            results.push(IndexRecord {
                name: row
                    .get::<String>(0)
                    .map_err(|e| DocsetError::Storage(e.to_string()))?,
                category: category
                    .parse::<Category>()
                    .map_err(|e| DocsetError::Storage(e.to_string()))?,
                path: row
                    .get::<String>(2)
                    .map_err(|e| DocsetError::Storage(e.to_string()))?,
            });
        }
        Ok(results)
    }

    /// Release the connection. All committed batches are already on disk.
    pub fn close(self) {
        debug!(path = %self.path.display(), "search index closed");
    }
}

/// Insert each record, mapping UNIQUE violations to integrity errors.
async fn insert_rows(conn: &Connection, records: &[IndexRecord]) -> Result<usize> {
    for record in records {
        conn.execute(
            "INSERT INTO searchIndex (name, type, path) VALUES (?1, ?2, ?3)",
            params![
                record.name.as_str(),
                record.category.as_str(),
                record.path.as_str()
            ],
        )
        .await
        .map_err(|e| {
            let message = e.to_string();
            if message.contains(UNIQUE_VIOLATION) {
                DocsetError::Integrity {
                    name: record.name.clone(),
                    category: record.category.to_string(),
                    path: record.path.clone(),
                }
            } else {
                DocsetError::Storage(message)
            }
        })?;
    }
    Ok(records.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_db_path() -> PathBuf {
        std::env::temp_dir().join(format!("dk_index_test_{}.dsidx", uuid::Uuid::now_v7()))
    }

    fn record(name: &str, category: Category, path: &str) -> IndexRecord {
        IndexRecord {
            name: name.into(),
            category,
            path: path.into(),
        }
    }

    #[tokio::test]
    async fn create_applies_schema() {
        let path = temp_db_path();
        let index = SearchIndex::create(&path).await.expect("create index");
        assert_eq!(index.schema_version().await.unwrap(), 1);
        assert_eq!(index.count().await.unwrap(), 0);
        index.close();

        // Re-opening an existing index does not re-run migrations.
        let index = SearchIndex::create(&path).await.expect("reopen index");
        assert_eq!(index.schema_version().await.unwrap(), 1);
        index.close();

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn create_fails_without_parent_directory() {
        let path = std::env::temp_dir()
            .join(format!("dk_missing_{}", uuid::Uuid::now_v7()))
            .join("docSet.dsidx");
        let err = SearchIndex::create(&path).await.err().expect("should fail");
        assert!(matches!(err, DocsetError::Io { .. }));
        assert!(!path.parent().unwrap().exists());
    }

    #[tokio::test]
    async fn insert_and_read_back() {
        let path = temp_db_path();
        let index = SearchIndex::create(&path).await.unwrap();

        let inserted = index
            .insert_batch(&[
                record("Rapid move", Category::Command, "g-code.html#gcode:G0"),
                record("O-word loops", Category::Guide, "o-code.html#ocode:loops"),
            ])
            .await
            .expect("insert batch");
        assert_eq!(inserted, 2);

        let records = index.records().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "Rapid move");
        assert_eq!(records[0].category, Category::Command);
        assert_eq!(records[1].path, "o-code.html#ocode:loops");

        let by_type = index.count_by_type().await.unwrap();
        assert_eq!(
            by_type,
            vec![("Command".to_string(), 1), ("Guide".to_string(), 1)]
        );

        index.close();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn duplicate_triple_is_an_integrity_error() {
        let path = temp_db_path();
        let index = SearchIndex::create(&path).await.unwrap();

        let rapid = record("Rapid move", Category::Command, "g-code.html#gcode:G0");
        index.insert_batch(&[rapid.clone()]).await.unwrap();

        let err = index.insert_batch(&[rapid]).await.unwrap_err();
        assert!(err.is_integrity(), "unexpected error: {err}");
        assert_eq!(index.count().await.unwrap(), 1);

        index.close();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn same_name_with_other_category_or_path_is_allowed() {
        let path = temp_db_path();
        let index = SearchIndex::create(&path).await.unwrap();

        index
            .insert_batch(&[
                record("Rapid move", Category::Command, "g-code.html#gcode:G0"),
                record("Rapid move", Category::Guide, "g-code.html#gcode:G0"),
                record("Rapid move", Category::Command, "overview.html#gcode:G0"),
            ])
            .await
            .expect("distinct triples");
        assert_eq!(index.count().await.unwrap(), 3);

        index.close();
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn failed_batch_commits_nothing() {
        let path = temp_db_path();
        let index = SearchIndex::create(&path).await.unwrap();

        let err = index
            .insert_batch(&[
                record("M3", Category::Command, "m-code.html#mcode:m3"),
                record("M4", Category::Command, "m-code.html#mcode:m4"),
                record("M3", Category::Command, "m-code.html#mcode:m3"),
            ])
            .await
            .unwrap_err();
        assert!(err.is_integrity());
        assert_eq!(index.count().await.unwrap(), 0);

        index.close();
        let _ = std::fs::remove_file(&path);
    }
}

use crate::{FileDropError, FileRecord, FileSummary, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

/// Metadata storage contract used by the file operations.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Create the backing table if it does not exist yet.
    async fn ensure_schema(&self) -> Result<()>;

    /// Insert a new record. Fails if the file id is already present.
    async fn put_record(&self, record: &FileRecord) -> Result<()>;

    async fn get_record(&self, file_id: &str) -> Result<Option<FileRecord>>;

    /// All records projected to [`FileSummary`], in backend order.
    async fn list_summaries(&self) -> Result<Vec<FileSummary>>;
}

/// SQLite-backed [`MetadataStore`] for single-node deployments.
///
/// A connection is opened per call on the blocking pool, so the store itself
/// holds no handle and is freely shareable.
#[derive(Debug, Clone)]
pub struct SqliteMetadataStore {
    db_path: PathBuf,
}

impl SqliteMetadataStore {
    pub fn new(db_path: impl Into<PathBuf>) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let store = Self { db_path };
        init_schema(&store.get_conn()?)?;
        Ok(store)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    fn get_conn(&self) -> Result<Connection> {
        let conn = Connection::open(&self.db_path)?;
        Ok(conn)
    }

    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let store = self.clone();
        tokio::task::spawn_blocking(move || {
            let conn = store.get_conn()?;
            f(&conn)
        })
        .await
        .map_err(|error| FileDropError::Internal(format!("sqlite task failed: {}", error)))?
    }
}

fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS files (
            file_id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            size_bytes INTEGER NOT NULL,
            content_type TEXT NOT NULL,
            sha256 TEXT NOT NULL,
            s3_key TEXT NOT NULL,
            uploaded_at TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.with_conn(init_schema).await
    }

    async fn put_record(&self, record: &FileRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO files (
                    file_id, filename, size_bytes, content_type, sha256, s3_key, uploaded_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.file_id,
                    record.filename,
                    record.size_bytes as i64,
                    record.content_type,
                    record.sha256,
                    record.s3_key,
                    record.uploaded_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_record(&self, file_id: &str) -> Result<Option<FileRecord>> {
        let file_id = file_id.to_string();
        self.with_conn(move |conn| {
            let record = conn
                .query_row(
                    "SELECT filename, size_bytes, content_type, sha256, s3_key, uploaded_at
                     FROM files WHERE file_id = ?1",
                    [&file_id],
                    |row| {
                        let size: i64 = row.get(1)?;
                        let uploaded_at: String = row.get(5)?;
                        Ok(FileRecord {
                            file_id: file_id.clone(),
                            filename: row.get(0)?,
                            size_bytes: size as u64,
                            content_type: row.get(2)?,
                            sha256: row.get(3)?,
                            s3_key: row.get(4)?,
                            uploaded_at: parse_timestamp(5, &uploaded_at)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
        .await
    }

    async fn list_summaries(&self) -> Result<Vec<FileSummary>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT file_id, filename, size_bytes, uploaded_at FROM files")?;

            let rows = stmt.query_map([], |row| {
                let size: i64 = row.get(2)?;
                let uploaded_at: String = row.get(3)?;
                Ok(FileSummary {
                    file_id: row.get(0)?,
                    filename: row.get(1)?,
                    size_bytes: size as u64,
                    uploaded_at: parse_timestamp(3, &uploaded_at)?,
                })
            })?;

            let mut summaries = Vec::new();
            for row in rows {
                summaries.push(row?);
            }

            Ok(summaries)
        })
        .await
    }
}

//! SQLite-backed document catalog and query log.
//!
//! The catalog is the source of truth for document status: one row per
//! upload, flipped to `processed` once its vectors are indexed. Queries are
//! appended to a separate log table for offline inspection.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;

use crate::processing::types::{DocumentMetadata, current_timestamp_rfc3339};

/// Errors produced by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Underlying SQLite failure.
    #[error("catalog database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// Filesystem preparation for the database path failed.
    #[error("failed to prepare catalog directory: {0}")]
    Io(#[from] std::io::Error),
    /// A previous panic left the connection lock unusable.
    #[error("catalog connection lock is poisoned")]
    Poisoned,
}

/// Handle to the catalog database.
///
/// The connection is serialized behind a mutex; catalog calls are short
/// single-statement operations, so contention stays negligible next to the
/// network round trips in the pipeline.
pub struct Catalog {
    conn: Mutex<Connection>,
}

impl Catalog {
    /// Open (or create) the catalog at the given path.
    pub fn open(path: &Path) -> Result<Self, CatalogError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        migrate(&conn)?;
        tracing::debug!(path = %path.display(), "Catalog opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory catalog. Used by tests and ephemeral setups.
    pub fn open_in_memory() -> Result<Self, CatalogError> {
        let conn = Connection::open_in_memory()?;
        migrate(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record a freshly uploaded document. The row starts unprocessed.
    pub fn insert_document(&self, metadata: &DocumentMetadata) -> Result<(), CatalogError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO documents (
                document_id, filename, document_type, domain, upload_timestamp,
                file_size, page_count, chunk_count, processed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                metadata.document_id,
                metadata.filename,
                metadata.document_type.as_str(),
                metadata.domain.as_str(),
                metadata.upload_timestamp,
                metadata.file_size as i64,
                metadata.page_count.map(|pages| pages as i64),
                metadata.chunk_count as i64,
                metadata.processed,
            ],
        )?;
        Ok(())
    }

    /// Look up a document row by id.
    pub fn get_document(&self, document_id: &str) -> Result<Option<DocumentMetadata>, CatalogError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT document_id, filename, document_type, domain, upload_timestamp,
                    file_size, page_count, chunk_count, processed
             FROM documents WHERE document_id = ?1",
        )?;
        let document = stmt
            .query_row(params![document_id], |row| {
                let kind_raw: String = row.get(2)?;
                let domain_raw: String = row.get(3)?;
                let document_type = kind_raw.parse().map_err(|_| {
                    rusqlite::Error::FromSqlConversionFailure(
                        2,
                        rusqlite::types::Type::Text,
                        format!("unrecognized document type {kind_raw:?}").into(),
                    )
                })?;
                let domain = domain_raw.parse().map_err(|_| {
                    rusqlite::Error::FromSqlConversionFailure(
                        3,
                        rusqlite::types::Type::Text,
                        format!("unrecognized domain {domain_raw:?}").into(),
                    )
                })?;
                Ok(DocumentMetadata {
                    document_id: row.get(0)?,
                    filename: row.get(1)?,
                    document_type,
                    domain,
                    upload_timestamp: row.get(4)?,
                    file_size: row.get::<_, i64>(5)? as u64,
                    page_count: row.get::<_, Option<i64>>(6)?.map(|pages| pages as u32),
                    chunk_count: row.get::<_, i64>(7)? as usize,
                    processed: row.get(8)?,
                })
            })
            .optional()?;
        Ok(document)
    }

    /// Mark a document as fully indexed with its final chunk count.
    pub fn mark_processed(&self, document_id: &str, chunk_count: usize) -> Result<(), CatalogError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE documents SET processed = 1, chunk_count = ?2 WHERE document_id = ?1",
            params![document_id, chunk_count as i64],
        )?;
        Ok(())
    }

    /// Remove a document row. Returns whether a row existed.
    pub fn delete_document(&self, document_id: &str) -> Result<bool, CatalogError> {
        let conn = self.conn()?;
        let affected = conn.execute(
            "DELETE FROM documents WHERE document_id = ?1",
            params![document_id],
        )?;
        Ok(affected > 0)
    }

    /// Append one entry to the query log.
    pub fn log_query(
        &self,
        query: &str,
        domain: Option<&str>,
        num_results: usize,
        processing_time: f64,
    ) -> Result<(), CatalogError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO query_log (query, domain, num_results, processing_time, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                query,
                domain,
                num_results as i64,
                processing_time,
                current_timestamp_rfc3339(),
            ],
        )?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn query_log_count(&self) -> Result<i64, CatalogError> {
        let conn = self.conn()?;
        Ok(conn.query_row("SELECT COUNT(*) FROM query_log", [], |row| row.get(0))?)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, CatalogError> {
        self.conn.lock().map_err(|_| CatalogError::Poisoned)
    }
}

fn migrate(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS documents (
            document_id TEXT PRIMARY KEY,
            filename TEXT NOT NULL,
            document_type TEXT NOT NULL,
            domain TEXT NOT NULL,
            upload_timestamp TEXT NOT NULL,
            file_size INTEGER NOT NULL,
            page_count INTEGER,
            chunk_count INTEGER NOT NULL DEFAULT 0,
            processed INTEGER NOT NULL DEFAULT 0
        );
        CREATE TABLE IF NOT EXISTS query_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            query TEXT NOT NULL,
            domain TEXT,
            num_results INTEGER NOT NULL,
            processing_time REAL NOT NULL,
            created_at TEXT NOT NULL
        );",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::types::{DocumentKind, Domain};

    fn sample_document(document_id: &str) -> DocumentMetadata {
        DocumentMetadata {
            document_id: document_id.to_string(),
            filename: "policy.pdf".to_string(),
            document_type: DocumentKind::Pdf,
            domain: Domain::Insurance,
            upload_timestamp: "2024-05-01T10:00:00Z".to_string(),
            file_size: 2048,
            page_count: Some(3),
            chunk_count: 0,
            processed: false,
        }
    }

    #[test]
    fn insert_and_get_round_trips_all_fields() {
        let catalog = Catalog::open_in_memory().expect("open");
        catalog
            .insert_document(&sample_document("doc-1"))
            .expect("insert");

        let stored = catalog
            .get_document("doc-1")
            .expect("get")
            .expect("row exists");
        assert_eq!(stored.document_id, "doc-1");
        assert_eq!(stored.filename, "policy.pdf");
        assert_eq!(stored.document_type, DocumentKind::Pdf);
        assert_eq!(stored.domain, Domain::Insurance);
        assert_eq!(stored.upload_timestamp, "2024-05-01T10:00:00Z");
        assert_eq!(stored.file_size, 2048);
        assert_eq!(stored.page_count, Some(3));
        assert_eq!(stored.chunk_count, 0);
        assert!(!stored.processed);

        assert!(catalog.get_document("missing").expect("get").is_none());
    }

    #[test]
    fn mark_processed_updates_status_and_chunk_count() {
        let catalog = Catalog::open_in_memory().expect("open");
        catalog
            .insert_document(&sample_document("doc-2"))
            .expect("insert");

        catalog.mark_processed("doc-2", 12).expect("mark");

        let stored = catalog
            .get_document("doc-2")
            .expect("get")
            .expect("row exists");
        assert!(stored.processed);
        assert_eq!(stored.chunk_count, 12);
    }

    #[test]
    fn delete_reports_whether_a_row_existed() {
        let catalog = Catalog::open_in_memory().expect("open");
        catalog
            .insert_document(&sample_document("doc-3"))
            .expect("insert");

        assert!(catalog.delete_document("doc-3").expect("delete"));
        assert!(!catalog.delete_document("doc-3").expect("delete again"));
        assert!(catalog.get_document("doc-3").expect("get").is_none());
    }

    #[test]
    fn log_query_appends_entries() {
        let catalog = Catalog::open_in_memory().expect("open");
        catalog
            .log_query("knee surgery coverage", Some("insurance"), 5, 1.25)
            .expect("log");
        catalog
            .log_query("notice period", None, 3, 0.4)
            .expect("log");

        assert_eq!(catalog.query_log_count().expect("count"), 2);
    }

    #[test]
    fn open_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("catalog.db");

        {
            let catalog = Catalog::open(&path).expect("open");
            catalog
                .insert_document(&sample_document("doc-4"))
                .expect("insert");
        }

        let reopened = Catalog::open(&path).expect("reopen");
        let stored = reopened
            .get_document("doc-4")
            .expect("get")
            .expect("row persisted");
        assert_eq!(stored.filename, "policy.pdf");
    }
}

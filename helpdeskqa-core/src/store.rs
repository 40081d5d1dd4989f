//! Document store: durable storage of ingested help articles keyed by URL.
//!
//! `get` on a missing url is a miss (`None`), not an error — the query
//! pipeline treats it exactly like an empty vector-index result. `put` is
//! an upsert-by-url, used by the ingestion seam.

use crate::error::StoreError;
use crate::types::Document;
use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use tokio::sync::RwLock;

/// Trait for document stores.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Look up a document by url. `None` is a miss, not an error.
    async fn get(&self, url: &str) -> Result<Option<Document>, StoreError>;

    /// Insert or replace the document with the same url.
    async fn put(&self, doc: &Document) -> Result<(), StoreError>;

    /// Enumerate the full corpus, for the indexing batch.
    async fn list(&self) -> Result<Vec<Document>, StoreError>;
}

/// SQLite-backed document store.
///
/// Single `docs` table with `url` as primary key; `put` maps to
/// `INSERT OR REPLACE`, which gives the upsert-by-url contract for free.
pub struct SqliteDocumentStore {
    conn: Mutex<Connection>,
}

impl SqliteDocumentStore {
    /// Open (and if needed create) the database at `path`.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open a transient in-memory database. Used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS docs (
                url     TEXT PRIMARY KEY,
                title   TEXT NOT NULL,
                article TEXT NOT NULL,
                locale  TEXT NOT NULL
            );",
        )?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Backend {
            message: "connection mutex poisoned".into(),
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn get(&self, url: &str) -> Result<Option<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT url, title, article, locale FROM docs WHERE url = ?1")?;
        let mut rows = stmt.query_map(params![url], |row| {
            Ok(Document {
                url: row.get(0)?,
                title: row.get(1)?,
                article: row.get(2)?,
                locale: row.get(3)?,
            })
        })?;
        match rows.next() {
            Some(doc) => Ok(Some(doc?)),
            None => Ok(None),
        }
    }

    async fn put(&self, doc: &Document) -> Result<(), StoreError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO docs (url, title, article, locale) VALUES (?1, ?2, ?3, ?4)",
            params![doc.url, doc.title, doc.article, doc.locale],
        )?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT url, title, article, locale FROM docs ORDER BY url")?;
        let rows = stmt.query_map([], |row| {
            Ok(Document {
                url: row.get(0)?,
                title: row.get(1)?,
                article: row.get(2)?,
                locale: row.get(3)?,
            })
        })?;
        let mut docs = Vec::new();
        for row in rows {
            docs.push(row?);
        }
        Ok(docs)
    }
}

/// In-memory document store for tests and ephemeral setups.
#[derive(Default)]
pub struct MemoryDocumentStore {
    docs: RwLock<HashMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get(&self, url: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.docs.read().await.get(url).cloned())
    }

    async fn put(&self, doc: &Document) -> Result<(), StoreError> {
        self.docs.write().await.insert(doc.url.clone(), doc.clone());
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Document>, StoreError> {
        let docs = self.docs.read().await;
        let mut all: Vec<Document> = docs.values().cloned().collect();
        all.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(all)
    }
}

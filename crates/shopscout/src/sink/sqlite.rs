//! Append-only SQLite writer into the `products` table.

use super::{ensure_parent, Sink};
use crate::error::SinkError;
use crate::types::Record;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS products (
    title TEXT NOT NULL,
    price TEXT,
    original_price TEXT,
    rating TEXT,
    review_count TEXT,
    url TEXT,
    seller TEXT,
    category TEXT,
    scraped_at TEXT NOT NULL
);";

pub struct SqliteSink {
    path: PathBuf,
    label: String,
}

impl SqliteSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let label = path.display().to_string();
        Self { path, label }
    }

    fn open(&self) -> Result<Connection, SinkError> {
        ensure_parent(&self.path)?;
        let db = Connection::open(&self.path)?;
        db.execute_batch(SCHEMA)?;
        Ok(db)
    }
}

impl Sink for SqliteSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn write(&mut self, records: &[Record]) -> Result<usize, SinkError> {
        let mut db = self.open()?;
        let tx = db.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO products
                 (title, price, original_price, rating, review_count, url, seller, category, scraped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for r in records {
                stmt.execute(rusqlite::params![
                    r.title,
                    r.price,
                    r.original_price,
                    r.rating,
                    r.review_count,
                    r.url,
                    r.seller,
                    r.category,
                    r.scraped_at,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }
}

//! Persistence adapters for extracted records.
//!
//! Every sink receives the same uniformly shaped records in the fixed
//! [`COLUMNS`](crate::types::COLUMNS) order. [`write_all`] attempts each sink
//! independently so one failing destination never blocks the others.

pub mod csv;
pub mod jsonl;
pub mod sqlite;
pub mod xlsx;

pub use self::csv::CsvSink;
pub use self::jsonl::JsonlSink;
pub use self::sqlite::SqliteSink;
pub use self::xlsx::XlsxSink;

use crate::error::SinkError;
use crate::types::Record;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// A destination for a batch of records.
pub trait Sink: Send {
    /// Short label used in logs and reports.
    fn name(&self) -> &str;
    /// Persist `records`, returning how many were written.
    fn write(&mut self, records: &[Record]) -> Result<usize, SinkError>;
}

/// Result of one sink's write.
#[derive(Debug, Clone, Serialize)]
pub struct SinkReport {
    pub sink: String,
    pub written: usize,
    pub error: Option<String>,
}

impl SinkReport {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Available sink kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkKind {
    Csv,
    Xlsx,
    Sqlite,
    Jsonl,
}

impl SinkKind {
    pub const ALL: [SinkKind; 4] = [Self::Xlsx, Self::Csv, Self::Sqlite, Self::Jsonl];
}

impl std::str::FromStr for SinkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "xlsx" | "excel" => Ok(Self::Xlsx),
            "sqlite" | "db" => Ok(Self::Sqlite),
            "jsonl" | "json" => Ok(Self::Jsonl),
            other => Err(format!("unknown sink '{other}' (expected csv, xlsx, sqlite or jsonl)")),
        }
    }
}

/// `{prefix}_{stamp}.{ext}` inside `dir`.
pub fn output_file(dir: &Path, prefix: &str, stamp: &str, ext: &str) -> PathBuf {
    dir.join(format!("{prefix}_{stamp}.{ext}"))
}

/// Run-stamp for output file names, e.g. `20250101_120000`.
pub fn run_stamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Build the requested sinks. Timestamped files share one run stamp.
pub fn build_sinks(
    kinds: &[SinkKind],
    output_dir: &Path,
    prefix: &str,
    database: &Path,
) -> Vec<Box<dyn Sink>> {
    let stamp = run_stamp();
    kinds
        .iter()
        .map(|kind| -> Box<dyn Sink> {
            match kind {
                SinkKind::Csv => Box::new(CsvSink::new(output_file(output_dir, prefix, &stamp, "csv"))),
                SinkKind::Xlsx => Box::new(XlsxSink::new(output_file(output_dir, prefix, &stamp, "xlsx"))),
                SinkKind::Sqlite => Box::new(SqliteSink::new(database)),
                SinkKind::Jsonl => Box::new(JsonlSink::new(output_file(output_dir, prefix, &stamp, "jsonl"))),
            }
        })
        .collect()
}

/// Write `records` to every sink, continuing past failures.
pub fn write_all(sinks: &mut [Box<dyn Sink>], records: &[Record]) -> Vec<SinkReport> {
    sinks
        .iter_mut()
        .map(|sink| {
            let name = sink.name().to_string();
            match sink.write(records) {
                Ok(written) => {
                    tracing::info!("saved {written} records to {name}");
                    SinkReport {
                        sink: name,
                        written,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::error!("{name} save error: {e}");
                    SinkReport {
                        sink: name,
                        written: 0,
                        error: Some(e.to_string()),
                    }
                }
            }
        })
        .collect()
}

/// Create the parent directory of `path` if needed.
pub(crate) fn ensure_parent(path: &Path) -> Result<(), SinkError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::Record;

    pub(crate) fn sample_records() -> Vec<Record> {
        vec![
            Record {
                title: "Apple iPhone 15 (Black, 128 GB)".into(),
                price: "61999".into(),
                original_price: "69900".into(),
                rating: "4.6".into(),
                review_count: "2,14,532".into(),
                url: "https://www.flipkart.com/apple-iphone-15/p/itm1".into(),
                seller: "SuperComNet".into(),
                category: "mobiles".into(),
                scraped_at: "2025-01-01 12:00:00".into(),
            },
            Record {
                title: "boAt Rockerz 450, \"On-Ear\"".into(),
                price: "1499".into(),
                original_price: "0".into(),
                rating: "N/A".into(),
                review_count: "0".into(),
                url: "N/A".into(),
                seller: "N/A".into(),
                category: "headphones".into(),
                scraped_at: "2025-01-01 12:00:05".into(),
            },
        ]
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn name(&self) -> &str {
            "failing"
        }
        fn write(&mut self, _records: &[Record]) -> Result<usize, SinkError> {
            Err(SinkError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only",
            )))
        }
    }

    #[test]
    fn test_write_all_continues_past_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut sinks: Vec<Box<dyn Sink>> = vec![
            Box::new(FailingSink),
            Box::new(CsvSink::new(dir.path().join("out.csv"))),
        ];
        let reports = write_all(&mut sinks, &sample_records());
        assert!(!reports[0].is_ok());
        assert!(reports[0].error.as_deref().unwrap().contains("read-only"));
        assert!(reports[1].is_ok());
        assert_eq!(reports[1].written, 2);
    }

    #[test]
    fn test_sink_kind_parse() {
        assert_eq!("CSV".parse::<SinkKind>().unwrap(), SinkKind::Csv);
        assert_eq!("excel".parse::<SinkKind>().unwrap(), SinkKind::Xlsx);
        assert!("parquet".parse::<SinkKind>().is_err());
    }

    #[test]
    fn test_build_sinks_names_files() {
        let dir = Path::new("out");
        let sinks = build_sinks(&SinkKind::ALL, dir, "products", Path::new("out/p.db"));
        let names: Vec<_> = sinks.iter().map(|s| s.name().to_string()).collect();
        assert_eq!(names.len(), 4);
        assert!(names[0].starts_with("out/products_") && names[0].ends_with(".xlsx"));
        assert!(names[1].ends_with(".csv"));
        assert_eq!(names[2], "out/p.db");
        assert!(names[3].ends_with(".jsonl"));
    }
}

//! UTF-8 CSV writer with a header row.

use super::{ensure_parent, Sink};
use crate::error::SinkError;
use crate::types::{Record, COLUMNS};
use std::path::PathBuf;

pub struct CsvSink {
    path: PathBuf,
    label: String,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }
}

impl Sink for CsvSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn write(&mut self, records: &[Record]) -> Result<usize, SinkError> {
        ensure_parent(&self.path)?;
        let mut writer = ::csv::Writer::from_path(&self.path)?;
        writer.write_record(COLUMNS)?;
        for record in records {
            writer.write_record(record.values())?;
        }
        writer.flush()?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::tests::sample_records;

    #[test]
    fn test_csv_header_and_quoting() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/products.csv");
        let mut sink = CsvSink::new(&path);
        assert_eq!(sink.write(&sample_records()).unwrap(), 2);

        let mut reader = ::csv::Reader::from_path(&path).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, COLUMNS);

        let rows: Vec<::csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][1], "61999");
        assert_eq!(&rows[1][0], "boAt Rockerz 450, \"On-Ear\"");
        assert_eq!(&rows[1][7], "headphones");
    }

    #[test]
    fn test_csv_header_only_for_empty_batch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        CsvSink::new(&path).write(&[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim_end(), COLUMNS.join(","));
    }
}

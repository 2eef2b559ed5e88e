//! Append-only JSON-lines writer; one record object per line.

use super::{ensure_parent, Sink};
use crate::error::SinkError;
use crate::types::Record;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

pub struct JsonlSink {
    path: PathBuf,
    label: String,
}

impl JsonlSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }
}

impl Sink for JsonlSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn write(&mut self, records: &[Record]) -> Result<usize, SinkError> {
        ensure_parent(&self.path)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut out = BufWriter::new(file);
        for record in records {
            serde_json::to_writer(&mut out, record)?;
            out.write_all(b"\n")?;
        }
        out.flush()?;
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::tests::sample_records;

    #[test]
    fn test_jsonl_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("products.jsonl");
        let mut sink = JsonlSink::new(&path);
        sink.write(&sample_records()).unwrap();
        sink.write(&sample_records()[..1]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let back: Record = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(back, sample_records()[1]);
    }
}

//! Single-sheet spreadsheet writer.

use super::{ensure_parent, Sink};
use crate::error::SinkError;
use crate::types::{Record, COLUMNS};
use rust_xlsxwriter::{Format, Workbook};
use std::path::PathBuf;

const SHEET_NAME: &str = "Products";

pub struct XlsxSink {
    path: PathBuf,
    label: String,
}

impl XlsxSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let label = path.display().to_string();
        Self { path, label }
    }
}

impl Sink for XlsxSink {
    fn name(&self) -> &str {
        &self.label
    }

    fn write(&mut self, records: &[Record]) -> Result<usize, SinkError> {
        ensure_parent(&self.path)?;
        let mut workbook = Workbook::new();
        let header = Format::new().set_bold();
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, name) in COLUMNS.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, *name, &header)?;
        }
        for (i, record) in records.iter().enumerate() {
            let row = (i + 1) as u32;
            for (col, value) in record.values().iter().enumerate() {
                sheet.write_string(row, col as u16, *value)?;
            }
        }

        workbook.save(&self.path)?;
        Ok(records.len())
    }
}

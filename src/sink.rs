//! Record sinks
//!
//! Records are flushed one at a time so an interrupted batch keeps every
//! record written before the interruption.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::engine::ExtractionRecord;
use crate::error::Result;

/// Destination for extraction records
pub trait RecordSink {
    /// Persist one record. Once this returns, the record is durable.
    fn write(&mut self, record: &ExtractionRecord) -> Result<()>;

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ExtractionRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ExtractionRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExtractionRecord> {
        self.records
    }
}

impl RecordSink for MemorySink {
    fn write(&mut self, record: &ExtractionRecord) -> Result<()> {
        self.records.push(record.clone());
        Ok(())
    }
}

/// CSV file rewritten in full after every record.
///
/// Columns named in the hint come first, in hint order, when any row has
/// them; other columns follow in the order they were first seen. Each
/// rewrite goes to a temporary file that is then renamed over the target.
#[derive(Debug)]
pub struct CsvSink {
    path: PathBuf,
    column_hint: Vec<String>,
    extras: Vec<String>,
    seen: HashSet<String>,
    rows: Vec<HashMap<String, String>>,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>, column_hint: Vec<String>) -> Self {
        Self {
            path: path.into(),
            column_hint,
            extras: Vec::new(),
            seen: HashSet::new(),
            rows: Vec::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header of the file as it is currently written
    pub fn columns(&self) -> Vec<String> {
        self.column_hint
            .iter()
            .filter(|c| self.seen.contains(c.as_str()))
            .chain(self.extras.iter())
            .cloned()
            .collect()
    }

    fn add_row(&mut self, row: Vec<(String, String)>) {
        for (column, _) in &row {
            if self.seen.insert(column.clone()) && !self.column_hint.contains(column) {
                self.extras.push(column.clone());
            }
        }
        self.rows.push(row.into_iter().collect());
    }

    fn rewrite(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let tmp = temp_path(&self.path);
        let columns = self.columns();
        {
            let mut writer = csv::Writer::from_path(&tmp)?;
            writer.write_record(&columns)?;
            for row in &self.rows {
                writer.write_record(
                    columns
                        .iter()
                        .map(|c| row.get(c).map(String::as_str).unwrap_or("")),
                )?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), rows = self.rows.len(), "csv rewritten");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "results.csv".into());
    name.push(".tmp");
    path.with_file_name(name)
}

impl RecordSink for CsvSink {
    fn write(&mut self, record: &ExtractionRecord) -> Result<()> {
        self.add_row(record.to_row());
        self.rewrite()
    }

    fn finish(&mut self) -> Result<()> {
        // An empty batch still leaves a header-only file behind
        if self.rows.is_empty() {
            self.rewrite()?;
        }
        Ok(())
    }
}

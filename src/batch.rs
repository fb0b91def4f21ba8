//! Sequential batch runner
//!
//! One lookup per item: wait for the results, extract, flush to the sink.
//! A failed item never stops the batch; a failing sink does.

use std::fmt;

use tracing::{info, warn};

use crate::config::ReadinessConfig;
use crate::engine::{extract_when_ready, fallback_record, ExtractionRecord};
use crate::error::{ExtractError, Result};
use crate::sink::RecordSink;
use crate::source::DocumentSource;
use crate::spec::SpecTable;

/// One lookup: where its page comes from and the input row it was made for
#[derive(Debug, Clone)]
pub struct BatchItem<S> {
    pub id: String,
    pub source: S,
    pub context: Vec<(String, String)>,
}

impl<S> BatchItem<S> {
    pub fn new(id: impl Into<String>, source: S) -> Self {
        Self {
            id: id.into(),
            source,
            context: Vec::new(),
        }
    }

    pub fn with_context(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.push((column.into(), value.into()));
        self
    }
}

#[derive(Debug)]
pub enum RecordStatus {
    /// Every field was located
    Success,
    /// Some fields fell back to their defaults
    Partial { missing: Vec<String> },
    Failed(ExtractError),
}

impl RecordStatus {
    fn of(record: &ExtractionRecord) -> Self {
        let missing = record.missing();
        if missing.is_empty() {
            Self::Success
        } else {
            Self::Partial {
                missing: missing.into_iter().map(String::from).collect(),
            }
        }
    }

    /// Value written to a table's status column
    pub fn label(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Partial { .. } => "Partial",
            Self::Failed(ExtractError::NoResults { .. }) => "No User Found",
            Self::Failed(_) => "Error",
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

#[derive(Debug)]
pub struct RecordOutcome {
    pub id: String,
    pub status: RecordStatus,
}

#[derive(Debug, Default)]
pub struct BatchSummary {
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchSummary {
    pub fn succeeded(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Success))
    }

    pub fn partial(&self) -> usize {
        self.count(|s| matches!(s, RecordStatus::Partial { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(RecordStatus::is_failed)
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&RecordStatus> {
        self.outcomes.iter().find(|o| o.id == id).map(|o| &o.status)
    }

    fn count(&self, pred: impl Fn(&RecordStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} complete, {} partial, {} failed",
            self.len(),
            self.succeeded(),
            self.partial(),
            self.failed()
        )
    }
}

pub struct BatchRunner<'a> {
    table: &'a SpecTable,
    config: ReadinessConfig,
}

impl<'a> BatchRunner<'a> {
    pub fn new(table: &'a SpecTable, config: ReadinessConfig) -> Self {
        Self { table, config }
    }

    /// Process `items` in order, flushing each record to `sink` before the
    /// next lookup starts.
    ///
    /// Returns an error only for an invalid table or a sink failure; item
    /// failures are reported in the summary.
    pub fn run<S, I, K>(&self, items: I, sink: &mut K) -> Result<BatchSummary>
    where
        I: IntoIterator<Item = BatchItem<S>>,
        S: DocumentSource,
        K: RecordSink + ?Sized,
    {
        self.table.validate()?;
        let mut summary = BatchSummary::default();

        for item in items {
            let status = self.process(item.source, item.context, &item.id, sink)?;
            summary.outcomes.push(RecordOutcome {
                id: item.id,
                status,
            });
        }

        sink.finish()?;
        info!(table = %self.table.name, "{summary}");
        Ok(summary)
    }

    fn process<S, K>(
        &self,
        source: S,
        context: Vec<(String, String)>,
        id: &str,
        sink: &mut K,
    ) -> Result<RecordStatus>
    where
        S: DocumentSource,
        K: RecordSink + ?Sized,
    {
        match extract_when_ready(&source, self.table, &self.config, context.clone()) {
            Ok(record) => {
                let status = RecordStatus::of(&record);
                info!(
                    id,
                    found = record.found_count(),
                    fields = record.fields().len(),
                    status = status.label(),
                    "record extracted"
                );
                sink.write(&self.annotate(record, &status))?;
                Ok(status)
            }
            Err(e) => {
                warn!(id, source = %source.describe(), error = %e, "record failed");
                let status = RecordStatus::Failed(e);
                if self.table.status_column.is_some() {
                    let record = fallback_record(self.table, context);
                    sink.write(&self.annotate(record, &status))?;
                }
                Ok(status)
            }
        }
    }

    fn annotate(&self, record: ExtractionRecord, status: &RecordStatus) -> ExtractionRecord {
        match &self.table.status_column {
            Some(column) => record.annotate(column.as_str(), status.label()),
            None => record,
        }
    }
}

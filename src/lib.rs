//! Resilient field extraction for eligibility result pages
//!
//! Pulls named fields out of rendered HTML snapshots using ordered
//! fallback strategies:
//! - CSS structural paths (with label-aware accessors)
//! - Free-text label scans
//! - Whole-page line scans and regex patterns
//!
//! Every value records which strategy produced it. Records are flushed to a
//! sink one at a time by the batch runner.

pub mod batch;
pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod extractors;
pub mod ffi;
pub mod layout;
pub mod sink;
pub mod source;
pub mod spec;
pub mod tables;

pub use batch::{BatchItem, BatchRunner, BatchSummary, RecordStatus};
pub use config::{EngineConfig, ReadinessConfig};
pub use document::Document;
pub use engine::*;
pub use error::{ExtractError, Result};
pub use layout::{classify, plan_inputs, FormLayout};
pub use sink::{CsvSink, MemorySink, RecordSink};
pub use source::{wait_until_ready, DocumentSource, HtmlFileSource, StaticSource};
pub use spec::{
    Accessor, DerivedField, FieldSpec, LocatorStrategy, SpecTable, StrategyKind, Transform,
};

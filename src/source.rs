//! Page-navigator collaborator and the readiness gate
//!
//! The engine never drives the browser. A [`DocumentSource`] hands out
//! snapshots of whatever the navigator currently shows, and
//! [`wait_until_ready`] polls it until a results marker appears or the
//! configured bound elapses.

use std::path::PathBuf;
use std::thread;
use std::time::Instant;

use tracing::debug;

use crate::config::ReadinessConfig;
use crate::document::Document;
use crate::error::{ExtractError, Result};

/// Supplies snapshots of the currently rendered page
pub trait DocumentSource {
    fn snapshot(&self) -> Result<Document>;

    /// Short label for diagnostics
    fn describe(&self) -> String {
        "document source".to_string()
    }
}

impl<F> DocumentSource for F
where
    F: Fn() -> Result<Document>,
{
    fn snapshot(&self) -> Result<Document> {
        self()
    }
}

/// Fixed in-memory HTML
#[derive(Debug, Clone)]
pub struct StaticSource {
    html: String,
}

impl StaticSource {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }
}

impl DocumentSource for StaticSource {
    fn snapshot(&self) -> Result<Document> {
        Ok(Document::parse(&self.html))
    }

    fn describe(&self) -> String {
        "inline html".to_string()
    }
}

/// An HTML file the navigator keeps overwriting with the live page.
/// Re-read on every snapshot.
#[derive(Debug, Clone)]
pub struct HtmlFileSource {
    path: PathBuf,
}

impl HtmlFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentSource for HtmlFileSource {
    fn snapshot(&self) -> Result<Document> {
        let html = std::fs::read_to_string(&self.path)?;
        Ok(Document::parse(&html))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Whether a snapshot shows rendered results. With no markers, any
/// non-blank snapshot counts.
pub fn is_ready(document: &Document, markers: &[String]) -> bool {
    document.ensure_valid().is_ok()
        && (markers.is_empty() || markers.iter().any(|m| document.contains(m)))
}

/// Poll `source` until any marker matches, then return the snapshot.
///
/// Fails with [`ExtractError::DocumentUnavailable`] once `config.timeout()`
/// has elapsed; the overshoot is at most one snapshot call. Source errors
/// count as "not ready yet".
pub fn wait_until_ready<S>(
    source: &S,
    markers: &[String],
    config: &ReadinessConfig,
) -> Result<Document>
where
    S: DocumentSource + ?Sized,
{
    let timeout = config.timeout();
    let deadline = Instant::now() + timeout;
    let mut polls = 0u32;

    loop {
        polls += 1;
        match source.snapshot() {
            Ok(document) if is_ready(&document, markers) => {
                debug!(source = %source.describe(), polls, "results rendered");
                return settle(source, document, config);
            }
            Ok(_) => debug!(source = %source.describe(), polls, "waiting for results marker"),
            Err(e) => debug!(source = %source.describe(), polls, error = %e, "snapshot failed"),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(ExtractError::timed_out(timeout));
        }
        thread::sleep(config.poll_interval().min(deadline - now));
    }
}

/// Give late widgets a moment, then take the snapshot that is extracted
fn settle<S>(source: &S, document: Document, config: &ReadinessConfig) -> Result<Document>
where
    S: DocumentSource + ?Sized,
{
    if config.settle().is_zero() {
        return Ok(document);
    }
    thread::sleep(config.settle());
    let settled = source.snapshot()?;
    settled.ensure_valid()?;
    Ok(settled)
}

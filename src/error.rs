//! Error taxonomy for the extraction engine
//!
//! A field that cannot be located is not an error: it degrades to the
//! field's default and is recorded as [`Provenance::NotFound`].
//!
//! [`Provenance::NotFound`]: crate::engine::Provenance::NotFound

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    /// The snapshot never reached the "results rendered" state, or the
    /// document handle was invalidated. Fatal for one record only.
    #[error("document unavailable: {reason}")]
    DocumentUnavailable { reason: String },

    /// No known form layout matched the page.
    #[error("form layout not recognized")]
    LayoutUnrecognized,

    /// The portal rendered a "no member found" style message.
    #[error("portal reported no results ({phrase:?})")]
    NoResults { phrase: String },

    #[error("invalid spec table: {0}")]
    InvalidSpec(String),

    #[error("invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("invalid pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ExtractError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        Self::DocumentUnavailable {
            reason: reason.into(),
        }
    }

    pub(crate) fn timed_out(timeout: Duration) -> Self {
        Self::unavailable(format!(
            "readiness marker not found within {:.1}s",
            timeout.as_secs_f64()
        ))
    }

    /// Whether the error only affects the record being processed.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            Self::DocumentUnavailable { .. } | Self::LayoutUnrecognized | Self::NoResults { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ExtractError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message() {
        let err = ExtractError::timed_out(Duration::from_millis(1500));
        assert_eq!(
            err.to_string(),
            "document unavailable: readiness marker not found within 1.5s"
        );
        assert!(err.is_record_scoped());
    }

    #[test]
    fn test_plumbing_errors_are_not_record_scoped() {
        let err: ExtractError = std::io::Error::other("disk full").into();
        assert!(!err.is_record_scoped());
        assert!(!ExtractError::InvalidSpec("empty".into()).is_record_scoped());
    }
}

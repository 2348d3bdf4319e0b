//! Structured error types for the folio reflow engine.
//!
//! Only caller-facing preconditions are errors: bad JSON and degenerate
//! estimation inputs. Broken internal invariants are engine defects and
//! panic at the point of detection instead of surfacing here.

use thiserror::Error;

/// Result type alias for folio operations.
pub type Result<T> = std::result::Result<T, PaginateError>;

/// The unified error type returned by all public folio API functions.
#[derive(Debug, Error)]
pub enum PaginateError {
    /// JSON input failed to parse as a valid folio document.
    #[error("Failed to parse document: {source}{}", hint_suffix(.hint))]
    Parse {
        #[source]
        source: serde_json::Error,
        hint: String,
    },

    /// The page budget, an estimator constant, or an estimate for some node
    /// is zero, negative, or not finite. Rejected before any layout starts.
    #[error("Degenerate estimation input: {subject} is {value} (must be positive and finite)")]
    EstimationDegenerate { subject: String, value: f64 },

    /// Reading input or writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &str) -> String {
    if hint.is_empty() {
        String::new()
    } else {
        format!("\n  Hint: {hint}")
    }
}

impl PaginateError {
    pub(crate) fn degenerate(subject: impl Into<String>, value: f64) -> Self {
        PaginateError::EstimationDegenerate {
            subject: subject.into(),
            value,
        }
    }
}

impl From<serde_json::Error> for PaginateError {
    fn from(e: serde_json::Error) -> Self {
        let hint = match e.classify() {
            serde_json::error::Category::Syntax => {
                "Check for trailing commas, missing quotes, or unescaped characters.".to_string()
            }
            serde_json::error::Category::Data => {
                "The JSON is valid but doesn't match the folio document schema. Check field names and types.".to_string()
            }
            serde_json::error::Category::Eof => {
                "Unexpected end of input, is the JSON truncated?".to_string()
            }
            serde_json::error::Category::Io => String::new(),
        };
        PaginateError::Parse { source: e, hint }
    }
}

/// Require a strictly positive, finite quantity.
pub(crate) fn ensure_positive(subject: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(PaginateError::degenerate(subject, value))
    }
}

//! Type Conversions for TraceError
//!
//! From trait implementations for converting common error types into
//! TraceError.

use super::types::TraceError;

impl From<serde_json::Error> for TraceError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

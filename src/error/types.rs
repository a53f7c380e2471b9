//! Core error type for trace instrumentation.

use thiserror::Error;

/// Errors raised by endpoint tracers and streaming aggregators.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraceError {
    /// JSON (de)serialization failure of a request or response body
    #[error("JSON error: {0}")]
    JsonError(String),

    /// A streamed event payload could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The SSE framing itself was invalid
    #[error("Stream error: {0}")]
    StreamError(String),

    /// The request body is not the JSON object the endpoint expects
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The response body is not the JSON object the endpoint returns
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl TraceError {
    /// Whether the error came from a streamed (SSE) response.
    pub fn is_stream_error(&self) -> bool {
        matches!(self, Self::ParseError(_) | Self::StreamError(_))
    }
}

/// Result alias used across the crate.
pub type TraceResult<T> = std::result::Result<T, TraceError>;

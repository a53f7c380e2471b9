//! Span capability consumed by the tracers.
//!
//! The tracing substrate owns the span; this crate only writes into it through
//! [`SpanHandle`]. [`SpanFactory`] opens new spans with an explicit start time so
//! span duration reflects the real request latency.

use crate::error::TraceResult;
use serde::Serialize;
use std::time::SystemTime;

/// Attribute value written onto a span.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

impl AttributeValue {
    /// Encode any serializable value as a JSON string attribute.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> TraceResult<Self> {
        Ok(Self::String(serde_json::to_string(value)?))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Span status.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error(String),
}

/// Write access to one open span.
pub trait SpanHandle: Send {
    fn set_attribute(&mut self, key: &str, value: AttributeValue);

    /// Record an exception event for `error`.
    fn record_error(&mut self, error: &(dyn std::error::Error + 'static));

    fn set_status(&mut self, status: SpanStatus);

    /// End the span at `timestamp`. Calls after the first are ignored.
    fn end(&mut self, timestamp: SystemTime);

    fn is_recording(&self) -> bool {
        true
    }
}

/// Opens spans on the tracing substrate.
pub trait SpanFactory: Send + Sync {
    fn start_span(&self, name: &str, start: SystemTime) -> Box<dyn SpanHandle>;
}

/// A span that drops everything written to it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NonRecordingSpan;

impl SpanHandle for NonRecordingSpan {
    fn set_attribute(&mut self, _key: &str, _value: AttributeValue) {}

    fn record_error(&mut self, _error: &(dyn std::error::Error + 'static)) {}

    fn set_status(&mut self, _status: SpanStatus) {}

    fn end(&mut self, _timestamp: SystemTime) {}

    fn is_recording(&self) -> bool {
        false
    }
}

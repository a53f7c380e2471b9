//! In-memory span recorder.
//!
//! Useful for asserting on produced spans in tests without an OpenTelemetry
//! pipeline.

use super::span::{AttributeValue, SpanFactory, SpanHandle, SpanStatus};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

/// Snapshot of one recorded span.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSpan {
    pub name: String,
    pub start_time: SystemTime,
    pub end_time: Option<SystemTime>,
    pub attributes: BTreeMap<String, AttributeValue>,
    pub status: SpanStatus,
    /// Messages of recorded exception events
    pub errors: Vec<String>,
}

impl RecordedSpan {
    pub fn attribute(&self, key: &str) -> Option<&AttributeValue> {
        self.attributes.get(key)
    }

    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attribute(key).and_then(AttributeValue::as_str)
    }

    /// Decode a JSON-encoded string attribute.
    pub fn attribute_json(&self, key: &str) -> Option<serde_json::Value> {
        self.attribute_str(key)
            .and_then(|s| serde_json::from_str(s).ok())
    }

    pub fn is_ended(&self) -> bool {
        self.end_time.is_some()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Span factory that keeps every span in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySpanFactory {
    spans: Arc<Mutex<Vec<Arc<Mutex<RecordedSpan>>>>>,
}

impl InMemorySpanFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// All spans opened so far, in start order.
    pub fn spans(&self) -> Vec<RecordedSpan> {
        lock(&self.spans)
            .iter()
            .map(|span| lock(span).clone())
            .collect()
    }

    /// Spans that have been ended.
    pub fn finished_spans(&self) -> Vec<RecordedSpan> {
        self.spans()
            .into_iter()
            .filter(RecordedSpan::is_ended)
            .collect()
    }

    pub fn clear(&self) {
        lock(&self.spans).clear();
    }
}

impl SpanFactory for InMemorySpanFactory {
    fn start_span(&self, name: &str, start: SystemTime) -> Box<dyn SpanHandle> {
        let record = Arc::new(Mutex::new(RecordedSpan {
            name: name.to_string(),
            start_time: start,
            end_time: None,
            attributes: BTreeMap::new(),
            status: SpanStatus::Unset,
            errors: Vec::new(),
        }));
        lock(&self.spans).push(record.clone());
        Box::new(RecordingSpan { record })
    }
}

struct RecordingSpan {
    record: Arc<Mutex<RecordedSpan>>,
}

impl SpanHandle for RecordingSpan {
    fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        let mut record = lock(&self.record);
        if record.end_time.is_none() {
            record.attributes.insert(key.to_string(), value);
        }
    }

    fn record_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        lock(&self.record).errors.push(error.to_string());
    }

    fn set_status(&mut self, status: SpanStatus) {
        lock(&self.record).status = status;
    }

    fn end(&mut self, timestamp: SystemTime) {
        let mut record = lock(&self.record);
        if record.end_time.is_none() {
            record.end_time = Some(timestamp);
        }
    }
}

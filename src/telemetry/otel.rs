//! OpenTelemetry-backed span factory.

use super::span::{AttributeValue, SpanFactory, SpanHandle, SpanStatus};
use opentelemetry::trace::{Span, SpanKind, Status, Tracer};
use opentelemetry::{KeyValue, Value, global};
use std::time::SystemTime;

/// Instrumentation scope used by [`OtelSpanFactory::global`].
pub const INSTRUMENTATION_NAME: &str = "braintrust-trace";

/// Opens spans through any OpenTelemetry [`Tracer`].
#[derive(Debug)]
pub struct OtelSpanFactory<T> {
    tracer: T,
}

impl OtelSpanFactory<global::BoxedTracer> {
    /// Use the process-wide tracer provider.
    pub fn global() -> Self {
        Self::new(global::tracer(INSTRUMENTATION_NAME))
    }
}

impl<T> OtelSpanFactory<T>
where
    T: Tracer + Send + Sync,
    T::Span: Send + 'static,
{
    pub fn new(tracer: T) -> Self {
        Self { tracer }
    }
}

impl<T> SpanFactory for OtelSpanFactory<T>
where
    T: Tracer + Send + Sync,
    T::Span: Send + 'static,
{
    fn start_span(&self, name: &str, start: SystemTime) -> Box<dyn SpanHandle> {
        let span = self
            .tracer
            .span_builder(name.to_string())
            .with_kind(SpanKind::Client)
            .with_start_time(start)
            .start(&self.tracer);
        Box::new(OtelSpan { span })
    }
}

struct OtelSpan<S> {
    span: S,
}

fn to_otel_value(value: AttributeValue) -> Value {
    match value {
        AttributeValue::String(s) => Value::from(s),
        AttributeValue::Int(i) => Value::from(i),
        AttributeValue::Float(f) => Value::from(f),
        AttributeValue::Bool(b) => Value::from(b),
    }
}

impl<S> SpanHandle for OtelSpan<S>
where
    S: Span + Send,
{
    fn set_attribute(&mut self, key: &str, value: AttributeValue) {
        self.span
            .set_attribute(KeyValue::new(key.to_string(), to_otel_value(value)));
    }

    fn record_error(&mut self, error: &(dyn std::error::Error + 'static)) {
        self.span.record_error(error);
    }

    fn set_status(&mut self, status: SpanStatus) {
        let status = match status {
            SpanStatus::Unset => Status::Unset,
            SpanStatus::Ok => Status::Ok,
            SpanStatus::Error(message) => Status::error(message),
        };
        self.span.set_status(status);
    }

    fn end(&mut self, timestamp: SystemTime) {
        self.span.end_with_timestamp(timestamp);
    }

    fn is_recording(&self) -> bool {
        self.span.is_recording()
    }
}

//! Provider Endpoint Tracers
//!
//! One [`EndpointTracer`] per traced provider endpoint. A tracer decodes the
//! request body into the canonical input when the span opens, and decodes the
//! buffered response (plain JSON or SSE) into the canonical output, metadata
//! and metrics when the caller is done with the body.
//!
//! Provider modules expose a `router` function mapping request paths to
//! tracers; see [`crate::execution::http::router`].

use crate::error::{TraceError, TraceResult};
use crate::execution::http::tee::CapturedBody;
use crate::telemetry::attributes;
use crate::telemetry::{AttributeValue, NonRecordingSpan, SpanFactory, SpanHandle, TraceConfig};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::SystemTime;

pub mod usage;

#[cfg(feature = "anthropic")]
pub mod anthropic;
#[cfg(feature = "google")]
pub mod gemini;
#[cfg(feature = "openai")]
pub mod openai;

pub use usage::normalize_usage;

/// Everything a tracer needs to open its span.
pub struct StartContext<'a> {
    pub spans: &'a dyn SpanFactory,
    pub config: &'a Arc<TraceConfig>,
    pub start_time: SystemTime,
    /// Request path, recorded as `metadata.endpoint`
    pub path: &'a str,
}

/// Per-endpoint request/response tracer.
///
/// A tracer is created for a single request: `start_span` runs before the
/// request is forwarded, `tag_span` at most once after the response body has
/// been consumed or closed.
pub trait EndpointTracer: Send {
    fn start_span(&mut self, ctx: &StartContext<'_>, request_body: &[u8]) -> TraceResult<Box<dyn SpanHandle>>;

    fn tag_span(&mut self, span: &mut dyn SpanHandle, response: &CapturedBody) -> TraceResult<()>;
}

/// Output, response metadata and raw usage extracted from one response.
///
/// Produced identically by the streaming and non-streaming paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResponseSummary {
    pub output: Option<Value>,
    pub metadata: Map<String, Value>,
    pub usage: Map<String, Value>,
}

impl ResponseSummary {
    /// Merge a usage object into the running usage, later values winning.
    pub fn merge_usage(&mut self, usage: Map<String, Value>) {
        self.usage.extend(usage);
    }
}

/// Request-scoped state shared by every endpoint tracer.
pub struct TracerState {
    pub streaming: bool,
    pub metadata: Map<String, Value>,
    started_at: Option<SystemTime>,
    config: Arc<TraceConfig>,
}

impl TracerState {
    pub fn new(provider: &str) -> Self {
        let mut metadata = Map::new();
        metadata.insert("provider".to_string(), Value::String(provider.to_string()));
        Self {
            streaming: false,
            metadata,
            started_at: None,
            config: Arc::new(TraceConfig::default()),
        }
    }

    /// Open the span and write the request-side attributes.
    pub fn open_span(
        &mut self,
        ctx: &StartContext<'_>,
        name: &str,
        input: Value,
    ) -> TraceResult<Box<dyn SpanHandle>> {
        self.config = ctx.config.clone();
        self.started_at = Some(ctx.start_time);
        self.metadata
            .insert("endpoint".to_string(), Value::String(ctx.path.to_string()));

        let mut span = ctx.spans.start_span(name, ctx.start_time);
        span.set_attribute(
            attributes::SPAN_ATTRIBUTES,
            AttributeValue::json(&json!({ "type": attributes::SPAN_TYPE_LLM }))?,
        );
        if !self.config.tags.is_empty() {
            span.set_attribute(attributes::TAGS, AttributeValue::json(&self.config.tags)?);
        }
        if self.config.record_inputs {
            span.set_attribute(self.config.input_key(), AttributeValue::json(&input)?);
        }
        span.set_attribute(attributes::METADATA, AttributeValue::json(&self.span_metadata())?);
        Ok(span)
    }

    /// Write the response-side attributes from `summary`.
    pub fn finish(
        &mut self,
        span: &mut dyn SpanHandle,
        summary: ResponseSummary,
        response: &CapturedBody,
    ) -> TraceResult<()> {
        let ResponseSummary { output, metadata, usage } = summary;
        self.metadata.extend(metadata);

        if self.config.record_outputs {
            if let Some(output) = output {
                span.set_attribute(self.config.output_key(), AttributeValue::json(&output)?);
            }
        }
        span.set_attribute(attributes::METADATA, AttributeValue::json(&self.span_metadata())?);

        if self.config.record_usage {
            let mut metrics: Map<String, Value> = normalize_usage(&usage)
                .into_iter()
                .map(|(k, v)| (k, Value::from(v)))
                .collect();
            if let Some(ttft) = self.time_to_first_token(response) {
                metrics.insert("time_to_first_token".to_string(), Value::from(ttft));
            }
            if !metrics.is_empty() {
                span.set_attribute(attributes::METRICS, AttributeValue::json(&metrics)?);
            }
        }
        Ok(())
    }

    fn time_to_first_token(&self, response: &CapturedBody) -> Option<f64> {
        if !self.streaming {
            return None;
        }
        let elapsed = response.first_chunk_at?.duration_since(self.started_at?).ok()?;
        Some(elapsed.as_secs_f64())
    }

    /// Accumulated metadata plus static metadata from the config.
    fn span_metadata(&self) -> Map<String, Value> {
        let mut metadata = self.metadata.clone();
        for (key, value) in &self.config.metadata {
            metadata
                .entry(key.clone())
                .or_insert_with(|| Value::String(value.clone()));
        }
        metadata
    }
}

/// Tracer for recognized endpoints that are deliberately not traced.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTracer;

impl EndpointTracer for NoopTracer {
    fn start_span(&mut self, _ctx: &StartContext<'_>, _request_body: &[u8]) -> TraceResult<Box<dyn SpanHandle>> {
        Ok(Box::new(NonRecordingSpan))
    }

    fn tag_span(&mut self, _span: &mut dyn SpanHandle, _response: &CapturedBody) -> TraceResult<()> {
        Ok(())
    }
}

/// Decode a request body into an endpoint's request schema.
pub(crate) fn decode_request<T: DeserializeOwned>(body: &[u8], what: &str) -> TraceResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| TraceError::InvalidRequest(format!("{what} request body: {e}")))
}

/// Decode a buffered non-streaming response body.
pub(crate) fn decode_response<T: DeserializeOwned>(body: &[u8], what: &str) -> TraceResult<T> {
    serde_json::from_slice(body)
        .map_err(|e| TraceError::InvalidResponse(format!("{what} response body: {e}")))
}

/// Copy the non-null `allowed` fields of `source` into `target`.
pub(crate) fn copy_allowed(target: &mut Map<String, Value>, source: &Map<String, Value>, allowed: &[&str]) {
    for key in allowed {
        if let Some(value) = source.get(*key).filter(|v| !v.is_null()) {
            target.insert((*key).to_string(), value.clone());
        }
    }
}

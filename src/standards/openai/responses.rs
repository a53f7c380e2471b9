//! Responses API tracer

use super::PROVIDER;
use super::responses_streaming::ResponsesAggregator;
use crate::error::TraceResult;
use crate::execution::http::tee::CapturedBody;
use crate::standards::{
    EndpointTracer, ResponseSummary, StartContext, TracerState, copy_allowed, decode_request,
    decode_response,
};
use crate::streaming::aggregate;
use crate::telemetry::SpanHandle;
use serde::Deserialize;
use serde_json::{Map, Value, json};

pub const SPAN_NAME: &str = "openai.responses.create";

const REQUEST_METADATA_FIELDS: &[&str] = &[
    "model",
    "instructions",
    "max_output_tokens",
    "metadata",
    "parallel_tool_calls",
    "previous_response_id",
    "reasoning",
    "service_tier",
    "store",
    "temperature",
    "text",
    "tool_choice",
    "tools",
    "top_p",
    "truncation",
    "user",
];

pub(super) const RESPONSE_METADATA_FIELDS: &[&str] = &[
    "id",
    "object",
    "model",
    "status",
    "created_at",
    "service_tier",
    "incomplete_details",
    "error",
];

#[derive(Debug, Deserialize)]
struct ResponsesRequest {
    #[serde(default)]
    input: Option<Value>,
    #[serde(default)]
    stream: Option<bool>,
    #[serde(flatten)]
    params: Map<String, Value>,
}

/// A `response` object, as returned directly or embedded in stream events.
#[derive(Debug, Deserialize)]
pub(super) struct ResponseObject {
    #[serde(default)]
    pub output: Option<Vec<Value>>,
    #[serde(default)]
    pub usage: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ResponseObject {
    /// Copy metadata and usage into `summary`, returning the output items.
    pub(super) fn merge_into(self, summary: &mut ResponseSummary) -> Option<Vec<Value>> {
        copy_allowed(&mut summary.metadata, &self.fields, RESPONSE_METADATA_FIELDS);
        if let Some(usage) = self.usage {
            summary.merge_usage(usage);
        }
        self.output
    }
}

/// Tracer for `POST /responses`.
pub struct ResponsesTracer {
    state: TracerState,
}

impl ResponsesTracer {
    pub fn new() -> Self {
        Self {
            state: TracerState::new(PROVIDER),
        }
    }
}

impl Default for ResponsesTracer {
    fn default() -> Self {
        Self::new()
    }
}

/// A bare string input is shorthand for one user message.
fn canonical_input(input: Option<Value>) -> Value {
    match input {
        Some(Value::String(text)) => json!([{"role": "user", "content": text}]),
        Some(Value::Array(items)) => Value::Array(items),
        Some(other) => json!([other]),
        None => json!([]),
    }
}

impl EndpointTracer for ResponsesTracer {
    fn start_span(&mut self, ctx: &StartContext<'_>, request_body: &[u8]) -> TraceResult<Box<dyn SpanHandle>> {
        let request: ResponsesRequest = decode_request(request_body, "responses")?;

        copy_allowed(&mut self.state.metadata, &request.params, REQUEST_METADATA_FIELDS);
        if let Some(stream) = request.stream {
            self.state.streaming = stream;
            self.state.metadata.insert("stream".to_string(), Value::Bool(stream));
        }

        self.state
            .open_span(ctx, SPAN_NAME, canonical_input(request.input))
    }

    fn tag_span(&mut self, span: &mut dyn SpanHandle, response: &CapturedBody) -> TraceResult<()> {
        let summary = if self.state.streaming {
            aggregate(&response.bytes, ResponsesAggregator::default())?
        } else {
            let object: ResponseObject = decode_response(&response.bytes, "responses")?;
            let mut summary = ResponseSummary::default();
            summary.output = object.merge_into(&mut summary).map(Value::Array);
            summary
        };
        self.state.finish(span, summary, response)
    }
}

//! Messages API tracer

use super::PROVIDER;
use super::streaming::MessagesAggregator;
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

pub const SPAN_NAME: &str = "anthropic.messages.create";

const REQUEST_METADATA_FIELDS: &[&str] = &[
    "model",
    "max_tokens",
    "metadata",
    "stop_sequences",
    "temperature",
    "thinking",
    "tool_choice",
    "tools",
    "top_k",
    "top_p",
    "service_tier",
];

pub(super) const RESPONSE_METADATA_FIELDS: &[&str] = &[
    "id",
    "type",
    "model",
    "stop_reason",
    "stop_sequence",
    "error",
];

#[derive(Debug, Deserialize)]
struct MessagesRequest {
    #[serde(default)]
    system: Option<Value>,
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    stream: Option<bool>,
    #[serde(flatten)]
    params: Map<String, Value>,
}

/// A `message` object, as returned directly or embedded in `message_start`.
#[derive(Debug, Deserialize)]
pub(super) struct MessageObject {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<Vec<Value>>,
    #[serde(default)]
    pub usage: Option<Map<String, Value>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

/// Tracer for `POST /v1/messages`.
pub struct MessagesTracer {
    state: TracerState,
}

impl MessagesTracer {
    pub fn new() -> Self {
        Self {
            state: TracerState::new(PROVIDER),
        }
    }
}

impl Default for MessagesTracer {
    fn default() -> Self {
        Self::new()
    }
}

/// `system` becomes a leading system message.
fn canonical_input(system: Option<Value>, messages: Vec<Value>) -> Value {
    let system = system
        .filter(|s| !s.is_null())
        .map(|content| json!({"role": "system", "content": content}));
    Value::Array(system.into_iter().chain(messages).collect())
}

pub(super) fn assistant_message(role: Option<String>, content: Vec<Value>) -> Value {
    json!([{
        "role": role.unwrap_or_else(|| "assistant".to_string()),
        "content": content,
    }])
}

impl EndpointTracer for MessagesTracer {
    fn start_span(&mut self, ctx: &StartContext<'_>, request_body: &[u8]) -> TraceResult<Box<dyn SpanHandle>> {
        let request: MessagesRequest = decode_request(request_body, "messages")?;

        copy_allowed(&mut self.state.metadata, &request.params, REQUEST_METADATA_FIELDS);
        if let Some(stream) = request.stream {
            self.state.streaming = stream;
            self.state.metadata.insert("stream".to_string(), Value::Bool(stream));
        }

        self.state.open_span(
            ctx,
            SPAN_NAME,
            canonical_input(request.system, request.messages),
        )
    }

    fn tag_span(&mut self, span: &mut dyn SpanHandle, response: &CapturedBody) -> TraceResult<()> {
        let summary = if self.state.streaming {
            aggregate(&response.bytes, MessagesAggregator::default())?
        } else {
            summarize(decode_response(&response.bytes, "messages")?)
        };
        self.state.finish(span, summary, response)
    }
}

fn summarize(message: MessageObject) -> ResponseSummary {
    let mut summary = ResponseSummary::default();
    copy_allowed(&mut summary.metadata, &message.fields, RESPONSE_METADATA_FIELDS);
    if let Some(usage) = message.usage {
        summary.merge_usage(usage);
    }
    summary.output = message
        .content
        .map(|content| assistant_message(message.role, content));
    summary
}

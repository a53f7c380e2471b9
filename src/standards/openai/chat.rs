//! Chat Completions tracer

use super::PROVIDER;
use super::chat_streaming::ChatCompletionsAggregator;
use crate::error::TraceResult;
use crate::execution::http::tee::CapturedBody;
use crate::standards::{
    EndpointTracer, ResponseSummary, StartContext, TracerState, copy_allowed, decode_request,
    decode_response,
};
use crate::streaming::aggregate;
use crate::telemetry::SpanHandle;
use serde::Deserialize;
use serde_json::{Map, Value};

pub const SPAN_NAME: &str = "openai.chat.completions.create";

const REQUEST_METADATA_FIELDS: &[&str] = &[
    "model",
    "frequency_penalty",
    "logit_bias",
    "logprobs",
    "max_tokens",
    "max_completion_tokens",
    "n",
    "presence_penalty",
    "reasoning_effort",
    "response_format",
    "seed",
    "service_tier",
    "stop",
    "stream_options",
    "temperature",
    "top_p",
    "top_logprobs",
    "tools",
    "tool_choice",
    "parallel_tool_calls",
    "user",
    "metadata",
    "store",
    "modalities",
];

pub(super) const RESPONSE_METADATA_FIELDS: &[&str] = &[
    "id",
    "object",
    "model",
    "created",
    "system_fingerprint",
    "service_tier",
    "error",
];

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    #[serde(default)]
    messages: Vec<Value>,
    #[serde(default)]
    stream: Option<bool>,
    #[serde(flatten)]
    params: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Value>>,
    #[serde(default)]
    usage: Option<Map<String, Value>>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

/// Tracer for `POST /chat/completions`.
pub struct ChatCompletionsTracer {
    state: TracerState,
}

impl ChatCompletionsTracer {
    pub fn new() -> Self {
        Self {
            state: TracerState::new(PROVIDER),
        }
    }
}

impl Default for ChatCompletionsTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl EndpointTracer for ChatCompletionsTracer {
    fn start_span(&mut self, ctx: &StartContext<'_>, request_body: &[u8]) -> TraceResult<Box<dyn SpanHandle>> {
        let request: ChatCompletionRequest = decode_request(request_body, "chat completion")?;

        copy_allowed(&mut self.state.metadata, &request.params, REQUEST_METADATA_FIELDS);
        if let Some(stream) = request.stream {
            self.state.streaming = stream;
            self.state.metadata.insert("stream".to_string(), Value::Bool(stream));
        }

        self.state
            .open_span(ctx, SPAN_NAME, Value::Array(request.messages))
    }

    fn tag_span(&mut self, span: &mut dyn SpanHandle, response: &CapturedBody) -> TraceResult<()> {
        let summary = if self.state.streaming {
            aggregate(&response.bytes, ChatCompletionsAggregator::default())?
        } else {
            summarize(decode_response(&response.bytes, "chat completion")?)
        };
        self.state.finish(span, summary, response)
    }
}

fn summarize(response: ChatCompletionResponse) -> ResponseSummary {
    let mut summary = ResponseSummary {
        output: response.choices.map(Value::Array),
        ..Default::default()
    };
    copy_allowed(&mut summary.metadata, &response.fields, RESPONSE_METADATA_FIELDS);
    if let Some(usage) = response.usage {
        summary.merge_usage(usage);
    }
    summary
}

//! generateContent tracer

use super::PROVIDER;
use super::streaming::GenerateContentAggregator;
use crate::error::TraceResult;
use crate::execution::http::tee::CapturedBody;
use crate::standards::{
    EndpointTracer, ResponseSummary, StartContext, TracerState, copy_allowed, decode_request,
    decode_response,
};
use crate::streaming::{aggregate, aggregate_json_array};
use crate::telemetry::SpanHandle;
use serde::Deserialize;
use serde_json::{Map, Value, json};

pub const SPAN_NAME: &str = "genai.models.generateContent";

const REQUEST_METADATA_FIELDS: &[&str] = &["tools", "toolConfig", "safetySettings", "cachedContent"];

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(default)]
    contents: Vec<Content>,
    #[serde(default)]
    system_instruction: Option<Content>,
    #[serde(default)]
    generation_config: Option<Map<String, Value>>,
    #[serde(flatten)]
    params: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub index: Option<usize>,
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// A full `GenerateContentResponse`, or one partial chunk of a stream.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<Map<String, Value>>,
    #[serde(default)]
    pub model_version: Option<String>,
    #[serde(default)]
    pub response_id: Option<String>,
    #[serde(default)]
    pub prompt_feedback: Option<Value>,
}

impl GenerateContentResponse {
    /// Copy response-level metadata and usage into `summary`.
    pub(super) fn merge_header(&mut self, summary: &mut ResponseSummary) {
        if let Some(version) = self.model_version.take() {
            summary.metadata.insert("model".to_string(), Value::String(version));
        }
        if let Some(id) = self.response_id.take() {
            summary.metadata.insert("id".to_string(), Value::String(id));
        }
        if let Some(feedback) = self.prompt_feedback.take() {
            summary.metadata.insert("prompt_feedback".to_string(), feedback);
        }
        if let Some(usage) = self.usage_metadata.take() {
            summary.merge_usage(usage);
        }
    }
}

fn is_plain_text(part: &Value) -> bool {
    part.as_object()
        .is_some_and(|p| p.len() == 1 && p.get("text").is_some_and(Value::is_string))
}

/// Parts collapse to one string when every part is plain text.
pub(super) fn parts_to_content(parts: Vec<Value>) -> Value {
    if !parts.is_empty() && parts.iter().all(is_plain_text) {
        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(Value::as_str))
            .collect();
        Value::String(text)
    } else {
        Value::Array(parts)
    }
}

fn canonical_role(role: Option<&str>, default: &str) -> String {
    match role {
        Some("model") => "assistant".to_string(),
        Some(role) => role.to_string(),
        None => default.to_string(),
    }
}

/// Record candidate finish reasons, ordered by candidate index.
///
/// `finish_reason` holds the first candidate's; `finish_reasons` lists every
/// candidate's when there is more than one.
pub(super) fn record_finish_reasons(summary: &mut ResponseSummary, reasons: Vec<Option<String>>) {
    if let Some(Some(first)) = reasons.first() {
        summary
            .metadata
            .insert("finish_reason".to_string(), Value::String(first.clone()));
    }
    if reasons.len() > 1 {
        let all = reasons.into_iter().map(|r| r.map_or(Value::Null, Value::String)).collect();
        summary
            .metadata
            .insert("finish_reasons".to_string(), Value::Array(all));
    }
}

pub(super) fn candidate_message(content: Option<Content>) -> Value {
    let content = content.unwrap_or_default();
    json!({
        "role": canonical_role(content.role.as_deref(), "assistant"),
        "content": parts_to_content(content.parts),
    })
}

fn canonical_input(system: Option<Content>, contents: Vec<Content>) -> Value {
    let system = system.map(|s| json!({"role": "system", "content": parts_to_content(s.parts)}));
    let messages = contents.into_iter().map(|c| {
        json!({
            "role": canonical_role(c.role.as_deref(), "user"),
            "content": parts_to_content(c.parts),
        })
    });
    Value::Array(system.into_iter().chain(messages).collect())
}

/// Tracer for `models/{model}:generateContent` and its streaming variant.
pub struct GenerateContentTracer {
    state: TracerState,
    model: String,
}

impl GenerateContentTracer {
    pub fn new(model: impl Into<String>, streaming: bool) -> Self {
        let mut state = TracerState::new(PROVIDER);
        state.streaming = streaming;
        Self {
            state,
            model: model.into(),
        }
    }
}

impl EndpointTracer for GenerateContentTracer {
    fn start_span(&mut self, ctx: &StartContext<'_>, request_body: &[u8]) -> TraceResult<Box<dyn SpanHandle>> {
        let request: GenerateContentRequest = decode_request(request_body, "generateContent")?;

        let metadata = &mut self.state.metadata;
        metadata.insert("model".to_string(), Value::String(self.model.clone()));
        if let Some(config) = &request.generation_config {
            for (key, value) in config {
                metadata.insert(key.clone(), value.clone());
            }
        }
        copy_allowed(metadata, &request.params, REQUEST_METADATA_FIELDS);
        if self.state.streaming {
            self.state.metadata.insert("stream".to_string(), Value::Bool(true));
        }

        self.state.open_span(
            ctx,
            SPAN_NAME,
            canonical_input(request.system_instruction, request.contents),
        )
    }

    fn tag_span(&mut self, span: &mut dyn SpanHandle, response: &CapturedBody) -> TraceResult<()> {
        let summary = if self.state.streaming {
            // Without `alt=sse` the stream is one JSON array of chunks.
            if response.bytes.trim_ascii_start().starts_with(b"[") {
                aggregate_json_array(&response.bytes, GenerateContentAggregator::default())?
            } else {
                aggregate(&response.bytes, GenerateContentAggregator::default())?
            }
        } else {
            summarize(decode_response(&response.bytes, "generateContent")?)
        };
        self.state.finish(span, summary, response)
    }
}

fn summarize(mut response: GenerateContentResponse) -> ResponseSummary {
    let mut summary = ResponseSummary::default();
    response.merge_header(&mut summary);

    let mut candidates: Vec<(usize, Candidate)> = response
        .candidates
        .into_iter()
        .enumerate()
        .map(|(position, candidate)| (candidate.index.unwrap_or(position), candidate))
        .collect();
    candidates.sort_by_key(|(index, _)| *index);

    let mut output = Vec::with_capacity(candidates.len());
    let mut reasons = Vec::with_capacity(candidates.len());
    for (_, candidate) in candidates {
        reasons.push(candidate.finish_reason);
        output.push(candidate_message(candidate.content));
    }
    record_finish_reasons(&mut summary, reasons);
    summary.output = Some(Value::Array(output));
    summary
}

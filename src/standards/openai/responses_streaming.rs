//! Responses API stream aggregation
//!
//! Rebuilds the `output` item array from `response.*` events. A terminal
//! `response.completed`/`incomplete`/`failed` event carries the full response
//! and takes precedence over the items rebuilt from deltas.

use super::responses::ResponseObject;
use crate::standards::ResponseSummary;
use crate::streaming::StreamAggregator;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct ResponsesStreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    response: Option<ResponseObject>,
    #[serde(default)]
    output_index: Option<usize>,
    #[serde(default)]
    content_index: Option<usize>,
    #[serde(default)]
    item: Option<Value>,
    #[serde(default)]
    part: Option<Value>,
    #[serde(default)]
    delta: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Accumulator for Responses API stream events.
#[derive(Debug, Default)]
pub struct ResponsesAggregator {
    items: BTreeMap<usize, Map<String, Value>>,
    final_output: Option<Vec<Value>>,
    summary: ResponseSummary,
}

fn empty_message() -> Map<String, Value> {
    let mut item = Map::new();
    item.insert("type".to_string(), Value::String("message".to_string()));
    item.insert("role".to_string(), Value::String("assistant".to_string()));
    item.insert("content".to_string(), Value::Array(Vec::new()));
    item
}

impl ResponsesAggregator {
    fn content_mut(&mut self, output_index: usize) -> Option<&mut Vec<Value>> {
        let content = self
            .items
            .entry(output_index)
            .or_insert_with(empty_message)
            .entry("content")
            .or_insert_with(|| Value::Array(Vec::new()));
        if !content.is_array() {
            *content = Value::Array(Vec::new());
        }
        content.as_array_mut()
    }

    fn append_text(&mut self, output_index: usize, content_index: usize, delta: &str) {
        let Some(parts) = self.content_mut(output_index) else { return };
        while parts.len() <= content_index {
            parts.push(json!({"type": "output_text", "text": ""}));
        }
        let part = &mut parts[content_index];
        if !part.is_object() {
            *part = json!({"type": "output_text", "text": ""});
        }
        let text = part
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        part["text"] = Value::String(text + delta);
    }

    fn set_part(&mut self, output_index: usize, content_index: usize, part: Value) {
        let Some(parts) = self.content_mut(output_index) else { return };
        while parts.len() <= content_index {
            parts.push(Value::Null);
        }
        parts[content_index] = part;
    }

    fn append_arguments(&mut self, output_index: usize, delta: &str) {
        let item = self.items.entry(output_index).or_default();
        let arguments = item
            .get("arguments")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        item.insert("arguments".to_string(), Value::String(arguments + delta));
    }
}

impl StreamAggregator for ResponsesAggregator {
    type Event = ResponsesStreamEvent;
    const LABEL: &'static str = "openai responses";

    fn apply(&mut self, event: ResponsesStreamEvent) {
        let output_index = event.output_index.unwrap_or(0);
        let delta = event.delta.as_ref().and_then(Value::as_str);

        match event.kind.as_str() {
            "response.created" | "response.in_progress" => {
                if let Some(response) = event.response {
                    response.merge_into(&mut self.summary);
                }
            }
            "response.completed" | "response.incomplete" | "response.failed" => {
                if let Some(response) = event.response {
                    if let Some(output) = response.merge_into(&mut self.summary) {
                        self.final_output = Some(output);
                    }
                }
            }
            "response.output_item.added" | "response.output_item.done" => {
                if let Some(Value::Object(item)) = event.item {
                    self.items.insert(output_index, item);
                }
            }
            "response.content_part.added" | "response.content_part.done" => {
                if let Some(part) = event.part {
                    self.set_part(output_index, event.content_index.unwrap_or(0), part);
                }
            }
            "response.output_text.delta" => {
                if let Some(delta) = delta {
                    self.append_text(output_index, event.content_index.unwrap_or(0), delta);
                }
            }
            "response.function_call_arguments.delta" => {
                if let Some(delta) = delta {
                    self.append_arguments(output_index, delta);
                }
            }
            "error" => {
                self.summary
                    .metadata
                    .insert("error".to_string(), Value::Object(event.extra));
            }
            _ => {}
        }
    }

    fn finish(self) -> ResponseSummary {
        let output = self
            .final_output
            .unwrap_or_else(|| self.items.into_values().map(Value::Object).collect());
        ResponseSummary {
            output: Some(Value::Array(output)),
            ..self.summary
        }
    }
}

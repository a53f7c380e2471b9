//! Messages API stream aggregation

use super::messages::{MessageObject, RESPONSE_METADATA_FIELDS, assistant_message};
use crate::standards::{ResponseSummary, copy_allowed};
use crate::streaming::StreamAggregator;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct MessagesStreamEvent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: Option<MessageObject>,
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    content_block: Option<Map<String, Value>>,
    #[serde(default)]
    delta: Option<Map<String, Value>>,
    #[serde(default)]
    usage: Option<Map<String, Value>>,
    #[serde(default)]
    error: Option<Value>,
}

/// One content block under construction.
#[derive(Debug, Default)]
struct BlockBuilder {
    block: Map<String, Value>,
    partial_json: String,
}

impl BlockBuilder {
    fn append(&mut self, field: &str, fragment: &str) {
        let current = self
            .block
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default();
        let joined = format!("{current}{fragment}");
        self.block.insert(field.to_string(), Value::String(joined));
    }

    fn into_value(mut self) -> Value {
        if !self.partial_json.is_empty() {
            let input = serde_json::from_str(&self.partial_json)
                .unwrap_or(Value::String(self.partial_json));
            self.block.insert("input".to_string(), input);
        } else if is_tool_block(&self.block) && !self.block.contains_key("input") {
            self.block.insert("input".to_string(), Value::Object(Map::new()));
        }
        Value::Object(self.block)
    }
}

fn is_tool_block(block: &Map<String, Value>) -> bool {
    matches!(
        block.get("type").and_then(Value::as_str),
        Some("tool_use" | "server_tool_use")
    )
}

fn delta_str<'a>(delta: &'a Map<String, Value>, field: &str) -> Option<&'a str> {
    delta.get(field).and_then(Value::as_str)
}

/// Accumulator for Messages API stream events.
#[derive(Debug, Default)]
pub struct MessagesAggregator {
    role: Option<String>,
    blocks: BTreeMap<usize, BlockBuilder>,
    summary: ResponseSummary,
}

impl MessagesAggregator {
    fn apply_delta(&mut self, index: usize, delta: Map<String, Value>) {
        let kind = delta_str(&delta, "type").unwrap_or_default();
        let builder = self.blocks.entry(index).or_default();
        if builder.block.is_empty() {
            let placeholder = if kind == "input_json_delta" { "tool_use" } else { "text" };
            builder
                .block
                .insert("type".to_string(), Value::String(placeholder.to_string()));
        }

        match kind {
            "text_delta" => {
                if let Some(text) = delta_str(&delta, "text") {
                    builder.append("text", text);
                }
            }
            "input_json_delta" => {
                if let Some(json) = delta_str(&delta, "partial_json") {
                    builder.partial_json.push_str(json);
                }
            }
            "thinking_delta" => {
                if let Some(thinking) = delta_str(&delta, "thinking") {
                    builder.append("thinking", thinking);
                }
            }
            "signature_delta" => {
                if let Some(signature) = delta_str(&delta, "signature") {
                    builder.append("signature", signature);
                }
            }
            "citations_delta" => {
                if let Some(citation) = delta.get("citation") {
                    let citations = builder
                        .block
                        .entry("citations")
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(list) = citations {
                        list.push(citation.clone());
                    }
                }
            }
            _ => {}
        }
    }
}

impl StreamAggregator for MessagesAggregator {
    type Event = MessagesStreamEvent;
    const LABEL: &'static str = "anthropic messages";

    fn apply(&mut self, event: MessagesStreamEvent) {
        match event.kind.as_str() {
            "message_start" => {
                if let Some(message) = event.message {
                    if message.role.is_some() {
                        self.role = message.role;
                    }
                    copy_allowed(&mut self.summary.metadata, &message.fields, RESPONSE_METADATA_FIELDS);
                    if let Some(usage) = message.usage {
                        self.summary.merge_usage(usage);
                    }
                }
            }
            "content_block_start" => {
                if let Some(block) = event.content_block {
                    // A new block, tool calls included, replaces whatever held the slot.
                    self.blocks.insert(
                        event.index.unwrap_or(0),
                        BlockBuilder {
                            block,
                            partial_json: String::new(),
                        },
                    );
                }
            }
            "content_block_delta" => {
                if let Some(delta) = event.delta {
                    self.apply_delta(event.index.unwrap_or(0), delta);
                }
            }
            "message_delta" => {
                if let Some(delta) = event.delta {
                    copy_allowed(&mut self.summary.metadata, &delta, &["stop_reason", "stop_sequence"]);
                }
                if let Some(usage) = event.usage {
                    self.summary.merge_usage(usage);
                }
            }
            "error" => {
                if let Some(error) = event.error {
                    self.summary.metadata.insert("error".to_string(), error);
                }
            }
            _ => {}
        }
    }

    fn finish(self) -> ResponseSummary {
        let content = self.blocks.into_values().map(BlockBuilder::into_value).collect();
        ResponseSummary {
            output: Some(assistant_message(self.role, content)),
            ..self.summary
        }
    }
}

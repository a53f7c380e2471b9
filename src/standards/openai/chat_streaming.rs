//! Chat Completions stream aggregation
//!
//! Folds `chat.completion.chunk` events back into the `choices` array of a
//! non-streaming chat completion.

use super::chat::RESPONSE_METADATA_FIELDS;
use crate::standards::{ResponseSummary, copy_allowed};
use crate::streaming::StreamAggregator;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
pub struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Map<String, Value>>,
    #[serde(flatten)]
    fields: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallDelta {
    #[serde(default)]
    index: Option<usize>,
    #[serde(default)]
    id: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    function: Option<FunctionDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

#[derive(Debug)]
struct ToolCallBuilder {
    slot: Option<usize>,
    id: String,
    kind: String,
    name: String,
    arguments: String,
}

impl ToolCallBuilder {
    fn into_value(self) -> Value {
        json!({
            "id": self.id,
            "type": self.kind,
            "function": {"name": self.name, "arguments": self.arguments},
        })
    }
}

#[derive(Debug, Default)]
struct ChoiceBuilder {
    role: Option<String>,
    content: String,
    tool_calls: Vec<ToolCallBuilder>,
    finish_reason: Option<String>,
}

impl ChoiceBuilder {
    fn apply_tool_call(&mut self, delta: ToolCallDelta) {
        let function = delta.function.unwrap_or_default();
        match delta.id.filter(|id| !id.is_empty()) {
            Some(id) => self.tool_calls.push(ToolCallBuilder {
                slot: delta.index,
                id,
                kind: delta.kind.unwrap_or_else(|| "function".to_string()),
                name: function.name.unwrap_or_default(),
                arguments: function.arguments.unwrap_or_default(),
            }),
            None => {
                let open = match self.tool_calls.iter().rposition(|tc| tc.slot == delta.index) {
                    Some(pos) => self.tool_calls.get_mut(pos),
                    None => self.tool_calls.last_mut(),
                };
                // Continuation without any open call has nothing to attach to.
                let Some(open) = open else { return };
                if let Some(name) = function.name {
                    open.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    open.arguments.push_str(&arguments);
                }
            }
        }
    }

    fn into_value(self, index: usize) -> Value {
        let content = if self.content.is_empty() && !self.tool_calls.is_empty() {
            Value::Null
        } else {
            Value::String(self.content)
        };
        let mut message = Map::new();
        message.insert(
            "role".to_string(),
            Value::String(self.role.unwrap_or_else(|| "assistant".to_string())),
        );
        message.insert("content".to_string(), content);
        if !self.tool_calls.is_empty() {
            let tool_calls = self.tool_calls.into_iter().map(ToolCallBuilder::into_value).collect();
            message.insert("tool_calls".to_string(), Value::Array(tool_calls));
        }
        json!({
            "index": index,
            "message": message,
            "finish_reason": self.finish_reason,
        })
    }
}

/// Accumulator for chat completion chunks.
#[derive(Debug, Default)]
pub struct ChatCompletionsAggregator {
    choices: BTreeMap<usize, ChoiceBuilder>,
    summary: ResponseSummary,
}

impl StreamAggregator for ChatCompletionsAggregator {
    type Event = ChatCompletionChunk;
    const LABEL: &'static str = "openai chat completions";

    fn apply(&mut self, chunk: ChatCompletionChunk) {
        copy_allowed(&mut self.summary.metadata, &chunk.fields, RESPONSE_METADATA_FIELDS);
        if let Some(usage) = chunk.usage {
            self.summary.merge_usage(usage);
        }

        for choice in chunk.choices {
            let builder = self.choices.entry(choice.index).or_default();
            if let Some(delta) = choice.delta {
                if let Some(role) = delta.role {
                    builder.role = Some(role);
                }
                if let Some(content) = delta.content {
                    builder.content.push_str(&content);
                }
                for tool_call in delta.tool_calls.unwrap_or_default() {
                    builder.apply_tool_call(tool_call);
                }
            }
            if let Some(reason) = choice.finish_reason {
                builder.finish_reason = Some(reason);
            }
        }
    }

    fn finish(self) -> ResponseSummary {
        let output = self
            .choices
            .into_iter()
            .map(|(index, choice)| choice.into_value(index))
            .collect();
        ResponseSummary {
            output: Some(Value::Array(output)),
            ..self.summary
        }
    }
}

//! streamGenerateContent aggregation
//!
//! Every event is a partial `GenerateContentResponse`. Text parts are joined
//! onto the candidate's previous text part when both share the same `thought`
//! flag; any other part is appended whole.

use super::generate_content::{
    Content, GenerateContentResponse, candidate_message, record_finish_reasons,
};
use crate::standards::ResponseSummary;
use crate::streaming::StreamAggregator;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Default)]
struct CandidateBuilder {
    role: Option<String>,
    parts: Vec<Value>,
    finish_reason: Option<String>,
}

fn text_of(part: &Value) -> Option<&str> {
    part.get("text").and_then(Value::as_str)
}

fn is_thought(part: &Value) -> bool {
    part.get("thought").and_then(Value::as_bool).unwrap_or(false)
}

impl CandidateBuilder {
    fn push_part(&mut self, part: Value) {
        if let (Some(text), Some(last)) = (text_of(&part), self.parts.last_mut()) {
            if is_thought(last) == is_thought(&part) {
                if let Some(previous) = text_of(last) {
                    let joined = format!("{previous}{text}");
                    last["text"] = Value::String(joined);
                    return;
                }
            }
        }
        self.parts.push(part);
    }
}

/// Accumulator for streamed `GenerateContentResponse` chunks.
#[derive(Debug, Default)]
pub struct GenerateContentAggregator {
    candidates: BTreeMap<usize, CandidateBuilder>,
    summary: ResponseSummary,
}

impl StreamAggregator for GenerateContentAggregator {
    type Event = GenerateContentResponse;
    const LABEL: &'static str = "gemini generateContent";

    fn apply(&mut self, mut chunk: GenerateContentResponse) {
        chunk.merge_header(&mut self.summary);

        for (position, candidate) in chunk.candidates.into_iter().enumerate() {
            let builder = self
                .candidates
                .entry(candidate.index.unwrap_or(position))
                .or_default();
            if let Some(content) = candidate.content {
                if content.role.is_some() {
                    builder.role = content.role;
                }
                for part in content.parts {
                    builder.push_part(part);
                }
            }
            if let Some(reason) = candidate.finish_reason {
                builder.finish_reason = Some(reason);
            }
        }
    }

    fn finish(mut self) -> ResponseSummary {
        let mut output = Vec::with_capacity(self.candidates.len());
        let mut reasons = Vec::with_capacity(self.candidates.len());
        for candidate in self.candidates.into_values() {
            reasons.push(candidate.finish_reason);
            output.push(candidate_message(Some(Content {
                role: candidate.role,
                parts: candidate.parts,
            })));
        }
        record_finish_reasons(&mut self.summary, reasons);
        self.summary.output = Some(Value::Array(output));
        self.summary
    }
}

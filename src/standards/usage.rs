//! Usage normalization
//!
//! Maps provider usage objects (OpenAI, Anthropic, Gemini) onto one flat set
//! of canonical token-count metric names.

use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Canonical name for a provider usage key.
fn canonical_name(key: &str) -> &str {
    match key {
        "input_tokens" | "promptTokenCount" => "prompt_tokens",
        "output_tokens" | "candidatesTokenCount" => "completion_tokens",
        "total_tokens" | "totalTokenCount" => "tokens",
        "cache_read_input_tokens" | "cachedContentTokenCount" => "prompt_cached_tokens",
        "cache_creation_input_tokens" => "prompt_cache_creation_tokens",
        "thoughtsTokenCount" => "completion_reasoning_tokens",
        "toolUsePromptTokenCount" => "prompt_tool_use_tokens",
        other => other,
    }
}

fn canonical_prefix(prefix: &str) -> &str {
    match prefix {
        "input" => "prompt",
        "output" => "completion",
        other => other,
    }
}

/// Non-negative integer count, or `None` for anything else.
fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0)
                .map(|f| f as u64)
        }),
        _ => None,
    }
}

/// Translate a usage object into canonical metrics.
///
/// Numeric fields are renamed; `<prefix>_tokens_details` objects are flattened
/// into `<prefix>_<field>`. Negative and non-numeric values are dropped and no
/// totals are derived. Already-canonical maps come back unchanged.
pub fn normalize_usage(usage: &Map<String, Value>) -> BTreeMap<String, u64> {
    let mut metrics = BTreeMap::new();
    for (key, value) in usage {
        if let Some(count) = as_count(value) {
            metrics.insert(canonical_name(key).to_string(), count);
            continue;
        }

        let (Some(prefix), Value::Object(details)) = (key.strip_suffix("_tokens_details"), value) else {
            continue;
        };
        let prefix = canonical_prefix(prefix);
        for (inner, value) in details {
            if let Some(count) = as_count(value) {
                metrics.insert(format!("{prefix}_{inner}"), count);
            }
        }
    }
    metrics
}

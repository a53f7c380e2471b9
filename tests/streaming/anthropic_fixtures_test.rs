//! Anthropic streaming fixtures tests

use braintrust_trace::telemetry::attributes;
use serde_json::json;

#[path = "../support/stream_fixture.rs"]
mod support;

const REQUEST: &str = r#"{"model":"claude-sonnet-4-5","max_tokens":1024,"stream":true,"system":[{"type":"text","text":"You are helpful."}],"messages":[{"role":"user","content":"Hello"}]}"#;

#[tokio::test]
async fn anthropic_message_start_deltas_stop_fixture() {
    let chunks = support::load_sse_fixture_as_bytes(
        "tests/fixtures/anthropic/message_start_deltas_stop.sse",
    )
    .expect("load fixture");
    let raw = support::concat_chunks(&chunks);

    let (seen, spans) = support::trace_chunks("/v1/messages", REQUEST, chunks).await;

    assert_eq!(seen, raw);
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.name, "anthropic.messages.create");
    assert_eq!(
        span.attribute_json(attributes::INPUT_JSON),
        Some(json!([
            {"role": "system", "content": [{"type": "text", "text": "You are helpful."}]},
            {"role": "user", "content": "Hello"}
        ]))
    );
    assert_eq!(
        span.attribute_json(attributes::OUTPUT_JSON),
        Some(json!([{"role": "assistant", "content": [{"type": "text", "text": "Hello world"}]}]))
    );

    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["prompt_tokens"], 10);
    assert_eq!(metrics["completion_tokens"], 2);
    assert_eq!(metrics["prompt_cached_tokens"], 0);
    assert_eq!(metrics["prompt_cache_creation_tokens"], 0);

    let metadata = span.attribute_json(attributes::METADATA).expect("metadata");
    assert_eq!(metadata["provider"], "anthropic");
    assert_eq!(metadata["model"], "claude-sonnet-4-5-20250929");
    assert_eq!(metadata["stop_reason"], "end_turn");
    assert_eq!(metadata["max_tokens"], 1024);
}

#[tokio::test]
async fn anthropic_thinking_and_tool_use_fixture() {
    let chunks = support::load_sse_fixture_as_bytes("tests/fixtures/anthropic/tool_use.sse")
        .expect("load fixture");

    let (_, spans) = support::trace_chunks("/v1/messages", REQUEST, chunks).await;

    let span = &spans[0];
    assert_eq!(
        span.attribute_json(attributes::OUTPUT_JSON),
        Some(json!([{"role": "assistant", "content": [
            {"type": "thinking", "thinking": "The user wants weather.", "signature": "EqQBCgIYAhIM"},
            {"type": "tool_use", "id": "toolu_01", "name": "get_weather", "input": {"location": "San Francisco"}}
        ]}]))
    );
    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["prompt_tokens"], 40);
    assert_eq!(metrics["completion_tokens"], 57);
    assert_eq!(
        span.attribute_json(attributes::METADATA).expect("metadata")["stop_reason"],
        "tool_use"
    );
}

#[tokio::test]
async fn anthropic_stream_cut_inside_event_keeps_partial_content() {
    let chunks = support::load_sse_fixture_as_bytes(
        "tests/fixtures/anthropic/message_start_deltas_stop.sse",
    )
    .expect("load fixture");
    let raw = support::concat_chunks(&chunks);
    // Ends halfway through the " world" text delta.
    let partial = support::cut_inside(&raw, r#""text":" world""#);

    let (seen, spans) =
        support::trace_chunks("/v1/messages", REQUEST, support::rechunk(partial, 50)).await;

    assert_eq!(seen, partial);
    let span = &spans[0];
    assert_eq!(
        span.attribute_json(attributes::OUTPUT_JSON),
        Some(json!([{"role": "assistant", "content": [{"type": "text", "text": "Hello"}]}]))
    );
    let metadata = span.attribute_json(attributes::METADATA).expect("metadata");
    assert_eq!(metadata["model"], "claude-sonnet-4-5-20250929");
    assert!(metadata.get("stop_reason").is_none_or(serde_json::Value::is_null));
    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["prompt_tokens"], 10);
}

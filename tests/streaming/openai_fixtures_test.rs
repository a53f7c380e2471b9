//! OpenAI streaming fixtures tests

use braintrust_trace::telemetry::attributes;
use serde_json::json;

#[path = "../support/stream_fixture.rs"]
mod support;

#[tokio::test]
async fn openai_chat_tool_call_fixture() {
    let chunks = support::load_sse_fixture_as_bytes("tests/fixtures/openai/chat_tool_call.sse")
        .expect("load fixture");
    let raw = support::concat_chunks(&chunks);

    let (seen, spans) = support::trace_chunks(
        "/v1/chat/completions",
        r#"{"model":"gpt-4o-mini","stream":true,"stream_options":{"include_usage":true},"messages":[{"role":"user","content":"Weather in SF?"}],"tools":[{"type":"function","function":{"name":"get_weather"}}]}"#,
        chunks,
    )
    .await;

    assert_eq!(seen, raw, "caller sees the body unchanged");
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.name, "openai.chat.completions.create");

    let output = span.attribute_json(attributes::OUTPUT_JSON).expect("output");
    let tool_calls = output[0]["message"]["tool_calls"].as_array().expect("tool calls");
    assert_eq!(tool_calls.len(), 1);
    assert_eq!(tool_calls[0]["id"], "call_1");
    assert_eq!(tool_calls[0]["function"]["name"], "get_weather");
    assert_eq!(tool_calls[0]["function"]["arguments"], "{\"location\":\"SF\"}");
    assert_eq!(output[0]["finish_reason"], "tool_calls");
    assert_eq!(output[0]["message"]["content"], serde_json::Value::Null);

    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["prompt_tokens"], 52);
    assert_eq!(metrics["completion_tokens"], 15);
    assert_eq!(metrics["tokens"], 67);
    assert_eq!(metrics["prompt_cached_tokens"], 0);
    assert_eq!(metrics["completion_reasoning_tokens"], 0);
    assert!(metrics["time_to_first_token"].as_f64().expect("ttft") >= 0.0);

    let metadata = span.attribute_json(attributes::METADATA).expect("metadata");
    assert_eq!(metadata["model"], "gpt-4o-mini-2024-07-18");
    assert_eq!(metadata["system_fingerprint"], "fp_0ba0d124f1");
    assert_eq!(metadata["stream"], true);
    assert_eq!(metadata["stream_options"], json!({"include_usage": true}));
}

#[tokio::test]
async fn openai_chat_text_fixture() {
    let chunks =
        support::load_sse_fixture_as_bytes("tests/fixtures/openai/chat_text_with_usage.sse")
            .expect("load fixture");

    let (_, spans) = support::trace_chunks(
        "/v1/chat/completions",
        r#"{"model":"gpt-4o-mini","stream":true,"messages":[{"role":"user","content":"hi"}]}"#,
        chunks,
    )
    .await;

    let span = &spans[0];
    assert_eq!(
        span.attribute_json(attributes::INPUT_JSON),
        Some(json!([{"role": "user", "content": "hi"}]))
    );
    assert_eq!(
        span.attribute_json(attributes::OUTPUT_JSON),
        Some(json!([{
            "index": 0,
            "message": {"role": "assistant", "content": "Hello world"},
            "finish_reason": "stop"
        }]))
    );
    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["prompt_tokens"], 3);
    assert_eq!(metrics["completion_tokens"], 2);
    assert_eq!(metrics["tokens"], 5);
}

#[tokio::test]
async fn openai_responses_fixture() {
    let chunks = support::load_sse_fixture_as_bytes("tests/fixtures/openai/responses_text.sse")
        .expect("load fixture");

    let (_, spans) = support::trace_chunks(
        "/v1/responses",
        r#"{"model":"gpt-4.1","stream":true,"input":"Say hello"}"#,
        chunks,
    )
    .await;

    let span = &spans[0];
    assert_eq!(span.name, "openai.responses.create");
    assert_eq!(
        span.attribute_json(attributes::INPUT_JSON),
        Some(json!([{"role": "user", "content": "Say hello"}]))
    );
    let output = span.attribute_json(attributes::OUTPUT_JSON).expect("output");
    assert_eq!(output[0]["content"][0]["text"], "Hello world");

    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["prompt_tokens"], 9);
    assert_eq!(metrics["completion_tokens"], 2);
    assert_eq!(metrics["tokens"], 11);

    let metadata = span.attribute_json(attributes::METADATA).expect("metadata");
    assert_eq!(metadata["status"], "completed");
    assert_eq!(metadata["id"], "resp_1");
}

#[tokio::test]
async fn openai_truncated_stream_keeps_partial_content() {
    let mut chunks =
        support::load_sse_fixture_as_bytes("tests/fixtures/openai/chat_text_with_usage.sse")
            .expect("load fixture");
    // comment, role chunk, "Hello"
    chunks.truncate(3);

    let (_, spans) = support::trace_chunks(
        "/v1/chat/completions",
        r#"{"model":"gpt-4o-mini","stream":true,"messages":[{"role":"user","content":"hi"}]}"#,
        chunks,
    )
    .await;

    let span = &spans[0];
    let output = span.attribute_json(attributes::OUTPUT_JSON).expect("output");
    assert_eq!(output[0]["message"]["content"], "Hello");
    assert_eq!(output[0]["finish_reason"], serde_json::Value::Null);
    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert!(metrics.get("tokens").is_none());
}

#[tokio::test]
async fn openai_stream_cut_inside_event_keeps_partial_content() {
    let chunks =
        support::load_sse_fixture_as_bytes("tests/fixtures/openai/chat_text_with_usage.sse")
            .expect("load fixture");
    let raw = support::concat_chunks(&chunks);
    // Ends halfway through the " world" delta.
    let partial = support::cut_inside(&raw, r#"{"content":" world"}"#);

    let (seen, spans) = support::trace_chunks(
        "/v1/chat/completions",
        r#"{"model":"gpt-4o-mini","stream":true,"messages":[{"role":"user","content":"hi"}]}"#,
        support::rechunk(partial, 64),
    )
    .await;

    assert_eq!(seen, partial);
    let span = &spans[0];
    let output = span.attribute_json(attributes::OUTPUT_JSON).expect("output");
    assert_eq!(output[0]["message"]["content"], "Hello");
    assert_eq!(output[0]["finish_reason"], serde_json::Value::Null);
}

#[tokio::test]
async fn openai_malformed_event_emits_span_without_output() {
    let chunks = vec![
        Ok(bytes::Bytes::from_static(
            b"data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\"Hi\"}}]}\n\n",
        )),
        Ok(bytes::Bytes::from_static(b"data: {oops\n\n")),
    ];

    let (seen, spans) = support::trace_chunks(
        "/v1/chat/completions",
        r#"{"model":"gpt-4o-mini","stream":true,"messages":[]}"#,
        chunks,
    )
    .await;

    assert!(seen.ends_with(b"data: {oops\n\n"));
    assert_eq!(spans.len(), 1);
    assert!(spans[0].attribute(attributes::OUTPUT_JSON).is_none());
    assert!(spans[0].attribute(attributes::INPUT_JSON).is_some());
}

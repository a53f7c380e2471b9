//! Gemini streaming fixtures tests

use braintrust_trace::telemetry::attributes;
use serde_json::json;

#[path = "../support/stream_fixture.rs"]
mod support;

const REQUEST: &str = r#"{"contents":[{"role":"user","parts":[{"text":"Hello"}]}],"generationConfig":{"temperature":0.2}}"#;

#[tokio::test]
async fn gemini_stream_text_fixture() {
    let chunks = support::load_sse_fixture_as_bytes("tests/fixtures/gemini/stream_text.sse")
        .expect("load fixture");
    let raw = support::concat_chunks(&chunks);

    let (seen, spans) = support::trace_chunks(
        "/v1beta/models/gemini-2.0-flash:streamGenerateContent?alt=sse",
        REQUEST,
        chunks,
    )
    .await;

    assert_eq!(seen, raw);
    assert_eq!(spans.len(), 1);
    let span = &spans[0];
    assert_eq!(span.name, "genai.models.generateContent");
    assert_eq!(
        span.attribute_json(attributes::INPUT_JSON),
        Some(json!([{"role": "user", "content": "Hello"}]))
    );
    assert_eq!(
        span.attribute_json(attributes::OUTPUT_JSON),
        Some(json!([{"role": "assistant", "content": "Hello world!"}]))
    );

    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["prompt_tokens"], 5);
    assert_eq!(metrics["completion_tokens"], 3);
    assert_eq!(metrics["tokens"], 8);

    let metadata = span.attribute_json(attributes::METADATA).expect("metadata");
    assert_eq!(metadata["model"], "gemini-2.0-flash");
    assert_eq!(metadata["temperature"], 0.2);
    assert_eq!(metadata["finish_reason"], "STOP");
    assert_eq!(metadata["stream"], true);
    assert_eq!(metadata["endpoint"], "/v1beta/models/gemini-2.0-flash:streamGenerateContent");
}

#[tokio::test]
async fn gemini_thought_and_function_call_fixture() {
    let chunks =
        support::load_sse_fixture_as_bytes("tests/fixtures/gemini/stream_function_call.sse")
            .expect("load fixture");

    let (_, spans) = support::trace_chunks(
        "/v1beta/models/gemini-2.5-flash:streamGenerateContent?alt=sse",
        REQUEST,
        chunks,
    )
    .await;

    let span = &spans[0];
    assert_eq!(
        span.attribute_json(attributes::OUTPUT_JSON),
        Some(json!([{"role": "assistant", "content": [
            {"text": "Let me look that up.", "thought": true},
            {"functionCall": {"name": "get_weather", "args": {"location": "San Francisco"}}}
        ]}]))
    );
    let metrics = span.attribute_json(attributes::METRICS).expect("metrics");
    assert_eq!(metrics["completion_reasoning_tokens"], 12);
    assert_eq!(metrics["tokens"], 50);
}

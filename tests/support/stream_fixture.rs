//! Test fixture utilities: load SSE fixtures and drive them through a dispatcher
#![allow(dead_code)]

use braintrust_trace::prelude::*;
use braintrust_trace::telemetry::{NoopLogger, RecordedSpan};
use bytes::Bytes;
use futures_util::StreamExt;
use std::io;
use std::sync::Arc;

/// Load an `.sse` fixture file and split it into SSE event chunks (separated by blank lines)
pub fn load_sse_fixture_as_bytes(path: &str) -> io::Result<Vec<Result<Bytes, io::Error>>> {
    let raw = std::fs::read_to_string(path)?;
    // Normalize line endings
    let normalized = raw.replace("\r\n", "\n");
    let mut out = Vec::new();
    for chunk in normalized.split("\n\n") {
        let s = chunk.trim_end_matches('\n');
        if s.is_empty() {
            continue;
        }
        // Restore SSE event blank line terminator
        let mut owned = String::from(s);
        owned.push_str("\n\n");
        out.push(Ok(Bytes::from(owned)));
    }
    Ok(out)
}

/// Dispatcher recording into `spans`, with diagnostics silenced.
pub fn recording_dispatcher(spans: &InMemorySpanFactory) -> TraceDispatcher {
    TraceDispatcher::builder()
        .span_factory(Arc::new(spans.clone()))
        .logger(Arc::new(NoopLogger))
        .build()
}

/// Run one exchange through a recording dispatcher, serving `chunks` as the
/// response body, and read the body to the end.
///
/// Returns the bytes the caller saw and the finished spans.
pub async fn trace_chunks(
    path: &str,
    request_body: &str,
    chunks: Vec<Result<Bytes, io::Error>>,
) -> (Vec<u8>, Vec<RecordedSpan>) {
    let spans = InMemorySpanFactory::new();
    let dispatcher = recording_dispatcher(&spans);
    let request = http::Request::builder()
        .method("POST")
        .uri(path)
        .body(Bytes::from(request_body.to_string()))
        .expect("request");

    let response = dispatcher
        .handle(request, |_request| async move {
            Ok::<_, io::Error>(http::Response::new(futures_util::stream::iter(chunks)))
        })
        .await
        .expect("response");

    let mut body = response.into_body();
    let mut seen = Vec::new();
    while let Some(chunk) = body.next().await {
        seen.extend_from_slice(&chunk.expect("chunk"));
    }
    drop(body);

    (seen, spans.finished_spans())
}

/// Concatenate fixture chunks into the raw body they represent.
pub fn concat_chunks(chunks: &[Result<Bytes, io::Error>]) -> Vec<u8> {
    chunks
        .iter()
        .filter_map(|c| c.as_ref().ok())
        .flat_map(|c| c.iter().copied())
        .collect()
}

/// Split a raw body into fixed-size chunks regardless of event boundaries.
pub fn rechunk(raw: &[u8], size: usize) -> Vec<Result<Bytes, io::Error>> {
    raw.chunks(size)
        .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
        .collect()
}

/// Prefix of `raw` ending in the middle of the first occurrence of `marker`.
pub fn cut_inside<'a>(raw: &'a [u8], marker: &str) -> &'a [u8] {
    let at = raw
        .windows(marker.len())
        .position(|w| w == marker.as_bytes())
        .expect("marker in fixture");
    &raw[..at + marker.len() / 2]
}

//! OpenAI Endpoint Tracers
//!
//! Traces `POST /v1/chat/completions` and `POST /v1/responses`, streaming and
//! non-streaming. Also matches OpenAI-compatible servers that mount the same
//! paths under a different prefix.

use super::{EndpointTracer, NoopTracer};

pub mod chat;
pub mod chat_streaming;
pub mod responses;
pub mod responses_streaming;

pub use chat::ChatCompletionsTracer;
pub use responses::ResponsesTracer;

/// Provider name recorded in span metadata.
pub const PROVIDER: &str = "openai";

/// OpenAI endpoints recognized but not traced.
const UNTRACED_SUFFIXES: &[&str] = &["/embeddings", "/moderations", "/models"];
const UNTRACED_SEGMENTS: &[&str] = &["/files", "/images/", "/audio/"];

/// Map an OpenAI request path to its tracer.
pub fn router(path: &str) -> Option<Box<dyn EndpointTracer>> {
    let path = path.trim_end_matches('/');
    if path.ends_with("/chat/completions") {
        return Some(Box::new(ChatCompletionsTracer::new()));
    }
    if path.ends_with("/responses") {
        return Some(Box::new(ResponsesTracer::new()));
    }
    if UNTRACED_SUFFIXES.iter().any(|s| path.ends_with(s))
        || UNTRACED_SEGMENTS.iter().any(|s| path.contains(s))
    {
        return Some(Box::new(NoopTracer));
    }
    None
}

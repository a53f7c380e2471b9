//! Anthropic Endpoint Tracers
//!
//! Traces `POST /v1/messages`, streaming and non-streaming.

use super::{EndpointTracer, NoopTracer};

pub mod messages;
pub mod streaming;

pub use messages::MessagesTracer;

/// Provider name recorded in span metadata.
pub const PROVIDER: &str = "anthropic";

/// Map an Anthropic request path to its tracer.
pub fn router(path: &str) -> Option<Box<dyn EndpointTracer>> {
    let path = path.trim_end_matches('/');
    if path.ends_with("/v1/messages") {
        return Some(Box::new(MessagesTracer::new()));
    }
    if path.ends_with("/v1/messages/count_tokens")
        || path.contains("/v1/messages/batches")
        || path.ends_with("/v1/models")
    {
        return Some(Box::new(NoopTracer));
    }
    None
}

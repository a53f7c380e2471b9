//! Stream aggregation driver
//!
//! Drives an endpoint's accumulator over the events of a buffered SSE body:
//! scanning until the first payload, accumulating until `[DONE]` or end of
//! body, then flattening into the same [`ResponseSummary`] the non-streaming
//! path produces.

use super::sse::SseDataEvents;
use crate::error::{TraceError, TraceResult};
use crate::standards::ResponseSummary;
use serde::de::DeserializeOwned;

/// Per-endpoint accumulator for streamed events.
pub trait StreamAggregator {
    /// Typed shape of one streamed event
    type Event: DeserializeOwned;

    /// Short name used in error messages
    const LABEL: &'static str;

    fn apply(&mut self, event: Self::Event);

    /// Flatten the accumulated state into the canonical response shape.
    fn finish(self) -> ResponseSummary;
}

/// Run `aggregator` over every event in `body`.
///
/// A malformed event aborts the whole aggregation; nothing accumulated so far
/// is returned. A final event cut off by the end of the body is dropped and
/// the events before it are kept.
pub fn aggregate<A: StreamAggregator>(body: &[u8], mut aggregator: A) -> TraceResult<ResponseSummary> {
    for item in SseDataEvents::new(body, A::LABEL) {
        let item = item?;
        match serde_json::from_str::<A::Event>(&item.data) {
            Ok(event) => aggregator.apply(event),
            Err(_) if !item.terminated => break,
            Err(e) => {
                return Err(TraceError::ParseError(format!(
                    "Failed to parse SSE JSON ({}): {e}",
                    A::LABEL
                )));
            }
        }
    }
    Ok(aggregator.finish())
}

/// Run `aggregator` over a body holding a JSON array of events.
pub fn aggregate_json_array<A: StreamAggregator>(body: &[u8], mut aggregator: A) -> TraceResult<ResponseSummary> {
    let events: Vec<A::Event> = serde_json::from_slice(body).map_err(|e| {
        TraceError::ParseError(format!("Failed to parse JSON event array ({}): {e}", A::LABEL))
    })?;
    for event in events {
        aggregator.apply(event);
    }
    Ok(aggregator.finish())
}

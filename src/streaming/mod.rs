//! Streaming Response Aggregation
//!
//! Buffered SSE bodies are scanned into JSON events and folded back into a
//! single response by a per-endpoint [`StreamAggregator`].

pub mod aggregator;
pub mod sse;

pub use aggregator::{StreamAggregator, aggregate, aggregate_json_array};
pub use sse::{DONE_MARKER, SseData, SseDataEvents};

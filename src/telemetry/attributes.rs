//! Span attribute keys written by the endpoint tracers.

/// Canonical input, JSON-encoded
pub const INPUT_JSON: &str = "braintrust.input_json";
/// Canonical input under the plain key
pub const INPUT: &str = "braintrust.input";
/// Canonical output, JSON-encoded
pub const OUTPUT_JSON: &str = "braintrust.output_json";
/// Canonical output under the plain key
pub const OUTPUT: &str = "braintrust.output";
/// Provider, endpoint and passthrough request/response fields
pub const METADATA: &str = "braintrust.metadata";
/// Flat map of canonical token-count metrics
pub const METRICS: &str = "braintrust.metrics";
/// Small tag map, e.g. `{"type":"llm"}`
pub const SPAN_ATTRIBUTES: &str = "braintrust.span_attributes";
/// Configured tags
pub const TAGS: &str = "braintrust.tags";

/// Span type recorded in `braintrust.span_attributes`.
pub const SPAN_TYPE_LLM: &str = "llm";

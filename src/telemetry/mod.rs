//! Telemetry and Observability
//!
//! The span capability the tracers write into, its OpenTelemetry and
//! in-memory implementations, attribute keys, configuration and the
//! diagnostic logger.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use braintrust_trace::telemetry::{OtelSpanFactory, TraceConfig};
//!
//! let spans = OtelSpanFactory::global();
//! let config = TraceConfig::builder()
//!     .record_inputs(true)
//!     .tag("production")
//!     .build();
//! ```

pub mod attributes;
pub mod config;
pub mod logger;
pub mod memory;
pub mod otel;
pub mod span;

pub use config::{IoKeys, TraceConfig, TraceConfigBuilder};
pub use logger::{DiagnosticLogger, NoopLogger, TracingLogger};
pub use memory::{InMemorySpanFactory, RecordedSpan};
pub use otel::OtelSpanFactory;
pub use span::{AttributeValue, NonRecordingSpan, SpanFactory, SpanHandle, SpanStatus};

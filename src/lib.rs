//! # braintrust-trace - LLM call tracing for Rust HTTP clients
//!
//! Turns raw HTTP exchanges with OpenAI, Anthropic and Gemini into normalized
//! LLM spans: canonical input and output messages, request/response metadata
//! and token metrics, written as `braintrust.*` attributes on OpenTelemetry
//! spans.
//!
//! ## Features
//!
//! - **Transparent**: the caller reads the response exactly as before; bytes are
//!   observed as they are pulled, never pre-drained.
//! - **Streaming aware**: SSE responses are folded back into the same output
//!   shape a non-streaming call would have produced.
//! - **Never in the way**: decoding failures are logged and the request goes
//!   through untouched.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use braintrust_trace::prelude::*;
//! use std::sync::Arc;
//!
//! let dispatcher = TraceDispatcher::builder()
//!     .span_factory(Arc::new(OtelSpanFactory::global()))
//!     .config(TraceConfig::builder().tag("production").build())
//!     .build();
//!
//! let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
//!     .with(TracingMiddleware::new(dispatcher))
//!     .build();
//! ```

#![deny(unsafe_code)]

pub mod error;
pub mod execution;
pub mod standards;
pub mod streaming;
pub mod telemetry;

pub use error::{TraceError, TraceResult};
pub use execution::http::{TraceDispatcher, TracingMiddleware};

/// Commonly used types
pub mod prelude {
    pub use crate::error::{TraceError, TraceResult};
    pub use crate::execution::http::{
        CapturedBody, InFlightSpan, Router, TeeBody, TeeReader, TraceDispatcher,
        TraceDispatcherBuilder, TracingMiddleware,
    };
    pub use crate::standards::{EndpointTracer, NoopTracer, StartContext};
    pub use crate::telemetry::{
        DiagnosticLogger, InMemorySpanFactory, IoKeys, OtelSpanFactory, SpanFactory, SpanHandle,
        TraceConfig, TracingLogger,
    };
}

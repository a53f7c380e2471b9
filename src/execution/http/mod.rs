//! HTTP Instrumentation
//!
//! The dispatcher, its path routers, the response body tee and the `reqwest`
//! middleware adapter.

pub mod dispatcher;
pub mod middleware;
pub mod router;
pub mod tee;

pub use dispatcher::{InFlightSpan, TraceDispatcher, TraceDispatcherBuilder};
pub use middleware::TracingMiddleware;
pub use router::{Router, default_routers, route};
pub use tee::{CapturedBody, CompletionCallback, TeeBody, TeeReader};

//! reqwest middleware
//!
//! Plugs a [`TraceDispatcher`] into a `reqwest_middleware::ClientWithMiddleware`.
//!
//! ```rust,no_run
//! use braintrust_trace::execution::http::{TraceDispatcher, TracingMiddleware};
//! use braintrust_trace::telemetry::OtelSpanFactory;
//! use std::sync::Arc;
//!
//! let dispatcher = TraceDispatcher::new(Arc::new(OtelSpanFactory::global()));
//! let client = reqwest_middleware::ClientBuilder::new(reqwest::Client::new())
//!     .with(TracingMiddleware::new(dispatcher))
//!     .build();
//! ```

use super::dispatcher::{InFlightSpan, TraceDispatcher};
use http::Extensions;
use http_body_util::BodyDataStream;
use reqwest::{Request, Response, ResponseBuilderExt};
use reqwest_middleware::{Middleware, Next};
use std::sync::Arc;

/// Traces LLM API calls made through a `reqwest` client.
#[derive(Debug, Clone)]
pub struct TracingMiddleware {
    dispatcher: Arc<TraceDispatcher>,
}

impl TracingMiddleware {
    pub fn new(dispatcher: TraceDispatcher) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
        }
    }

    pub fn from_shared(dispatcher: Arc<TraceDispatcher>) -> Self {
        Self { dispatcher }
    }

    fn begin(&self, request: &Request) -> Option<InFlightSpan> {
        let path = request.url().path();
        match request.body().and_then(|body| body.as_bytes()) {
            Some(body) => self.dispatcher.begin(path, body),
            None => {
                tracing::debug!(
                    target: crate::telemetry::logger::LOG_TARGET,
                    url = %request.url(),
                    "request body is not buffered; not traced"
                );
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl Middleware for TracingMiddleware {
    async fn handle(
        &self,
        req: Request,
        extensions: &mut Extensions,
        next: Next<'_>,
    ) -> reqwest_middleware::Result<Response> {
        let Some(in_flight) = self.begin(&req) else {
            return next.run(req, extensions).await;
        };

        match next.run(req, extensions).await {
            Ok(response) => Ok(observe_response(response, in_flight)),
            Err(err) => {
                in_flight.fail(&err);
                Err(err)
            }
        }
    }
}

/// Rebuild `response` around a teed body.
///
/// Status, version, headers, extensions and URL are carried over unchanged.
fn observe_response(response: Response, in_flight: InFlightSpan) -> Response {
    let url = response.url().clone();
    let (mut parts, body) = http::Response::<reqwest::Body>::from(response).into_parts();
    // The URL travels in a private extension that the conversion above drops.
    if let Ok(carrier) = http::Response::builder().url(url).body(()) {
        parts.extensions.extend(carrier.into_parts().0.extensions);
    }
    let stream = Box::pin(BodyDataStream::new(body));
    let body = reqwest::Body::wrap_stream(in_flight.observe(stream));
    Response::from(http::Response::from_parts(parts, body))
}

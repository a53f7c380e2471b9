//! Trace dispatcher
//!
//! Routes each outgoing request to an endpoint tracer, opens the span before
//! the request is forwarded and tees the response body so the tracer can tag
//! the span once the caller is done reading. Instrumentation failures are
//! logged and never change what the caller sees.

use super::router::{Router, default_routers, route};
use super::tee::{CapturedBody, TeeBody, TeeReader};
use crate::standards::{EndpointTracer, StartContext};
use crate::telemetry::{DiagnosticLogger, SpanFactory, SpanHandle, SpanStatus, TraceConfig, TracingLogger};
use bytes::Bytes;
use std::future::Future;
use std::io::Read;
use std::sync::Arc;
use std::time::SystemTime;

/// Entry point of the HTTP instrumentation.
pub struct TraceDispatcher {
    spans: Arc<dyn SpanFactory>,
    routers: Vec<Router>,
    config: Arc<TraceConfig>,
    logger: Arc<dyn DiagnosticLogger>,
}

impl std::fmt::Debug for TraceDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TraceDispatcher")
            .field("routers", &self.routers.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TraceDispatcher {
    /// Dispatcher over every compiled-in provider with the default config.
    pub fn new(spans: Arc<dyn SpanFactory>) -> Self {
        Self::builder().span_factory(spans).build()
    }

    pub fn builder() -> TraceDispatcherBuilder {
        TraceDispatcherBuilder::default()
    }

    pub fn config(&self) -> &TraceConfig {
        &self.config
    }

    /// Tracer for `path`, or `None` when the path is untraced or tracing is off.
    pub fn tracer_for(&self, path: &str) -> Option<Box<dyn EndpointTracer>> {
        if !self.config.enabled {
            return None;
        }
        route(&self.routers, path)
    }

    /// Open a span for a request about to be forwarded.
    ///
    /// Returns `None` when the request should go out untraced: unknown or
    /// deliberately untraced path, tracing disabled, or a request body the
    /// tracer could not decode.
    pub fn begin(&self, path: &str, request_body: &[u8]) -> Option<InFlightSpan> {
        let mut tracer = self.tracer_for(path)?;
        let ctx = StartContext {
            spans: self.spans.as_ref(),
            config: &self.config,
            start_time: SystemTime::now(),
            path,
        };

        match tracer.start_span(&ctx, request_body) {
            Ok(span) if span.is_recording() => {
                self.logger.debug(&format!("tracing request to {path}"));
                Some(InFlightSpan {
                    tracer,
                    span,
                    logger: self.logger.clone(),
                    path: path.to_string(),
                })
            }
            Ok(_) => None,
            Err(e) => {
                self.logger
                    .warn(&format!("failed to start span for {path}: {e}"));
                None
            }
        }
    }

    /// Run one exchange through `next`, tracing it when the path is known.
    ///
    /// Untraced responses are wrapped in a passthrough body so both branches
    /// share one response type.
    pub async fn handle<S, E, F, Fut>(
        &self,
        request: http::Request<Bytes>,
        next: F,
    ) -> Result<http::Response<TeeBody<S>>, E>
    where
        F: FnOnce(http::Request<Bytes>) -> Fut,
        Fut: Future<Output = Result<http::Response<S>, E>>,
        E: std::error::Error + 'static,
    {
        let Some(in_flight) = self.begin(request.uri().path(), request.body()) else {
            return next(request)
                .await
                .map(|response| response.map(TeeBody::passthrough));
        };

        match next(request).await {
            Ok(response) => Ok(response.map(|body| in_flight.observe(body))),
            Err(err) => {
                in_flight.fail(&err);
                Err(err)
            }
        }
    }
}

/// Builder for [`TraceDispatcher`].
#[derive(Default)]
pub struct TraceDispatcherBuilder {
    spans: Option<Arc<dyn SpanFactory>>,
    routers: Option<Vec<Router>>,
    config: Option<Arc<TraceConfig>>,
    logger: Option<Arc<dyn DiagnosticLogger>>,
}

impl TraceDispatcherBuilder {
    /// Where spans are opened. Defaults to the global OpenTelemetry tracer.
    pub fn span_factory(mut self, spans: Arc<dyn SpanFactory>) -> Self {
        self.spans = Some(spans);
        self
    }

    /// Add a router. When none are added every compiled-in provider is routed.
    pub fn router(mut self, router: Router) -> Self {
        self.routers.get_or_insert_with(Vec::new).push(router);
        self
    }

    pub fn routers(mut self, routers: Vec<Router>) -> Self {
        self.routers = Some(routers);
        self
    }

    pub fn config(mut self, config: TraceConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    pub fn logger(mut self, logger: Arc<dyn DiagnosticLogger>) -> Self {
        self.logger = Some(logger);
        self
    }

    pub fn build(self) -> TraceDispatcher {
        TraceDispatcher {
            spans: self
                .spans
                .unwrap_or_else(|| Arc::new(crate::telemetry::OtelSpanFactory::global())),
            routers: self.routers.unwrap_or_else(default_routers),
            config: self.config.unwrap_or_default(),
            logger: self.logger.unwrap_or_else(|| Arc::new(TracingLogger)),
        }
    }
}

/// A traced request between `start_span` and span end.
pub struct InFlightSpan {
    tracer: Box<dyn EndpointTracer>,
    span: Box<dyn SpanHandle>,
    logger: Arc<dyn DiagnosticLogger>,
    path: String,
}

impl InFlightSpan {
    /// The request failed before a response arrived.
    pub fn fail(mut self, error: &(dyn std::error::Error + 'static)) {
        self.logger
            .debug(&format!("request to {} failed: {error}", self.path));
        self.span.record_error(error);
        self.span.set_status(SpanStatus::Error(error.to_string()));
        self.span.end(SystemTime::now());
    }

    /// Tee an async response body; the span ends when the body completes.
    pub fn observe<S>(self, body: S) -> TeeBody<S> {
        TeeBody::new(body, move |captured| self.complete(captured))
    }

    /// Tee a blocking response body; the span ends when the body completes.
    pub fn observe_reader<R: Read>(self, body: R) -> TeeReader<R> {
        TeeReader::new(body, move |captured| self.complete(captured))
    }

    fn complete(mut self, captured: CapturedBody) {
        if let Err(e) = self.tracer.tag_span(self.span.as_mut(), &captured) {
            self.logger
                .warn(&format!("failed to tag span for {}: {e}", self.path));
        }
        self.span.end(SystemTime::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::{InMemorySpanFactory, NoopLogger, attributes};
    use futures::StreamExt;
    use serde_json::json;
    use std::io::Cursor;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    #[derive(Default)]
    struct RecordingLogger {
        warnings: Mutex<Vec<String>>,
    }

    impl DiagnosticLogger for RecordingLogger {
        fn warn(&self, message: &str) {
            self.warnings.lock().unwrap().push(message.to_string());
        }
    }

    fn dispatcher(spans: &InMemorySpanFactory) -> TraceDispatcher {
        TraceDispatcher::builder()
            .span_factory(Arc::new(spans.clone()))
            .logger(Arc::new(NoopLogger))
            .build()
    }

    const CHAT_REQUEST: &str = r#"{"model":"m","messages":[{"role":"user","content":"hi"}]}"#;
    const CHAT_RESPONSE: &str = r#"{"id":"c1","model":"m","choices":[{"index":0,"message":{"role":"assistant","content":"hello"},"finish_reason":"stop"}],"usage":{"prompt_tokens":3,"completion_tokens":1,"total_tokens":4}}"#;

    #[test]
    fn reader_body_ends_span_after_eof() {
        let spans = InMemorySpanFactory::new();
        let in_flight = dispatcher(&spans)
            .begin("/v1/chat/completions", CHAT_REQUEST.as_bytes())
            .unwrap();
        assert!(spans.finished_spans().is_empty());

        let mut body = in_flight.observe_reader(Cursor::new(CHAT_RESPONSE.as_bytes().to_vec()));
        let mut out = String::new();
        body.read_to_string(&mut out).unwrap();
        assert_eq!(out, CHAT_RESPONSE);

        let finished = spans.finished_spans();
        assert_eq!(finished.len(), 1);
        assert_eq!(
            finished[0].attribute_json(attributes::METRICS),
            Some(json!({"prompt_tokens": 3, "completion_tokens": 1, "tokens": 4}))
        );
        assert_eq!(finished[0].attribute_json(attributes::METADATA).unwrap()["model"], "m");
    }

    const STREAM_REQUEST: &str = r#"{"model":"m","stream":true,"messages":[{"role":"user","content":"hi"}]}"#;
    const STREAM_BODY: &str = concat!(
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"role\":\"assistant\",\"content\":\"Hello\"}}]}\n\n",
        "data: {\"choices\":[{\"index\":0,\"delta\":{\"content\":\" world\"}}]}\n\n",
        "data: [DONE]\n\n",
    );

    fn partial_stream_len() -> usize {
        // First event plus half of the second.
        let first = STREAM_BODY.find("\n\n").unwrap() + 2;
        first + 30
    }

    #[test]
    fn closing_reader_mid_event_keeps_partial_output() {
        let spans = InMemorySpanFactory::new();
        let in_flight = dispatcher(&spans)
            .begin("/v1/chat/completions", STREAM_REQUEST.as_bytes())
            .unwrap();
        let mut body = in_flight.observe_reader(Cursor::new(STREAM_BODY.as_bytes().to_vec()));

        let mut partial = vec![0u8; partial_stream_len()];
        body.read_exact(&mut partial).unwrap();
        body.close();

        let finished = spans.finished_spans();
        assert_eq!(finished.len(), 1);
        assert_eq!(
            finished[0].attribute_json(attributes::OUTPUT_JSON),
            Some(json!([{
                "index": 0,
                "message": {"role": "assistant", "content": "Hello"},
                "finish_reason": null
            }]))
        );
    }

    #[tokio::test]
    async fn dropping_stream_mid_event_keeps_partial_output() {
        let spans = InMemorySpanFactory::new();
        let in_flight = dispatcher(&spans)
            .begin("/v1/chat/completions", STREAM_REQUEST.as_bytes())
            .unwrap();
        let bytes = STREAM_BODY.as_bytes();
        let cut = partial_stream_len();
        let chunks = vec![
            Ok::<_, std::io::Error>(Bytes::from_static(&bytes[..cut])),
            Ok(Bytes::from_static(&bytes[cut..])),
        ];
        let mut body = in_flight.observe(futures::stream::iter(chunks));

        let first = body.next().await.unwrap().unwrap();
        assert_eq!(first.len(), cut);
        drop(body);

        let finished = spans.finished_spans();
        assert_eq!(finished.len(), 1);
        let output = finished[0].attribute_json(attributes::OUTPUT_JSON).unwrap();
        assert_eq!(output[0]["message"]["content"], "Hello");
    }

    #[test]
    fn unknown_paths_and_disabled_config_are_not_traced() {
        let spans = InMemorySpanFactory::new();
        assert!(dispatcher(&spans).begin("/healthz", b"{}").is_none());
        assert!(dispatcher(&spans).begin("/v1/embeddings", b"{}").is_none());

        let disabled = TraceDispatcher::builder()
            .span_factory(Arc::new(spans.clone()))
            .config(TraceConfig::disabled())
            .build();
        assert!(disabled.begin("/v1/chat/completions", CHAT_REQUEST.as_bytes()).is_none());
        assert!(spans.spans().is_empty());
    }

    #[test]
    fn undecodable_request_is_logged_and_forwarded_untraced() {
        let spans = InMemorySpanFactory::new();
        let logger = Arc::new(RecordingLogger::default());
        let dispatcher = TraceDispatcher::builder()
            .span_factory(Arc::new(spans.clone()))
            .logger(logger.clone())
            .build();

        assert!(dispatcher.begin("/v1/chat/completions", b"not json").is_none());
        assert!(spans.spans().is_empty());
        let warnings = logger.warnings.lock().unwrap();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("failed to start span for /v1/chat/completions"));
    }

    #[traced_test]
    #[test]
    fn undecodable_response_still_ends_span() {
        let spans = InMemorySpanFactory::new();
        let dispatcher = TraceDispatcher::builder()
            .span_factory(Arc::new(spans.clone()))
            .build();
        let in_flight = dispatcher
            .begin("/v1/chat/completions", CHAT_REQUEST.as_bytes())
            .unwrap();
        let mut body = in_flight.observe_reader(Cursor::new(b"<html>bad gateway</html>".to_vec()));
        std::io::copy(&mut body, &mut std::io::sink()).unwrap();

        let finished = spans.finished_spans();
        assert_eq!(finished.len(), 1);
        assert!(finished[0].attribute(attributes::OUTPUT_JSON).is_none());
        assert!(finished[0].attribute(attributes::INPUT_JSON).is_some());
        assert!(logs_contain("failed to tag span for /v1/chat/completions"));
    }

    #[tokio::test]
    async fn handle_traces_and_tees_async_bodies() {
        let spans = InMemorySpanFactory::new();
        let dispatcher = dispatcher(&spans);
        let request = http::Request::builder()
            .uri("https://api.openai.com/v1/chat/completions")
            .body(Bytes::from_static(CHAT_REQUEST.as_bytes()))
            .unwrap();

        let response = dispatcher
            .handle(request, |request| async move {
                assert_eq!(request.body().as_ref(), CHAT_REQUEST.as_bytes());
                let chunks = vec![
                    Ok::<_, std::io::Error>(Bytes::from_static(&CHAT_RESPONSE.as_bytes()[..20])),
                    Ok(Bytes::from_static(&CHAT_RESPONSE.as_bytes()[20..])),
                ];
                Ok::<_, std::io::Error>(http::Response::new(futures::stream::iter(chunks)))
            })
            .await
            .unwrap();

        assert!(spans.finished_spans().is_empty());
        let body: Vec<u8> = response
            .into_body()
            .map(|chunk| chunk.unwrap().to_vec())
            .concat()
            .await;
        assert_eq!(body, CHAT_RESPONSE.as_bytes());

        let finished = spans.finished_spans();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].name, "openai.chat.completions.create");
        assert!(finished[0].end_time.unwrap() >= finished[0].start_time);
    }

    #[tokio::test]
    async fn handle_records_transport_errors() {
        let spans = InMemorySpanFactory::new();
        let dispatcher = dispatcher(&spans);
        let request = http::Request::builder()
            .uri("/v1/chat/completions")
            .body(Bytes::from_static(CHAT_REQUEST.as_bytes()))
            .unwrap();

        let result = dispatcher
            .handle(request, |_request| async {
                Err::<http::Response<futures::stream::Empty<Result<Bytes, std::io::Error>>>, _>(
                    std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused"),
                )
            })
            .await;

        let err = result.err().unwrap();
        assert_eq!(err.kind(), std::io::ErrorKind::ConnectionRefused);
        let finished = spans.finished_spans();
        assert_eq!(finished.len(), 1);
        assert_eq!(finished[0].status, SpanStatus::Error("connection refused".into()));
        assert_eq!(finished[0].errors, vec!["connection refused".to_string()]);
    }

    #[tokio::test]
    async fn handle_passes_untraced_paths_through() {
        let spans = InMemorySpanFactory::new();
        let dispatcher = dispatcher(&spans);
        let request = http::Request::builder()
            .uri("/v1/embeddings")
            .body(Bytes::from_static(b"{}"))
            .unwrap();

        let response = dispatcher
            .handle(request, |_request| async {
                let chunks = vec![Ok::<_, std::io::Error>(Bytes::from_static(b"{\"data\":[]}"))];
                Ok::<_, std::io::Error>(
                    http::Response::builder()
                        .status(200)
                        .header("x-request-id", "abc")
                        .body(futures::stream::iter(chunks))
                        .unwrap(),
                )
            })
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "abc");
        assert!(!response.body().is_pending());
        let body: Vec<u8> = response
            .into_body()
            .map(|chunk| chunk.unwrap().to_vec())
            .concat()
            .await;
        assert_eq!(body, b"{\"data\":[]}");
        assert!(spans.spans().is_empty());
    }
}

//! Diagnostic logger capability.
//!
//! Instrumentation failures are reported here and nowhere else. The logger is
//! handed to the dispatcher at construction time; the default writes through
//! `tracing`.

/// `tracing` target used for dispatcher diagnostics.
pub const LOG_TARGET: &str = "braintrust_trace::http";

/// Best-effort sink for instrumentation diagnostics.
pub trait DiagnosticLogger: Send + Sync {
    fn warn(&self, message: &str);

    fn debug(&self, _message: &str) {}
}

/// Logger backed by `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl DiagnosticLogger for TracingLogger {
    fn warn(&self, message: &str) {
        tracing::warn!(target: LOG_TARGET, "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: LOG_TARGET, "{message}");
    }
}

/// Logger that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLogger;

impl DiagnosticLogger for NoopLogger {
    fn warn(&self, _message: &str) {}
}

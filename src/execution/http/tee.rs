//! Buffered tee over response bodies.
//!
//! The caller keeps reading the body as usual; every byte it pulls is also
//! appended to an internal buffer. A completion callback receives the buffered
//! bytes exactly once, on end-of-stream or on close/drop, whichever comes first.
//! Read errors are passed through untouched and do not complete the tee.

use bytes::{Bytes, BytesMut};
use futures::Stream;
use std::io::{self, Read};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::SystemTime;

/// Bytes observed by a tee when it completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedBody {
    pub bytes: Bytes,
    /// When the first non-empty chunk was read
    pub first_chunk_at: Option<SystemTime>,
}

/// Completion callback fired once per tee.
pub type CompletionCallback = Box<dyn FnOnce(CapturedBody) + Send>;

/// Accumulator plus single-use latch shared by both tee front-ends.
struct Capture {
    buffer: BytesMut,
    first_chunk_at: Option<SystemTime>,
    on_complete: Option<CompletionCallback>,
}

impl Capture {
    fn new(on_complete: CompletionCallback) -> Self {
        Self {
            buffer: BytesMut::new(),
            first_chunk_at: None,
            on_complete: Some(on_complete),
        }
    }

    fn detached() -> Self {
        Self {
            buffer: BytesMut::new(),
            first_chunk_at: None,
            on_complete: None,
        }
    }

    fn record(&mut self, chunk: &[u8]) {
        // Nothing left to deliver to once the latch is spent.
        if self.on_complete.is_none() || chunk.is_empty() {
            return;
        }
        if self.first_chunk_at.is_none() {
            self.first_chunk_at = Some(SystemTime::now());
        }
        self.buffer.extend_from_slice(chunk);
    }

    fn fire(&mut self) {
        if let Some(on_complete) = self.on_complete.take() {
            let bytes = std::mem::take(&mut self.buffer).freeze();
            on_complete(CapturedBody {
                bytes,
                first_chunk_at: self.first_chunk_at,
            });
        }
    }

    fn is_pending(&self) -> bool {
        self.on_complete.is_some()
    }
}

/// Tee over a blocking [`Read`] body.
pub struct TeeReader<R> {
    inner: Option<R>,
    capture: Capture,
}

impl<R: Read> TeeReader<R> {
    pub fn new<F>(inner: R, on_complete: F) -> Self
    where
        F: FnOnce(CapturedBody) + Send + 'static,
    {
        Self {
            inner: Some(inner),
            capture: Capture::new(Box::new(on_complete)),
        }
    }
}

impl<R> TeeReader<R> {
    /// Complete the tee with whatever was read so far and release the body.
    ///
    /// Only the first close (or end-of-stream) fires the callback.
    pub fn close(&mut self) {
        self.capture.fire();
        self.inner = None;
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    /// Whether the completion callback has yet to fire.
    pub fn is_pending(&self) -> bool {
        self.capture.is_pending()
    }
}

impl<R: Read> Read for TeeReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(inner) = self.inner.as_mut() else {
            return Ok(0);
        };
        let n = inner.read(buf)?;
        if n == 0 {
            if !buf.is_empty() {
                self.capture.fire();
            }
        } else {
            self.capture.record(&buf[..n]);
        }
        Ok(n)
    }
}

impl<R> Drop for TeeReader<R> {
    fn drop(&mut self) {
        self.capture.fire();
    }
}

/// Tee over an async byte stream such as `reqwest::Response::bytes_stream`.
///
/// Dropping the body before end-of-stream counts as a close.
pub struct TeeBody<S> {
    inner: Option<S>,
    capture: Capture,
}

impl<S> TeeBody<S> {
    pub fn new<F>(inner: S, on_complete: F) -> Self
    where
        F: FnOnce(CapturedBody) + Send + 'static,
    {
        Self {
            inner: Some(inner),
            capture: Capture::new(Box::new(on_complete)),
        }
    }

    /// A body that forwards chunks without buffering or notifying anyone.
    pub fn passthrough(inner: S) -> Self {
        Self {
            inner: Some(inner),
            capture: Capture::detached(),
        }
    }

    /// Complete the tee with whatever was read so far and release the body.
    pub fn close(&mut self) {
        self.capture.fire();
        self.inner = None;
    }

    pub fn is_pending(&self) -> bool {
        self.capture.is_pending()
    }
}

impl<S, B, E> Stream for TeeBody<S>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    type Item = Result<B, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };

        match Pin::new(inner).poll_next(cx) {
            Poll::Ready(Some(Ok(chunk))) => {
                this.capture.record(chunk.as_ref());
                Poll::Ready(Some(Ok(chunk)))
            }
            Poll::Ready(None) => {
                this.capture.fire();
                this.inner = None;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}

impl<S> Drop for TeeBody<S> {
    fn drop(&mut self) {
        self.capture.fire();
    }
}

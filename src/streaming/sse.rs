//! SSE JSON scanning
//!
//! Splits a buffered `text/event-stream` body into the `data:` payloads of its
//! events. SSE framing (comments, `event:` lines, CRLF, multi-line data) is
//! handled by `eventsource-stream`; this module only filters payloads.

use crate::error::TraceError;
use bytes::Bytes;
use eventsource_stream::{EventStream, Eventsource};
use futures::executor::{BlockingStream, block_on_stream};
use futures::stream::{self, Iter};
use std::convert::Infallible;

/// Payload that terminates an OpenAI-style stream.
pub const DONE_MARKER: &str = "[DONE]";

type ByteSource = Iter<std::array::IntoIter<Result<Bytes, Infallible>, 1>>;
type Events = BlockingStream<EventStream<ByteSource>>;

/// One `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseData {
    pub data: String,
    /// `false` when the body ended before the event's blank-line terminator,
    /// i.e. the payload may have been cut off.
    pub terminated: bool,
}

/// Iterator over the non-empty `data:` payloads of a buffered SSE body.
///
/// Iteration stops at the first [`DONE_MARKER`] or at the end of the body.
pub struct SseDataEvents {
    complete: Events,
    tail: Option<Events>,
    label: &'static str,
    done: bool,
}

fn events(bytes: Vec<u8>) -> Events {
    let source: ByteSource = stream::iter([Ok(Bytes::from(bytes))]);
    block_on_stream(source.eventsource())
}

/// Length of the prefix of `body` that ends on an event terminator.
fn terminated_len(body: &[u8]) -> usize {
    [&b"\r\n\r\n"[..], b"\n\n", b"\r\r"]
        .iter()
        .filter_map(|sep| {
            body.windows(sep.len())
                .rposition(|w| w == *sep)
                .map(|i| i + sep.len())
        })
        .max()
        .unwrap_or(0)
}

impl SseDataEvents {
    pub fn new(body: &[u8], label: &'static str) -> Self {
        let (complete, rest) = body.split_at(terminated_len(body));
        let tail = (!rest.iter().all(u8::is_ascii_whitespace)).then(|| {
            let mut owned = Vec::with_capacity(rest.len() + 2);
            owned.extend_from_slice(rest);
            owned.extend_from_slice(b"\n\n");
            events(owned)
        });
        Self {
            complete: events(complete.to_vec()),
            tail,
            label,
            done: false,
        }
    }

    fn next_event(&mut self) -> Option<(Result<eventsource_stream::Event, String>, bool)> {
        if let Some(event) = self.complete.next() {
            return Some((event.map_err(|e| e.to_string()), true));
        }
        let event = self.tail.as_mut()?.next()?;
        Some((event.map_err(|e| e.to_string()), false))
    }
}

impl Iterator for SseDataEvents {
    type Item = Result<SseData, TraceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let (event, terminated) = self.next_event()?;
            let event = match event {
                Ok(event) => event,
                Err(e) => {
                    self.done = true;
                    return Some(Err(TraceError::StreamError(format!(
                        "SSE stream error ({}): {e}",
                        self.label
                    ))));
                }
            };

            let data = event.data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_MARKER {
                self.done = true;
                return None;
            }
            return Some(Ok(SseData {
                data: data.to_string(),
                terminated,
            }));
        }
    }
}

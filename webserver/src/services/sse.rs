//! Server-sent event decoding for streamed chat completions

use std::collections::VecDeque;

use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};

use shared::Utf8StreamDecoder;

use crate::error::WebServerError;
use crate::traits::TextStream;
use crate::types::ChatCompletionChunk;

const DONE_SENTINEL: &str = "[DONE]";

/// One decoded upstream event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseEvent {
    Fragment(String),
    Done,
    Error(String),
}

/// Incremental `data:` line decoder
#[derive(Debug, Default)]
pub struct SseDecoder {
    decoder: Utf8StreamDecoder,
    line: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw body bytes; returns the events completed by them
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseEvent> {
        let text = self.decoder.decode(bytes);
        let mut events = Vec::new();
        for c in text.chars() {
            if c == '\n' {
                let line = std::mem::take(&mut self.line);
                parse_line(&line, &mut events);
            } else {
                self.line.push(c);
            }
        }
        events
    }

    /// End of body: decode a final unterminated line
    pub fn finish(&mut self) -> Vec<SseEvent> {
        if let Some(rest) = self.decoder.finish() {
            self.line.push_str(&rest);
        }
        let mut events = Vec::new();
        let line = std::mem::take(&mut self.line);
        parse_line(&line, &mut events);
        events
    }
}

fn parse_line(line: &str, events: &mut Vec<SseEvent>) {
    let line = line.trim_end_matches('\r');
    let Some(data) = line.strip_prefix("data:") else {
        // Blank separators, comments and `event:`/`id:` fields carry no text
        return;
    };
    let data = data.trim();
    if data.is_empty() {
        return;
    }
    if data == DONE_SENTINEL {
        events.push(SseEvent::Done);
        return;
    }

    let chunk: ChatCompletionChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(e) => {
            events.push(SseEvent::Error(format!("malformed stream chunk: {e}")));
            return;
        }
    };
    if let Some(error) = chunk.error {
        events.push(SseEvent::Error(error.describe()));
        return;
    }

    let mut finished = false;
    for choice in chunk.choices {
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            events.push(SseEvent::Fragment(content));
        }
        finished |= choice.finish_reason.is_some_and(|reason| !reason.is_empty());
    }
    if finished {
        events.push(SseEvent::Done);
    }
}

struct SseState<S> {
    body: S,
    decoder: SseDecoder,
    pending: VecDeque<SseEvent>,
    body_ended: bool,
}

/// Turn a streamed completion body into ordered text fragments.
///
/// The returned stream ends cleanly only after a completion signal; an
/// in-band error or a body that stops without one yields an `Err` item.
pub fn completion_stream<S, E>(body: S) -> TextStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: Into<WebServerError> + Send + 'static,
{
    let state = SseState {
        body,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        body_ended: false,
    };

    stream::unfold(Some(state), |state| async move {
        let mut state = state?;
        loop {
            if let Some(event) = state.pending.pop_front() {
                return match event {
                    SseEvent::Fragment(text) => Some((Ok(text), Some(state))),
                    SseEvent::Done => None,
                    SseEvent::Error(message) => Some((Err(WebServerError::upstream(message)), None)),
                };
            }
            if state.body_ended {
                return Some((Err(WebServerError::UpstreamTruncated), None));
            }

            match state.body.next().await {
                Some(Ok(bytes)) => {
                    let events = state.decoder.push(&bytes);
                    state.pending.extend(events);
                }
                Some(Err(e)) => return Some((Err(e.into()), None)),
                None => {
                    state.body_ended = true;
                    let events = state.decoder.finish();
                    state.pending.extend(events);
                }
            }
        }
    })
    .boxed()
}

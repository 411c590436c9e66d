// ── Engine: Stream Decoding ────────────────────────────────────────────────
// Turns an open chunked HTTP response body into a lazy sequence of typed
// events. Two stages:
//
//   FrameDecoder — byte chunks → complete text lines. Partial lines (and
//   split multi-byte UTF-8 sequences) at a chunk boundary stay buffered
//   until the rest arrives. No line is emitted twice, no byte is dropped.
//
//   Event mapper — lines → JSON payloads. Only `data:`-prefixed lines carry
//   payloads; everything else is a keep-alive. A payload with the reserved
//   `done` field ends the stream without being emitted. A payload with an
//   `error` field, or one that fails to parse, terminates the stream with a
//   failure — events already emitted stand.
//
// Dropping the returned stream drops the response body, which releases the
// underlying connection on every exit path (early break on the sentinel,
// consumer abandonment, or failure).

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::stream::{self, BoxStream, Stream, StreamExt};
use serde_json::Value;

use crate::atoms::constants::{DATA_PREFIX, DONE_FIELD, ERROR_FIELD, TOKEN_FIELD};
use crate::atoms::error::{ClientError, ClientResult};
use crate::atoms::types::{AgentStepEvent, TokenEvent};

/// Lazy sequence of token fragments from `/llm/stream`.
pub type TokenStream = Pin<Box<dyn Stream<Item = ClientResult<TokenEvent>> + Send>>;

/// Lazy sequence of agent step records from `/agent/v2/stream`.
pub type AgentEventStream = Pin<Box<dyn Stream<Item = ClientResult<AgentStepEvent>> + Send>>;

/// Decoded but not-yet-typed payload stream shared by both event kinds.
pub(crate) type RawEventStream = Pin<Box<dyn Stream<Item = ClientResult<Value>> + Send>>;

// ── Frame decoder ──────────────────────────────────────────────────────────

/// Incremental newline framer over raw response bytes.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk and return every line completed by it. Bytes after
    /// the last newline — including an incomplete multi-byte sequence —
    /// remain buffered for the next feed.
    pub fn feed(&mut self, chunk: &[u8]) -> ClientResult<Vec<String>> {
        self.buf.extend_from_slice(chunk);
        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(rel) = self.buf[start..].iter().position(|&b| b == b'\n') {
            let end = start + rel;
            lines.push(to_line(&self.buf[start..end])?);
            start = end + 1;
        }
        self.buf.drain(..start);
        Ok(lines)
    }

    /// End-of-stream: emit any buffered remainder as a final line (the
    /// stream ended without a trailing newline).
    pub fn finish(&mut self) -> ClientResult<Option<String>> {
        if self.buf.is_empty() {
            return Ok(None);
        }
        let rest = std::mem::take(&mut self.buf);
        to_line(&rest).map(Some)
    }
}

/// Convert one complete line, stripping a single trailing `\r`. Lines are
/// complete records, so invalid UTF-8 here is a protocol violation rather
/// than a chunk-boundary artifact.
fn to_line(raw: &[u8]) -> ClientResult<String> {
    let raw = match raw.last() {
        Some(b'\r') => &raw[..raw.len() - 1],
        _ => raw,
    };
    std::str::from_utf8(raw)
        .map(str::to_owned)
        .map_err(|e| ClientError::Stream(format!("invalid UTF-8 in frame: {}", e)))
}

// ── Event mapper ───────────────────────────────────────────────────────────

/// Extract the payload of a data line. Non-data lines yield `None` and are
/// never surfaced.
fn data_payload(line: &str) -> Option<&str> {
    line.strip_prefix(DATA_PREFIX).map(str::trim)
}

enum Mapped {
    Event(Value),
    Done,
}

/// Parse one payload. The sentinel is the presence of the reserved `done`
/// field in the parsed object — checked after parsing, so token text
/// containing the word "done" can never terminate a stream.
fn map_payload(payload: &str) -> ClientResult<Mapped> {
    let value: Value = serde_json::from_str(payload)?;
    if value.get(DONE_FIELD).is_some() {
        return Ok(Mapped::Done);
    }
    if let Some(message) = value.get(ERROR_FIELD).and_then(Value::as_str) {
        return Err(ClientError::Stream(message.to_string()));
    }
    Ok(Mapped::Event(value))
}

struct DecodeState {
    body: BoxStream<'static, ClientResult<Bytes>>,
    decoder: FrameDecoder,
    lines: VecDeque<String>,
    eof: bool,
    finished: bool,
}

/// Wrap a byte-chunk stream into a lazy payload stream. The sentinel (or
/// the first failure) ends the sequence; no further chunks are read after
/// either.
pub(crate) fn decode_events<S, E>(body: S) -> RawEventStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
{
    let state = DecodeState {
        body: body.map(|r| r.map_err(Into::<ClientError>::into)).boxed(),
        decoder: FrameDecoder::new(),
        lines: VecDeque::new(),
        eof: false,
        finished: false,
    };
    Box::pin(stream::unfold(state, |mut st| async move {
        loop {
            if st.finished {
                return None;
            }
            while let Some(line) = st.lines.pop_front() {
                let Some(payload) = data_payload(&line) else { continue };
                if payload.is_empty() {
                    // bare "data:" heartbeat
                    continue;
                }
                match map_payload(payload) {
                    Ok(Mapped::Event(value)) => return Some((Ok(value), st)),
                    Ok(Mapped::Done) => {
                        st.finished = true;
                        return None;
                    }
                    Err(e) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                }
            }
            if st.eof {
                st.finished = true;
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => match st.decoder.feed(&chunk) {
                    Ok(batch) => st.lines.extend(batch),
                    Err(e) => {
                        st.finished = true;
                        return Some((Err(e), st));
                    }
                },
                // Transport failure mid-stream: stop without flushing the
                // buffered partial line as if it were complete.
                Some(Err(e)) => {
                    st.finished = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.eof = true;
                    match st.decoder.finish() {
                        Ok(Some(rest)) => st.lines.push_back(rest),
                        Ok(None) => {}
                        Err(e) => {
                            st.finished = true;
                            return Some((Err(e), st));
                        }
                    }
                }
            }
        }
    }))
}

/// Narrow a payload stream to token fragments. Payloads without a `token`
/// field are benign non-data frames and emit nothing.
pub(crate) fn into_token_stream(raw: RawEventStream) -> TokenStream {
    Box::pin(raw.filter_map(|item| async move {
        match item {
            Ok(value) => value
                .get(TOKEN_FIELD)
                .and_then(Value::as_str)
                .map(|token| Ok(TokenEvent { token: token.to_string() })),
            Err(e) => Some(Err(e)),
        }
    }))
}

/// Agent streams yield every payload verbatim — no field filtering.
pub(crate) fn into_agent_stream(raw: RawEventStream) -> AgentEventStream {
    Box::pin(raw)
}

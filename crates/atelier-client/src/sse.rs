use std::collections::VecDeque;
use std::pin::Pin;

use futures::{Stream, StreamExt};
use reqwest::Response;
use serde::de::DeserializeOwned;

use crate::error::{ApiError, Result};

/// Incremental decoder for `data: `-framed event streams.
///
/// Bytes arrive in arbitrary chunks; [`Self::next_frame`] hands back one
/// complete `data: ` payload at a time, in wire order. Lines that are
/// not data frames (comments, blank keep-alives) and lines that are not
/// valid UTF-8 are dropped.
#[derive(Debug, Default)]
pub struct SseFrameBuffer {
    buffer: VecDeque<u8>,
}

impl SseFrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend(bytes);
    }

    /// Next complete data payload, if a full line is buffered.
    pub fn next_frame(&mut self) -> Option<String> {
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line_bytes: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(payload) = Self::payload_of(&line_bytes) {
                return Some(payload);
            }
        }
        None
    }

    /// Flush a trailing unterminated line at end-of-stream.
    pub fn flush(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest: Vec<u8> = self.buffer.drain(..).collect();
        Self::payload_of(&rest)
    }

    fn payload_of(line_bytes: &[u8]) -> Option<String> {
        let line = match std::str::from_utf8(line_bytes) {
            Ok(s) => s.trim(),
            Err(err) => {
                tracing::warn!("dropping non-UTF-8 stream line: {err}");
                return None;
            }
        };
        let data = line.strip_prefix("data: ")?.trim();
        if data.is_empty() {
            return None;
        }
        Some(data.to_string())
    }
}

/// Decode a response body as a stream of JSON events.
///
/// Events are yielded in the order received on the wire. Malformed JSON
/// frames are logged and skipped without aborting the stream; a
/// transport error ends it.
pub fn event_stream<T>(response: Response) -> Pin<Box<dyn Stream<Item = Result<T>> + Send>>
where
    T: DeserializeOwned + Send + 'static,
{
    let byte_stream = response.bytes_stream();

    Box::pin(async_stream::stream! {
        let mut chunks = Box::pin(byte_stream);
        let mut buffer = SseFrameBuffer::new();

        while let Some(chunk_result) = chunks.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(&bytes);
                    while let Some(frame) = buffer.next_frame() {
                        match serde_json::from_str::<T>(&frame) {
                            Ok(event) => yield Ok(event),
                            Err(err) => {
                                tracing::warn!("skipping malformed event frame: {err}");
                            }
                        }
                    }
                }
                Err(err) => {
                    yield Err(ApiError::Transport(err));
                    return;
                }
            }
        }

        // The final frame may not be newline-terminated.
        if let Some(frame) = buffer.flush() {
            match serde_json::from_str::<T>(&frame) {
                Ok(event) => yield Ok(event),
                Err(err) => {
                    tracing::warn!("skipping malformed trailing frame: {err}");
                }
            }
        }
    })
}

//! ND-JSON stream reader.
//!
//! Generate, chat, and pull responses arrive as one JSON value per line over
//! a chunked HTTP body. [`JsonLines`] consumes the body incrementally — it
//! holds at most one pending line in memory, so arbitrarily long generations
//! never inflate the process.

use std::marker::PhantomData;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt, stream::BoxStream};
use serde::de::DeserializeOwned;

use crate::error::{RellamaError, Result};

/// Lazy, finite, forward-only reader over a newline-delimited JSON body.
///
/// Blank lines are skipped. A line that fails to decode ends the sequence
/// with [`RellamaError::Stream`]. The sequence ends at end-of-stream; there
/// is no out-of-band terminator, so callers needing completion semantics
/// inspect the `done` field of the last record.
pub struct JsonLines<T> {
    stream: BoxStream<'static, reqwest::Result<Bytes>>,
    buf: BytesMut,
    finished: bool,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonLines<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = reqwest::Result<Bytes>> + Send + 'static,
    {
        Self {
            stream: stream.boxed(),
            buf: BytesMut::new(),
            finished: false,
            _record: PhantomData,
        }
    }

    /// Read a response body as a record stream.
    pub fn from_response(response: reqwest::Response) -> Self {
        Self::new(response.bytes_stream())
    }

    /// Next decoded record, or `None` once the stream is exhausted.
    ///
    /// After the first `Err` or the first `None` every subsequent call
    /// returns `None`; the reader is not restartable.
    pub async fn next_record(&mut self) -> Option<Result<T>> {
        if self.finished {
            return None;
        }

        loop {
            // Drain complete lines out of the buffer first.
            while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                let line = self.buf.split_to(pos + 1);
                match self.decode(&line) {
                    Some(result) => return Some(result),
                    None => continue, // blank line
                }
            }

            match self.stream.next().await {
                Some(Ok(chunk)) => self.buf.extend_from_slice(&chunk),
                Some(Err(e)) => {
                    self.finished = true;
                    return Some(Err(RellamaError::Network(format!(
                        "Stream read failed: {e}"
                    ))));
                }
                None => {
                    // End of stream: a final line without a trailing newline
                    // is still a record.
                    self.finished = true;
                    let rest = self.buf.split();
                    return self.decode(&rest);
                }
            }
        }
    }

    /// Consume the remaining records, returning the last one.
    ///
    /// Used where only the terminal record matters (warm-up calls, one-shot
    /// stats); decode failures still surface.
    pub async fn drain(mut self) -> Result<Option<T>> {
        let mut last = None;
        while let Some(record) = self.next_record().await {
            last = Some(record?);
        }
        Ok(last)
    }

    /// Decode one framed line; `None` for blank/whitespace-only lines.
    fn decode(&mut self, line: &[u8]) -> Option<Result<T>> {
        let text = String::from_utf8_lossy(line);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        match serde_json::from_str(trimmed) {
            Ok(record) => Some(Ok(record)),
            Err(e) => {
                self.finished = true;
                Some(Err(RellamaError::Stream(e.to_string())))
            }
        }
    }
}

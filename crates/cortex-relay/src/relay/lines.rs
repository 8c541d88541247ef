use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::fmt::Display;

use crate::errors::{RelayError, RelayResult};

/// Splits a byte stream into lines on `\n`, `\r\n` or `\r`.
///
/// Bytes are buffered until a terminator arrives, so multi-byte characters
/// split across chunks survive. Only the current partial line is held.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    // Set after a `\r` so a following `\n` is not read as an empty line.
    skip_lf: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and collect every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();
        for &byte in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if byte == b'\n' {
                    continue;
                }
            }
            match byte {
                b'\n' => lines.push(self.take()),
                b'\r' => {
                    lines.push(self.take());
                    self.skip_lf = true;
                }
                other => self.pending.push(other),
            }
        }
        lines
    }

    /// The unterminated remainder at end of stream, if any.
    pub fn finish(mut self) -> Option<String> {
        if self.pending.is_empty() {
            None
        } else {
            Some(self.take())
        }
    }

    fn take(&mut self) -> String {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        line
    }
}

/// Adapt an upstream body into a stream of lines. A transport error ends
/// the stream with `RelayError::UpstreamStreamFailed`.
pub fn lines<S, E>(body: S) -> impl Stream<Item = RelayResult<String>>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    async_stream::stream! {
        let mut body = Box::pin(body);
        let mut buffer = LineBuffer::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(chunk) => {
                    for line in buffer.push(&chunk) {
                        yield Ok(line);
                    }
                }
                Err(e) => {
                    yield Err(RelayError::UpstreamStreamFailed(e.to_string()));
                    return;
                }
            }
        }
        if let Some(line) = buffer.finish() {
            yield Ok(line);
        }
    }
}

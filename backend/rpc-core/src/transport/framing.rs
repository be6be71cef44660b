//! Incremental de-framer for the chunked response stream.
//!
//! ```text
//! )]}'\n
//! <decimal length>\n<length bytes of payload>
//! <decimal length>\n<length bytes of payload>
//! ...
//! ```
//!
//! Bytes are pushed as they arrive from the network; [`FrameReader::next_frame`]
//! yields a frame only once all of its declared bytes are buffered. Lengths
//! count bytes of payload, excluding the newline that ends the length line.

use crate::error::RpcError;

/// Anti-hijacking sentinel that opens every response body.
pub const ANTI_HIJACK_PREAMBLE: &[u8] = b")]}'";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub declared_length: usize,
    pub payload: Vec<u8>,
    /// Absolute byte offset of the payload in the response body.
    pub offset: usize,
}

#[derive(Debug, Default)]
pub struct FrameReader {
    buffer: Vec<u8>,
    /// Absolute offset of `buffer[0]`.
    consumed: usize,
    preamble_matched: bool,
}

impl FrameReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn preamble_matched(&self) -> bool {
        self.preamble_matched
    }

    /// Bytes received but not yet returned as part of a frame.
    pub fn pending_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Total bytes pushed so far.
    pub fn bytes_read(&self) -> usize {
        self.consumed + self.buffer.len()
    }

    /// Next complete frame, or `None` until more bytes arrive.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, RpcError> {
        if !self.preamble_matched && !self.match_preamble()? {
            return Ok(None);
        }

        loop {
            let Some(newline) = self.buffer.iter().position(|&b| b == b'\n') else {
                return Ok(None);
            };

            let line = self.buffer[..newline].trim_ascii();
            if line.is_empty() {
                self.consume(newline + 1);
                continue;
            }

            let declared_length = parse_length(line, self.consumed)?;
            let payload_start = newline + 1;
            if self.buffer.len() - payload_start < declared_length {
                return Ok(None);
            }

            let payload_end = payload_start + declared_length;
            let frame = Frame {
                declared_length,
                payload: self.buffer[payload_start..payload_end].to_vec(),
                offset: self.consumed + payload_start,
            };
            self.consume(payload_end);
            return Ok(Some(frame));
        }
    }

    /// Call once the stream has closed and [`next_frame`](Self::next_frame)
    /// returned `None`. Anything but whitespace left over is a truncated chunk.
    pub fn finish(&self) -> Result<(), RpcError> {
        if !self.preamble_matched {
            return Err(RpcError::framing(
                "stream ended before the anti-hijacking preamble",
                self.consumed,
            ));
        }

        let rest = self.buffer.trim_ascii_start();
        if rest.is_empty() {
            return Ok(());
        }
        let line_offset = self.consumed + (self.buffer.len() - rest.len());

        let line_end = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let declared_length = parse_length(rest[..line_end].trim_ascii(), line_offset)?;
        let received = rest.len().saturating_sub(line_end + 1);
        Err(RpcError::framing(
            format!("stream ended mid-chunk: declared {declared_length} bytes, received {received}"),
            line_offset,
        ))
    }

    fn match_preamble(&mut self) -> Result<bool, RpcError> {
        let available = self.buffer.len().min(ANTI_HIJACK_PREAMBLE.len());
        if self.buffer[..available] != ANTI_HIJACK_PREAMBLE[..available] {
            return Err(RpcError::framing(
                "response does not start with the anti-hijacking preamble",
                self.consumed,
            ));
        }
        if available < ANTI_HIJACK_PREAMBLE.len() {
            return Ok(false);
        }
        self.consume(ANTI_HIJACK_PREAMBLE.len());
        self.preamble_matched = true;
        Ok(true)
    }

    fn consume(&mut self, count: usize) {
        self.buffer.drain(..count);
        self.consumed += count;
    }
}

fn parse_length(line: &[u8], offset: usize) -> Result<usize, RpcError> {
    std::str::from_utf8(line)
        .ok()
        .filter(|text| text.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|text| text.parse::<usize>().ok())
        .ok_or_else(|| {
            RpcError::framing(
                format!(
                    "unparseable chunk length {:?}",
                    String::from_utf8_lossy(&line[..line.len().min(32)])
                ),
                offset,
            )
        })
}

/// De-frame a complete response body.
pub fn split_frames(body: &[u8]) -> Result<Vec<Frame>, RpcError> {
    let mut reader = FrameReader::new();
    reader.push(body);
    let mut frames = Vec::new();
    while let Some(frame) = reader.next_frame()? {
        frames.push(frame);
    }
    reader.finish()?;
    Ok(frames)
}

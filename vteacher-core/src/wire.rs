//! Render stream framing
//!
//! Chunks travel as newline-delimited JSON: one [`TreeChunk`] per line,
//! served as `application/x-ndjson`. The resolved location travels ahead of
//! the body in the `X-Location` header.

use crate::error::FrameError;
use crate::tree::TreeChunk;
use bytes::{Bytes, BytesMut};

/// Response header carrying the encoded resolved location.
pub const LOCATION_HEADER: &str = "x-location";

/// Content type of a render stream body.
pub const STREAM_CONTENT_TYPE: &str = "application/x-ndjson";

/// Serialize one chunk as a complete frame, including its trailing newline.
pub fn encode_frame(chunk: &TreeChunk) -> Result<Bytes, FrameError> {
    let mut buf = serde_json::to_vec(chunk).map_err(|e| FrameError::Encode {
        reason: e.to_string(),
    })?;
    buf.push(b'\n');
    Ok(Bytes::from(buf))
}

/// Incremental decoder for a render stream body.
///
/// Bytes may be pushed in arbitrary pieces; only complete lines are decoded.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: BytesMut,
    line: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes and return every chunk completed by them.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<TreeChunk>, FrameError> {
        self.buffer.extend_from_slice(bytes);
        let mut chunks = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let frame = self.buffer.split_to(pos + 1);
            self.line += 1;
            let payload = trim_ascii(&frame[..pos]);
            if payload.is_empty() {
                continue;
            }
            let chunk = serde_json::from_slice::<TreeChunk>(payload).map_err(|e| {
                FrameError::InvalidFrame {
                    line: self.line,
                    reason: e.to_string(),
                }
            })?;
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    /// Bytes received but not yet part of a complete frame.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Signal end of input. Fails if a partial frame is left over.
    pub fn finish(&self) -> Result<(), FrameError> {
        if trim_ascii(&self.buffer).is_empty() {
            Ok(())
        } else {
            Err(FrameError::Truncated {
                pending: self.buffer.len(),
            })
        }
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

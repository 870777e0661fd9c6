//! LSP-style length-prefixed framing: a `Content-Length: N\r\n\r\n` header
//! block followed by exactly `N` bytes of JSON payload.
//!
//! The codec is deliberately buffer-in, buffer-out: it knows nothing about
//! sockets. The transport layer in `gabp-server` owns the growing
//! per-connection `Vec<u8>` and repeatedly calls [`FrameCodec::decode_next`]
//! as more bytes arrive, the way the example pack's `decision-gate-mcp`
//! `read_framed`/`write_framed` helpers frame a single stdio payload — here
//! generalized to a partial, re-entrant buffer instead of a blocking reader.

use thiserror::Error;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame header is missing a Content-Length field")]
    MissingContentLength,

    #[error("frame header has a non-numeric Content-Length value: {0:?}")]
    InvalidContentLength(String),
}

/// Stateless LSP-style frame codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Serializes one payload into a complete frame (headers + payload).
    ///
    /// `Content-Type: application/json` is always emitted; per `spec.md`
    /// §4.1 it is informational only — the decoder ignores it on receive.
    #[must_use]
    pub fn encode(payload: &[u8]) -> Vec<u8> {
        let header = format!(
            "Content-Length: {}\r\nContent-Type: application/json\r\n\r\n",
            payload.len()
        );
        let mut frame = Vec::with_capacity(header.len() + payload.len());
        frame.extend_from_slice(header.as_bytes());
        frame.extend_from_slice(payload);
        frame
    }

    /// Attempts to pull one complete frame's payload out of `buf`.
    ///
    /// - `Ok(None)`: the buffer does not yet hold a complete header block, or
    ///   holds a header but not the full declared payload — the caller should
    ///   read more bytes and try again. `buf` is left untouched in this case.
    /// - `Ok(Some(payload))`: one frame was decoded and both its header and
    ///   payload bytes were drained from the front of `buf`.
    /// - `Err(_)`: the header block is malformed (no numeric
    ///   `Content-Length`). Per `spec.md` §9 open question 3, callers SHOULD
    ///   close the connection rather than attempt recovery.
    pub fn decode_next(buf: &mut Vec<u8>) -> Result<Option<Vec<u8>>, FrameError> {
        let Some(header_end) = find_header_terminator(buf) else {
            return Ok(None);
        };

        let header_bytes = &buf[..header_end];
        let content_length = parse_content_length(header_bytes)?;

        let payload_start = header_end + HEADER_TERMINATOR.len();
        let payload_end = payload_start + content_length;
        if buf.len() < payload_end {
            return Ok(None);
        }

        let payload = buf[payload_start..payload_end].to_vec();
        buf.drain(..payload_end);
        Ok(Some(payload))
    }
}

fn find_header_terminator(buf: &[u8]) -> Option<usize> {
    buf.windows(HEADER_TERMINATOR.len())
        .position(|window| window == HEADER_TERMINATOR)
}

fn parse_content_length(header_bytes: &[u8]) -> Result<usize, FrameError> {
    let header_text = String::from_utf8_lossy(header_bytes);
    for line in header_text.split("\r\n") {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        if name.trim().eq_ignore_ascii_case("content-length") {
            let trimmed = value.trim();
            return trimmed
                .parse::<usize>()
                .map_err(|_| FrameError::InvalidContentLength(trimmed.to_owned()));
        }
    }
    Err(FrameError::MissingContentLength)
}

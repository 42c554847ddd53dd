//! Line codec for the controller's text protocol.
//!
//! The controller terminates every status line with `\n` and expects every
//! command token to be terminated the same way. `LineCodec` implements the
//! Tokio codec traits so the framing logic is shared between the background
//! reader (decoding) and the command path (encoding):
//!
//! - [`Decoder`]: extracts complete lines from the raw byte stream
//! - [`Encoder<&str>`]: appends the terminator to an outgoing token
//!
//! # Malformed input
//!
//! Decoding never fails on bad bytes. Invalid UTF-8 sequences are dropped,
//! trailing whitespace (including `\r`) is trimmed. A line longer than the
//! configured maximum is discarded up to its terminator and reported once as
//! a [`LinkError::Decode`], after which decoding resumes normally.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use printgate_serial::codec::LineCodec;
//! use tokio_util::codec::{Decoder, Encoder};
//!
//! let mut codec = LineCodec::new();
//!
//! let mut inbound = BytesMut::from(&b"R:OK\r\nPLACE FIN"[..]);
//! assert_eq!(codec.decode(&mut inbound).unwrap(), Some("R:OK".to_string()));
//! assert_eq!(codec.decode(&mut inbound).unwrap(), None);
//!
//! let mut outbound = BytesMut::new();
//! codec.encode("V", &mut outbound).unwrap();
//! assert_eq!(&outbound[..], b"V\n");
//! ```

use bytes::{Buf, BufMut, BytesMut};
use printgate_core::constants::{DEFAULT_MAX_LINE_LENGTH, LINE_TERMINATOR};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::LinkError;

/// Newline-delimited text codec.
#[derive(Debug, Clone)]
pub struct LineCodec {
    /// Index in the buffer already scanned for a terminator.
    next_index: usize,

    /// Maximum accepted line length in bytes, terminator excluded.
    max_line_length: usize,

    /// Dropping an oversized line until the next terminator.
    discarding: bool,
}

impl LineCodec {
    /// Create a codec with the default maximum line length.
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length.
    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            next_index: 0,
            max_line_length,
            discarding: false,
        }
    }

    /// Get the maximum line length.
    pub fn max_line_length(&self) -> usize {
        self.max_line_length
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a raw line, skipping invalid UTF-8 and trimming trailing whitespace.
fn decode_line(raw: &[u8]) -> String {
    let text: String = raw.utf8_chunks().map(|chunk| chunk.valid()).collect();
    text.trim_end().to_string()
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = LinkError;

    /// Decode the next complete line.
    ///
    /// Returns `Ok(None)` until a terminator is buffered. Blank lines are
    /// returned as empty strings; filtering them is the caller's concern.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, LinkError> {
        loop {
            let newline = src[self.next_index..]
                .iter()
                .position(|b| *b == LINE_TERMINATOR)
                .map(|offset| offset + self.next_index);

            match (self.discarding, newline) {
                (true, Some(index)) => {
                    src.advance(index + 1);
                    self.discarding = false;
                    self.next_index = 0;
                }
                (true, None) => {
                    src.advance(src.len());
                    self.next_index = 0;
                    return Ok(None);
                }
                (false, Some(index)) => {
                    self.next_index = 0;
                    let line = src.split_to(index + 1);
                    if index > self.max_line_length {
                        return Err(LinkError::decode(format!(
                            "line of {} bytes exceeds {} bytes",
                            index, self.max_line_length
                        )));
                    }
                    return Ok(Some(decode_line(&line[..index])));
                }
                (false, None) if src.len() > self.max_line_length => {
                    self.discarding = true;
                    self.next_index = 0;
                    return Err(LinkError::decode(format!(
                        "line exceeds {} bytes",
                        self.max_line_length
                    )));
                }
                (false, None) => {
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }
}

impl<'a> Encoder<&'a str> for LineCodec {
    type Error = LinkError;

    fn encode(&mut self, token: &'a str, dst: &mut BytesMut) -> Result<(), LinkError> {
        dst.reserve(token.len() + 1);
        dst.put_slice(token.as_bytes());
        dst.put_u8(LINE_TERMINATOR);
        Ok(())
    }
}

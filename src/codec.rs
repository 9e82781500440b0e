//! Line codec - frames a TCP byte stream into chat lines.
//!
//! Splits on `\n`, drops a trailing `\r`, and decodes each line as UTF-8
//! with invalid sequences replaced by U+FFFD. Outgoing lines get a `\n`.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

/// Codec error: an over-long line or an I/O error.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("line exceeds maximum length ({0} bytes)")]
    LineTooLong(usize),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A tokio codec that frames chat lines on `\n` boundaries.
#[derive(Debug, Clone, Copy)]
pub struct ChatCodec {
    max_length: usize,
}

impl ChatCodec {
    /// `max_length` bounds a line's length, excluding the terminator
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }
}

fn decode_line(bytes: &[u8]) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

impl Decoder for ChatCodec {
    type Item = String;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match src.iter().position(|b| *b == b'\n') {
            Some(pos) if pos > self.max_length => Err(CodecError::LineTooLong(self.max_length)),
            Some(pos) => {
                let line = src.split_to(pos);
                src.advance(1); // skip \n
                Ok(Some(decode_line(&line)))
            }
            None if src.len() > self.max_length => Err(CodecError::LineTooLong(self.max_length)),
            None => Ok(None),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(src)? {
            return Ok(Some(line));
        }
        if src.is_empty() {
            return Ok(None);
        }
        // unterminated final line
        let line = src.split_to(src.len());
        Ok(Some(decode_line(&line)))
    }
}

impl Encoder<String> for ChatCodec {
    type Error = CodecError;

    fn encode(&mut self, item: String, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(item.len() + 1);
        dst.put_slice(item.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

//! Buffered transcoding writer used by `encode_to_stream`.

use crate::error::EncodeError;
use crate::OutputBuffer;
use encoding_rs::{CoderResult, EncoderResult, Encoding};
use std::io::Write;

pub type CharsetEncoder = encoding_rs::Encoder;

/// Moves text out of the engine's `OutputBuffer` into a byte sink, converting
/// it to the target charset on the way.
///
/// Bytes reach the sink in chunks of up to `threshold` bytes (never less than
/// 16), one `write_all` per chunk.
pub struct TextStreamer<'w> {
    sink: &'w mut dyn Write,
    encoder: CharsetEncoder,
    plain_text: bool,
    threshold: usize,
    chunk: Vec<u8>,
    filled: usize,
    writes: usize,
}

impl<'w> TextStreamer<'w> {
    pub const DEFAULT_FLUSH_THRESHOLD: usize = 1024;
    const MIN_CHUNK: usize = 16;

    pub fn new(sink: &'w mut dyn Write, encoding: &'static Encoding, plain_text: bool) -> Self {
        Self::with_threshold(sink, encoding, plain_text, Self::DEFAULT_FLUSH_THRESHOLD)
    }

    pub fn with_threshold(
        sink: &'w mut dyn Write,
        encoding: &'static Encoding,
        plain_text: bool,
        threshold: usize,
    ) -> Self {
        let threshold = threshold.max(1);
        Self {
            sink,
            encoder: encoding.new_encoder(),
            plain_text,
            threshold,
            chunk: vec![0; threshold.max(Self::MIN_CHUNK)],
            filled: 0,
            writes: 0,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Number of `write_all` calls made on the sink so far.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Transcode and write `out` once it holds more than `threshold` UTF-16
    /// units.
    pub fn flush_if_long_enough(&mut self, out: &mut OutputBuffer) -> Result<(), EncodeError> {
        if out.len_utf16() <= self.threshold {
            return Ok(());
        }
        self.flush(out, false)
    }

    /// Transcode and write whatever is buffered, finishing the charset
    /// encoder's state.
    pub fn force_flush(&mut self, out: &mut OutputBuffer) -> Result<(), EncodeError> {
        self.flush(out, true)
    }

    fn flush(&mut self, out: &mut OutputBuffer, last: bool) -> Result<(), EncodeError> {
        log::debug!(
            target: "encoder.stream",
            "flush {} utf-16 units (last: {last})",
            out.len_utf16()
        );
        let result = self.encode_and_write(out.as_str(), last);
        out.clear();
        result.map_err(EncodeError::from)
    }

    fn encode_and_write(&mut self, mut text: &str, last: bool) -> std::io::Result<()> {
        loop {
            // Plain text keeps one byte spare for the substitution character.
            let limit = if self.plain_text {
                self.chunk.len() - 1
            } else {
                self.chunk.len()
            };
            let dst = &mut self.chunk[self.filled..limit];
            let done = if self.plain_text {
                let (result, read, written) =
                    self.encoder.encode_from_utf8_without_replacement(text, dst, last);
                text = &text[read..];
                self.filled += written;
                match result {
                    EncoderResult::InputEmpty => true,
                    EncoderResult::OutputFull => {
                        self.write_chunk()?;
                        false
                    }
                    EncoderResult::Unmappable(ch) => {
                        log::trace!(target: "encoder.stream", "unmappable {ch:?} replaced");
                        self.chunk[self.filled] = b'?';
                        self.filled += 1;
                        false
                    }
                }
            } else {
                let (result, read, written, _) = self.encoder.encode_from_utf8(text, dst, last);
                text = &text[read..];
                self.filled += written;
                match result {
                    CoderResult::InputEmpty => true,
                    CoderResult::OutputFull => {
                        self.write_chunk()?;
                        false
                    }
                }
            };
            if self.filled >= limit {
                self.write_chunk()?;
            }
            if done {
                break;
            }
        }
        self.write_chunk()
    }

    fn write_chunk(&mut self) -> std::io::Result<()> {
        if self.filled == 0 {
            return Ok(());
        }
        let filled = std::mem::take(&mut self.filled);
        self.writes += 1;
        self.sink.write_all(&self.chunk[..filled])
    }
}

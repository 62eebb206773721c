//! Consumers of the substituted character stream.

use std::io::{self, Write};

use crate::decode::Encoding;

/// Accepts an ordered sequence of characters.
pub trait CharSink {
    fn write_chars(&mut self, chars: &[char]) -> io::Result<()>;

    /// Push everything written so far to its final destination.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl CharSink for String {
    fn write_chars(&mut self, chars: &[char]) -> io::Result<()> {
        self.extend(chars);
        Ok(())
    }
}

impl CharSink for Vec<char> {
    fn write_chars(&mut self, chars: &[char]) -> io::Result<()> {
        self.extend_from_slice(chars);
        Ok(())
    }
}

impl<S: CharSink + ?Sized> CharSink for &mut S {
    fn write_chars(&mut self, chars: &[char]) -> io::Result<()> {
        (**self).write_chars(chars)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// Encodes characters onto a byte writer.
///
/// Characters the encoding cannot represent fail the write with
/// [`io::ErrorKind::InvalidData`].
pub struct WriterSink<W: Write> {
    writer: W,
    encoding: Encoding,
    bytes: Vec<u8>,
    bytes_written: u64,
}

impl<W: Write> WriterSink<W> {
    pub fn new(writer: W, encoding: Encoding) -> Self {
        Self {
            writer,
            encoding,
            bytes: Vec::new(),
            bytes_written: 0,
        }
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> CharSink for WriterSink<W> {
    fn write_chars(&mut self, chars: &[char]) -> io::Result<()> {
        self.bytes.clear();
        self.encoding
            .encode_into(chars, &mut self.bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.writer.write_all(&self.bytes)?;
        self.bytes_written += self.bytes.len() as u64;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

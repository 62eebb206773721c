//! Producers of the character stream fed to the substitutor.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::str::Chars;

use crate::decode::{Encoding, StreamDecoder};

/// A finite, ordered, non-restartable sequence of characters.
pub trait CharSource {
    /// Fill a prefix of `buf` and return how many characters were written.
    ///
    /// `Ok(0)` with a non-empty `buf` means the source is exhausted.
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize>;
}

/// Characters of a borrowed string.
pub struct StrSource<'a> {
    chars: Chars<'a>,
}

impl<'a> StrSource<'a> {
    pub fn new(s: &'a str) -> Self {
        Self { chars: s.chars() }
    }
}

impl CharSource for StrSource<'_> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        let mut n = 0;
        for slot in buf.iter_mut() {
            match self.chars.next() {
                Some(ch) => *slot = ch,
                None => break,
            }
            n += 1;
        }
        Ok(n)
    }
}

/// Size of the byte buffer used for each underlying read.
const READ_CHUNK: usize = 8 * 1024;

/// Decodes characters from a byte reader.
///
/// Malformed input is reported as an [`io::ErrorKind::InvalidData`] error
/// wrapping the [`DecodeError`](crate::decode::DecodeError).
pub struct ReaderSource<R> {
    reader: R,
    decoder: StreamDecoder,
    bytes: Vec<u8>,
    /// Decoded characters not yet handed out.
    decoded: VecDeque<char>,
    scratch: Vec<char>,
    eof: bool,
    bytes_read: u64,
}

impl<R: Read> ReaderSource<R> {
    pub fn new(reader: R, encoding: Encoding) -> Self {
        Self {
            reader,
            decoder: StreamDecoder::new(encoding),
            bytes: vec![0u8; READ_CHUNK],
            decoded: VecDeque::new(),
            scratch: Vec::new(),
            eof: false,
            bytes_read: 0,
        }
    }

    /// Total bytes pulled from the underlying reader.
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Read and decode one chunk. Returns false once the reader is exhausted.
    fn fill_decoded(&mut self) -> io::Result<bool> {
        loop {
            let n = match self.reader.read(&mut self.bytes) {
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.eof = true;
                self.decoder
                    .finish()
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                return Ok(false);
            }
            self.bytes_read += n as u64;
            self.scratch.clear();
            self.decoder
                .decode(&self.bytes[..n], &mut self.scratch)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
            self.decoded.extend(self.scratch.iter().copied());
            // A chunk may end mid-sequence and decode to nothing yet.
            if !self.decoded.is_empty() {
                return Ok(true);
            }
        }
    }
}

impl<R: Read> CharSource for ReaderSource<R> {
    fn read_chars(&mut self, buf: &mut [char]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.decoded.is_empty() && (self.eof || !self.fill_decoded()?) {
            return Ok(0);
        }
        let n = buf.len().min(self.decoded.len());
        for (slot, ch) in buf.iter_mut().zip(self.decoded.drain(..n)) {
            *slot = ch;
        }
        Ok(n)
    }
}

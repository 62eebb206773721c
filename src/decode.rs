//! Conversion between external bytes and the engine's `char` stream.
//!
//! A multi-byte UTF-8 sequence can be split across two reads, so
//! [`StreamDecoder`] carries an incomplete trailing sequence over to the
//! next chunk instead of rejecting it.

use std::fmt;
use std::str::FromStr;

use phf::{Map, phf_map};
use thiserror::Error;

/// Character encodings understood on the stream and in pattern arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    /// ISO-8859-1: every byte is the code point of the same value.
    Latin1,
    Ascii,
}

/// Accepted spellings of each encoding, lowercase.
const LABEL_TO_ENCODING: Map<&'static str, Encoding> = phf_map! {
    "ascii" => Encoding::Ascii,
    "iso-8859-1" => Encoding::Latin1,
    "iso8859-1" => Encoding::Latin1,
    "latin-1" => Encoding::Latin1,
    "latin1" => Encoding::Latin1,
    "us-ascii" => Encoding::Ascii,
    "utf-8" => Encoding::Utf8,
    "utf8" => Encoding::Utf8,
};

/// Errors converting between bytes and characters.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("invalid {encoding} sequence at byte {offset}")]
    InvalidSequence { encoding: Encoding, offset: usize },
    #[error("input ends in the middle of a {encoding} sequence at byte {offset}")]
    Truncated { encoding: Encoding, offset: usize },
    #[error("character {ch:?} cannot be represented in {encoding}")]
    Unencodable { encoding: Encoding, ch: char },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown encoding '{0}'")]
pub struct UnknownEncoding(pub String);

impl Encoding {
    /// Look up an encoding by label, ignoring case.
    pub fn from_label(label: &str) -> Option<Encoding> {
        LABEL_TO_ENCODING
            .get(label.to_ascii_lowercase().as_str())
            .copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Ascii => "US-ASCII",
        }
    }

    /// Decode a complete byte string.
    pub fn decode(&self, bytes: &[u8]) -> Result<Vec<char>, DecodeError> {
        let mut decoder = StreamDecoder::new(*self);
        let mut out = Vec::with_capacity(bytes.len());
        decoder.decode(bytes, &mut out)?;
        decoder.finish()?;
        Ok(out)
    }

    /// Append the encoded form of `chars` to `out`.
    pub fn encode_into(&self, chars: &[char], out: &mut Vec<u8>) -> Result<(), DecodeError> {
        match self {
            Encoding::Utf8 => {
                let mut buf = [0u8; 4];
                for ch in chars {
                    out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
                }
            }
            Encoding::Latin1 | Encoding::Ascii => {
                let limit = if *self == Encoding::Latin1 { 0xFF } else { 0x7F };
                for &ch in chars {
                    if u32::from(ch) > limit {
                        return Err(DecodeError::Unencodable {
                            encoding: *self,
                            ch,
                        });
                    }
                    out.push(u32::from(ch) as u8);
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Encoding {
    type Err = UnknownEncoding;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Encoding::from_label(s).ok_or_else(|| UnknownEncoding(s.to_string()))
    }
}

/// Incremental decoder for a byte stream delivered in arbitrary chunks.
pub struct StreamDecoder {
    encoding: Encoding,
    /// Start of an incomplete UTF-8 sequence left over from the last chunk.
    pending: Vec<u8>,
    /// Bytes fully decoded so far, for error offsets.
    offset: usize,
}

impl StreamDecoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            pending: Vec::with_capacity(4),
            offset: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    /// Decode the next chunk, appending complete characters to `out`.
    pub fn decode(&mut self, bytes: &[u8], out: &mut Vec<char>) -> Result<(), DecodeError> {
        match self.encoding {
            Encoding::Utf8 => self.decode_utf8(bytes, out),
            Encoding::Latin1 => {
                out.extend(bytes.iter().map(|&b| char::from(b)));
                self.offset += bytes.len();
                Ok(())
            }
            Encoding::Ascii => {
                if let Some(bad) = bytes.iter().position(|b| !b.is_ascii()) {
                    return Err(DecodeError::InvalidSequence {
                        encoding: self.encoding,
                        offset: self.offset + bad,
                    });
                }
                out.extend(bytes.iter().map(|&b| char::from(b)));
                self.offset += bytes.len();
                Ok(())
            }
        }
    }

    /// Signal end of input. Fails if a sequence was left incomplete.
    pub fn finish(&self) -> Result<(), DecodeError> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            Err(DecodeError::Truncated {
                encoding: self.encoding,
                offset: self.offset,
            })
        }
    }

    fn decode_utf8(&mut self, mut bytes: &[u8], out: &mut Vec<char>) -> Result<(), DecodeError> {
        // Finish the sequence carried over from the previous chunk first.
        while !self.pending.is_empty() {
            let Some((&b, rest)) = bytes.split_first() else {
                return Ok(());
            };
            self.pending.push(b);
            bytes = rest;
            match std::str::from_utf8(&self.pending) {
                Ok(s) => {
                    out.extend(s.chars());
                    self.offset += self.pending.len();
                    self.pending.clear();
                }
                Err(e) if e.error_len().is_some() => return Err(self.invalid()),
                Err(_) => {}
            }
        }

        match std::str::from_utf8(bytes) {
            Ok(s) => {
                out.extend(s.chars());
                self.offset += bytes.len();
                Ok(())
            }
            Err(e) => {
                let valid = e.valid_up_to();
                // The prefix is known to be valid, so this never substitutes.
                out.extend(String::from_utf8_lossy(&bytes[..valid]).chars());
                self.offset += valid;
                match e.error_len() {
                    Some(_) => Err(self.invalid()),
                    None => {
                        self.pending.extend_from_slice(&bytes[valid..]);
                        Ok(())
                    }
                }
            }
        }
    }

    fn invalid(&self) -> DecodeError {
        DecodeError::InvalidSequence {
            encoding: self.encoding,
            offset: self.offset,
        }
    }
}

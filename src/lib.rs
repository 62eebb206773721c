//! Bounded-memory literal substitution over a character stream.
//!
//! A [`PatternIndex`] holds the needles and their replacements; a
//! [`StreamSubstitutor`] copies a [`CharSource`] to a [`CharSink`] through a
//! fixed-size window, replacing every needle it finds. Needles may straddle
//! read boundaries freely.
//!
//! # Example
//!
//! ```rust
//! use substitute::{PatternIndex, substitute_str};
//!
//! let mut index = PatternIndex::new();
//! let needle: Vec<char> = "id".chars().collect();
//! index.insert(&needle, "hello".chars().collect::<Vec<char>>()).unwrap();
//!
//! assert_eq!(
//!     substitute_str(&index, "the id is here").unwrap(),
//!     "the hello is here"
//! );
//!
//! // A needle may not be a prefix of another one.
//! let longer: Vec<char> = "idle".chars().collect();
//! assert!(index.insert(&longer, Vec::new()).is_err());
//! ```

pub mod config;
pub mod decode;
pub mod file;
pub mod pattern_index;
pub mod sink;
pub mod source;
pub mod substitutor;

#[cfg(test)]
mod proptests;

pub use config::{Rejection, RejectReason, Replacement, SubstituteConfig, WindowConfig};
pub use decode::{DecodeError, Encoding, StreamDecoder};
pub use file::{STDIO_PATH, substitute_file};
pub use pattern_index::{IndexError, MatchCursor, PatternIndex};
pub use sink::{CharSink, WriterSink};
pub use source::{CharSource, ReaderSource, StrSource};
pub use substitutor::{
    StreamSubstitutor, SubstituteError, SubstituteStats, substitute, substitute_str,
};

//! Run configuration and construction of the replacement index from it.

use std::fmt;

use log::{debug, warn};
use thiserror::Error;

use crate::decode::{DecodeError, Encoding};
use crate::pattern_index::{IndexError, PatternIndex};

/// Default size of the input and output windows, in characters.
pub const DEFAULT_WINDOW: usize = 8 * 1024;

/// Buffer sizing for a substitution pass.
///
/// These are lower bounds: the input window always holds at least one
/// character more than the longest needle, and the output window always
/// fits the longest replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowConfig {
    pub input_window: usize,
    pub output_window: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            input_window: DEFAULT_WINDOW,
            output_window: DEFAULT_WINDOW,
        }
    }
}

/// A needle and its replacement as raw, not yet decoded, bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub needle: Vec<u8>,
    pub replacement: Vec<u8>,
}

impl Replacement {
    pub fn new(needle: impl Into<Vec<u8>>, replacement: impl Into<Vec<u8>>) -> Self {
        Self {
            needle: needle.into(),
            replacement: replacement.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SubstituteConfig {
    /// Pairs in the order they were supplied. Earlier pairs win collisions.
    pub replacements: Vec<Replacement>,
    /// Encoding of the stream and of the pairs.
    pub encoding: Encoding,
    pub windows: WindowConfig,
    /// Treat any rejected pair as a fatal configuration error.
    pub strict: bool,
}

/// Why a single pair was left out of the index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("needle: {0}")]
    Needle(DecodeError),
    #[error("replacement: {0}")]
    Replacement(DecodeError),
    #[error(transparent)]
    Index(IndexError),
}

/// A pair that was not accepted into the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Zero-based position of the pair in [`SubstituteConfig::replacements`].
    pub position: usize,
    /// The needle as given, lossily decoded for display.
    pub needle: String,
    pub reason: RejectReason,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "replacement #{} ({:?}): {}",
            self.position + 1,
            self.needle,
            self.reason
        )
    }
}

impl SubstituteConfig {
    /// Decode every pair and insert it into a fresh index.
    ///
    /// Pairs that fail to decode or collide with an earlier pair are skipped
    /// and reported; only running out of memory aborts the whole build.
    pub fn build_index(&self) -> Result<(PatternIndex<Vec<char>>, Vec<Rejection>), IndexError> {
        let mut index = PatternIndex::new();
        let mut rejections = Vec::new();

        for (position, pair) in self.replacements.iter().enumerate() {
            let reason = match self.insert_pair(&mut index, pair) {
                Ok(()) => continue,
                Err(RejectReason::Index(IndexError::ResourceExhausted)) => {
                    return Err(IndexError::ResourceExhausted);
                }
                Err(reason) => reason,
            };
            let rejection = Rejection {
                position,
                needle: String::from_utf8_lossy(&pair.needle).into_owned(),
                reason,
            };
            warn!("Skipping {rejection}");
            rejections.push(rejection);
        }

        debug!(
            "Built index with {} needle(s), height {}",
            index.len(),
            index.height()
        );
        Ok((index, rejections))
    }

    fn insert_pair(
        &self,
        index: &mut PatternIndex<Vec<char>>,
        pair: &Replacement,
    ) -> Result<(), RejectReason> {
        let needle = self
            .encoding
            .decode(&pair.needle)
            .map_err(RejectReason::Needle)?;
        let replacement = self
            .encoding
            .decode(&pair.replacement)
            .map_err(RejectReason::Replacement)?;
        index
            .insert(&needle, replacement)
            .map_err(RejectReason::Index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pairs: &[(&str, &str)]) -> SubstituteConfig {
        SubstituteConfig {
            replacements: pairs
                .iter()
                .map(|(n, r)| Replacement::new(*n, *r))
                .collect(),
            ..Default::default()
        }
    }

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_default_windows() {
        let windows = WindowConfig::default();
        assert_eq!(windows.input_window, DEFAULT_WINDOW);
        assert_eq!(windows.output_window, DEFAULT_WINDOW);
    }

    #[test]
    fn test_build_index_all_accepted() {
        let cfg = config(&[("id", "hello"), ("ipsum", "world"), ("mattis", "foobar")]);
        let (index, rejections) = cfg.build_index().unwrap();
        assert!(rejections.is_empty());
        assert_eq!(index.len(), 3);
        assert_eq!(index.height(), 6);
        assert_eq!(index.get(&chars("ipsum")), Some(&chars("world")));
    }

    #[test]
    fn test_collision_rejects_only_offending_pair() {
        let cfg = config(&[("foo", "1"), ("foobar", "2"), ("baz", "3")]);
        let (index, rejections) = cfg.build_index().unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(
            rejections,
            vec![Rejection {
                position: 1,
                needle: "foobar".to_string(),
                reason: RejectReason::Index(IndexError::KeyCollision),
            }]
        );
        assert_eq!(index.get(&chars("baz")), Some(&chars("3")));
    }

    #[test]
    fn test_decode_failure_is_per_pair() {
        let cfg = SubstituteConfig {
            replacements: vec![
                Replacement::new("ok", "fine"),
                Replacement::new(b"bad\xff".to_vec(), "x"),
                Replacement::new("y", b"\xfe".to_vec()),
            ],
            ..Default::default()
        };
        let (index, rejections) = cfg.build_index().unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(rejections.len(), 2);
        assert!(matches!(rejections[0].reason, RejectReason::Needle(_)));
        assert!(matches!(rejections[1].reason, RejectReason::Replacement(_)));
    }

    #[test]
    fn test_empty_needle_rejected() {
        let cfg = config(&[("", "nothing")]);
        let (index, rejections) = cfg.build_index().unwrap();
        assert!(index.is_empty());
        assert_eq!(
            rejections[0].reason,
            RejectReason::Index(IndexError::EmptyKey)
        );
    }

    #[test]
    fn test_latin1_pairs() {
        let cfg = SubstituteConfig {
            replacements: vec![Replacement::new(b"caf\xe9".to_vec(), "tea")],
            encoding: Encoding::Latin1,
            ..Default::default()
        };
        let (index, _) = cfg.build_index().unwrap();
        assert_eq!(index.get(&chars("café")), Some(&chars("tea")));
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection {
            position: 0,
            needle: "hello".to_string(),
            reason: RejectReason::Index(IndexError::KeyCollision),
        };
        assert_eq!(
            rejection.to_string(),
            "replacement #1 (\"hello\"): needle collides with a previously accepted needle"
        );
    }
}

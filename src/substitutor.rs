//! Streaming substitution engine.
//!
//! Characters are pulled from a [`CharSource`] into a fixed input window and
//! matched against a [`PatternIndex`] one scan origin at a time. At each
//! origin the matcher walks the trie as far as the input allows:
//!
//! - reaching a payload emits the replacement and skips the whole needle;
//! - falling off the trie emits the single character at the origin and
//!   retries from the next one, since a shorter needle may start there.
//!
//! Until the source is exhausted the last `height()` characters of the
//! window are never resolved: they could be the start of a needle that
//! completes after the next refill. They are shifted to the front and the
//! rest of the window is refilled. Memory use is therefore bounded by the
//! longest needle and the longest replacement, whatever the input size.

use std::collections::TryReserveError;
use std::io;

use log::{debug, info};
use thiserror::Error;

use crate::config::WindowConfig;
use crate::pattern_index::PatternIndex;
use crate::sink::CharSink;
use crate::source::{CharSource, StrSource};

#[derive(Debug, Error)]
pub enum SubstituteError {
    /// Reading the source or writing the sink failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("out of memory allocating substitution windows")]
    ResourceExhausted,
}

impl From<TryReserveError> for SubstituteError {
    fn from(_: TryReserveError) -> Self {
        SubstituteError::ResourceExhausted
    }
}

/// Counters for one completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubstituteStats {
    pub chars_read: u64,
    pub chars_written: u64,
    pub replacements: u64,
}

/// Resolved output waiting to be handed to the sink.
struct OutputWindow {
    buf: Vec<char>,
    cap: usize,
}

impl OutputWindow {
    fn push<K: CharSink + ?Sized>(&mut self, chars: &[char], sink: &mut K) -> io::Result<()> {
        if self.buf.len() + chars.len() > self.cap {
            self.flush(sink)?;
        }
        if chars.len() > self.cap {
            return sink.write_chars(chars);
        }
        self.buf.extend_from_slice(chars);
        Ok(())
    }

    fn flush<K: CharSink + ?Sized>(&mut self, sink: &mut K) -> io::Result<()> {
        if !self.buf.is_empty() {
            sink.write_chars(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }
}

/// Per-stream state for substituting against a shared, frozen index.
pub struct StreamSubstitutor<'a, V> {
    index: &'a PatternIndex<V>,
    input: Vec<char>,
    output: OutputWindow,
}

impl<'a, V: AsRef<[char]>> StreamSubstitutor<'a, V> {
    /// Allocate the windows for `index`. The sizes in `windows` are raised
    /// as needed to fit the longest needle and the longest replacement.
    pub fn new(
        index: &'a PatternIndex<V>,
        windows: &WindowConfig,
    ) -> Result<Self, SubstituteError> {
        let height = index.height();
        let input_cap = windows.input_window.max(height + 1);
        let longest_replacement = index
            .iter()
            .map(|(_, replacement)| replacement.as_ref().len())
            .max()
            .unwrap_or(0);
        let output_cap = windows.output_window.max(longest_replacement).max(1);

        let mut input = Vec::new();
        input.try_reserve_exact(input_cap)?;
        input.resize(input_cap, '\0');
        let mut output = Vec::new();
        output.try_reserve_exact(output_cap)?;

        debug!(
            "Substitution windows: input {input_cap} chars (height {height}), output {output_cap} chars"
        );
        Ok(Self {
            index,
            input,
            output: OutputWindow {
                buf: output,
                cap: output_cap,
            },
        })
    }

    /// Copy `source` to `sink`, replacing every needle.
    ///
    /// The sink is flushed on success. On failure whatever was already
    /// written stays written.
    pub fn run<S, K>(
        &mut self,
        source: &mut S,
        sink: &mut K,
    ) -> Result<SubstituteStats, SubstituteError>
    where
        S: CharSource + ?Sized,
        K: CharSink + ?Sized,
    {
        let index = self.index;
        let height = index.height();
        let cap = self.input.len();
        let mut stats = SubstituteStats::default();
        let mut len = 0;
        let mut exhausted = false;
        self.output.buf.clear();

        loop {
            if !exhausted {
                let n = fill(source, &mut self.input[len..])?;
                stats.chars_read += n as u64;
                len += n;
                exhausted = len < cap;
            }

            // Keep back anything that might still grow into a match.
            let retain = if exhausted { 0 } else { height };
            let window = &self.input[..len];
            let mut pos = 0;
            while len - pos > retain {
                match match_at(index, &window[pos..]) {
                    Some((needle_len, replacement)) => {
                        let replacement = replacement.as_ref();
                        self.output.push(replacement, sink)?;
                        stats.replacements += 1;
                        stats.chars_written += replacement.len() as u64;
                        pos += needle_len;
                    }
                    None => {
                        self.output.push(&window[pos..=pos], sink)?;
                        stats.chars_written += 1;
                        pos += 1;
                    }
                }
            }

            self.input.copy_within(pos..len, 0);
            len -= pos;
            if exhausted {
                break;
            }
        }

        self.output.flush(sink)?;
        sink.flush()?;
        info!(
            "Substituted {} replacement(s): {} chars in, {} chars out",
            stats.replacements, stats.chars_read, stats.chars_written
        );
        Ok(stats)
    }
}

/// The needle that `text` starts with, as its length and payload.
///
/// Prefix-exclusivity means at most one needle can match here, so the walk
/// stops at the first payload.
fn match_at<'a, V>(index: &'a PatternIndex<V>, text: &[char]) -> Option<(usize, &'a V)> {
    let mut cursor = index.cursor_at_root();
    for &ch in text {
        cursor = index.advance(cursor, ch)?;
        if let Some(payload) = index.payload_at(cursor) {
            return Some((cursor.depth(), payload));
        }
    }
    None
}

/// Read until `buf` is full or the source is exhausted.
fn fill<S: CharSource + ?Sized>(source: &mut S, buf: &mut [char]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read_chars(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Run one pass with freshly allocated windows.
pub fn substitute<V, S, K>(
    index: &PatternIndex<V>,
    source: &mut S,
    sink: &mut K,
    windows: &WindowConfig,
) -> Result<SubstituteStats, SubstituteError>
where
    V: AsRef<[char]>,
    S: CharSource + ?Sized,
    K: CharSink + ?Sized,
{
    StreamSubstitutor::new(index, windows)?.run(source, sink)
}

/// Substitute an in-memory string.
pub fn substitute_str<V: AsRef<[char]>>(
    index: &PatternIndex<V>,
    input: &str,
) -> Result<String, SubstituteError> {
    let mut out = String::with_capacity(input.len());
    substitute(
        index,
        &mut StrSource::new(input),
        &mut out,
        &WindowConfig::default(),
    )?;
    Ok(out)
}

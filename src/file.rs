//! Substituting one file (or standard stream) into another.
//!
//! The source is opened before the destination is touched, and output goes
//! to a temporary file next to the destination that only replaces it once
//! the whole pass has succeeded. A failed run leaves an existing
//! destination exactly as it was.

use std::fs::{self, File};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};
use tempfile::{Builder, NamedTempFile};

use crate::config::SubstituteConfig;
use crate::pattern_index::PatternIndex;
use crate::sink::WriterSink;
use crate::source::ReaderSource;
use crate::substitutor::{StreamSubstitutor, SubstituteStats};

/// Path designating standard input as source or standard output as
/// destination.
pub const STDIO_PATH: &str = "-";

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == STDIO_PATH
}

/// Open `src` for reading, making sure it is something we can read from.
fn open_source(src: &Path) -> Result<Box<dyn Read>> {
    if is_stdio(src) {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file =
        File::open(src).with_context(|| format!("Failed to open source {}", src.display()))?;
    let metadata = file
        .metadata()
        .with_context(|| format!("Failed to stat source {}", src.display()))?;
    if metadata.is_dir() {
        bail!("Source {} is a directory", src.display());
    }
    Ok(Box::new(file))
}

/// Copy `src` to `dest`, applying every replacement in `index`.
///
/// Either path may be [`STDIO_PATH`].
pub fn substitute_file(
    src: &Path,
    dest: &Path,
    index: &PatternIndex<Vec<char>>,
    config: &SubstituteConfig,
) -> Result<SubstituteStats> {
    let reader = open_source(src)?;
    let mut source = ReaderSource::new(reader, config.encoding);
    let mut substitutor = StreamSubstitutor::new(index, &config.windows)?;

    let stats = if is_stdio(dest) {
        let mut sink = WriterSink::new(BufWriter::new(io::stdout().lock()), config.encoding);
        substitutor
            .run(&mut source, &mut sink)
            .with_context(|| format!("Failed to substitute {}", src.display()))?
    } else {
        write_atomically(dest, |file| {
            let mut sink = WriterSink::new(BufWriter::new(file), config.encoding);
            substitutor
                .run(&mut source, &mut sink)
                .with_context(|| format!("Failed to substitute {}", src.display()))
        })?
    };

    info!(
        "{} -> {}: {} replacement(s), {} chars read",
        src.display(),
        dest.display(),
        stats.replacements,
        stats.chars_read
    );
    Ok(stats)
}

/// The path actually written: an existing destination is resolved through
/// symlinks so the link target receives the output, not the link.
fn resolve_destination(dest: &Path) -> Result<PathBuf> {
    match fs::symlink_metadata(dest) {
        Ok(_) => fs::canonicalize(dest)
            .with_context(|| format!("Failed to resolve destination {}", dest.display())),
        Err(_) => Ok(dest.to_path_buf()),
    }
}

/// A temp file in `dir` created with the mode a plain new file would get.
fn create_temp_in(dir: &Path) -> io::Result<NamedTempFile> {
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Subject to the umask, like `File::create`.
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir)
}

/// Run `write` against a temporary file in `dest`'s directory and move it
/// over `dest` only if it succeeds.
fn write_atomically<T>(dest: &Path, write: impl FnOnce(&mut File) -> Result<T>) -> Result<T> {
    let target = resolve_destination(dest)?;
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut temp = create_temp_in(parent)
        .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
    debug!("Writing {} via {}", target.display(), temp.path().display());

    let value = write(temp.as_file_mut())?;
    temp.as_file_mut()
        .flush()
        .with_context(|| format!("Failed to write {}", temp.path().display()))?;

    // Keep the permissions of a file we are replacing.
    if let Ok(metadata) = fs::metadata(&target) {
        fs::set_permissions(temp.path(), metadata.permissions())
            .with_context(|| format!("Failed to set permissions on {}", temp.path().display()))?;
    }
    temp.persist(&target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", dest.display()))?;
    Ok(value)
}

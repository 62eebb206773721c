use std::ffi::OsString;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::{ArgAction, Parser};
use itertools::Itertools;
use log::debug;

use substitute::config::DEFAULT_WINDOW;
use substitute::{Encoding, Replacement, SubstituteConfig, WindowConfig, substitute_file};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Example: substitute -r foo bar in.txt out.txt")]
struct Args {
    /// Replaces the NEEDLE in the source text with REPLACEMENT
    #[arg(
        short = 'r',
        long = "replace",
        num_args = 2,
        value_names = ["NEEDLE", "REPLACEMENT"],
        action = ArgAction::Append,
        value_parser = clap::value_parser!(OsString)
    )]
    replace: Vec<OsString>,

    /// Encoding of the source, the destination and the replacements
    #[arg(short = 'e', long, value_name = "ENCODING", default_value = "utf-8")]
    encoding: Encoding,

    /// Fail instead of skipping replacements that collide with another
    #[arg(long)]
    strict: bool,

    /// Minimum look-ahead window, in characters
    #[arg(long, value_name = "CHARS", default_value_t = DEFAULT_WINDOW, hide = true)]
    window: usize,

    /// Increase verbosity
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    /// Only report errors
    #[arg(short, long)]
    quiet: bool,

    /// Source file, or - for standard input
    #[arg(value_name = "SRC")]
    src: PathBuf,

    /// Destination file, or - for standard output
    #[arg(value_name = "DEST")]
    dest: PathBuf,
}

fn init_logging(verbose: u8, quiet: bool) {
    let log_level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, 2) => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();
}

/// Raw bytes of an argument, to be decoded with the `-e` encoding.
#[cfg(unix)]
fn arg_bytes(arg: OsString, _encoding: Encoding) -> Result<Vec<u8>> {
    use std::os::unix::ffi::OsStringExt;
    Ok(arg.into_vec())
}

/// Arguments arrive as Unicode here, so they are re-encoded in the `-e`
/// encoding rather than passed through.
#[cfg(not(unix))]
fn arg_bytes(arg: OsString, encoding: Encoding) -> Result<Vec<u8>> {
    let Ok(text) = arg.into_string() else {
        bail!("Argument is not valid Unicode");
    };
    let mut bytes = Vec::new();
    encoding.encode_into(&text.chars().collect_vec(), &mut bytes)?;
    Ok(bytes)
}

fn run(args: Args) -> Result<()> {
    let encoding = args.encoding;
    let replacements: Vec<Replacement> = args
        .replace
        .into_iter()
        .tuples::<(OsString, OsString)>()
        .map(|(needle, replacement)| -> Result<Replacement> {
            Ok(Replacement::new(
                arg_bytes(needle, encoding)?,
                arg_bytes(replacement, encoding)?,
            ))
        })
        .collect::<Result<_>>()?;

    let config = SubstituteConfig {
        replacements,
        encoding,
        windows: WindowConfig {
            input_window: args.window,
            output_window: args.window,
        },
        strict: args.strict,
    };
    debug!("{:?}", config);

    let (index, rejections) = config.build_index()?;
    if config.strict && !rejections.is_empty() {
        bail!(
            "{} replacement{} rejected: {}",
            rejections.len(),
            if rejections.len() == 1 { "" } else { "s" },
            rejections.iter().join("; ")
        );
    }

    substitute_file(&args.src, &args.dest, &index, &config)?;
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose, args.quiet);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error substituting: {err:#}");
            ExitCode::FAILURE
        }
    }
}

//! Command-line surface of `wuart-tool`.
//!
//! [`Cli`] is parsed by clap in `main.rs`; [`execute`] runs one subcommand
//! against a loaded [`ToolConfig`] and writes its output to any writer, which
//! keeps the whole command path testable without a terminal.

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};

use wuart_core::protocol::transport::{send_packet, IoSink};

use crate::application::{build_frame, escape_text, hex, parse_frames};
use crate::infrastructure::storage::config::{save_config, ToolConfig};

#[derive(Parser, Debug)]
#[command(version, about = "Build, parse and escape wireless UART packets")]
pub struct Cli {
    /// Configuration file (defaults to the platform config directory).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Force debug logging.
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a frame and print it as \XX pairs
    Build(BuildArgs),
    /// Find packets in a captured byte stream
    Parse(ParseArgs),
    /// Escape a value (text, or 0x-prefixed hex)
    Escape { value: String },
    /// Unescape a value
    Unescape { text: String },
    /// Print the effective configuration
    Config {
        /// Also write it to the configuration file
        #[arg(long)]
        save: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Packet key
    #[arg(short, long, default_value = "test")]
    pub key: String,
    /// Packet value: text, or 0x-prefixed hex; empty for a key-only packet
    #[arg(short, long, default_value = "")]
    pub val: String,
    /// Escape the value before framing
    #[arg(long)]
    pub escape: bool,
    /// Append the end symbol
    #[arg(long)]
    pub end: bool,
    /// Write raw frame bytes instead of \XX text
    #[arg(long)]
    pub raw: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Hex input: \23\24.., 0x2324.. or 2324..
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read raw bytes from a file instead
    #[arg(short, long)]
    pub file: Option<PathBuf>,
    /// Unescape packet values
    #[arg(long)]
    pub unescape: bool,
}

/// Runs `command`, writing its output to `out`.
///
/// # Errors
///
/// Returns an error for invalid arguments (bad hex, invalid key), unreadable
/// input files, configuration write failures, or a failing `out`.
pub fn execute(
    command: &Command,
    cli_config: Option<&std::path::Path>,
    config: &ToolConfig,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    match command {
        Command::Build(args) => run_build(args, config, out),
        Command::Parse(args) => run_parse(args, config, out),
        Command::Escape { value } => {
            writeln!(out, "{}", escape_text::escape_text(value)?)?;
            Ok(())
        }
        Command::Unescape { text } => {
            writeln!(out, "{}", escape_text::unescape_text(text))?;
            Ok(())
        }
        Command::Config { save } => {
            write!(out, "{}", toml::to_string_pretty(config)?)?;
            if *save {
                let path = save_config(config, cli_config)?;
                tracing::info!(path = %path.display(), "configuration saved");
            }
            Ok(())
        }
    }
}

fn run_build(args: &BuildArgs, config: &ToolConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let mut options = build_frame::BuildOptions {
        escape_value: args.escape || config.codec.escape_values,
        frame: config.frame.clone(),
    };
    options.frame.append_end_symbol |= args.end;

    if args.raw {
        let packet = build_frame::build_packet(&args.key, &args.val, options.escape_value)?;
        let mut sink = IoSink::new(out);
        send_packet(&mut sink, &packet, &options.frame)?;
        return Ok(());
    }

    let bytes = build_frame::build_frame(&args.key, &args.val, &options)?;
    writeln!(out, "{}", hex::to_wire_text(&bytes))?;
    Ok(())
}

fn run_parse(args: &ParseArgs, config: &ToolConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    let bytes = match (&args.hex, &args.file) {
        (Some(text), _) => hex::parse_hex(text)?,
        (None, Some(path)) => std::fs::read(path)
            .with_context(|| format!("reading capture file {}", path.display()))?,
        (None, None) => anyhow::bail!("no input given"),
    };

    let unescape = args.unescape || config.codec.escape_values;
    let report = parse_frames::parse_stream(&bytes, &config.frame, unescape);
    for line in report.lines() {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

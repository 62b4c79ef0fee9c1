//! Command-line front end
//!
//! The CLI is generic over [`Backend`] so it runs against libnftables in the
//! binary and against an in-memory engine in tests.

use crate::audit::{self, AuditLog, EventType};
use crate::config::AppConfig;
use crate::core::context::Context;
use crate::core::engine::Backend;
use crate::core::error::{Error, NftablesErrorPattern, Result};
use crate::core::flags::{FlagTable, parse_flag};
use crate::core::view::{self, View};
use clap::{ArgAction, Args, Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};

shadow_rs::shadow!(build);

#[derive(Parser, Debug)]
#[command(name = "nftctx")]
#[command(about = "Run nftables commands through libnftables and view the response", long_about = None)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run commands and print the response
    Run(RunArgs),
    /// Validate commands in dry-run mode without touching the ruleset
    Check(CommandSource),
    /// List output flags, or decode a flag bitmask
    Flags {
        /// Bitmask to decode into flag names
        #[arg(long, value_name = "BITS")]
        decode: Option<String>,
    },
    /// Print the effective configuration, optionally writing it to the config file
    Config {
        /// Save the effective configuration (defaults if none exists yet)
        #[arg(long)]
        write: bool,
    },
    /// Show build information
    Version,
}

#[derive(Args, Debug)]
pub struct CommandSource {
    /// Command words, joined with spaces into a single command
    pub words: Vec<String>,

    /// Read newline-separated commands from FILE ("-" for stdin)
    #[arg(short, long, value_name = "FILE", conflicts_with = "words")]
    pub file: Option<PathBuf>,
}

impl CommandSource {
    /// Returns the command text to submit
    ///
    /// # Errors
    ///
    /// Returns `Error::Validation` when no command was given and `Error::Io`
    /// when the file cannot be read.
    pub fn text(&self) -> Result<String> {
        let text = match &self.file {
            Some(path) => crate::utils::read_commands(path)?,
            None => self.words.join(" "),
        };

        if text.trim().is_empty() {
            return Err(Error::validation("command", "no command given"));
        }
        Ok(text)
    }
}

#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: CommandSource,

    /// Output flag by name (handle, json, numeric-all, ...) or number; repeatable
    #[arg(short = 'F', long = "flag", value_name = "FLAG")]
    pub flags: Vec<String>,

    /// Parse and validate without committing to the ruleset
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// How to print the response: text, lines, handles or json
    #[arg(long, value_name = "VIEW")]
    pub view: Option<View>,
}

/// Everything a subcommand needs besides its arguments
pub struct Session<'a, B: Backend> {
    pub backend: B,
    pub config: &'a AppConfig,
    /// Where `config --write` saves; `None` when no location is known
    pub config_path: Option<&'a Path>,
    pub audit: Option<&'a AuditLog>,
}

/// Runs one subcommand, writing results to `out`
///
/// # Errors
///
/// Returns any context error; the caller reports it with [`report_error`].
pub fn execute<B: Backend>(
    session: Session<'_, B>,
    command: Commands,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Commands::Run(args) => run(session, &args, out),
        Commands::Check(source) => check(session, &source, out),
        Commands::Flags { decode } => flags(session.backend.flags(), decode.as_deref(), out),
        Commands::Config { write } => show_config(session.config, session.config_path, write, out),
        Commands::Version => {
            writeln!(out, "nftctx {}", build::PKG_VERSION)?;
            writeln!(out, "commit: {} (clean: {})", build::SHORT_COMMIT, build::GIT_CLEAN)?;
            writeln!(out, "built: {}", build::BUILD_TIME)?;
            Ok(())
        }
    }
}

/// Flag bits requested on the command line, falling back to the config.
///
/// The JSON and handle views need their output flag, so it is added for them.
fn requested_flags(args: &RunArgs, config: &AppConfig, table: &FlagTable, view: View) -> Result<u32> {
    let mut bits = if args.flags.is_empty() {
        config.default_bits(table)
    } else {
        args.flags
            .iter()
            .map(|f| parse_flag(f, table))
            .try_fold(0, |acc, f| f.map(|f| acc | f))?
    };

    match view {
        View::Json => bits |= table.json,
        View::Handles => bits |= table.handle,
        View::Text | View::Lines => {}
    }
    Ok(bits)
}

fn run<B: Backend>(session: Session<'_, B>, args: &RunArgs, out: &mut impl Write) -> Result<()> {
    let text = args.source.text()?;
    let view = args.view.unwrap_or(session.config.view);
    let dry_run = args.dry_run || session.config.dry_run;

    let mut ctx = Context::new(session.backend)?;
    let bits = requested_flags(args, session.config, ctx.flags(), view)?;
    if bits != 0 {
        ctx.set_output_flags(&[bits])?;
    }
    if dry_run {
        ctx.enable_dry_run()?;
    }

    let result = ctx.run(&text).map(|_| ());
    if let Some(log) = session.audit {
        let error = result.as_ref().err().map(ToString::to_string);
        audit::log_command(log, EventType::RunCommand, &text, bits, dry_run, error);
    }
    result?;

    let rendered = view::render(ctx.text(), view)?;
    out.write_all(rendered.as_bytes())?;
    if !rendered.is_empty() && !rendered.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    Ok(())
}

fn check<B: Backend>(
    session: Session<'_, B>,
    source: &CommandSource,
    out: &mut impl Write,
) -> Result<()> {
    let text = source.text()?;

    let mut ctx = Context::new(session.backend)?;
    ctx.enable_dry_run()?;

    let result = ctx.run(&text).map(|_| ());
    if let Some(log) = session.audit {
        let error = result.as_ref().err().map(ToString::to_string);
        audit::log_command(log, EventType::CheckCommand, &text, 0, true, error);
    }
    result?;

    writeln!(out, "OK: {} command(s) validated", text.lines().filter(|l| !l.trim().is_empty()).count())?;
    Ok(())
}

fn flags(table: &FlagTable, decode: Option<&str>, out: &mut impl Write) -> Result<()> {
    if let Some(bits) = decode {
        let bits = parse_flag(bits, table)?;
        let names: Vec<String> = table.decode(bits).iter().map(ToString::to_string).collect();
        if names.is_empty() {
            writeln!(out, "default")?;
        } else {
            writeln!(out, "{}", names.join(", "))?;
        }
        return Ok(());
    }

    for (flag, value) in table.entries() {
        writeln!(out, "{:<16} {:>5}  {:#06x}", flag.to_string(), value, value)?;
    }
    Ok(())
}

fn show_config(
    config: &AppConfig,
    path: Option<&Path>,
    write: bool,
    out: &mut impl Write,
) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(config)?)?;
    if !write {
        return Ok(());
    }

    let path = path.ok_or_else(|| Error::Config("Failed to determine config directory".to_string()))?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    crate::config::save_config_to(config, path)?;
    writeln!(out, "Saved to {}", path.display())?;
    Ok(())
}

/// Writes an error with translated hints for engine rejections
pub fn report_error(err: &Error, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Error: {err}")?;

    if let Error::Command { message } = err {
        let translation = NftablesErrorPattern::match_error(message);
        writeln!(out, "{}", translation.user_message)?;
        for suggestion in &translation.suggestions {
            writeln!(out, "  - {suggestion}")?;
        }
        if let Some(url) = &translation.help_url {
            writeln!(out, "  See: {url}")?;
        }
    } else if err.is_fatal() {
        writeln!(out, "The engine context is unusable; try again or check libnftables.")?;
    }
    Ok(())
}

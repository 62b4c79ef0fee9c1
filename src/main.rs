//! nftctx - run nftables commands through libnftables
//!
//! Submits commands to a libnftables context and prints the response as raw
//! text, cleaned lines, a handle map or parsed JSON.
//!
//! # Usage
//!
//! ```bash
//! nftctx run add table inet filter
//! nftctx run --view handles list ruleset      # handle -> object
//! nftctx run --view json list table inet filter
//! nftctx run -F numeric-all -F stateless list ruleset
//! nftctx run -f rules.nft                     # one command per line
//! nftctx check -f rules.nft                   # dry run, nothing committed
//! nftctx flags --decode 24                    # -> handle, json
//! nftctx config --write                       # save current defaults
//! ```
//!
//! Defaults for flags, view, dry-run, logging and auditing are read from
//! `config.json` in the XDG data directory (or `$NFTCTX_CONFIG`).

use clap::Parser;
use nftctx::audit::AuditLog;
use nftctx::cli::{self, Cli, Commands, Session};
use nftctx::config;
use nftctx::core::native::NativeBackend;
use std::process::ExitCode;
use tracing::Level;

fn init_logging(verbose: u8, to_file: bool) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    };

    if to_file
        && let Some(mut log_path) = nftctx::utils::get_state_dir()
        && nftctx::utils::ensure_dirs().is_ok()
    {
        log_path.push("nftctx.log");
        if let Ok(file) = std::fs::File::create(log_path) {
            tracing_subscriber::fmt()
                .with_max_level(level)
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
            return;
        }
    }

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config, config_error) = match config::load_config() {
        Ok(config) => (config, None),
        Err(e) => (config::AppConfig::default(), Some(e)),
    };
    init_logging(cli.verbose, config.log_to_file);
    if let Some(e) = config_error {
        tracing::warn!("Ignoring unreadable config, using defaults: {e}");
    }

    if let Commands::Run(args) = &cli.command
        && !args.dry_run
        && !config.dry_run
        && !nix::unistd::getuid().is_root()
    {
        eprintln!("Note: Not running as root. Changing the ruleset needs CAP_NET_ADMIN.");
    }

    let audit = if config.audit_log {
        match nftctx::utils::ensure_dirs().and_then(|()| AuditLog::new()) {
            Ok(log) => Some(log),
            Err(e) => {
                tracing::warn!("Audit log unavailable: {e}");
                None
            }
        }
    } else {
        None
    };

    let config_path = config::config_path();
    let session = Session {
        backend: NativeBackend,
        config: &config,
        config_path: config_path.as_deref(),
        audit: audit.as_ref(),
    };

    let stdout = std::io::stdout();
    match cli::execute(session, cli.command, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let _ = cli::report_error(&e, &mut std::io::stderr());
            ExitCode::FAILURE
        }
    }
}

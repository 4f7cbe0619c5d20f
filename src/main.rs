//! zprogress - version 0.1.0
//!
//! Live progress for running archive tools, with tracing logging.
//! This is the main entry point that resolves configuration, handles
//! subcommands and runs the monitoring session.

use clap::Parser;
use crossterm::terminal;
use std::fs::OpenOptions;
use std::io::{self, IsTerminal};
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error, info};

use zprogress::archive::CommandProbe;
use zprogress::cli::{Args, Commands, LogLevel};
use zprogress::commands::{command_check, command_formats};
use zprogress::config::{
    parse_log_level, resolve_config, show_config, validate_effective_config, Config,
};
use zprogress::monitor::{MonitorContext, SystemClock};
use zprogress::process::{discover_archive_processes, ProcFs};
use zprogress::render::{RenderMode, Screen};
use zprogress::session::Session;
use zprogress::startup_checks;

/// Exit code after Ctrl+C or SIGTERM.
const EXIT_INTERRUPTED: i32 = 130;

/// CLI level, else config level, else warn.
fn resolve_log_level(config: &Config, args: &Args) -> LogLevel {
    args.log_level
        .or_else(|| {
            config
                .log_level
                .as_deref()
                .and_then(|l| parse_log_level(l).ok())
        })
        .unwrap_or(LogLevel::Warn)
}

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(config: &Config, args: &Args) {
    let level = resolve_log_level(config, args);
    let filter = match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let builder = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    let mut open_error = None;
    let log_file = config.log_file.as_ref().and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(file),
            Err(e) => {
                eprintln!("⚠️  Cannot open log file {} for writing - logging to stderr", path.display());
                open_error = Some(e);
                None
            }
        }
    });

    let result = match log_file {
        Some(file) => tracing::subscriber::set_global_default(
            builder.with_ansi(false).with_writer(Mutex::new(file)).finish(),
        ),
        None => tracing::subscriber::set_global_default(builder.with_writer(io::stderr).finish()),
    };

    if let Err(e) = result {
        eprintln!("⚠️  Failed to set tracing subscriber: {}", e);
        return;
    }

    if let Some(e) = open_error {
        debug!("Log file open failed: {}", e);
    }
    debug!("Logging initialized with level: {:?}", level);
}

/// Helper function to load and validate configuration.
/// Exits the process with error code 1 if validation fails.
fn load_validated_config(args: &Args) -> Config {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    config
}

/// Resolves once Ctrl+C or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), stopping...");
        }
        _ = terminate => {
            info!("Received SIGTERM, stopping...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = load_validated_config(&args);

        if args.check_config {
            println!("✅ Configuration is valid");
            return Ok(());
        }

        show_config(&config, args.config_format)?;
        return Ok(());
    }

    let config = load_validated_config(&args);
    setup_logging(&config, &args);

    // Handle subcommands
    if let Some(command) = &args.command {
        return match command {
            Commands::Formats => command_formats(),
            Commands::Check { tools } => {
                if !command_check(*tools, &config)? {
                    std::process::exit(1);
                }
                Ok(())
            }
        };
    }

    let proc_root = config.proc_root();
    if let Err(e) = startup_checks::validate_requirements(&proc_root) {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let inspector = ProcFs::new(&proc_root);
    let pids: Vec<u32> = if args.pids.is_empty() {
        discover_archive_processes(inspector.root())
            .into_iter()
            .map(|c| c.pid)
            .collect()
    } else {
        args.pids.clone()
    };
    debug!("Candidate PIDs: {:?}", pids);

    let mode = if io::stdout().is_terminal() {
        RenderMode::Interactive
    } else {
        RenderMode::Plain
    };
    let screen = Arc::new(Screen::new(io::stdout(), mode, config.color_enabled()));

    let mut session = Session::new(MonitorContext {
        inspector: Arc::new(inspector),
        clock: Arc::new(SystemClock),
        probe: Arc::new(CommandProbe),
        screen: Arc::clone(&screen),
        settings: config.monitor_settings(),
    });
    if mode == RenderMode::Interactive {
        match terminal::size() {
            Ok((_, rows)) => session = session.with_terminal_rows(rows),
            Err(e) => debug!("Terminal size unavailable: {}", e),
        }
    }
    let footer_row = session.footer_row(&pids);

    tokio::select! {
        outcome = session.run(&pids) => {
            let code = outcome.exit_code();
            if code != 0 {
                std::process::exit(code);
            }
        }
        _ = shutdown_signal() => {
            if let Err(e) = screen.restore(footer_row) {
                debug!("Failed to restore terminal: {}", e);
            }
            std::process::exit(EXIT_INTERRUPTED);
        }
    }

    Ok(())
}

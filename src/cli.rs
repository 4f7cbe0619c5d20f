//! CLI arguments and subcommands for zprogress.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::commands::formats::formats_table;
use crate::rate::RatePolicy;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Configuration format options for output
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum ConfigFormat {
    #[default]
    Yaml,
    Json,
    Toml,
}

/// Main CLI arguments structure
#[derive(Parser, Debug, Default)]
#[command(
    name = "zprogress",
    about = "Live progress for running gzip, pigz, xz, bzip2, pbzip2 and zstd processes",
    long_about = "Live progress for running gzip, pigz, xz, bzip2, pbzip2 and zstd processes.\n\n\
                  Finds running compression tools, works out whether each one is compressing or \
                  decompressing, and shows a live line per process using the kernel's per-process \
                  I/O counters. The tools themselves are never modified or signalled.",
    version = "0.1.0",
    propagate_version = true,
    after_help = formats_table()
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Seconds between samples
    #[arg(short = 'i', long)]
    pub interval: Option<f64>,

    /// Progress bar width in cells
    #[arg(short = 'w', long)]
    pub bar_width: Option<usize>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    /// How transfer rates are averaged
    #[arg(long, value_enum)]
    pub rate_policy: Option<RatePolicy>,

    /// Monitor this PID instead of discovering processes (repeatable)
    #[arg(short = 'p', long = "pid")]
    pub pids: Vec<u32>,

    /// Do not run archive-listing tools to find the uncompressed size
    #[arg(long)]
    pub no_size_probe: bool,

    /// Root of the proc filesystem
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Log level [default: warn]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that this system can be monitored
    Check {
        /// Also list which supported tools are installed
        #[arg(long)]
        tools: bool,
    },

    /// List supported tools and archive formats
    Formats,
}

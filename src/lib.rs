//! zprogress library
//!
//! Live progress reporting for archive tools (gzip, pigz, xz, bzip2, pbzip2,
//! zstd) that are already running, built purely on observation of the
//! process through `/proc`. The monitored tools are never modified or
//! signalled.
//!
//! # Features
//!
//! - **Discovery**: Finds running archive tools by scanning `/proc`
//! - **Mode Detection**: Tells compression from decompression via arguments and stdin
//! - **Rates and ETA**: Derived from the kernel's `rchar`/`wchar` counters
//! - **Concurrent Display**: One task and one terminal row per process
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use zprogress::archive::CommandProbe;
//! use zprogress::monitor::{MonitorContext, MonitorSettings, SystemClock};
//! use zprogress::process::{discover_archive_processes, ProcFs};
//! use zprogress::render::{RenderMode, Screen};
//! use zprogress::session::Session;
//!
//! # async fn run() {
//! let inspector = ProcFs::default();
//! let pids: Vec<u32> = discover_archive_processes(inspector.root())
//!     .into_iter()
//!     .map(|c| c.pid)
//!     .collect();
//!
//! let ctx = MonitorContext {
//!     inspector: Arc::new(inspector),
//!     clock: Arc::new(SystemClock),
//!     probe: Arc::new(CommandProbe),
//!     screen: Arc::new(Screen::new(std::io::stdout(), RenderMode::Interactive, true)),
//!     settings: MonitorSettings::default(),
//! };
//!
//! let outcome = Session::new(ctx).run(&pids).await;
//! std::process::exit(outcome.exit_code());
//! # }
//! ```

pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod monitor;
pub mod process;
pub mod rate;
pub mod render;
pub mod session;
pub mod startup_checks;

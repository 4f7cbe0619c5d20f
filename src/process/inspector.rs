//! Point-in-time facts about a PID from the process-information filesystem.
//!
//! Every read is a single non-blocking attempt. Failures collapse to the
//! documented defaults (`false`, `"unknown"`, `""`, `0`, `None`) so a target
//! racing to exit degrades its own display instead of aborting the program.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::process::stat::read_start_time;

/// Default mount point of the process-information filesystem.
pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Name returned when a command name cannot be read.
pub const UNKNOWN_COMMAND: &str = "unknown";

/// Named cumulative I/O counter from `/proc/<pid>/io`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoCounter {
    /// Total bytes read (`rchar`).
    Rchar,
    /// Total bytes written (`wchar`).
    Wchar,
}

impl IoCounter {
    pub fn key(self) -> &'static str {
        match self {
            IoCounter::Rchar => "rchar",
            IoCounter::Wchar => "wchar",
        }
    }
}

/// Both cumulative counters, read together.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IoCounters {
    pub rchar: u64,
    pub wchar: u64,
}

/// Immutable snapshot of one target's counters at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessSample {
    pub pid: u32,
    /// Seconds since the epoch.
    pub timestamp: f64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

impl ProcessSample {
    pub fn new(pid: u32, timestamp: f64, counters: IoCounters) -> Self {
        Self {
            pid,
            timestamp,
            bytes_read: counters.rchar,
            bytes_written: counters.wchar,
        }
    }
}

/// Read-only access to per-process facts.
///
/// Implemented by [`ProcFs`] for the live system; tests substitute their own.
pub trait ProcessInspector: Send + Sync {
    /// True iff the process entry for `pid` is present.
    fn exists(&self, pid: u32) -> bool;

    /// Executable short name, or `"unknown"` if unreadable.
    fn command_name(&self, pid: u32) -> String;

    /// Wall-clock process start in seconds since the epoch.
    fn start_time(&self, pid: u32) -> Option<f64>;

    /// Target of a file descriptor (`pipe:[...]`, `socket:[...]`, a path), or `""`.
    fn fd_target(&self, pid: u32, fd: u32) -> String;

    /// Open file descriptor numbers, ascending.
    fn open_fds(&self, pid: u32) -> Vec<u32>;

    /// Command line split into arguments (argv[0] included).
    fn cmdline(&self, pid: u32) -> Vec<String>;

    /// Current working directory of the process.
    fn cwd(&self, pid: u32) -> Option<PathBuf>;

    /// Both I/O counters, or `None` when the read failed this instant.
    fn read_io(&self, pid: u32) -> Option<IoCounters>;

    /// One named counter; `0` when unreadable.
    fn io_counter(&self, pid: u32, counter: IoCounter) -> u64 {
        self.read_io(pid)
            .map(|io| match counter {
                IoCounter::Rchar => io.rchar,
                IoCounter::Wchar => io.wchar,
            })
            .unwrap_or(0)
    }

    /// Size of a regular file, or `None` if missing or not a regular file.
    fn file_size(&self, path: &Path) -> Option<u64> {
        fs::metadata(path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len())
    }
}

/// Parses `rchar` and `wchar` out of `/proc/<pid>/io` content.
///
/// Returns `None` unless both keys are present.
pub fn parse_io_counters(content: &str) -> Option<IoCounters> {
    let mut rchar = None;
    let mut wchar = None;

    for line in content.lines() {
        if let Some(v) = line.strip_prefix("rchar:") {
            rchar = v.trim().parse().ok();
        } else if let Some(v) = line.strip_prefix("wchar:") {
            wchar = v.trim().parse().ok();
        }

        if rchar.is_some() && wchar.is_some() {
            break;
        }
    }

    Some(IoCounters {
        rchar: rchar?,
        wchar: wchar?,
    })
}

/// [`ProcessInspector`] backed by a procfs mount.
#[derive(Debug, Clone)]
pub struct ProcFs {
    root: PathBuf,
}

impl Default for ProcFs {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_ROOT)
    }
}

impl ProcFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pid_path(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }
}

impl ProcessInspector for ProcFs {
    fn exists(&self, pid: u32) -> bool {
        self.pid_path(pid).exists()
    }

    fn command_name(&self, pid: u32) -> String {
        crate::process::scanner::read_process_name(&self.pid_path(pid))
            .unwrap_or_else(|| UNKNOWN_COMMAND.to_string())
    }

    fn start_time(&self, pid: u32) -> Option<f64> {
        match read_start_time(&self.root, &self.pid_path(pid)) {
            Ok(t) => Some(t),
            Err(e) => {
                debug!("Failed to derive start time for pid {}: {}", pid, e);
                None
            }
        }
    }

    fn fd_target(&self, pid: u32, fd: u32) -> String {
        let link = self.pid_path(pid).join("fd").join(fd.to_string());
        fs::read_link(link)
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    fn open_fds(&self, pid: u32) -> Vec<u32> {
        let mut fds: Vec<u32> = match fs::read_dir(self.pid_path(pid).join("fd")) {
            Ok(entries) => entries
                .flatten()
                .filter_map(|e| e.file_name().to_str().and_then(|s| s.parse().ok()))
                .collect(),
            Err(_) => Vec::new(),
        };
        fds.sort_unstable();
        fds
    }

    fn cmdline(&self, pid: u32) -> Vec<String> {
        match fs::read(self.pid_path(pid).join("cmdline")) {
            Ok(content) => content
                .split(|&b| b == 0u8)
                .filter(|s| !s.is_empty())
                .map(|s| String::from_utf8_lossy(s).into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    fn cwd(&self, pid: u32) -> Option<PathBuf> {
        fs::read_link(self.pid_path(pid).join("cwd")).ok()
    }

    fn read_io(&self, pid: u32) -> Option<IoCounters> {
        match fs::read_to_string(self.pid_path(pid).join("io")) {
            Ok(content) => parse_io_counters(&content),
            Err(e) => {
                debug!("Failed to read io counters for pid {}: {}", pid, e);
                None
            }
        }
    }
}

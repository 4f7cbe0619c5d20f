//! Process start-time derivation from `/proc/<pid>/stat` and `/proc/stat`.
//!
//! The kernel reports a process start as clock ticks since boot (field 22 of
//! `/proc/<pid>/stat`). Converting it to wall-clock seconds needs the boot
//! time (`btime` in `/proc/stat`) and the clock tick rate.

use once_cell::sync::Lazy;
use std::fs;
use std::path::Path;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> f64 {
    #[cfg(unix)]
    {
        // SAFETY: sysconf is safe to call with _SC_CLK_TCK
        // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
        unsafe {
            let tck = libc::sysconf(libc::_SC_CLK_TCK);
            if tck > 0 {
                return tck as f64;
            }
        }
    }
    100.0
}

/// System clock ticks per second.
pub static CLK_TCK: Lazy<f64> = Lazy::new(get_clk_tck);

/// Extracts the start time in ticks since boot from `/proc/<pid>/stat` content.
///
/// The command name in field 2 may contain spaces and parentheses, so fields
/// are counted from the last `)`.
pub fn parse_start_ticks(content: &str) -> Result<u64, std::io::Error> {
    let close = content
        .rfind(')')
        .ok_or_else(|| std::io::Error::other("Invalid stat format: missing comm"))?;

    // Fields after comm start at field 3 (state); starttime is field 22.
    let rest: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if rest.len() < 20 {
        return Err(std::io::Error::other("Invalid stat format"));
    }

    rest[19]
        .parse()
        .map_err(|_| std::io::Error::other("Failed to parse starttime field"))
}

/// Reads the boot time (seconds since the epoch) from the `btime` line of `/proc/stat`.
pub fn parse_boot_time(content: &str) -> Option<u64> {
    content
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
}

/// Wall-clock start time of the process at `proc_path`, in seconds since the epoch.
pub fn read_start_time(proc_root: &Path, proc_path: &Path) -> Result<f64, std::io::Error> {
    let stat = fs::read_to_string(proc_path.join("stat"))?;
    let ticks = parse_start_ticks(&stat)?;

    let system_stat = fs::read_to_string(proc_root.join("stat"))?;
    let boot_time = parse_boot_time(&system_stat)
        .ok_or_else(|| std::io::Error::other("btime missing from /proc/stat"))?;

    Ok(boot_time as f64 + ticks as f64 / *CLK_TCK)
}

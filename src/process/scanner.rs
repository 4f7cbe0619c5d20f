//! Process discovery: finds running archive tools in /proc.
//!
//! The candidate set is computed once at startup; processes started later
//! are not picked up.

use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::process::classifier::ArchiveTool;

/// Process entry representing a directory in /proc filesystem.
#[derive(Debug, Clone)]
pub struct ProcEntry {
    pub pid: u32,
    pub proc_path: PathBuf,
}

/// A discovered archive process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub pid: u32,
    pub tool: ArchiveTool,
}

/// Scans the /proc directory for process entries with numeric PIDs.
pub fn collect_proc_entries(root: &Path) -> Vec<ProcEntry> {
    let mut out = Vec::new();
    if let Ok(entries) = fs::read_dir(root) {
        for entry in entries.flatten() {
            let p = entry.path();
            let name = match p.file_name().and_then(|s| s.to_str()) {
                Some(v) => v,
                None => continue,
            };
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_digit()) {
                continue;
            }
            let pid: u32 = match name.parse() {
                Ok(v) => v,
                Err(_) => continue,
            };
            out.push(ProcEntry { pid, proc_path: p });
        }
    }
    out
}

/// Reads process name from comm file or extracts from cmdline.
pub fn read_process_name(proc_path: &Path) -> Option<String> {
    if let Ok(s) = fs::read_to_string(proc_path.join("comm")) {
        let t = s.trim();
        if !t.is_empty() {
            return Some(t.into());
        }
    }

    if let Ok(content) = fs::read(proc_path.join("cmdline")) {
        let first = content.split(|&b| b == 0u8).next()?;
        let first = std::str::from_utf8(first).ok()?;
        if let Some(name) = Path::new(first).file_name() {
            return name.to_str().map(|s| s.to_string());
        }
    }
    None
}

/// Returns every live process whose name is a supported archive tool,
/// ordered by PID.
pub fn discover_archive_processes(root: &Path) -> Vec<Candidate> {
    let entries = collect_proc_entries(root);
    debug!("Collected {} process entries from {}", entries.len(), root.display());

    let mut found: Vec<Candidate> = entries
        .par_iter()
        .filter_map(|entry| {
            let name = read_process_name(&entry.proc_path)?;
            let tool = ArchiveTool::from_command_name(&name)?;
            debug!("Discovered {} with pid {}", tool, entry.pid);
            Some(Candidate {
                pid: entry.pid,
                tool,
            })
        })
        .collect();

    found.sort_by_key(|c| c.pid);
    found
}

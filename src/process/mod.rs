//! Process-related modules for inspection, discovery, and classification.
//!
//! This module provides:
//! - `inspector`: Point-in-time reads from /proc/<pid>
//! - `stat`: Start-time derivation from clock ticks and boot time
//! - `scanner`: Discovery of running archive tools
//! - `classifier`: Tool identification, compress/decompress heuristic, file resolution

pub mod classifier;
pub mod inspector;
pub mod scanner;
pub mod stat;

// Re-export commonly used types
pub use classifier::{
    classify, has_decompress_flag, resolve_output_file, resolve_source_file, ArchiveTool, Mode,
};
pub use inspector::{
    IoCounter, IoCounters, ProcFs, ProcessInspector, ProcessSample, DEFAULT_PROC_ROOT,
    UNKNOWN_COMMAND,
};
pub use scanner::{discover_archive_processes, Candidate};
pub use stat::CLK_TCK;

//! Archive tool identification and compress/decompress classification.
//!
//! Classification is a heuristic made once per target: a pipe on stdin means
//! the tool is consuming a stream (compress), anything else means it is
//! reading an archive from disk (decompress). An explicit decompress flag on
//! the command line overrides the stdin heuristic.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::process::inspector::ProcessInspector;

/// Supported archive tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveTool {
    Gzip,
    Pigz,
    Xz,
    Bzip2,
    Pbzip2,
    Zstd,
}

impl ArchiveTool {
    pub const ALL: [ArchiveTool; 6] = [
        ArchiveTool::Gzip,
        ArchiveTool::Pigz,
        ArchiveTool::Xz,
        ArchiveTool::Bzip2,
        ArchiveTool::Pbzip2,
        ArchiveTool::Zstd,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ArchiveTool::Gzip => "gzip",
            ArchiveTool::Pigz => "pigz",
            ArchiveTool::Xz => "xz",
            ArchiveTool::Bzip2 => "bzip2",
            ArchiveTool::Pbzip2 => "pbzip2",
            ArchiveTool::Zstd => "zstd",
        }
    }

    /// Exact match on the executable short name.
    pub fn from_command_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// File extensions this tool's archives usually carry.
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            ArchiveTool::Gzip | ArchiveTool::Pigz => &[".gz", ".tgz"],
            ArchiveTool::Xz => &[".xz", ".txz"],
            ArchiveTool::Bzip2 | ArchiveTool::Pbzip2 => &[".bz2", ".tbz", ".tbz2"],
            ArchiveTool::Zstd => &[".zst", ".tzst"],
        }
    }

    /// Whether an archive-listing command can report the uncompressed size.
    pub fn reports_uncompressed_size(self) -> bool {
        !matches!(self, ArchiveTool::Bzip2 | ArchiveTool::Pbzip2)
    }
}

impl fmt::Display for ArchiveTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Direction of the monitored operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Compress,
    Decompress,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Compress => f.write_str("compress"),
            Mode::Decompress => f.write_str("decompress"),
        }
    }
}

// `-d`, or a cluster of short flags containing `d` such as `-cd` / `-dk`.
static DECOMPRESS_SHORT_FLAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-[A-Za-z]*d[A-Za-z]*$").expect("static regex"));

static ARCHIVE_EXTENSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\.(gz|tgz|xz|txz|bz2|tbz|tbz2|zst|tzst)$").expect("static regex")
});

/// True when the arguments (without argv[0]) explicitly ask for decompression.
pub fn has_decompress_flag<S: AsRef<str>>(args: &[S]) -> bool {
    args.iter().map(AsRef::as_ref).any(|arg| {
        arg == "--decompress" || arg == "--uncompress" || DECOMPRESS_SHORT_FLAG.is_match(arg)
    })
}

/// True for fd targets of the form `pipe:[inode]`.
pub fn is_pipe_target(target: &str) -> bool {
    target.starts_with("pipe:")
}

/// True when an fd target looks like an on-disk file rather than a pipe,
/// socket, anonymous inode or device node.
pub fn is_regular_path_target(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("/dev/") && !target.ends_with(" (deleted)")
}

/// True when the path carries a known archive extension.
pub fn has_archive_extension(path: &str) -> bool {
    ARCHIVE_EXTENSION.is_match(path)
}

/// Decides once whether `pid` compresses or decompresses.
pub fn classify<I: ProcessInspector + ?Sized>(inspector: &I, pid: u32) -> Mode {
    let cmdline = inspector.cmdline(pid);
    if has_decompress_flag(cmdline.get(1..).unwrap_or_default()) {
        return Mode::Decompress;
    }

    if is_pipe_target(&inspector.fd_target(pid, 0)) {
        Mode::Compress
    } else {
        Mode::Decompress
    }
}

/// Resolves the archive a decompressing process reads.
///
/// Prefers the stdin target when it is a regular file, then the first
/// command-line argument with a known archive extension (relative paths are
/// resolved against the process's working directory).
pub fn resolve_source_file<I: ProcessInspector + ?Sized>(inspector: &I, pid: u32) -> Option<PathBuf> {
    let stdin = inspector.fd_target(pid, 0);
    if is_regular_path_target(&stdin) && inspector.file_size(Path::new(&stdin)).is_some() {
        return Some(PathBuf::from(stdin));
    }

    let cmdline = inspector.cmdline(pid);
    let arg = cmdline
        .iter()
        .skip(1)
        .filter(|a| !a.starts_with('-'))
        .find(|a| has_archive_extension(a))?;

    let path = Path::new(arg);
    if path.is_absolute() {
        Some(path.to_path_buf())
    } else {
        let cwd = inspector.cwd(pid)?;
        Some(cwd.join(path))
    }
}

/// Resolves the file a compressing process writes.
///
/// Prefers stdout when it is a regular file, then scans the remaining open
/// descriptors, preferring one with the tool's archive extension.
pub fn resolve_output_file<I: ProcessInspector + ?Sized>(
    inspector: &I,
    pid: u32,
    tool: ArchiveTool,
) -> Option<PathBuf> {
    let stdout = inspector.fd_target(pid, 1);
    if is_regular_path_target(&stdout) {
        return Some(PathBuf::from(stdout));
    }

    let candidates: Vec<String> = inspector
        .open_fds(pid)
        .into_iter()
        .filter(|&fd| fd > 2)
        .map(|fd| inspector.fd_target(pid, fd))
        .filter(|t| is_regular_path_target(t))
        .collect();

    candidates
        .iter()
        .find(|t| tool.extensions().iter().any(|ext| t.ends_with(ext)))
        .or_else(|| candidates.first())
        .map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_command_name() {
        assert_eq!(ArchiveTool::from_command_name("gzip"), Some(ArchiveTool::Gzip));
        assert_eq!(ArchiveTool::from_command_name("pbzip2"), Some(ArchiveTool::Pbzip2));
        assert_eq!(ArchiveTool::from_command_name("zstd"), Some(ArchiveTool::Zstd));
        assert_eq!(ArchiveTool::from_command_name("gunzip"), None);
        assert_eq!(ArchiveTool::from_command_name("unknown"), None);
    }

    #[test]
    fn test_has_decompress_flag() {
        assert!(has_decompress_flag(&["-d"]));
        assert!(has_decompress_flag(&["-T4", "-cd", "file.xz"]));
        assert!(has_decompress_flag(&["-kd"]));
        assert!(has_decompress_flag(&["--decompress"]));
        assert!(!has_decompress_flag(&["-9", "-c"]));
        assert!(!has_decompress_flag(&["--fast", "-T0"]));
        assert!(!has_decompress_flag(&["data.d"]));
        assert!(!has_decompress_flag::<&str>(&[]));
    }

    #[test]
    fn test_target_kinds() {
        assert!(is_pipe_target("pipe:[123]"));
        assert!(!is_pipe_target("socket:[123]"));
        assert!(is_regular_path_target("/home/u/a.gz"));
        assert!(!is_regular_path_target("/dev/null"));
        assert!(!is_regular_path_target("anon_inode:[eventfd]"));
        assert!(!is_regular_path_target("/tmp/x.gz (deleted)"));
        assert!(!is_regular_path_target(""));
    }

    #[test]
    fn test_has_archive_extension() {
        assert!(has_archive_extension("backup.tar.gz"));
        assert!(has_archive_extension("dump.sql.zst"));
        assert!(has_archive_extension("x.tbz2"));
        assert!(!has_archive_extension("notes.txt"));
        assert!(!has_archive_extension("gz"));
    }
}

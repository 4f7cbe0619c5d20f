//! Uncompressed-size lookup through each format's archive-listing tool.
//!
//! Failure of any kind (tool missing, unreadable archive, unparsable output,
//! format without size metadata) means "unavailable", never an error.

use anyhow::{anyhow, bail, Context};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

use crate::process::ArchiveTool;

/// Best-effort uncompressed size of an archive.
pub trait SizeProbe: Send + Sync {
    fn uncompressed_size(&self, tool: ArchiveTool, archive: &Path) -> Option<u64>;
}

/// Probe that never knows; used when probing is disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProbe;

impl SizeProbe for NoProbe {
    fn uncompressed_size(&self, _tool: ArchiveTool, _archive: &Path) -> Option<u64> {
        None
    }
}

/// Probe that runs `gzip -l`, `xz --robot --list` or `zstd --list -v`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandProbe;

impl CommandProbe {
    fn run(program: &str, args: &[&str], archive: &Path) -> anyhow::Result<String> {
        let output = Command::new(program)
            .args(args)
            .arg(archive)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("failed to run {}", program))?;

        if !output.status.success() {
            bail!("{} exited with {}", program, output.status);
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn query(tool: ArchiveTool, archive: &Path) -> anyhow::Result<u64> {
        match tool {
            ArchiveTool::Gzip | ArchiveTool::Pigz => {
                parse_gzip_list(&Self::run("gzip", &["-l"], archive)?)
            }
            ArchiveTool::Xz => parse_xz_robot_list(&Self::run("xz", &["--robot", "--list"], archive)?),
            ArchiveTool::Zstd => parse_zstd_list(&Self::run("zstd", &["--list", "-v"], archive)?),
            ArchiveTool::Bzip2 | ArchiveTool::Pbzip2 => {
                Err(anyhow!("{} archives do not record the uncompressed size", tool))
            }
        }
    }
}

impl SizeProbe for CommandProbe {
    fn uncompressed_size(&self, tool: ArchiveTool, archive: &Path) -> Option<u64> {
        match Self::query(tool, archive) {
            Ok(size) => Some(size),
            Err(e) => {
                debug!("Uncompressed size unavailable for {}: {:#}", archive.display(), e);
                None
            }
        }
    }
}

/// Parses `gzip -l`: the second column of the first data row.
///
/// gzip stores the size modulo 2^32, so archives of 4 GB and more report
/// a wrapped value.
pub fn parse_gzip_list(output: &str) -> anyhow::Result<u64> {
    let row = output
        .lines()
        .skip_while(|l| !l.trim_start().starts_with("compressed"))
        .nth(1)
        .ok_or_else(|| anyhow!("no data row in gzip listing"))?;

    row.split_whitespace()
        .nth(1)
        .ok_or_else(|| anyhow!("missing uncompressed column"))?
        .parse()
        .context("invalid uncompressed size")
}

/// Parses `xz --robot --list`: field 5 of the `totals` line.
pub fn parse_xz_robot_list(output: &str) -> anyhow::Result<u64> {
    let totals = output
        .lines()
        .find(|l| l.starts_with("totals"))
        .ok_or_else(|| anyhow!("no totals line in xz listing"))?;

    totals
        .split('\t')
        .nth(4)
        .ok_or_else(|| anyhow!("missing uncompressed field"))?
        .trim()
        .parse()
        .context("invalid uncompressed size")
}

/// Parses `zstd --list -v`: the byte count on the `Decompressed Size:` line.
pub fn parse_zstd_list(output: &str) -> anyhow::Result<u64> {
    let value = output
        .lines()
        .find_map(|l| l.trim().strip_prefix("Decompressed Size:"))
        .ok_or_else(|| anyhow!("frame header carries no decompressed size"))?;

    // "1.00 MiB (1048576 B)" or "12 B"
    let bytes = match (value.rfind('('), value.rfind(')')) {
        (Some(open), Some(close)) if open < close => &value[open + 1..close],
        _ => value,
    };

    bytes
        .trim()
        .trim_end_matches('B')
        .trim()
        .parse()
        .context("invalid decompressed size")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_gzip_list() {
        let output = "         compressed        uncompressed  ratio uncompressed_name\n            1048610             1048576   0.0% /tmp/x\n";
        assert_eq!(parse_gzip_list(output).unwrap(), 1_048_576);
    }

    #[test]
    fn test_parse_gzip_list_garbage() {
        assert!(parse_gzip_list("").is_err());
        assert!(parse_gzip_list("gzip: x: not in gzip format\n").is_err());
    }

    #[test]
    fn test_parse_xz_robot_list() {
        let output = "name\t/tmp/x.xz\nfile\t1\t1\t1048680\t1048576\t1.000\tCRC64\t0\ntotals\t1\t1\t1048680\t1048576\t1.000\tCRC64\t0\t1\n";
        assert_eq!(parse_xz_robot_list(output).unwrap(), 1_048_576);
        assert!(parse_xz_robot_list("name\tx\n").is_err());
    }

    #[test]
    fn test_parse_zstd_list() {
        let output = "x.zst \n# Zstandard Frames: 1\nDictID: 0\nWindow Size: 1.00 MiB (1048576 B)\nCompressed Size: 1.00 MiB (1048607 B)\nDecompressed Size: 1.00 MiB (1048576 B)\nRatio: 1.0000\n";
        assert_eq!(parse_zstd_list(output).unwrap(), 1_048_576);
        assert_eq!(parse_zstd_list("Decompressed Size: 12 B\n").unwrap(), 12);
    }

    #[test]
    fn test_parse_zstd_list_unknown_size() {
        let output = "# Zstandard Frames: 1\nCompressed Size: 45 B (45 B)\n";
        assert!(parse_zstd_list(output).is_err());
    }

    #[test]
    fn test_no_probe_and_bzip2_unavailable() {
        let path = Path::new("/nonexistent/archive.bz2");
        assert_eq!(NoProbe.uncompressed_size(ArchiveTool::Gzip, path), None);
        assert_eq!(CommandProbe.uncompressed_size(ArchiveTool::Bzip2, path), None);
        assert_eq!(CommandProbe.uncompressed_size(ArchiveTool::Pbzip2, path), None);
    }
}

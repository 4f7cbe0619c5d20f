//! Builds the four display line variants as coloured spans.
//!
//! Colour is decoration only: [`Line::plain_text`] carries the full content.

use crossterm::style::Color;

use crate::monitor::{CompressSummary, DecompressSummary, MonitorTarget};
use crate::rate::ProgressState;
use crate::render::format::{draw_progress_bar, format_rate, format_size, format_time};

/// Shown in place of the ETA while the rate is still zero.
pub const ETA_PENDING: &str = "calculating...";
/// Shown for sizes that cannot be determined.
pub const UNAVAILABLE: &str = "unavailable";
/// Shown for a ratio while either side is zero.
pub const RATIO_NA: &str = "N/A";

const TAG_ACTIVE: Color = Color::Cyan;
const TAG_DONE: Color = Color::Green;
const BAR_COLOR: Color = Color::Green;
const ETA_COLOR: Color = Color::Yellow;

/// A run of text with an optional foreground colour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub color: Option<Color>,
}

/// One display row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    spans: Vec<Span>,
}

impl Line {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plain(mut self, text: impl Into<String>) -> Self {
        self.spans.push(Span {
            text: text.into(),
            color: None,
        });
        self
    }

    pub fn colored(mut self, text: impl Into<String>, color: Color) -> Self {
        self.spans.push(Span {
            text: text.into(),
            color: Some(color),
        });
        self
    }

    pub fn spans(&self) -> &[Span] {
        &self.spans
    }

    pub fn plain_text(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }
}

fn tag(target: &MonitorTarget) -> String {
    format!("[{}]", target.tool)
}

fn ratio_text(ratio: Option<f64>) -> String {
    ratio
        .map(|r| format!("{:.2}", r))
        .unwrap_or_else(|| RATIO_NA.to_string())
}

/// Decompression in progress: tag, PID, bar, percent, rate, ETA, elapsed.
pub fn decompress_progress(target: &MonitorTarget, state: &ProgressState, bar_width: usize) -> Line {
    let percent = state.percent_complete.unwrap_or(0.0);
    let eta = state
        .eta_seconds
        .map(format_time)
        .unwrap_or_else(|| ETA_PENDING.to_string());

    Line::new()
        .colored(tag(target), TAG_ACTIVE)
        .plain(format!(" PID {:<7} ", target.pid))
        .colored(draw_progress_bar(percent, bar_width), BAR_COLOR)
        .plain(format!(
            " {:>5.1}% | {:>12} | ETA: ",
            percent,
            format_rate(state.current_rate)
        ))
        .colored(format!("{:<14}", eta), ETA_COLOR)
        .plain(format!(" | Elapsed: {}", format_time(state.elapsed_seconds)))
}

/// Decompression finished: tag, PID, file, tool, sizes, average speed, total time.
pub fn decompress_done(target: &MonitorTarget, summary: &DecompressSummary) -> Line {
    let file_name = target
        .source_file
        .as_deref()
        .and_then(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "-".to_string());
    let destination = summary
        .destination_size
        .map(|s| format_size(s as f64))
        .unwrap_or_else(|| UNAVAILABLE.to_string());

    Line::new().colored(tag(target), TAG_DONE).plain(format!(
        " PID {:<7} {} ({}) | {} -> {} | avg {} | total {}",
        target.pid,
        file_name,
        target.tool,
        format_size(summary.source_size as f64),
        destination,
        format_rate(summary.average_rate),
        format_time(summary.elapsed_seconds),
    ))
}

/// Compression in progress: tag, PID, tool, read, written, ratio, rates, elapsed.
pub fn compress_progress(target: &MonitorTarget, state: &ProgressState) -> Line {
    Line::new().colored(tag(target), TAG_ACTIVE).plain(format!(
        " PID {:<7} {} | read {:>10} | written {:>10} | ratio {:>5} | in {:>12} | out {:>12} | Elapsed: {}",
        target.pid,
        target.tool,
        format_size(state.bytes_read as f64),
        format_size(state.bytes_written as f64),
        ratio_text(state.compression_ratio()),
        format_rate(state.current_rate),
        format_rate(state.write_rate),
        format_time(state.elapsed_seconds),
    ))
}

/// Compression finished: tag, PID, tool, totals, ratio, average speeds, total time.
pub fn compress_done(target: &MonitorTarget, summary: &CompressSummary) -> Line {
    let output = target
        .output_file
        .as_deref()
        .and_then(|p| p.file_name())
        .map(|n| format!(" -> {}", n.to_string_lossy()))
        .unwrap_or_default();

    Line::new().colored(tag(target), TAG_DONE).plain(format!(
        " PID {:<7} {}{} | read {} | written {} | ratio {} | avg in {} | avg out {} | total {}",
        target.pid,
        target.tool,
        output,
        format_size(summary.bytes_read as f64),
        format_size(summary.bytes_written as f64),
        ratio_text(summary.ratio()),
        format_rate(summary.average_read_rate),
        format_rate(summary.average_write_rate),
        format_time(summary.elapsed_seconds),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ArchiveTool, Mode};
    use std::path::PathBuf;

    fn target(mode: Mode) -> MonitorTarget {
        MonitorTarget {
            pid: 4242,
            tool: ArchiveTool::Xz,
            mode,
            display_row: 2,
            start_time: 0.0,
            source_file: Some(PathBuf::from("/data/backup.tar.xz")),
            source_size: Some(2_000_000),
            output_file: Some(PathBuf::from("/data/out.xz")),
        }
    }

    fn state() -> ProgressState {
        ProgressState {
            bytes_read: 500_000,
            bytes_written: 100_000,
            percent_complete: Some(25.0),
            current_rate: 50_000.0,
            write_rate: 10_000.0,
            eta_seconds: None,
            elapsed_seconds: 75.0,
        }
    }

    #[test]
    fn test_decompress_progress_line() {
        let line = decompress_progress(&target(Mode::Decompress), &state(), 8);
        let text = line.plain_text();
        assert!(text.starts_with("[xz] PID 4242"));
        assert!(text.contains("██░░░░░░"));
        assert!(text.contains(" 25.0%"));
        assert!(text.contains("50.00 KB/s"));
        assert!(text.contains(ETA_PENDING));
        assert!(text.contains("Elapsed: 1m15s"));
        assert_eq!(line.spans()[0].color, Some(Color::Cyan));
    }

    #[test]
    fn test_decompress_done_line() {
        let summary = DecompressSummary {
            source_size: 2_000_000,
            destination_size: None,
            average_rate: 1_000_000.0,
            elapsed_seconds: 2.0,
        };
        let line = decompress_done(&target(Mode::Decompress), &summary);
        let text = line.plain_text();
        assert!(text.contains("backup.tar.xz (xz)"));
        assert!(text.contains("2.00 MB -> unavailable"));
        assert!(text.contains("avg 1.00 MB/s"));
        assert!(text.contains("total 2s"));
        assert_eq!(line.spans()[0].color, Some(Color::Green));
    }

    #[test]
    fn test_compress_lines() {
        let progress = compress_progress(&target(Mode::Compress), &state()).plain_text();
        assert!(progress.contains("ratio  5.00"));
        assert!(progress.contains("50.00 KB/s"));
        assert!(progress.contains("read  500.00 KB"));

        let summary = CompressSummary {
            bytes_read: 0,
            bytes_written: 0,
            average_read_rate: 0.0,
            average_write_rate: 0.0,
            elapsed_seconds: 0.0,
        };
        let done = compress_done(&target(Mode::Compress), &summary).plain_text();
        assert!(done.contains("xz -> out.xz"));
        assert!(done.contains("ratio N/A"));
    }
}

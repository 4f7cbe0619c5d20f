//! One monitored archive process, end to end.
//!
//! A [`Monitor`] walks `Attaching -> Sampling -> Done`:
//!
//! - **Attaching** resolves the tool, classifies the mode once, and resolves
//!   the file of interest. A decompression target without a readable,
//!   non-empty source archive goes straight to `Done` without output.
//! - **Sampling** reads the I/O counters every interval and redraws the
//!   target's row until the process disappears or, when decompressing, the
//!   bytes read reach the archive size.
//! - **Done** draws the summary line, timed from attach.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::archive::SizeProbe;
use crate::process::{
    classify, resolve_output_file, resolve_source_file, ArchiveTool, IoCounters, Mode,
    ProcessInspector, ProcessSample,
};
use crate::rate::{compression_ratio, ProgressState, RatePolicy, RateSampler};
use crate::render::lines::{self, Line};
use crate::render::{LineKind, Screen};

/// Default time between samples.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);
/// Default progress bar width in cells.
pub const DEFAULT_BAR_WIDTH: usize = 50;

/// Longest single sleep before re-checking that the process still exists.
const MAX_SLEEP_SLICE: Duration = Duration::from_millis(100);

/// Source of sampling timestamps, in seconds since the epoch.
pub trait Clock: Send + Sync {
    fn now(&self) -> f64;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        chrono::Utc::now().timestamp_millis() as f64 / 1000.0
    }
}

/// Tunables shared by every monitor in a run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorSettings {
    pub interval: Duration,
    pub bar_width: usize,
    pub rate_policy: RatePolicy,
    /// Query archive-listing tools for the uncompressed size.
    pub probe_sizes: bool,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            bar_width: DEFAULT_BAR_WIDTH,
            rate_policy: RatePolicy::default(),
            probe_sizes: true,
        }
    }
}

/// Collaborators handed to every monitor task.
pub struct MonitorContext<W: Write> {
    pub inspector: Arc<dyn ProcessInspector>,
    pub clock: Arc<dyn Clock>,
    pub probe: Arc<dyn SizeProbe>,
    pub screen: Arc<Screen<W>>,
    pub settings: MonitorSettings,
}

impl<W: Write> Clone for MonitorContext<W> {
    fn clone(&self) -> Self {
        Self {
            inspector: Arc::clone(&self.inspector),
            clock: Arc::clone(&self.clock),
            probe: Arc::clone(&self.probe),
            screen: Arc::clone(&self.screen),
            settings: self.settings,
        }
    }
}

/// Identity of one tracked job, fixed at attach.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorTarget {
    pub pid: u32,
    pub tool: ArchiveTool,
    pub mode: Mode,
    pub display_row: u16,
    /// Process start, or attach time when the start is unreadable.
    pub start_time: f64,
    /// Archive being decompressed.
    pub source_file: Option<PathBuf>,
    pub source_size: Option<u64>,
    /// File being written by a compressor, when it could be found.
    pub output_file: Option<PathBuf>,
}

/// Why a target was never displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The process was gone before attach.
    Exited,
    /// The command name is not a supported tool.
    UnknownTool(String),
    /// No archive could be found for a decompression.
    SourceUnresolved,
    /// The archive has zero size.
    EmptySource,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecompressSummary {
    pub source_size: u64,
    pub destination_size: Option<u64>,
    pub average_rate: f64,
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompressSummary {
    pub bytes_read: u64,
    pub bytes_written: u64,
    pub average_read_rate: f64,
    pub average_write_rate: f64,
    pub elapsed_seconds: f64,
}

impl CompressSummary {
    pub fn ratio(&self) -> Option<f64> {
        compression_ratio(self.bytes_read, self.bytes_written)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Summary {
    Decompress(DecompressSummary),
    Compress(CompressSummary),
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorOutcome {
    Skipped(SkipReason),
    Completed(Summary),
}

/// Result of one monitor task.
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorReport {
    pub pid: u32,
    pub target: Option<MonitorTarget>,
    pub outcome: MonitorOutcome,
    /// Number of lines drawn for this target.
    pub renders: usize,
}

/// Everything sampling needs once attach succeeded.
#[derive(Debug)]
pub struct Attached {
    target: MonitorTarget,
    attach_time: f64,
    sampler: RateSampler,
    destination_size: Option<u64>,
}

/// Monitor lifecycle.
#[derive(Debug)]
pub enum MonitorState {
    Attaching,
    Sampling(Box<Attached>),
    Done(MonitorOutcome),
}

pub struct Monitor<W: Write> {
    pid: u32,
    row: u16,
    ctx: MonitorContext<W>,
    target: Option<MonitorTarget>,
    renders: usize,
}

fn average(bytes: u64, seconds: f64) -> f64 {
    if seconds > 0.0 {
        bytes as f64 / seconds
    } else {
        0.0
    }
}

impl<W: Write + Send + 'static> Monitor<W> {
    pub fn new(pid: u32, row: u16, ctx: MonitorContext<W>) -> Self {
        Self {
            pid,
            row,
            ctx,
            target: None,
            renders: 0,
        }
    }

    #[instrument(skip(self), fields(pid = self.pid, row = self.row))]
    pub async fn run(mut self) -> MonitorReport {
        let mut state = MonitorState::Attaching;
        loop {
            state = match state {
                MonitorState::Attaching => match self.attach().await {
                    Ok(attached) => {
                        debug!(
                            "Attached to {} ({}) on row {}",
                            attached.target.tool, attached.target.mode, self.row
                        );
                        self.target = Some(attached.target.clone());
                        MonitorState::Sampling(Box::new(attached))
                    }
                    Err(reason) => {
                        debug!("Skipping pid {}: {:?}", self.pid, reason);
                        MonitorState::Done(MonitorOutcome::Skipped(reason))
                    }
                },
                MonitorState::Sampling(attached) => {
                    MonitorState::Done(MonitorOutcome::Completed(self.sample(*attached).await))
                }
                MonitorState::Done(outcome) => {
                    return MonitorReport {
                        pid: self.pid,
                        target: self.target,
                        outcome,
                        renders: self.renders,
                    };
                }
            };
        }
    }

    async fn attach(&self) -> Result<Attached, SkipReason> {
        let inspector = self.ctx.inspector.as_ref();
        let pid = self.pid;

        if !inspector.exists(pid) {
            return Err(SkipReason::Exited);
        }

        let name = inspector.command_name(pid);
        let tool = ArchiveTool::from_command_name(&name).ok_or(SkipReason::UnknownTool(name))?;
        let mode = classify(inspector, pid);
        let attach_time = self.ctx.clock.now();

        let (source_file, source_size, output_file) = match mode {
            Mode::Decompress => {
                let source = resolve_source_file(inspector, pid).ok_or(SkipReason::SourceUnresolved)?;
                let size = inspector
                    .file_size(&source)
                    .ok_or(SkipReason::SourceUnresolved)?;
                if size == 0 {
                    return Err(SkipReason::EmptySource);
                }
                (Some(source), Some(size), None)
            }
            Mode::Compress => (None, None, resolve_output_file(inspector, pid, tool)),
        };

        let destination_size = match &source_file {
            Some(source)
                if self.ctx.settings.probe_sizes && tool.reports_uncompressed_size() =>
            {
                let probe = Arc::clone(&self.ctx.probe);
                let source = source.clone();
                tokio::task::spawn_blocking(move || probe.uncompressed_size(tool, &source))
                    .await
                    .ok()
                    .flatten()
            }
            _ => None,
        };

        let (start_time, sampler) = match inspector.start_time(pid) {
            Some(start) => (
                start,
                RateSampler::new(self.ctx.settings.rate_policy, start, source_size),
            ),
            None => {
                debug!("Start time unavailable for pid {}, timing from attach", pid);
                let baseline = inspector.read_io(pid).unwrap_or_default();
                (
                    attach_time,
                    RateSampler::new(self.ctx.settings.rate_policy, attach_time, source_size)
                        .with_baseline(baseline),
                )
            }
        };

        Ok(Attached {
            target: MonitorTarget {
                pid,
                tool,
                mode,
                display_row: self.row,
                start_time,
                source_file,
                source_size,
                output_file,
            },
            attach_time,
            sampler,
            destination_size,
        })
    }

    async fn sample(&mut self, attached: Attached) -> Summary {
        let Attached {
            target,
            attach_time,
            mut sampler,
            destination_size,
        } = attached;
        let mut last = IoCounters::default();

        loop {
            if !self.ctx.inspector.exists(self.pid) {
                break;
            }

            match self.ctx.inspector.read_io(self.pid) {
                Some(io) => {
                    let sample = ProcessSample::new(self.pid, self.ctx.clock.now(), io);
                    let state = sampler.observe(&sample);
                    last = io;
                    self.draw(&live_line(&target, &state, self.ctx.settings.bar_width), LineKind::Live);

                    if let Some(total) = target.source_size {
                        if state.bytes_read >= total {
                            debug!("pid {} read the whole archive", self.pid);
                            break;
                        }
                    }
                }
                None => debug!("No counter update for pid {} this tick", self.pid),
            }

            if !self.sleep_while_alive().await {
                break;
            }
        }

        let elapsed = (self.ctx.clock.now() - attach_time).max(0.0);
        let summary = match target.source_size {
            Some(total) => Summary::Decompress(DecompressSummary {
                source_size: total,
                destination_size,
                average_rate: average(last.rchar.min(total), elapsed),
                elapsed_seconds: elapsed,
            }),
            None => Summary::Compress(CompressSummary {
                bytes_read: last.rchar,
                bytes_written: last.wchar,
                average_read_rate: average(last.rchar, elapsed),
                average_write_rate: average(last.wchar, elapsed),
                elapsed_seconds: elapsed,
            }),
        };

        let line = match &summary {
            Summary::Decompress(s) => lines::decompress_done(&target, s),
            Summary::Compress(s) => lines::compress_done(&target, s),
        };
        self.draw(&line, LineKind::Final);
        summary
    }

    /// Sleeps one interval in slices; false once the process is gone.
    async fn sleep_while_alive(&self) -> bool {
        let mut remaining = self.ctx.settings.interval;
        loop {
            let step = remaining.min(MAX_SLEEP_SLICE);
            tokio::time::sleep(step).await;
            remaining = remaining.saturating_sub(step);

            if !self.ctx.inspector.exists(self.pid) {
                return false;
            }
            if remaining.is_zero() {
                return true;
            }
        }
    }

    fn draw(&mut self, line: &Line, kind: LineKind) {
        self.renders += 1;
        if let Err(e) = self.ctx.screen.draw(self.row, line, kind) {
            debug!("Failed to draw row {} for pid {}: {}", self.row, self.pid, e);
        }
    }
}

fn live_line(target: &MonitorTarget, state: &ProgressState, bar_width: usize) -> Line {
    match target.mode {
        Mode::Decompress => lines::decompress_progress(target, state, bar_width),
        Mode::Compress => lines::compress_progress(target, state),
    }
}

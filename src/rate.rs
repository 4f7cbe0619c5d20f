//! Throughput, percent-complete and ETA estimation from cumulative counters.
//!
//! Two averaging policies are available and one is applied for a whole run:
//!
//! - [`RatePolicy::Cumulative`] (default): bytes since the origin divided by
//!   time since the origin. The origin is the process start, so the "current"
//!   rate is really a lifetime average. Stable, but slow to show stalls.
//! - [`RatePolicy::Windowed`]: bytes since the previous sample divided by the
//!   time since the previous sample. Responsive, noisy, and reads zero for a
//!   tick without I/O.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::process::{IoCounters, ProcessSample};

/// Averaging strategy for rates.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum RatePolicy {
    #[default]
    Cumulative,
    Windowed,
}

impl fmt::Display for RatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RatePolicy::Cumulative => f.write_str("cumulative"),
            RatePolicy::Windowed => f.write_str("windowed"),
        }
    }
}

impl FromStr for RatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cumulative" => Ok(RatePolicy::Cumulative),
            "windowed" => Ok(RatePolicy::Windowed),
            other => Err(format!(
                "Invalid rate policy '{}', expected 'cumulative' or 'windowed'",
                other
            )),
        }
    }
}

/// Derived progress for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressState {
    pub bytes_read: u64,
    pub bytes_written: u64,
    /// 0-100, decompression only. Never decreases for a target.
    pub percent_complete: Option<f64>,
    /// Read throughput in bytes per second.
    pub current_rate: f64,
    /// Write throughput in bytes per second.
    pub write_rate: f64,
    /// Remaining seconds, decompression only; `None` while the rate is zero.
    pub eta_seconds: Option<f64>,
    pub elapsed_seconds: f64,
}

impl ProgressState {
    /// `bytes_read / bytes_written`, or `None` while either is zero.
    pub fn compression_ratio(&self) -> Option<f64> {
        compression_ratio(self.bytes_read, self.bytes_written)
    }
}

/// `read / written`, or `None` while either is zero.
pub fn compression_ratio(read: u64, written: u64) -> Option<f64> {
    if read == 0 || written == 0 {
        None
    } else {
        Some(read as f64 / written as f64)
    }
}

/// Percent of `total` covered by `progress`, clamped to [0, 100].
pub fn percent_of(progress: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    progress.min(total) as f64 * 100.0 / total as f64
}

/// Per-target rate state, fed one sample per tick.
#[derive(Debug, Clone)]
pub struct RateSampler {
    policy: RatePolicy,
    total_input: Option<u64>,
    origin_time: f64,
    baseline: IoCounters,
    last: Option<(f64, IoCounters)>,
    read_rate: f64,
    write_rate: f64,
    peak_percent: f64,
}

impl RateSampler {
    /// Creates a sampler whose counters are measured from `origin_time`.
    ///
    /// `total_input` is the archive size for decompression, `None` for compression.
    pub fn new(policy: RatePolicy, origin_time: f64, total_input: Option<u64>) -> Self {
        Self {
            policy,
            total_input,
            origin_time,
            baseline: IoCounters::default(),
            last: None,
            read_rate: 0.0,
            write_rate: 0.0,
            peak_percent: 0.0,
        }
    }

    /// Counters already accumulated at `origin_time`, subtracted from rates.
    ///
    /// Used when the process start time is unknown and the origin falls back
    /// to the attach time.
    pub fn with_baseline(mut self, baseline: IoCounters) -> Self {
        self.baseline = baseline;
        self
    }

    pub fn policy(&self) -> RatePolicy {
        self.policy
    }

    pub fn observe(&mut self, sample: &ProcessSample) -> ProgressState {
        let counters = IoCounters {
            rchar: sample.bytes_read,
            wchar: sample.bytes_written,
        };

        if let Some((_, prev)) = self.last {
            if counters.rchar < prev.rchar || counters.wchar < prev.wchar {
                debug!(
                    "Counters for pid {} went backwards ({} -> {}), re-baselining",
                    sample.pid, prev.rchar, counters.rchar
                );
                self.origin_time = sample.timestamp;
                self.baseline = counters;
                self.last = None;
                self.read_rate = 0.0;
                self.write_rate = 0.0;
            }
        }

        let elapsed = (sample.timestamp - self.origin_time).max(0.0);

        match self.policy {
            RatePolicy::Cumulative => {
                if elapsed > 0.0 {
                    self.read_rate = counters.rchar.saturating_sub(self.baseline.rchar) as f64 / elapsed;
                    self.write_rate =
                        counters.wchar.saturating_sub(self.baseline.wchar) as f64 / elapsed;
                }
            }
            RatePolicy::Windowed => {
                if let Some((last_time, prev)) = self.last {
                    let dt = sample.timestamp - last_time;
                    if dt > 0.0 {
                        self.read_rate = counters.rchar.saturating_sub(prev.rchar) as f64 / dt;
                        self.write_rate = counters.wchar.saturating_sub(prev.wchar) as f64 / dt;
                    }
                }
            }
        }

        self.last = Some((sample.timestamp, counters));

        let (percent_complete, eta_seconds) = match self.total_input {
            Some(total) if total > 0 => {
                let progress = counters.rchar.min(total);
                self.peak_percent = self.peak_percent.max(percent_of(progress, total));

                let remaining = total - progress;
                let eta = if remaining == 0 {
                    Some(0.0)
                } else if self.read_rate > 0.0 {
                    Some(remaining as f64 / self.read_rate)
                } else {
                    None
                };
                (Some(self.peak_percent), eta)
            }
            _ => (None, None),
        };

        ProgressState {
            bytes_read: counters.rchar,
            bytes_written: counters.wchar,
            percent_complete,
            current_rate: self.read_rate,
            write_rate: self.write_rate,
            eta_seconds,
            elapsed_seconds: elapsed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, read: u64, written: u64) -> ProcessSample {
        ProcessSample {
            pid: 1,
            timestamp: t,
            bytes_read: read,
            bytes_written: written,
        }
    }

    #[test]
    fn test_cumulative_rate_uses_origin() {
        let mut sampler = RateSampler::new(RatePolicy::Cumulative, 100.0, None);
        let state = sampler.observe(&sample(110.0, 10_000, 2_000));
        assert_eq!(state.current_rate, 1_000.0);
        assert_eq!(state.write_rate, 200.0);
        assert_eq!(state.elapsed_seconds, 10.0);
        assert_eq!(state.percent_complete, None);
        assert_eq!(state.eta_seconds, None);
    }

    #[test]
    fn test_cumulative_rate_zero_elapsed() {
        let mut sampler = RateSampler::new(RatePolicy::Cumulative, 100.0, Some(1000));
        let state = sampler.observe(&sample(100.0, 500, 0));
        assert_eq!(state.current_rate, 0.0);
        assert_eq!(state.percent_complete, Some(50.0));
        assert_eq!(state.eta_seconds, None);
    }

    #[test]
    fn test_baseline_subtracted_from_rate() {
        let baseline = IoCounters { rchar: 5_000, wchar: 0 };
        let mut sampler =
            RateSampler::new(RatePolicy::Cumulative, 0.0, None).with_baseline(baseline);
        let state = sampler.observe(&sample(5.0, 10_000, 0));
        assert_eq!(state.current_rate, 1_000.0);
    }

    #[test]
    fn test_windowed_rate() {
        let mut sampler = RateSampler::new(RatePolicy::Windowed, 0.0, None);
        let first = sampler.observe(&sample(1.0, 1_000, 0));
        assert_eq!(first.current_rate, 0.0);

        let second = sampler.observe(&sample(2.0, 4_000, 500));
        assert_eq!(second.current_rate, 3_000.0);
        assert_eq!(second.write_rate, 500.0);

        // No I/O during the window reads as zero.
        let third = sampler.observe(&sample(3.0, 4_000, 500));
        assert_eq!(third.current_rate, 0.0);

        // Zero-length window keeps the previous rate.
        let fourth = sampler.observe(&sample(3.0, 9_000, 500));
        assert_eq!(fourth.current_rate, 0.0);
    }

    #[test]
    fn test_percent_monotonic_and_clamped() {
        let total = 1_000_000;
        let mut sampler = RateSampler::new(RatePolicy::Cumulative, 0.0, Some(total));

        let mut last = 0.0;
        for (i, read) in (0..=10u64).map(|i| i * 100_000).enumerate() {
            let state = sampler.observe(&sample(i as f64 + 1.0, read, 0));
            let pct = state.percent_complete.unwrap();
            assert!(pct >= last);
            last = pct;
        }
        assert_eq!(last, 100.0);

        let over = sampler.observe(&sample(20.0, 1_500_000, 0));
        assert_eq!(over.percent_complete, Some(100.0));
        assert_eq!(over.eta_seconds, Some(0.0));
    }

    #[test]
    fn test_eta() {
        let mut sampler = RateSampler::new(RatePolicy::Cumulative, 0.0, Some(1_000));
        let state = sampler.observe(&sample(2.0, 200, 0));
        assert_eq!(state.current_rate, 100.0);
        assert_eq!(state.eta_seconds, Some(8.0));
    }

    #[test]
    fn test_counter_decrease_rebaselines() {
        let mut sampler = RateSampler::new(RatePolicy::Cumulative, 0.0, Some(1_000));
        let before = sampler.observe(&sample(10.0, 800, 0));
        assert_eq!(before.percent_complete, Some(80.0));

        // PID reuse: counters restart.
        let after = sampler.observe(&sample(11.0, 100, 0));
        assert_eq!(after.current_rate, 0.0);
        assert_eq!(after.elapsed_seconds, 0.0);
        assert_eq!(after.percent_complete, Some(80.0));

        let later = sampler.observe(&sample(13.0, 300, 0));
        assert_eq!(later.current_rate, 100.0);
    }

    #[test]
    fn test_compression_ratio() {
        assert_eq!(compression_ratio(0, 10), None);
        assert_eq!(compression_ratio(10, 0), None);
        assert_eq!(compression_ratio(300, 100), Some(3.0));
    }

    #[test]
    fn test_rate_policy_from_str() {
        assert_eq!("cumulative".parse::<RatePolicy>(), Ok(RatePolicy::Cumulative));
        assert_eq!(" Windowed ".parse::<RatePolicy>(), Ok(RatePolicy::Windowed));
        assert!("instant".parse::<RatePolicy>().is_err());
    }
}

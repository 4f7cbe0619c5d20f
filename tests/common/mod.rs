//! Shared fixtures: a scripted process table, a stepping clock and a
//! capturing writer.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use zprogress::archive::NoProbe;
use zprogress::monitor::{Clock, MonitorContext, MonitorSettings};
use zprogress::process::{IoCounters, ProcessInspector, UNKNOWN_COMMAND};
use zprogress::rate::RatePolicy;
use zprogress::render::{RenderMode, Screen};

/// One fake process. It exists until every scripted counter read was served.
/// A `None` read is an unreadable sample while the process is still alive.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProcess {
    pub name: String,
    pub cmdline: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub fds: BTreeMap<u32, String>,
    pub start_time: Option<f64>,
    pub io: Vec<Option<IoCounters>>,
    cursor: usize,
}

impl ScriptedProcess {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cmdline: vec![name.to_string()],
            ..Self::default()
        }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmdline.extend(args.iter().map(|a| a.to_string()));
        self
    }

    pub fn fd(mut self, fd: u32, target: &str) -> Self {
        self.fds.insert(fd, target.to_string());
        self
    }

    pub fn cwd(mut self, cwd: &str) -> Self {
        self.cwd = Some(PathBuf::from(cwd));
        self
    }

    pub fn started_at(mut self, start: f64) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Appends counter reads served in order, one per call to `read_io`.
    pub fn reads(mut self, samples: &[(u64, u64)]) -> Self {
        self.io.extend(
            samples
                .iter()
                .map(|&(rchar, wchar)| Some(IoCounters { rchar, wchar })),
        );
        self
    }

    /// Appends one read that fails.
    pub fn unreadable_read(mut self) -> Self {
        self.io.push(None);
        self
    }
}

#[derive(Debug, Default)]
pub struct MockInspector {
    processes: Mutex<HashMap<u32, ScriptedProcess>>,
    files: HashMap<PathBuf, u64>,
}

impl MockInspector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_process(self, pid: u32, process: ScriptedProcess) -> Self {
        self.processes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pid, process);
        self
    }

    pub fn with_file(mut self, path: &str, size: u64) -> Self {
        self.files.insert(PathBuf::from(path), size);
        self
    }

    fn with<T>(&self, pid: u32, f: impl FnOnce(&mut ScriptedProcess) -> T) -> Option<T> {
        let mut processes = self.processes.lock().unwrap_or_else(PoisonError::into_inner);
        processes.get_mut(&pid).map(f)
    }
}

impl ProcessInspector for MockInspector {
    fn exists(&self, pid: u32) -> bool {
        self.with(pid, |p| p.cursor < p.io.len()).unwrap_or(false)
    }

    fn command_name(&self, pid: u32) -> String {
        self.with(pid, |p| p.name.clone())
            .unwrap_or_else(|| UNKNOWN_COMMAND.to_string())
    }

    fn start_time(&self, pid: u32) -> Option<f64> {
        self.with(pid, |p| p.start_time).flatten()
    }

    fn fd_target(&self, pid: u32, fd: u32) -> String {
        self.with(pid, |p| p.fds.get(&fd).cloned())
            .flatten()
            .unwrap_or_default()
    }

    fn open_fds(&self, pid: u32) -> Vec<u32> {
        self.with(pid, |p| p.fds.keys().copied().collect())
            .unwrap_or_default()
    }

    fn cmdline(&self, pid: u32) -> Vec<String> {
        self.with(pid, |p| p.cmdline.clone()).unwrap_or_default()
    }

    fn cwd(&self, pid: u32) -> Option<PathBuf> {
        self.with(pid, |p| p.cwd.clone()).flatten()
    }

    fn read_io(&self, pid: u32) -> Option<IoCounters> {
        self.with(pid, |p| {
            let io = p.io.get(p.cursor).copied().flatten();
            p.cursor += 1;
            io
        })
        .flatten()
    }

    fn file_size(&self, path: &Path) -> Option<u64> {
        self.files.get(path).copied()
    }
}

/// Clock that advances by `step` seconds on every read.
#[derive(Debug)]
pub struct StepClock {
    now: Mutex<f64>,
    step: f64,
}

impl StepClock {
    pub fn new(start: f64, step: f64) -> Self {
        Self {
            now: Mutex::new(start),
            step,
        }
    }
}

impl Clock for StepClock {
    fn now(&self) -> f64 {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        let t = *now;
        *now += self.step;
        t
    }
}

/// Cloneable writer whose bytes can be inspected after the run.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

pub fn fast_settings() -> MonitorSettings {
    MonitorSettings {
        interval: Duration::from_millis(1),
        bar_width: 20,
        rate_policy: RatePolicy::Cumulative,
        probe_sizes: false,
    }
}

/// Context over `inspector` writing interactive, colourless output to a buffer.
pub fn context(inspector: MockInspector, mode: RenderMode) -> (MonitorContext<SharedBuffer>, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let ctx = MonitorContext {
        inspector: Arc::new(inspector),
        clock: Arc::new(StepClock::new(1_000.0, 1.0)),
        probe: Arc::new(NoProbe),
        screen: Arc::new(Screen::new(buffer.clone(), mode, false)),
        settings: fast_settings(),
    };
    (ctx, buffer)
}

//! Runs one monitor per candidate PID and waits for all of them.
//!
//! Row assignment is decided up front by a [`RowTable`] and handed to each
//! task at creation; no task looks at or moves the shared cursor except to
//! address its own row.

use ahash::AHashMap as HashMap;
use std::io::Write;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::monitor::{Monitor, MonitorContext, MonitorReport};
use crate::process::ArchiveTool;

/// First display row for targets; row 0 holds the header.
pub const FIRST_TARGET_ROW: u16 = 2;

/// Fixed PID to row assignment.
#[derive(Debug, Clone, Default)]
pub struct RowTable {
    rows: HashMap<u32, u16>,
    order: Vec<u32>,
    first_row: u16,
}

impl RowTable {
    /// Assigns consecutive rows from `first_row` in `pids` order.
    /// Duplicate PIDs keep their first row.
    pub fn assign(pids: &[u32], first_row: u16) -> Self {
        let mut table = Self {
            rows: HashMap::new(),
            order: Vec::with_capacity(pids.len()),
            first_row,
        };
        for &pid in pids {
            if table.rows.contains_key(&pid) {
                continue;
            }
            let row = first_row.saturating_add(table.order.len() as u16);
            table.rows.insert(pid, row);
            table.order.push(pid);
        }
        table
    }

    pub fn row_of(&self, pid: u32) -> Option<u16> {
        self.rows.get(&pid).copied()
    }

    /// First row after the last assigned one.
    pub fn next_free_row(&self) -> u16 {
        self.first_row.saturating_add(self.order.len() as u16)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Number of targets whose row is at or past the last row of a
    /// `height`-row terminal.
    pub fn overflow(&self, height: u16) -> usize {
        self.iter().filter(|&(_, row)| row >= height).count()
    }

    /// `(pid, row)` pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u16)> + '_ {
        self.order
            .iter()
            .filter_map(move |pid| self.rows.get(pid).map(|row| (*pid, *row)))
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionOutcome {
    /// Nothing to monitor; guidance was printed.
    NoCandidates,
    /// Every monitor ran to completion.
    Completed(Vec<MonitorReport>),
}

impl SessionOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionOutcome::NoCandidates => 1,
            SessionOutcome::Completed(_) => 0,
        }
    }
}

/// Text printed when no archive process is running.
pub fn guidance_text() -> String {
    let tools: Vec<&str> = ArchiveTool::ALL.iter().map(|t| t.name()).collect();
    format!(
        "No running compression or decompression processes found.\n\
         Supported tools: {}\n\
         Start one (for example `gzip -d backup.tar.gz`) and run zprogress again,\n\
         or pass --pid <PID> to monitor a specific process.\n",
        tools.join(", ")
    )
}

pub fn header_text(count: usize) -> String {
    format!(
        "zprogress: monitoring {} archive process{}",
        count,
        if count == 1 { "" } else { "es" }
    )
}

/// Message written once every monitor finished.
pub const ALL_DONE: &str = "All done.";

pub struct Session<W: Write> {
    ctx: MonitorContext<W>,
    first_row: u16,
    terminal_rows: Option<u16>,
}

impl<W: Write + Send + 'static> Session<W> {
    pub fn new(ctx: MonitorContext<W>) -> Self {
        Self {
            ctx,
            first_row: FIRST_TARGET_ROW,
            terminal_rows: None,
        }
    }

    pub fn with_first_row(mut self, first_row: u16) -> Self {
        self.first_row = first_row;
        self
    }

    /// Height of the terminal, used to warn when rows would overlap.
    pub fn with_terminal_rows(mut self, rows: u16) -> Self {
        self.terminal_rows = Some(rows);
        self
    }

    /// Row just below the targets for `pids`, where the footer goes.
    pub fn footer_row(&self, pids: &[u32]) -> u16 {
        RowTable::assign(pids, self.first_row).next_free_row()
    }

    /// Monitors `pids` concurrently and returns once all monitors are done.
    pub async fn run(&self, pids: &[u32]) -> SessionOutcome {
        let screen = Arc::clone(&self.ctx.screen);

        if pids.is_empty() {
            info!("No candidate processes");
            if let Err(e) = screen.write_text(&guidance_text()) {
                error!("Failed to write guidance: {}", e);
            }
            return SessionOutcome::NoCandidates;
        }

        let rows = RowTable::assign(pids, self.first_row);
        info!("Monitoring {} process(es)", rows.len());
        if let Some(height) = self.terminal_rows {
            let hidden = rows.overflow(height);
            if hidden > 0 {
                warn!(
                    "{} of {} targets do not fit in a {}-row terminal and will share its last row",
                    hidden,
                    rows.len(),
                    height
                );
            }
        }
        if let Err(e) = screen.begin(&header_text(rows.len())) {
            error!("Failed to write header: {}", e);
        }

        let mut tasks = JoinSet::new();
        for (pid, row) in rows.iter() {
            let monitor = Monitor::new(pid, row, self.ctx.clone());
            tasks.spawn(monitor.run());
        }

        let mut reports = Vec::with_capacity(rows.len());
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(report) => reports.push(report),
                Err(e) => error!("Monitor task failed: {}", e),
            }
        }
        reports.sort_by_key(|r| rows.row_of(r.pid));

        if let Err(e) = screen.finish(rows.next_free_row(), ALL_DONE) {
            error!("Failed to write footer: {}", e);
        }
        info!("All monitors finished");
        SessionOutcome::Completed(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_table_assigns_consecutive_rows() {
        let table = RowTable::assign(&[300, 100, 200], 3);
        assert_eq!(table.row_of(300), Some(3));
        assert_eq!(table.row_of(100), Some(4));
        assert_eq!(table.row_of(200), Some(5));
        assert_eq!(table.row_of(999), None);
        assert_eq!(table.next_free_row(), 6);
    }

    #[test]
    fn test_row_table_ignores_duplicates() {
        let table = RowTable::assign(&[7, 7, 8], FIRST_TARGET_ROW);
        assert_eq!(table.len(), 2);
        assert_eq!(table.row_of(8), Some(FIRST_TARGET_ROW + 1));
        assert_eq!(table.iter().collect::<Vec<_>>(), vec![(7, 2), (8, 3)]);
    }

    #[test]
    fn test_row_table_overflow() {
        let table = RowTable::assign(&[1, 2, 3, 4], FIRST_TARGET_ROW);
        assert_eq!(table.overflow(24), 0);
        assert_eq!(table.overflow(6), 0);
        assert_eq!(table.overflow(5), 1);
        assert_eq!(table.overflow(2), 4);
    }

    #[test]
    fn test_exit_codes_and_text() {
        assert_eq!(SessionOutcome::NoCandidates.exit_code(), 1);
        assert_eq!(SessionOutcome::Completed(Vec::new()).exit_code(), 0);
        assert!(guidance_text().contains("pbzip2"));
        assert_eq!(header_text(1), "zprogress: monitoring 1 archive process");
        assert!(header_text(2).ends_with("processes"));
    }
}

//! Statistics collection and export.
//!
//! [`PassStats`] describes a single propagation pass, [`SchedulerStats`]
//! aggregates every pass a scheduler has run. Both export to JSON and to a
//! human-readable summary.

use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::PassStatus;
use crate::event::PassReport;

/// Counters for one propagation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassStats {
    /// Seeds actually enqueued (unknown ids excluded)
    pub seeds: usize,

    /// Component updates performed by this engine
    pub updates: u64,

    /// Total frontier pushes, seeds included
    pub enqueued: u64,

    /// Largest frontier length seen
    pub peak_queue: usize,

    /// Nested passes run inside Custom nodes, at any depth
    pub nested_passes: u64,

    /// Updates performed by nested passes
    pub nested_updates: u64,

    /// Nested passes that hit the update ceiling
    pub nested_unstable: u64,
}

impl PassStats {
    /// Updates including those inside Custom nodes.
    pub fn total_updates(&self) -> u64 {
        self.updates + self.nested_updates
    }
}

/// Aggregate statistics of a scheduler.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Requests received (component requests, request-all and clock ticks)
    pub requests: u64,

    /// Requests that arrived while a pass was executing
    pub coalesced_requests: u64,

    /// Passes executed
    pub passes: u64,

    /// Passes aborted at the update ceiling
    pub unstable_passes: u64,

    /// Clock ticks applied
    pub clock_ticks: u64,

    /// Component updates over all passes, nested ones included
    pub total_updates: u64,

    /// Wall time spent in passes, in milliseconds
    pub busy_ms: f64,
}

impl SchedulerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds a finished pass into the totals.
    pub fn record_pass(&mut self, report: &PassReport) {
        self.passes += 1;
        if report.status == PassStatus::Unstable {
            self.unstable_passes += 1;
        }
        self.total_updates += report.stats.total_updates();
        self.busy_ms += report.elapsed_ms;
    }

    /// Mean updates per pass.
    pub fn updates_per_pass(&self) -> f64 {
        if self.passes == 0 {
            0.0
        } else {
            self.total_updates as f64 / self.passes as f64
        }
    }

    /// Exports statistics to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Exports statistics to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }

    /// Writes a human-readable summary to a writer.
    pub fn write_summary<W: Write>(&self, mut w: W) -> std::io::Result<()> {
        writeln!(w, "=== Scheduler Statistics ===")?;
        writeln!(w, "Requests: {}", self.requests)?;
        writeln!(w, "Coalesced requests: {}", self.coalesced_requests)?;
        writeln!(w, "Clock ticks: {}", self.clock_ticks)?;
        writeln!(w)?;
        writeln!(w, "--- Passes ---")?;
        writeln!(w, "Passes: {}", self.passes)?;
        writeln!(w, "Unstable: {}", self.unstable_passes)?;
        writeln!(w, "Updates: {}", self.total_updates)?;
        writeln!(w, "Updates/pass: {:.2}", self.updates_per_pass())?;
        writeln!(w, "Busy time: {:.2} ms", self.busy_ms)?;
        Ok(())
    }

    /// Returns the summary as a string.
    pub fn summary(&self) -> String {
        let mut buf = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_summary(&mut buf);
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// A simple timer for measuring wall-clock time.
#[derive(Debug)]
pub struct Timer {
    start: std::time::Instant,
}

impl Timer {
    /// Starts a new timer.
    pub fn start() -> Self {
        Self {
            start: std::time::Instant::now(),
        }
    }

    /// Returns elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::start()
    }
}

//! Scheduler notifications.
//!
//! The scheduler reports its progress to the interactive surface through
//! these events. The surface polls them; nothing in the simulation waits
//! for them to be consumed.

use serde::{Deserialize, Serialize};

use crate::engine::PassStatus;
use crate::stats::PassStats;
use crate::types::ComponentId;

/// Summary of one finished pass.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PassReport {
    /// Sequence number, starting at 1
    pub pass: u64,
    /// Seeds the pass started from
    pub seeds: Vec<ComponentId>,
    /// Status of the top-level circuit only. A Custom node whose interior
    /// hit the ceiling is counted in `stats.nested_unstable` instead; see
    /// [`PassReport::is_settled`].
    pub status: PassStatus,
    pub stats: PassStats,
    /// Wall time of the pass in milliseconds
    pub elapsed_ms: f64,
}

impl PassReport {
    pub fn is_stable(&self) -> bool {
        self.status == PassStatus::Stable
    }

    /// Stable at the top level and inside every Custom node evaluated.
    pub fn is_settled(&self) -> bool {
        self.is_stable() && self.stats.nested_unstable == 0
    }
}

/// A notification emitted by the scheduler.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SchedulerEvent {
    /// A pass began executing.
    PassStarted {
        pass: u64,
        seeds: Vec<ComponentId>,
    },

    /// A pass finished, stable or not.
    PassCompleted(PassReport),

    /// No follow-up was pending; results are ready to be read.
    Idle {
        /// Passes executed so far
        passes: u64,
    },
}

impl SchedulerEvent {
    /// The pass number for pass events.
    pub fn pass(&self) -> Option<u64> {
        match self {
            SchedulerEvent::PassStarted { pass, .. } => Some(*pass),
            SchedulerEvent::PassCompleted(report) => Some(report.pass),
            SchedulerEvent::Idle { .. } => None,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SchedulerEvent::Idle { .. })
    }
}

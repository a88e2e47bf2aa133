//! Propagation engine.
//!
//! The `PropagationEngine` drives one pass: starting from a set of seed
//! components it repeatedly takes the oldest dirty component off a FIFO
//! [`Frontier`], runs its update rule and lets the circuit enqueue every
//! component whose input actually changed. The pass ends when the frontier
//! is empty, or when the update ceiling is hit, in which case the pass is
//! reported as [`PassStatus::Unstable`] and the graph is left partially
//! propagated.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::circuit::Circuit;
use crate::io::DirtySink;
use crate::stats::PassStats;
use crate::types::ComponentId;

/// Default ceiling on component updates per pass.
pub const DEFAULT_MAX_UPDATES: u64 = 100_000;

fn default_max_updates() -> u64 {
    DEFAULT_MAX_UPDATES
}

/// Engine configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Update count after which a pass is aborted as unstable
    #[serde(default = "default_max_updates")]
    pub max_updates: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_updates: DEFAULT_MAX_UPDATES,
        }
    }
}

impl EngineConfig {
    pub fn with_max_updates(mut self, max_updates: u64) -> Self {
        self.max_updates = max_updates;
        self
    }
}

/// How a pass ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PassStatus {
    /// The frontier drained
    Stable,
    /// The update ceiling was reached (oscillation or runaway feedback)
    Unstable,
}

/// Result of one pass.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutcome {
    pub status: PassStatus,
    pub stats: PassStats,
}

impl PassOutcome {
    /// Whether the top-level circuit drained. Inner Custom aborts do not
    /// affect this; check [`PassOutcome::is_settled`] for those.
    pub fn is_stable(&self) -> bool {
        self.status == PassStatus::Stable
    }

    pub fn is_settled(&self) -> bool {
        self.is_stable() && self.stats.nested_unstable == 0
    }
}

/// FIFO queue of dirty components.
///
/// A component is queued at most once at a time; once dequeued it may be
/// queued again.
#[derive(Debug, Default)]
pub struct Frontier {
    queue: VecDeque<ComponentId>,
    queued: HashSet<ComponentId>,
    enqueued: u64,
    peak: usize,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues `component` unless it is already queued.
    pub fn push(&mut self, component: ComponentId) -> bool {
        if !self.queued.insert(component) {
            return false;
        }
        self.queue.push_back(component);
        self.enqueued += 1;
        self.peak = self.peak.max(self.queue.len());
        true
    }

    pub fn pop(&mut self) -> Option<ComponentId> {
        let component = self.queue.pop_front()?;
        self.queued.remove(&component);
        Some(component)
    }

    pub fn is_queued(&self, component: ComponentId) -> bool {
        self.queued.contains(&component)
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
        self.queued.clear();
    }

    /// Total successful pushes since creation.
    pub fn enqueued(&self) -> u64 {
        self.enqueued
    }

    /// Largest queue length seen.
    pub fn peak(&self) -> usize {
        self.peak
    }
}

impl DirtySink for Frontier {
    fn mark_dirty(&mut self, component: ComponentId) {
        self.push(component);
    }
}

/// Per-pass context handed to update rules.
///
/// Custom nodes use it to run their nested engines with the same settings
/// and to fold the nested work into the outer pass statistics.
#[derive(Debug)]
pub struct EvalContext {
    config: EngineConfig,
    nested_passes: u64,
    nested_updates: u64,
    nested_unstable: u64,
}

impl EvalContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            nested_passes: 0,
            nested_updates: 0,
            nested_unstable: 0,
        }
    }

    pub fn config(&self) -> EngineConfig {
        self.config
    }

    pub(crate) fn record_nested(&mut self, outcome: &PassOutcome) {
        self.nested_passes += 1 + outcome.stats.nested_passes;
        self.nested_updates += outcome.stats.updates + outcome.stats.nested_updates;
        self.nested_unstable += outcome.stats.nested_unstable;
        if !outcome.is_stable() {
            self.nested_unstable += 1;
        }
    }
}

/// Runs propagation passes over a circuit.
#[derive(Clone, Debug, Default)]
pub struct PropagationEngine {
    config: EngineConfig,
}

impl PropagationEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Propagates from `seeds` until the circuit settles or the update
    /// ceiling is hit.
    ///
    /// Seeds are enqueued in the order given; ids not in `circuit` are
    /// skipped.
    pub fn run<I>(&self, circuit: &mut Circuit, seeds: I) -> PassOutcome
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let mut frontier = Frontier::new();
        for seed in seeds {
            if circuit.contains(seed) {
                frontier.push(seed);
            } else {
                debug!(circuit = %circuit.id(), component = %seed, "skipping unknown seed");
            }
        }

        let mut stats = PassStats {
            seeds: frontier.len(),
            ..PassStats::default()
        };
        let mut ctx = EvalContext::new(self.config);
        let mut status = PassStatus::Stable;

        while let Some(component) = frontier.pop() {
            if stats.updates >= self.config.max_updates {
                warn!(
                    circuit = %circuit.id(),
                    updates = stats.updates,
                    pending = frontier.len() + 1,
                    "pass did not stabilize, aborting"
                );
                frontier.clear();
                status = PassStatus::Unstable;
                break;
            }
            stats.updates += 1;
            trace!(component = %component, "update");
            circuit.evaluate(component, &mut ctx, &mut frontier);
        }

        stats.enqueued = frontier.enqueued();
        stats.peak_queue = frontier.peak();
        stats.nested_passes = ctx.nested_passes;
        stats.nested_updates = ctx.nested_updates;
        stats.nested_unstable = ctx.nested_unstable;

        debug!(
            circuit = %circuit.id(),
            ?status,
            updates = stats.updates,
            nested = stats.nested_passes,
            "pass finished"
        );
        PassOutcome { status, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::Component;
    use crate::nodes::GateOp;
    use crate::types::CircuitId;

    #[test]
    fn test_frontier_dedups_while_queued() {
        let circuit = CircuitId::next();
        let a = ComponentId::new(circuit, 0);
        let b = ComponentId::new(circuit, 1);

        let mut frontier = Frontier::new();
        assert!(frontier.push(a));
        assert!(frontier.push(b));
        assert!(!frontier.push(a));
        assert_eq!(frontier.len(), 2);

        assert_eq!(frontier.pop(), Some(a));
        assert!(!frontier.is_queued(a));
        assert!(frontier.push(a));
        assert_eq!(frontier.pop(), Some(b));
        assert_eq!(frontier.pop(), Some(a));
        assert_eq!(frontier.pop(), None);
        assert_eq!(frontier.enqueued(), 3);
        assert_eq!(frontier.peak(), 2);
    }

    #[test]
    fn test_chain_propagates() {
        let mut circuit = Circuit::new();
        let switch = circuit.add(Component::switch());
        let not = circuit.add(Component::not());
        let buffer = circuit.add(Component::buffer());
        let light = circuit.add(Component::light());
        circuit.connect(switch, 0, not, 0).unwrap();
        circuit.connect(not, 0, buffer, 0).unwrap();
        circuit.connect(buffer, 0, light, 0).unwrap();

        let engine = PropagationEngine::default();
        let outcome = engine.run(&mut circuit, [switch, not]);
        assert!(outcome.is_stable());
        assert!(circuit.state(light).unwrap().is_high());

        circuit.set_switch(switch, true).unwrap();
        let outcome = engine.run(&mut circuit, [switch]);
        assert!(outcome.is_stable());
        assert_eq!(outcome.stats.updates, 4);
        assert!(!circuit.state(light).unwrap().is_high());
    }

    #[test]
    fn test_unchanged_output_stops_propagation() {
        let mut circuit = Circuit::new();
        let a = circuit.add(Component::switch());
        let b = circuit.add(Component::switch());
        let and = circuit.add(Component::gate(GateOp::And, 2).unwrap());
        let light = circuit.add(Component::light());
        circuit.connect(a, 0, and, 0).unwrap();
        circuit.connect(b, 0, and, 1).unwrap();
        circuit.connect(and, 0, light, 0).unwrap();

        circuit.set_switch(a, true).unwrap();
        let outcome = PropagationEngine::default().run(&mut circuit, [a]);
        // a changes the AND input, but the AND output stays low.
        assert_eq!(outcome.stats.updates, 2);
        assert!(!circuit.state(light).unwrap().is_high());
    }

    #[test]
    fn test_unknown_seed_is_skipped() {
        let mut circuit = Circuit::new();
        let mut other = Circuit::new();
        let stray = other.add(Component::switch());

        let outcome = PropagationEngine::default().run(&mut circuit, [stray]);
        assert!(outcome.is_stable());
        assert_eq!(outcome.stats.seeds, 0);
        assert_eq!(outcome.stats.updates, 0);
    }

    #[test]
    fn test_ceiling_aborts_oscillation() {
        let mut circuit = Circuit::new();
        let not = circuit.add(Component::not());
        circuit.connect(not, 0, not, 0).unwrap();

        let engine = PropagationEngine::new(EngineConfig::default().with_max_updates(50));
        let outcome = engine.run(&mut circuit, [not]);
        assert_eq!(outcome.status, PassStatus::Unstable);
        assert_eq!(outcome.stats.updates, 50);
    }
}

//! Single-flight simulation scheduler.
//!
//! The `Scheduler` owns a circuit and a dedicated worker thread. Callers
//! request propagation from seed components and return immediately; the
//! worker runs at most one pass at a time. Requests that arrive while a pass
//! executes are folded into exactly one follow-up pass seeded with the union
//! of their seeds, so no request is lost and bursts of edits collapse into a
//! single re-evaluation.
//!
//! Structural edits go through the same mutex the worker holds for the
//! duration of a pass. An edit issued mid-pass therefore waits for the pass
//! to finish and is applied between passes.
//!
//! # Example
//!
//! ```rust
//! use std::time::Duration;
//! use gatesim::{Circuit, Component, Scheduler, SchedulerConfig};
//!
//! let mut circuit = Circuit::new();
//! let switch = circuit.add(Component::switch());
//! let light = circuit.add(Component::light());
//! circuit.connect(switch, 0, light, 0).unwrap();
//!
//! let scheduler = Scheduler::spawn(circuit, SchedulerConfig::default()).unwrap();
//! scheduler.set_switch(switch, true).unwrap();
//! scheduler.wait_for_idle(Duration::from_secs(5)).unwrap();
//! assert!(scheduler.read(|c| c.state(light).unwrap().is_high()));
//! ```

use std::collections::HashSet;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::circuit::Circuit;
use crate::component::Component;
use crate::duplicate::Duplicated;
use crate::engine::{EngineConfig, PassStatus, PropagationEngine};
use crate::error::CircuitError;
use crate::event::{PassReport, SchedulerEvent};
use crate::stats::{SchedulerStats, Timer};
use crate::types::{ComponentId, PinIndex, Position, WireId};
use crate::wire::Wire;

/// Errors raised by the scheduler.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The worker thread could not be started.
    #[error("Failed to spawn simulation worker: {0}")]
    Spawn(#[from] std::io::Error),

    /// The worker thread has exited.
    #[error("Simulation worker is no longer running")]
    Disconnected,

    /// No idle notification arrived in time.
    #[error("Timed out after {0:?} waiting for the scheduler to go idle")]
    Timeout(Duration),

    /// A structural edit was rejected.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
}

/// Result type alias using `SchedulerError`.
pub type Result<T> = std::result::Result<T, SchedulerError>;

fn default_event_capacity() -> usize {
    1024
}

fn default_thread_name() -> String {
    "gatesim-worker".to_string()
}

/// Scheduler configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Settings for every pass; filled from the `engine` section of a
    /// [`SimConfig`](crate::config::SimConfig)
    #[serde(skip)]
    pub engine: EngineConfig,

    /// Clock period; clocks only tick on request when unset
    #[serde(default)]
    pub clock_period_ms: Option<u64>,

    /// Capacity of the notification queue
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    /// Name of the worker thread
    #[serde(default = "default_thread_name")]
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            clock_period_ms: None,
            event_capacity: default_event_capacity(),
            thread_name: default_thread_name(),
        }
    }
}

impl SchedulerConfig {
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    pub fn with_clock_period(mut self, period_ms: u64) -> Self {
        self.clock_period_ms = Some(period_ms);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }
}

/// The single-flight rule, free of threads and channels.
///
/// `request` either starts a pass right away or records a follow-up;
/// `complete` ends the running pass and hands out the follow-up, if any.
/// Follow-up seeds are the union of all recorded seeds in first-seen order.
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: bool,
    pending: Vec<ComponentId>,
    pending_set: HashSet<ComponentId>,
    follow_up: bool,
}

impl SingleFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the seeds to run now, or `None` if a pass is already running
    /// (the seeds are then recorded for the follow-up). An empty request
    /// never starts a pass.
    pub fn request<I>(&mut self, seeds: I) -> Option<Vec<ComponentId>>
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let before = self.pending.len();
        for seed in seeds {
            if self.pending_set.insert(seed) {
                self.pending.push(seed);
            }
        }

        if self.running {
            self.follow_up |= self.pending.len() > before;
            return None;
        }
        if self.pending.is_empty() {
            return None;
        }
        self.running = true;
        Some(self.take_pending())
    }

    /// Ends the running pass. Returns the follow-up seeds if requests came
    /// in meanwhile, otherwise goes idle and returns `None`.
    pub fn complete(&mut self) -> Option<Vec<ComponentId>> {
        if self.follow_up {
            self.follow_up = false;
            return Some(self.take_pending());
        }
        self.running = false;
        None
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_follow_up(&self) -> bool {
        self.follow_up
    }

    fn take_pending(&mut self) -> Vec<ComponentId> {
        self.pending_set.clear();
        std::mem::take(&mut self.pending)
    }
}

enum Command {
    Request(Vec<ComponentId>),
    RequestAll,
    TickClocks,
    Shutdown,
}

struct Worker {
    circuit: Arc<Mutex<Circuit>>,
    engine: PropagationEngine,
    commands: Receiver<Command>,
    events: Sender<SchedulerEvent>,
    stats: Arc<Mutex<SchedulerStats>>,
    ticker: Receiver<Instant>,
    flight: SingleFlight,
    passes: u64,
    shutdown: bool,
}

impl Worker {
    fn run(mut self) {
        info!("simulation worker started");
        while !self.shutdown {
            let command = select! {
                recv(self.commands) -> msg => msg.ok(),
                recv(self.ticker) -> _ => Some(Command::TickClocks),
            };
            let Some(command) = command else {
                break;
            };
            if let Some(seeds) = self.accept(command) {
                self.run_until_idle(seeds);
            }
        }
        info!(passes = self.passes, "simulation worker stopped");
    }

    /// Folds one command into the single-flight state. Returns seeds when a
    /// pass should start now.
    fn accept(&mut self, command: Command) -> Option<Vec<ComponentId>> {
        let seeds = match command {
            Command::Request(seeds) => seeds,
            Command::RequestAll => self.circuit.lock().component_ids().collect(),
            Command::TickClocks => {
                let seeds = self.circuit.lock().tick_clocks();
                self.stats.lock().clock_ticks += 1;
                seeds
            }
            Command::Shutdown => {
                self.shutdown = true;
                return None;
            }
        };

        {
            let mut stats = self.stats.lock();
            stats.requests += 1;
            if self.flight.is_running() {
                stats.coalesced_requests += 1;
            }
        }
        self.flight.request(seeds)
    }

    fn run_until_idle(&mut self, seeds: Vec<ComponentId>) {
        let mut next = Some(seeds);
        while let Some(seeds) = next {
            self.run_pass(seeds);
            while let Ok(command) = self.commands.try_recv() {
                // Nothing can start while the flight is running.
                let _ = self.accept(command);
            }
            next = self.flight.complete();
        }
        self.emit(SchedulerEvent::Idle {
            passes: self.passes,
        });
    }

    fn run_pass(&mut self, seeds: Vec<ComponentId>) {
        self.passes += 1;
        let pass = self.passes;
        self.emit(SchedulerEvent::PassStarted {
            pass,
            seeds: seeds.clone(),
        });

        let timer = Timer::start();
        let outcome = {
            let mut circuit = self.circuit.lock();
            self.engine.run(&mut circuit, seeds.iter().copied())
        };
        let report = PassReport {
            pass,
            seeds,
            status: outcome.status,
            stats: outcome.stats,
            elapsed_ms: timer.elapsed_ms(),
        };

        if report.status == PassStatus::Unstable {
            warn!(pass, updates = report.stats.updates, "pass aborted at the update ceiling");
        } else if !report.is_settled() {
            warn!(pass, nested_unstable = report.stats.nested_unstable, "pass completed with unsettled Custom interiors");
        } else {
            debug!(pass, updates = report.stats.total_updates(), elapsed_ms = report.elapsed_ms, "pass completed");
        }
        self.stats.lock().record_pass(&report);
        self.emit(SchedulerEvent::PassCompleted(report));
    }

    fn emit(&self, event: SchedulerEvent) {
        if let Err(TrySendError::Full(event)) = self.events.try_send(event) {
            trace!(?event, "notification queue full, dropping event");
        }
    }
}

/// Runs propagation passes for one circuit on a background thread.
pub struct Scheduler {
    circuit: Arc<Mutex<Circuit>>,
    commands: Sender<Command>,
    events: Receiver<SchedulerEvent>,
    stats: Arc<Mutex<SchedulerStats>>,
    worker: Option<JoinHandle<()>>,
}

impl Scheduler {
    /// Takes ownership of `circuit` and starts the worker thread.
    pub fn spawn(circuit: Circuit, config: SchedulerConfig) -> Result<Self> {
        let circuit = Arc::new(Mutex::new(circuit));
        let stats = Arc::new(Mutex::new(SchedulerStats::new()));
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let (event_tx, event_rx) = crossbeam_channel::bounded(config.event_capacity.max(1));

        let ticker = match config.clock_period_ms {
            Some(period) if period > 0 => crossbeam_channel::tick(Duration::from_millis(period)),
            _ => crossbeam_channel::never(),
        };

        let worker = Worker {
            circuit: Arc::clone(&circuit),
            engine: PropagationEngine::new(config.engine),
            commands: command_rx,
            events: event_tx,
            stats: Arc::clone(&stats),
            ticker,
            flight: SingleFlight::new(),
            passes: 0,
            shutdown: false,
        };
        let handle = std::thread::Builder::new()
            .name(config.thread_name.clone())
            .spawn(move || worker.run())?;

        Ok(Self {
            circuit,
            commands: command_tx,
            events: event_rx,
            stats,
            worker: Some(handle),
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SchedulerError::Disconnected)
    }

    /// Requests a pass seeded with `seed`. Never blocks.
    pub fn request(&self, seed: ComponentId) -> Result<()> {
        self.send(Command::Request(vec![seed]))
    }

    /// Requests a pass seeded with several components.
    pub fn request_many<I>(&self, seeds: I) -> Result<()>
    where
        I: IntoIterator<Item = ComponentId>,
    {
        let seeds: Vec<ComponentId> = seeds.into_iter().collect();
        if seeds.is_empty() {
            return Ok(());
        }
        self.send(Command::Request(seeds))
    }

    /// Requests a pass seeded with every top-level component.
    pub fn request_all(&self) -> Result<()> {
        self.send(Command::RequestAll)
    }

    /// Advances every clock and propagates the change.
    pub fn tick_clocks(&self) -> Result<()> {
        self.send(Command::TickClocks)
    }

    /// Notification queue.
    pub fn events(&self) -> &Receiver<SchedulerEvent> {
        &self.events
    }

    /// Drains the notifications available right now.
    pub fn poll_events(&self) -> Vec<SchedulerEvent> {
        self.events.try_iter().collect()
    }

    /// Blocks until an idle notification arrives, returning everything
    /// received up to and including it.
    pub fn wait_for_idle(&self, timeout: Duration) -> Result<Vec<SchedulerEvent>> {
        let deadline = Instant::now() + timeout;
        let mut seen = Vec::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.events.recv_timeout(remaining) {
                Ok(event) => {
                    let idle = event.is_idle();
                    seen.push(event);
                    if idle {
                        return Ok(seen);
                    }
                }
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    return Err(SchedulerError::Timeout(timeout))
                }
                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => {
                    return Err(SchedulerError::Disconnected)
                }
            }
        }
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats.lock().clone()
    }

    /// Shared handle to the circuit. Holding its lock stalls the worker.
    pub fn circuit(&self) -> &Arc<Mutex<Circuit>> {
        &self.circuit
    }

    /// Reads the circuit between passes.
    pub fn read<R>(&self, f: impl FnOnce(&Circuit) -> R) -> R {
        f(&*self.circuit.lock())
    }

    /// Mutates the circuit between passes. No pass is requested.
    pub fn with_circuit<R>(&self, f: impl FnOnce(&mut Circuit) -> R) -> R {
        f(&mut *self.circuit.lock())
    }

    /// Adds a component and requests its first evaluation.
    pub fn add_component(&self, component: Component) -> Result<ComponentId> {
        let id = self.circuit.lock().add(component);
        self.request(id)?;
        Ok(id)
    }

    /// Connects two pins and requests the destination.
    pub fn connect(
        &self,
        source: ComponentId,
        output: PinIndex,
        dest: ComponentId,
        input: PinIndex,
    ) -> Result<WireId> {
        let wire = self.circuit.lock().connect(source, output, dest, input)?;
        self.request(dest)?;
        Ok(wire)
    }

    /// Removes a wire and requests the component it fed.
    pub fn disconnect(&self, wire: WireId) -> Result<Wire> {
        let removed = self.circuit.lock().disconnect(wire)?;
        self.request(removed.dest_component())?;
        Ok(removed)
    }

    /// Deletes a component and requests everything it fed.
    pub fn delete_component(&self, id: ComponentId) -> Result<()> {
        let affected = self.circuit.lock().delete_component(id)?;
        self.request_many(affected)
    }

    /// Sets a switch; requests a pass only if its state changed.
    pub fn set_switch(&self, id: ComponentId, value: bool) -> Result<()> {
        if self.circuit.lock().set_switch(id, value)? {
            self.request(id)?;
        }
        Ok(())
    }

    /// Flips a switch and returns its new state.
    pub fn toggle_switch(&self, id: ComponentId) -> Result<bool> {
        let state = self.circuit.lock().toggle_switch(id)?;
        self.request(id)?;
        Ok(state)
    }

    /// Duplicates components within the circuit and requests the copies.
    pub fn duplicate(&self, ids: &[ComponentId], offset: Position) -> Result<Duplicated> {
        let copy = self.circuit.lock().duplicate(ids, offset)?;
        self.request_many(copy.components.iter().copied())?;
        Ok(copy)
    }

    /// Stops the worker after its current work and returns the circuit
    /// handle.
    pub fn shutdown(mut self) -> Arc<Mutex<Circuit>> {
        self.stop();
        Arc::clone(&self.circuit)
    }

    fn stop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("simulation worker panicked");
            }
        }
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

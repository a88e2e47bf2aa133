//! # gatesim
//!
//! An interactive digital-logic simulation core: a circuit graph of gates,
//! switches, lights and hierarchical Custom nodes, a propagation engine
//! that settles the graph after every change, a single-flight scheduler
//! that runs propagation off the interactive thread, and a duplicator that
//! clones subgraphs with their internal wiring.
//!
//! ## Design Principles
//!
//! - **Arena Graph**: Components and wires live in a [`Circuit`] and refer
//!   to each other through ids, so cyclic graphs (latches, oscillators) need
//!   no shared ownership.
//! - **Change-Driven Propagation**: Only components whose inputs actually
//!   changed are re-evaluated, in FIFO order. Feedback that never settles is
//!   cut off by an update ceiling and reported as unstable.
//! - **Hierarchy**: A Custom node owns a private inner circuit and runs its
//!   own nested engine when evaluated.
//! - **Single-Flight Scheduling**: At most one pass runs at a time; requests
//!   made during a pass coalesce into one follow-up pass.
//!
//! ## Quick Start
//!
//! ```rust
//! use gatesim::{Circuit, Component, GateOp, PropagationEngine, EngineConfig};
//!
//! // NAND SR latch
//! let mut circuit = Circuit::new();
//! let set = circuit.add(Component::switch());
//! let reset = circuit.add(Component::switch());
//! let top = circuit.add(Component::gate(GateOp::Nand, 2).unwrap());
//! let bottom = circuit.add(Component::gate(GateOp::Nand, 2).unwrap());
//! let q = circuit.add(Component::light());
//! circuit.connect(set, 0, top, 0).unwrap();
//! circuit.connect(reset, 0, bottom, 1).unwrap();
//! circuit.connect(bottom, 0, top, 1).unwrap();
//! circuit.connect(top, 0, bottom, 0).unwrap();
//! circuit.connect(top, 0, q, 0).unwrap();
//!
//! let engine = PropagationEngine::new(EngineConfig::default());
//! circuit.set_switch(set, true).unwrap();
//! circuit.set_switch(reset, true).unwrap();
//! let seeds: Vec<_> = circuit.component_ids().collect();
//! assert!(engine.run(&mut circuit, seeds).is_stable());
//! ```
//!
//! ## Background Simulation
//!
//! ```rust,ignore
//! use gatesim::{Scheduler, SchedulerConfig};
//!
//! let scheduler = Scheduler::spawn(circuit, SchedulerConfig::default())?;
//! scheduler.toggle_switch(set)?;
//! for event in scheduler.poll_events() {
//!     // redraw when idle
//! }
//! ```
//!
//! ## Configuration-Driven Setup
//!
//! ```rust,ignore
//! use gatesim::config::SimConfig;
//!
//! let config = SimConfig::from_file("adder.yaml")?;
//! gatesim::init_logging(&config.logging.level);
//! let scheduler = Scheduler::spawn(config.build_circuit()?, config.scheduler_config())?;
//! ```

pub mod types;
pub mod error;
pub mod wire;
pub mod io;
pub mod nodes;
pub mod component;
pub mod custom;
pub mod circuit;
pub mod engine;
pub mod duplicate;
pub mod event;
pub mod scheduler;
pub mod stats;
pub mod registry;
pub mod config;

// Re-export commonly used types
pub use types::{CircuitId, ComponentId, PinDirection, PinIndex, PinRef, Position, Side, WireId};
pub use error::CircuitError;
pub use wire::{Wire, WireMap};
pub use io::{DirtySink, IoManager, Pin};
pub use nodes::{ClockPhase, GateOp};
pub use component::{Component, ComponentKind, ComponentState, ComponentType};
pub use custom::{BoundaryLayout, Custom};
pub use circuit::Circuit;
pub use engine::{EngineConfig, Frontier, PassOutcome, PassStatus, PropagationEngine};
pub use duplicate::{duplicate_into, DuplicationPlan, Duplicated};
pub use event::{PassReport, SchedulerEvent};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerError, SingleFlight};
pub use stats::{PassStats, SchedulerStats, Timer};
pub use registry::{create_default_registry, ComponentRegistry};
pub use config::{ConfigError, SimConfig, SimConfigBuilder};

/// Initialize the tracing subscriber for logging.
///
/// Call this at the start of your program to enable logging. `RUST_LOG`
/// overrides `level` when set.
///
/// # Example
///
/// ```rust,ignore
/// gatesim::init_logging("info");
/// ```
pub fn init_logging(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}

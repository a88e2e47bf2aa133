//! Built-in primitive update rules.
//!
//! These are the input→output functions of the primitive components. The
//! component model in [`crate::component`] dispatches to them.
//!
//! # Available Primitives
//!
//! ## Gates
//! - [`GateOp`] - AND, OR, NAND, NOR, XOR, XNOR over 2..=8 inputs
//! - [`gate::not`] / [`gate::buffer`] - single-input gates
//!
//! ## Sources
//! - [`ClockPhase`] - phase counter driving a clock's output
//!
//! ## Sinks
//! - [`sink::display_value`] - 4-bit hex display decoding

pub mod gate;
pub mod sink;
pub mod source;

pub use gate::{GateOp, DEFAULT_GATE_INPUTS, MAX_GATE_INPUTS, MIN_GATE_INPUTS};
pub use source::ClockPhase;

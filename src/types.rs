//! Core type definitions for the circuit graph.
//!
//! Components, pins and wires reference each other through the stable ids
//! defined here rather than through pointers, so the cyclic graph can be
//! mutated, duplicated and torn down without cycle-aware ownership.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

/// Index of a pin within its direction group on one component.
///
/// Assigned when the pin is created and never reused for the lifetime of
/// the component.
pub type PinIndex = usize;

static NEXT_CIRCUIT_ID: AtomicU32 = AtomicU32::new(1);

/// Identifier of one circuit arena (the top level or a Custom node's interior).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CircuitId(u32);

impl CircuitId {
    /// Allocates a fresh, process-unique circuit id.
    pub fn next() -> Self {
        Self(NEXT_CIRCUIT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for CircuitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit#{}", self.0)
    }
}

/// Unique identifier for a component in a circuit.
///
/// The owning circuit is part of the id, so an id that leaks out of a
/// Custom node's interior can never be mistaken for a top-level component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ComponentId {
    pub circuit: CircuitId,
    pub slot: u32,
}

impl ComponentId {
    pub fn new(circuit: CircuitId, slot: u32) -> Self {
        Self { circuit, slot }
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}:{}", self.circuit.0, self.slot)
    }
}

/// Unique identifier for a wire in a circuit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WireId {
    pub circuit: CircuitId,
    pub slot: u32,
}

impl WireId {
    pub fn new(circuit: CircuitId, slot: u32) -> Self {
        Self { circuit, slot }
    }
}

impl fmt::Display for WireId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}:{}", self.circuit.0, self.slot)
    }
}

/// Direction of a pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinDirection {
    Input,
    Output,
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinDirection::Input => f.write_str("input"),
            PinDirection::Output => f.write_str("output"),
        }
    }
}

/// Fully qualified address of one pin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PinRef {
    pub component: ComponentId,
    pub direction: PinDirection,
    pub index: PinIndex,
}

impl PinRef {
    pub fn input(component: ComponentId, index: PinIndex) -> Self {
        Self {
            component,
            direction: PinDirection::Input,
            index,
        }
    }

    pub fn output(component: ComponentId, index: PinIndex) -> Self {
        Self {
            component,
            direction: PinDirection::Output,
            index,
        }
    }
}

impl fmt::Display for PinRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}{}", self.component, self.direction, self.index)
    }
}

/// Position of a component on the canvas, in pixels.
///
/// Opaque to the simulation; only offset arithmetic and the scan-axis
/// ordering of Custom boundary elements look at it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this position translated by `offset`.
    pub fn offset(self, offset: Position) -> Self {
        Self {
            x: self.x + offset.x,
            y: self.y + offset.y,
        }
    }
}

/// One of the four sides of a component body.
///
/// Doubles as the component rotation (the side its body faces).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Right,
    Down,
    Left,
    Up,
}

impl Side {
    /// All sides in boundary pin allocation order.
    pub const ALL: [Side; 4] = [Side::Right, Side::Down, Side::Left, Side::Up];

    /// Coordinate along which elements on this side are ordered:
    /// x for the top and bottom sides, y for the left and right sides.
    pub fn scan_coordinate(self, position: Position) -> i32 {
        match self {
            Side::Up | Side::Down => position.x,
            Side::Left | Side::Right => position.y,
        }
    }

    pub fn rotated_clockwise(self) -> Self {
        match self {
            Side::Right => Side::Down,
            Side::Down => Side::Left,
            Side::Left => Side::Up,
            Side::Up => Side::Right,
        }
    }

    pub fn rotated_counter_clockwise(self) -> Self {
        match self {
            Side::Right => Side::Up,
            Side::Up => Side::Left,
            Side::Left => Side::Down,
            Side::Down => Side::Right,
        }
    }
}

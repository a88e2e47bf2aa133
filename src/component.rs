//! Component definitions.
//!
//! Components are the vertices of the circuit graph. Each one owns its pins
//! through an [`IoManager`] and has an update rule mapping input signals to
//! output signals. The set of rules is closed: [`ComponentKind`] lists every
//! primitive plus [`Custom`], the variant that owns a private sub-graph.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::circuit::Circuit;
use crate::custom::{BoundaryLayout, Custom};
use crate::engine::EvalContext;
use crate::error::{CircuitError, Result};
use crate::io::IoManager;
use crate::nodes::gate;
use crate::nodes::sink::{display_value, DISPLAY_INPUTS};
use crate::nodes::{ClockPhase, GateOp, DEFAULT_GATE_INPUTS, MAX_GATE_INPUTS, MIN_GATE_INPUTS};
use crate::types::{Position, Side};
use crate::wire::WireMap;

/// The type of a component, as named by the registry and config files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ComponentType {
    And,
    Or,
    Not,
    Nand,
    Nor,
    Xor,
    Xnor,
    Buffer,
    Switch,
    Light,
    Clock,
    Button,
    Zero,
    One,
    Display,
    Custom,
}

impl ComponentType {
    /// Every component type.
    pub const ALL: [ComponentType; 16] = [
        ComponentType::And,
        ComponentType::Or,
        ComponentType::Not,
        ComponentType::Nand,
        ComponentType::Nor,
        ComponentType::Xor,
        ComponentType::Xnor,
        ComponentType::Buffer,
        ComponentType::Switch,
        ComponentType::Light,
        ComponentType::Clock,
        ComponentType::Button,
        ComponentType::Zero,
        ComponentType::One,
        ComponentType::Display,
        ComponentType::Custom,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ComponentType::And => "AND",
            ComponentType::Or => "OR",
            ComponentType::Not => "NOT",
            ComponentType::Nand => "NAND",
            ComponentType::Nor => "NOR",
            ComponentType::Xor => "XOR",
            ComponentType::Xnor => "XNOR",
            ComponentType::Buffer => "BUFFER",
            ComponentType::Switch => "SWITCH",
            ComponentType::Light => "LIGHT",
            ComponentType::Clock => "CLOCK",
            ComponentType::Button => "BUTTON",
            ComponentType::Zero => "ZERO",
            ComponentType::One => "ONE",
            ComponentType::Display => "DISPLAY",
            ComponentType::Custom => "CUSTOM",
        }
    }

    /// Case-insensitive lookup by name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(name))
    }

    /// The gate operation for multi-input gate types.
    pub fn gate_op(self) -> Option<GateOp> {
        match self {
            ComponentType::And => Some(GateOp::And),
            ComponentType::Or => Some(GateOp::Or),
            ComponentType::Nand => Some(GateOp::Nand),
            ComponentType::Nor => Some(GateOp::Nor),
            ComponentType::Xor => Some(GateOp::Xor),
            ComponentType::Xnor => Some(GateOp::Xnor),
            _ => None,
        }
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Read-only view of a component's internal state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentState {
    /// Switches, buttons, lights, constants and gates (last output)
    Logic(bool),
    /// Clock level and phase counter
    Clock { high: bool, phase: u64 },
    /// Digit shown by a hex display
    Display(u8),
    /// Boundary output values of a Custom node
    Custom { outputs: Vec<bool> },
}

impl ComponentState {
    /// Collapses the state to one level: true when lit, high or non-zero.
    pub fn is_high(&self) -> bool {
        match self {
            ComponentState::Logic(v) => *v,
            ComponentState::Clock { high, .. } => *high,
            ComponentState::Display(v) => *v != 0,
            ComponentState::Custom { outputs } => outputs.iter().any(|&v| v),
        }
    }
}

/// The update rule of a component.
#[derive(Debug)]
pub enum ComponentKind {
    /// Multi-input gate
    Gate(GateOp),
    Not,
    Buffer,
    /// Toggle switch, driven by the user
    Switch,
    /// Momentary switch, high while pressed
    Button,
    Clock(ClockPhase),
    /// ZERO or ONE
    Constant(bool),
    Light,
    /// 4-bit hex display
    Display { value: u8 },
    /// Hierarchical node wrapping an inner circuit
    Custom(Box<Custom>),
}

/// A vertex of the circuit graph.
#[derive(Debug)]
pub struct Component {
    name: String,
    position: Position,
    rotation: Side,
    state: bool,
    io: IoManager,
    kind: ComponentKind,
}

impl Component {
    fn with_kind(kind: ComponentKind, inputs: usize, outputs: usize) -> Self {
        Self {
            name: String::new(),
            position: Position::default(),
            rotation: Side::default(),
            state: false,
            io: IoManager::with_pins(inputs, outputs),
            kind,
        }
    }

    /// Creates a multi-input gate with `inputs` inputs and one output.
    pub fn gate(op: GateOp, inputs: usize) -> Result<Self> {
        if !(MIN_GATE_INPUTS..=MAX_GATE_INPUTS).contains(&inputs) {
            return Err(CircuitError::InvalidArity {
                requested: inputs,
                min: MIN_GATE_INPUTS,
                max: MAX_GATE_INPUTS,
            });
        }
        Ok(Self::with_kind(ComponentKind::Gate(op), inputs, 1))
    }

    pub fn not() -> Self {
        Self::with_kind(ComponentKind::Not, 1, 1)
    }

    pub fn buffer() -> Self {
        Self::with_kind(ComponentKind::Buffer, 1, 1)
    }

    pub fn switch() -> Self {
        Self::with_kind(ComponentKind::Switch, 0, 1)
    }

    pub fn button() -> Self {
        Self::with_kind(ComponentKind::Button, 0, 1)
    }

    pub fn clock() -> Self {
        Self::with_kind(ComponentKind::Clock(ClockPhase::new()), 0, 1)
    }

    pub fn constant(value: bool) -> Self {
        let mut component = Self::with_kind(ComponentKind::Constant(value), 0, 1);
        component.state = value;
        component
    }

    pub fn light() -> Self {
        Self::with_kind(ComponentKind::Light, 1, 0)
    }

    pub fn display() -> Self {
        Self::with_kind(ComponentKind::Display { value: 0 }, DISPLAY_INPUTS, 0)
    }

    /// Wraps `inner` into a Custom node exposing the switches and lights of
    /// `layout` as boundary pins.
    pub fn custom(label: impl Into<String>, inner: Circuit, layout: BoundaryLayout) -> Result<Self> {
        let (custom, io) = Custom::build(label.into(), inner, layout)?;
        Ok(Self::from_custom(custom, io))
    }

    fn from_custom(custom: Custom, io: IoManager) -> Self {
        Self {
            name: String::new(),
            position: Position::default(),
            rotation: Side::default(),
            state: false,
            io,
            kind: ComponentKind::Custom(Box::new(custom)),
        }
    }

    /// Creates a primitive of type `ty` with default settings; `None` for
    /// `Custom`, which needs an inner circuit.
    pub fn primitive(ty: ComponentType) -> Option<Self> {
        let component = match ty {
            ComponentType::Not => Self::not(),
            ComponentType::Buffer => Self::buffer(),
            ComponentType::Switch => Self::switch(),
            ComponentType::Button => Self::button(),
            ComponentType::Clock => Self::clock(),
            ComponentType::Zero => Self::constant(false),
            ComponentType::One => Self::constant(true),
            ComponentType::Light => Self::light(),
            ComponentType::Display => Self::display(),
            ComponentType::Custom => return None,
            gate => Self::with_kind(ComponentKind::Gate(gate.gate_op()?), DEFAULT_GATE_INPUTS, 1),
        };
        Some(component)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_position(mut self, x: i32, y: i32) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn with_rotation(mut self, rotation: Side) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn rotation(&self) -> Side {
        self.rotation
    }

    pub fn set_rotation(&mut self, rotation: Side) {
        self.rotation = rotation;
    }

    pub fn io(&self) -> &IoManager {
        &self.io
    }

    pub fn kind(&self) -> &ComponentKind {
        &self.kind
    }

    pub fn as_custom(&self) -> Option<&Custom> {
        match &self.kind {
            ComponentKind::Custom(custom) => Some(custom),
            _ => None,
        }
    }

    pub fn component_type(&self) -> ComponentType {
        match &self.kind {
            ComponentKind::Gate(op) => match op {
                GateOp::And => ComponentType::And,
                GateOp::Or => ComponentType::Or,
                GateOp::Nand => ComponentType::Nand,
                GateOp::Nor => ComponentType::Nor,
                GateOp::Xor => ComponentType::Xor,
                GateOp::Xnor => ComponentType::Xnor,
            },
            ComponentKind::Not => ComponentType::Not,
            ComponentKind::Buffer => ComponentType::Buffer,
            ComponentKind::Switch => ComponentType::Switch,
            ComponentKind::Button => ComponentType::Button,
            ComponentKind::Clock(_) => ComponentType::Clock,
            ComponentKind::Constant(false) => ComponentType::Zero,
            ComponentKind::Constant(true) => ComponentType::One,
            ComponentKind::Light => ComponentType::Light,
            ComponentKind::Display { .. } => ComponentType::Display,
            ComponentKind::Custom(_) => ComponentType::Custom,
        }
    }

    pub fn state(&self) -> ComponentState {
        match &self.kind {
            ComponentKind::Clock(phase) => ComponentState::Clock {
                high: phase.is_high(),
                phase: phase.ticks(),
            },
            ComponentKind::Display { value } => ComponentState::Display(*value),
            ComponentKind::Custom(custom) => ComponentState::Custom {
                outputs: (0..custom.num_outputs())
                    .map(|i| self.io.output_signal(i))
                    .collect(),
            },
            _ => ComponentState::Logic(self.state),
        }
    }

    /// Switches, buttons and clocks, plus Custom nodes containing one. These
    /// are re-evaluated on every pass of an enclosing Custom node.
    pub fn is_stateful(&self) -> bool {
        match &self.kind {
            ComponentKind::Switch | ComponentKind::Button | ComponentKind::Clock(_) => true,
            ComponentKind::Custom(custom) => custom.is_stateful(),
            _ => false,
        }
    }

    pub fn is_switch(&self) -> bool {
        matches!(self.kind, ComponentKind::Switch | ComponentKind::Button)
    }

    /// Copies type, name, rotation, state and pin layout, but no wiring.
    pub fn make_copy(&self, offset: Position) -> Result<Self> {
        let (kind, io) = match &self.kind {
            ComponentKind::Custom(custom) => {
                let (copy, io) = custom.duplicate()?;
                (ComponentKind::Custom(Box::new(copy)), io)
            }
            ComponentKind::Gate(op) => (ComponentKind::Gate(*op), self.io.clone_unwired()),
            ComponentKind::Not => (ComponentKind::Not, self.io.clone_unwired()),
            ComponentKind::Buffer => (ComponentKind::Buffer, self.io.clone_unwired()),
            ComponentKind::Switch => (ComponentKind::Switch, self.io.clone_unwired()),
            ComponentKind::Button => (ComponentKind::Button, self.io.clone_unwired()),
            ComponentKind::Clock(phase) => (ComponentKind::Clock(*phase), self.io.clone_unwired()),
            ComponentKind::Constant(v) => (ComponentKind::Constant(*v), self.io.clone_unwired()),
            ComponentKind::Light => (ComponentKind::Light, self.io.clone_unwired()),
            ComponentKind::Display { value } => {
                (ComponentKind::Display { value: *value }, self.io.clone_unwired())
            }
        };

        Ok(Self {
            name: self.name.clone(),
            position: self.position.offset(offset),
            rotation: self.rotation,
            state: self.state,
            io,
            kind,
        })
    }

    /// Runs the update rule and returns the new value of every output pin.
    pub(crate) fn update(&mut self, wires: &WireMap, ctx: &mut EvalContext) -> Vec<bool> {
        let inputs = self.io.read_inputs(wires);
        let first = inputs.first().copied().unwrap_or(false);

        match &mut self.kind {
            ComponentKind::Gate(op) => {
                self.state = op.evaluate(&inputs);
                vec![self.state]
            }
            ComponentKind::Not => {
                self.state = gate::not(first);
                vec![self.state]
            }
            ComponentKind::Buffer => {
                self.state = gate::buffer(first);
                vec![self.state]
            }
            ComponentKind::Switch | ComponentKind::Button => vec![self.state],
            ComponentKind::Clock(phase) => {
                self.state = phase.is_high();
                vec![self.state]
            }
            ComponentKind::Constant(value) => {
                self.state = *value;
                vec![*value]
            }
            ComponentKind::Light => {
                self.state = first;
                Vec::new()
            }
            ComponentKind::Display { value } => {
                *value = display_value(&inputs);
                self.state = *value != 0;
                Vec::new()
            }
            ComponentKind::Custom(custom) => custom.evaluate(&inputs, ctx),
        }
    }

    pub(crate) fn io_mut(&mut self) -> &mut IoManager {
        &mut self.io
    }

    pub(crate) fn kind_mut(&mut self) -> &mut ComponentKind {
        &mut self.kind
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }

    /// Sets a switch or button; returns whether the state changed.
    pub(crate) fn set_switch_state(&mut self, value: bool) -> Option<bool> {
        if !self.is_switch() {
            return None;
        }
        let changed = self.state != value;
        self.state = value;
        Some(changed)
    }
}

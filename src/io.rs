//! Pins and the per-component `IoManager`.
//!
//! The `IoManager` owns the ordered input and output pins of one component
//! and mediates every read and write of signal state. Writing an output is
//! also how the propagation frontier grows: a destination whose cached
//! signal actually changes is reported to the running engine through a
//! [`DirtySink`].

use serde::{Deserialize, Serialize};

use crate::types::{ComponentId, PinDirection, PinIndex, WireId};
use crate::wire::WireMap;

/// Receiver of components whose inputs changed during a pass.
pub trait DirtySink {
    /// Registers `component` as needing re-evaluation.
    fn mark_dirty(&mut self, component: ComponentId);
}

impl DirtySink for Vec<ComponentId> {
    fn mark_dirty(&mut self, component: ComponentId) {
        self.push(component);
    }
}

/// An attachment point on a component.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pin {
    direction: PinDirection,
    index: PinIndex,
    /// Last value written (outputs only; inputs read through their wire)
    signal: bool,
    /// Attached wires, in attachment order. Inputs hold at most one.
    wires: Vec<WireId>,
}

impl Pin {
    fn new(direction: PinDirection, index: PinIndex) -> Self {
        Self {
            direction,
            index,
            signal: false,
            wires: Vec::new(),
        }
    }

    pub fn direction(&self) -> PinDirection {
        self.direction
    }

    pub fn index(&self) -> PinIndex {
        self.index
    }

    /// Last value written to an output pin.
    pub fn signal(&self) -> bool {
        self.signal
    }

    pub fn wires(&self) -> &[WireId] {
        &self.wires
    }

    pub fn num_wires(&self) -> usize {
        self.wires.len()
    }

    pub fn is_connected(&self) -> bool {
        !self.wires.is_empty()
    }

    /// The single wire of an input pin, if any.
    pub fn wire(&self) -> Option<WireId> {
        self.wires.first().copied()
    }
}

/// Owns the ordered pins of one component.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoManager {
    inputs: Vec<Pin>,
    outputs: Vec<Pin>,
}

impl IoManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a manager with `inputs` input pins and `outputs` output pins.
    pub fn with_pins(inputs: usize, outputs: usize) -> Self {
        let mut io = Self::new();
        for _ in 0..inputs {
            io.add_pin(PinDirection::Input);
        }
        for _ in 0..outputs {
            io.add_pin(PinDirection::Output);
        }
        io
    }

    /// Allocates the next pin of `direction` and returns its index.
    pub fn add_pin(&mut self, direction: PinDirection) -> PinIndex {
        let group = self.group_mut(direction);
        let index = group.len();
        group.push(Pin::new(direction, index));
        index
    }

    pub fn pin_at(&self, index: PinIndex, direction: PinDirection) -> Option<&Pin> {
        self.group(direction).get(index)
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn inputs(&self) -> &[Pin] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Pin] {
        &self.outputs
    }

    /// Reads input `index`: false when the pin has no wire (or does not
    /// exist), otherwise the wire's cached signal.
    pub fn read_input(&self, index: PinIndex, wires: &WireMap) -> bool {
        self.inputs
            .get(index)
            .and_then(Pin::wire)
            .and_then(|id| wires.get(&id))
            .map(|wire| wire.signal)
            .unwrap_or(false)
    }

    /// Reads every input in pin order.
    pub fn read_inputs(&self, wires: &WireMap) -> Vec<bool> {
        (0..self.inputs.len())
            .map(|index| self.read_input(index, wires))
            .collect()
    }

    /// Last value written to output `index` (false if it does not exist).
    pub fn output_signal(&self, index: PinIndex) -> bool {
        self.outputs.get(index).map(Pin::signal).unwrap_or(false)
    }

    /// Writes `value` to output `index` and pushes it across every attached
    /// wire. Destinations whose cached signal changes are marked dirty on
    /// `sink`; writing an unchanged value dirties nothing.
    pub fn write_output(
        &mut self,
        index: PinIndex,
        value: bool,
        wires: &mut WireMap,
        sink: &mut dyn DirtySink,
    ) {
        let Some(pin) = self.outputs.get_mut(index) else {
            return;
        };
        pin.signal = value;

        for id in &pin.wires {
            if let Some(wire) = wires.get_mut(id) {
                if wire.signal != value {
                    wire.signal = value;
                    sink.mark_dirty(wire.dest.component);
                }
            }
        }
    }

    /// Every wire attached to any pin, inputs first.
    pub fn all_wires(&self) -> impl Iterator<Item = WireId> + '_ {
        self.inputs
            .iter()
            .chain(self.outputs.iter())
            .flat_map(|pin| pin.wires.iter().copied())
    }

    /// Same pin layout and output signals, no wires.
    pub fn clone_unwired(&self) -> Self {
        let strip = |pins: &[Pin]| -> Vec<Pin> {
            pins.iter()
                .map(|pin| Pin {
                    wires: Vec::new(),
                    ..pin.clone()
                })
                .collect()
        };
        Self {
            inputs: strip(&self.inputs),
            outputs: strip(&self.outputs),
        }
    }

    pub(crate) fn attach(&mut self, direction: PinDirection, index: PinIndex, wire: WireId) {
        if let Some(pin) = self.group_mut(direction).get_mut(index) {
            pin.wires.push(wire);
        }
    }

    pub(crate) fn detach(&mut self, direction: PinDirection, index: PinIndex, wire: WireId) {
        if let Some(pin) = self.group_mut(direction).get_mut(index) {
            pin.wires.retain(|w| *w != wire);
        }
    }

    pub(crate) fn set_output_signal(&mut self, index: PinIndex, value: bool) {
        if let Some(pin) = self.outputs.get_mut(index) {
            pin.signal = value;
        }
    }

    fn group(&self, direction: PinDirection) -> &Vec<Pin> {
        match direction {
            PinDirection::Input => &self.inputs,
            PinDirection::Output => &self.outputs,
        }
    }

    fn group_mut(&mut self, direction: PinDirection) -> &mut Vec<Pin> {
        match direction {
            PinDirection::Input => &mut self.inputs,
            PinDirection::Output => &mut self.outputs,
        }
    }
}

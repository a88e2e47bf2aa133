//! The circuit arena.
//!
//! A `Circuit` owns a set of components and the wires between them. It is
//! the unit the propagation engine runs over: the top-level circuit edited
//! by the user as well as the private interior of every Custom node.
//!
//! Every editing operation validates before it mutates, so an operation
//! returning an error leaves the circuit exactly as it was.
//!
//! # Example
//!
//! ```rust
//! use gatesim::{Circuit, Component, PropagationEngine, EngineConfig};
//!
//! let mut circuit = Circuit::new();
//! let switch = circuit.add(Component::switch());
//! let light = circuit.add(Component::light());
//! circuit.connect(switch, 0, light, 0).unwrap();
//!
//! circuit.set_switch(switch, true).unwrap();
//! let engine = PropagationEngine::new(EngineConfig::default());
//! assert!(engine.run(&mut circuit, [switch]).is_stable());
//! assert!(circuit.state(light).unwrap().is_high());
//! ```

use std::collections::{BTreeMap, BTreeSet, HashMap};

use tracing::debug;

use crate::component::{Component, ComponentKind, ComponentState};
use crate::duplicate::{DuplicationPlan, Duplicated};
use crate::engine::EvalContext;
use crate::error::{CircuitError, Result};
use crate::io::DirtySink;
use crate::types::{CircuitId, ComponentId, PinDirection, PinIndex, PinRef, Position, WireId};
use crate::wire::{Wire, WireMap};

/// Components and wires of one graph.
#[derive(Debug)]
pub struct Circuit {
    id: CircuitId,
    next_component: u32,
    next_wire: u32,
    components: BTreeMap<ComponentId, Component>,
    wires: WireMap,
    /// Name -> component index
    names: HashMap<String, ComponentId>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

impl Circuit {
    /// Creates an empty circuit with a fresh id.
    pub fn new() -> Self {
        Self {
            id: CircuitId::next(),
            next_component: 0,
            next_wire: 0,
            components: BTreeMap::new(),
            wires: WireMap::new(),
            names: HashMap::new(),
        }
    }

    pub fn id(&self) -> CircuitId {
        self.id
    }

    /// Number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Adds a component and returns its id.
    ///
    /// A component without a name is named `<TYPE><slot>`. A name already
    /// taken is made unique with a `_<n>` suffix.
    pub fn add(&mut self, mut component: Component) -> ComponentId {
        let id = ComponentId::new(self.id, self.next_component);
        self.next_component += 1;

        let base = if component.name().is_empty() {
            format!("{}{}", component.component_type(), id.slot)
        } else {
            component.name().to_string()
        };
        let name = self.unique_name(base);
        component.set_name(name.clone());

        self.names.insert(name, id);
        self.components.insert(id, component);
        id
    }

    fn unique_name(&self, base: String) -> String {
        if !self.names.contains_key(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}_{n}"))
            .find(|candidate| !self.names.contains_key(candidate))
            .unwrap_or(base)
    }

    pub fn contains(&self, id: ComponentId) -> bool {
        self.components.contains_key(&id)
    }

    pub fn component(&self, id: ComponentId) -> Option<&Component> {
        self.components.get(&id)
    }

    /// Looks up a component, distinguishing foreign ids from stale ones.
    pub fn get(&self, id: ComponentId) -> Result<&Component> {
        self.check_owned(id)?;
        self.components
            .get(&id)
            .ok_or(CircuitError::UnknownComponent(id))
    }

    fn check_owned(&self, id: ComponentId) -> Result<()> {
        if id.circuit != self.id {
            return Err(CircuitError::ForeignComponent {
                component: id,
                expected: self.id,
                actual: id.circuit,
            });
        }
        if !self.components.contains_key(&id) {
            return Err(CircuitError::UnknownComponent(id));
        }
        Ok(())
    }

    /// All components in creation order.
    pub fn components(&self) -> impl Iterator<Item = (ComponentId, &Component)> + '_ {
        self.components.iter().map(|(&id, c)| (id, c))
    }

    pub fn component_ids(&self) -> impl Iterator<Item = ComponentId> + '_ {
        self.components.keys().copied()
    }

    pub fn find_by_name(&self, name: &str) -> Option<ComponentId> {
        self.names.get(name).copied()
    }

    /// Renames a component. Fails if another component uses `name`.
    pub fn rename(&mut self, id: ComponentId, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.check_owned(id)?;
        match self.names.get(&name) {
            Some(&owner) if owner == id => return Ok(()),
            Some(_) => return Err(CircuitError::DuplicateName(name)),
            None => {}
        }

        if let Some(component) = self.components.get_mut(&id) {
            self.names.remove(component.name());
            component.set_name(name.clone());
            self.names.insert(name, id);
        }
        Ok(())
    }

    pub fn set_position(&mut self, id: ComponentId, position: Position) -> Result<()> {
        self.check_owned(id)?;
        if let Some(component) = self.components.get_mut(&id) {
            component.set_position(position);
        }
        Ok(())
    }

    pub fn wires(&self) -> &WireMap {
        &self.wires
    }

    pub fn wire(&self, id: WireId) -> Option<&Wire> {
        self.wires.get(&id)
    }

    /// Wires `source`'s output pin `output` to `dest`'s input pin `input`.
    ///
    /// The new wire starts out carrying the source pin's current signal.
    /// Fails with [`CircuitError::InputOccupied`] if the input already has
    /// a wire; see [`Circuit::connect_replacing`].
    pub fn connect(
        &mut self,
        source: ComponentId,
        output: PinIndex,
        dest: ComponentId,
        input: PinIndex,
    ) -> Result<WireId> {
        let signal = self.validate_connection(source, output, dest, input)?;
        if let Some(wire) = self.input_wire(dest, input) {
            return Err(CircuitError::InputOccupied {
                component: dest,
                index: input,
                wire,
            });
        }
        Ok(self.insert_wire(PinRef::output(source, output), PinRef::input(dest, input), signal))
    }

    /// Like [`Circuit::connect`], but first detaches a wire already on the
    /// input. Returns the new wire and the replaced one.
    pub fn connect_replacing(
        &mut self,
        source: ComponentId,
        output: PinIndex,
        dest: ComponentId,
        input: PinIndex,
    ) -> Result<(WireId, Option<Wire>)> {
        let signal = self.validate_connection(source, output, dest, input)?;
        let replaced = match self.input_wire(dest, input) {
            Some(existing) => Some(self.disconnect(existing)?),
            None => None,
        };
        let wire = self.insert_wire(PinRef::output(source, output), PinRef::input(dest, input), signal);
        Ok((wire, replaced))
    }

    /// Checks both endpoints and returns the signal the wire starts with.
    fn validate_connection(
        &self,
        source: ComponentId,
        output: PinIndex,
        dest: ComponentId,
        input: PinIndex,
    ) -> Result<bool> {
        let src = self.get(source)?;
        let dst = self.get(dest)?;
        let pin = src
            .io()
            .pin_at(output, PinDirection::Output)
            .ok_or(CircuitError::NoSuchPin {
                component: source,
                direction: PinDirection::Output,
                index: output,
            })?;
        if dst.io().pin_at(input, PinDirection::Input).is_none() {
            return Err(CircuitError::NoSuchPin {
                component: dest,
                direction: PinDirection::Input,
                index: input,
            });
        }
        Ok(pin.signal())
    }

    fn input_wire(&self, component: ComponentId, input: PinIndex) -> Option<WireId> {
        self.components
            .get(&component)
            .and_then(|c| c.io().pin_at(input, PinDirection::Input))
            .and_then(|pin| pin.wire())
    }

    /// Creates a wire between two pins known to exist.
    pub(crate) fn insert_wire(&mut self, source: PinRef, dest: PinRef, signal: bool) -> WireId {
        let id = WireId::new(self.id, self.next_wire);
        self.next_wire += 1;

        if let Some(component) = self.components.get_mut(&source.component) {
            component.io_mut().attach(PinDirection::Output, source.index, id);
        }
        if let Some(component) = self.components.get_mut(&dest.component) {
            component.io_mut().attach(PinDirection::Input, dest.index, id);
        }
        self.wires.insert(id, Wire::new(source, dest, signal));
        id
    }

    /// Removes a wire, detaching it from both pins.
    pub fn disconnect(&mut self, id: WireId) -> Result<Wire> {
        let wire = self.wires.remove(&id).ok_or(CircuitError::UnknownWire(id))?;
        for pin in [wire.source, wire.dest] {
            if let Some(component) = self.components.get_mut(&pin.component) {
                component.io_mut().detach(pin.direction, pin.index, id);
            }
        }
        Ok(wire)
    }

    /// Deletes a component after severing every wire on its pins. A Custom
    /// node's interior is torn down with it.
    ///
    /// Returns the components that lost an input wire, in wire creation order; they
    /// need re-evaluation.
    pub fn delete_component(&mut self, id: ComponentId) -> Result<Vec<ComponentId>> {
        // A self-loop shows up on both an input and an output pin.
        let wires: BTreeSet<WireId> = self.get(id)?.io().all_wires().collect();

        let mut affected = Vec::new();
        for wire in wires {
            let removed = self.disconnect(wire)?;
            let dest = removed.dest_component();
            if dest != id && !affected.contains(&dest) {
                affected.push(dest);
            }
        }

        if let Some(mut component) = self.components.remove(&id) {
            self.names.remove(component.name());
            if let ComponentKind::Custom(custom) = component.kind_mut() {
                custom.clear();
            }
        }
        debug!(circuit = %self.id, component = %id, affected = affected.len(), "deleted component");
        Ok(affected)
    }

    /// Deletes every component and wire.
    pub fn clear(&mut self) {
        let ids: Vec<ComponentId> = self.component_ids().collect();
        for id in ids {
            if let Some(mut component) = self.components.remove(&id) {
                if let ComponentKind::Custom(custom) = component.kind_mut() {
                    custom.clear();
                }
            }
        }
        self.wires.clear();
        self.names.clear();
    }

    /// Sets a switch or button. Returns whether its state changed.
    pub fn set_switch(&mut self, id: ComponentId, value: bool) -> Result<bool> {
        self.check_owned(id)?;
        self.components
            .get_mut(&id)
            .and_then(|c| c.set_switch_state(value))
            .ok_or(CircuitError::NotASwitch(id))
    }

    /// Flips a switch or button and returns its new state.
    pub fn toggle_switch(&mut self, id: ComponentId) -> Result<bool> {
        let current = self.get(id)?.state().is_high();
        self.set_switch(id, !current)?;
        Ok(!current)
    }

    /// Advances every clock, including clocks inside Custom nodes.
    ///
    /// Returns the top-level components that need re-evaluation: the ticked
    /// clocks and the Custom nodes containing one.
    pub fn tick_clocks(&mut self) -> Vec<ComponentId> {
        let mut ticked = Vec::new();
        for (&id, component) in self.components.iter_mut() {
            let advanced = match component.kind_mut() {
                ComponentKind::Clock(phase) => {
                    phase.tick();
                    true
                }
                ComponentKind::Custom(custom) => custom.tick_clocks(),
                _ => false,
            };
            if advanced {
                ticked.push(id);
            }
        }
        ticked
    }

    /// Switches, buttons, clocks and stateful Custom nodes.
    pub fn stateful_ids(&self) -> Vec<ComponentId> {
        self.components
            .iter()
            .filter(|(_, c)| c.is_stateful())
            .map(|(&id, _)| id)
            .collect()
    }

    pub fn state(&self, id: ComponentId) -> Option<ComponentState> {
        self.components.get(&id).map(Component::state)
    }

    /// Current value seen on an input pin (false when unconnected).
    pub fn read_input(&self, id: ComponentId, index: PinIndex) -> bool {
        self.components
            .get(&id)
            .map(|c| c.io().read_input(index, &self.wires))
            .unwrap_or(false)
    }

    /// Last value written to an output pin.
    pub fn output_signal(&self, id: ComponentId, index: PinIndex) -> bool {
        self.components
            .get(&id)
            .map(|c| c.io().output_signal(index))
            .unwrap_or(false)
    }

    /// Duplicates `ids` and their internal wires within this circuit.
    pub fn duplicate(&mut self, ids: &[ComponentId], offset: Position) -> Result<Duplicated> {
        let plan = DuplicationPlan::build(self, ids, offset)?;
        Ok(plan.apply(self))
    }

    /// Runs one component's update rule and writes its outputs, reporting
    /// changed destinations to `sink`. Returns false for unknown ids.
    pub(crate) fn evaluate(
        &mut self,
        id: ComponentId,
        ctx: &mut EvalContext,
        sink: &mut dyn DirtySink,
    ) -> bool {
        let Some(component) = self.components.get_mut(&id) else {
            return false;
        };
        let outputs = component.update(&self.wires, ctx);
        for (index, value) in outputs.into_iter().enumerate() {
            component.io_mut().write_output(index, value, &mut self.wires, sink);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::GateOp;

    #[test]
    fn test_add_generates_unique_names() {
        let mut circuit = Circuit::new();
        let a = circuit.add(Component::switch());
        let b = circuit.add(Component::switch().with_name("SWITCH0"));
        let c = circuit.add(Component::light().with_name("out"));
        let d = circuit.add(Component::light().with_name("out"));

        assert_eq!(circuit.get(a).unwrap().name(), "SWITCH0");
        assert_eq!(circuit.get(b).unwrap().name(), "SWITCH0_1");
        assert_eq!(circuit.get(c).unwrap().name(), "out");
        assert_eq!(circuit.get(d).unwrap().name(), "out_1");
        assert_eq!(circuit.find_by_name("out_1"), Some(d));
    }

    #[test]
    fn test_rename_rejects_duplicates() {
        let mut circuit = Circuit::new();
        let a = circuit.add(Component::switch().with_name("a"));
        let b = circuit.add(Component::switch().with_name("b"));

        assert_eq!(circuit.rename(b, "a"), Err(CircuitError::DuplicateName("a".into())));
        circuit.rename(b, "c").unwrap();
        assert_eq!(circuit.find_by_name("c"), Some(b));
        assert_eq!(circuit.find_by_name("b"), None);
        circuit.rename(a, "a").unwrap();
    }

    #[test]
    fn test_connect_validates_pins() {
        let mut circuit = Circuit::new();
        let switch = circuit.add(Component::switch());
        let light = circuit.add(Component::light());

        let err = circuit.connect(switch, 1, light, 0).unwrap_err();
        assert!(matches!(err, CircuitError::NoSuchPin { direction: PinDirection::Output, .. }));
        let err = circuit.connect(switch, 0, light, 1).unwrap_err();
        assert!(matches!(err, CircuitError::NoSuchPin { direction: PinDirection::Input, .. }));
        assert_eq!(circuit.wire_count(), 0);
    }

    #[test]
    fn test_input_holds_one_wire() {
        let mut circuit = Circuit::new();
        let a = circuit.add(Component::switch());
        let b = circuit.add(Component::constant(true));
        let light = circuit.add(Component::light());

        let first = circuit.connect(a, 0, light, 0).unwrap();
        let err = circuit.connect(b, 0, light, 0).unwrap_err();
        assert_eq!(
            err,
            CircuitError::InputOccupied {
                component: light,
                index: 0,
                wire: first
            }
        );

        let (second, replaced) = circuit.connect_replacing(b, 0, light, 0).unwrap();
        assert_eq!(replaced.map(|w| w.source_component()), Some(a));
        assert!(circuit.wire(first).is_none());
        assert_eq!(circuit.wire_count(), 1);
        assert!(circuit.get(a).unwrap().io().outputs()[0].wires().is_empty());
        assert_eq!(circuit.get(light).unwrap().io().inputs()[0].wire(), Some(second));
    }

    #[test]
    fn test_connect_rejects_foreign_ids() {
        let mut circuit = Circuit::new();
        let mut other = Circuit::new();
        let local = circuit.add(Component::light());
        let foreign = other.add(Component::switch());

        let err = circuit.connect(foreign, 0, local, 0).unwrap_err();
        assert!(matches!(err, CircuitError::ForeignComponent { .. }));
    }

    #[test]
    fn test_wire_starts_with_source_signal() {
        let mut circuit = Circuit::new();
        let one = circuit.add(Component::constant(true));
        let light = circuit.add(Component::light());
        let mut ctx = EvalContext::new(Default::default());
        let mut sink: Vec<ComponentId> = Vec::new();
        circuit.evaluate(one, &mut ctx, &mut sink);

        circuit.connect(one, 0, light, 0).unwrap();
        assert!(circuit.read_input(light, 0));
    }

    #[test]
    fn test_delete_severs_wires() {
        let mut circuit = Circuit::new();
        let switch = circuit.add(Component::switch());
        let gate = circuit.add(Component::gate(GateOp::And, 2).unwrap());
        let light = circuit.add(Component::light());
        circuit.connect(switch, 0, gate, 0).unwrap();
        circuit.connect(switch, 0, gate, 1).unwrap();
        circuit.connect(gate, 0, light, 0).unwrap();

        let affected = circuit.delete_component(switch).unwrap();
        assert_eq!(affected, vec![gate]);
        assert_eq!(circuit.wire_count(), 1);
        assert!(!circuit.contains(switch));
        assert!(circuit.get(gate).unwrap().io().inputs().iter().all(|p| !p.is_connected()));

        assert_eq!(
            circuit.delete_component(switch),
            Err(CircuitError::UnknownComponent(switch))
        );
    }

    #[test]
    fn test_delete_component_with_self_loop() {
        let mut circuit = Circuit::new();
        let not = circuit.add(Component::not().with_name("ring"));
        circuit.connect(not, 0, not, 0).unwrap();

        let affected = circuit.delete_component(not).unwrap();
        assert!(affected.is_empty());
        assert!(!circuit.contains(not));
        assert!(circuit.find_by_name("ring").is_none());
        assert_eq!(circuit.wire_count(), 0);

        // Feedback into one input of a wider gate, plus a downstream light.
        let switch = circuit.add(Component::switch());
        let or = circuit.add(Component::gate(GateOp::Or, 2).unwrap());
        let light = circuit.add(Component::light());
        circuit.connect(switch, 0, or, 0).unwrap();
        circuit.connect(or, 0, or, 1).unwrap();
        circuit.connect(or, 0, light, 0).unwrap();

        let affected = circuit.delete_component(or).unwrap();
        assert_eq!(affected, vec![light]);
        assert!(!circuit.contains(or));
        assert_eq!(circuit.wire_count(), 0);
        assert!(!circuit.get(switch).unwrap().io().outputs()[0].is_connected());
    }

    #[test]
    fn test_switch_operations() {
        let mut circuit = Circuit::new();
        let switch = circuit.add(Component::switch());
        let light = circuit.add(Component::light());

        assert_eq!(circuit.set_switch(switch, true), Ok(true));
        assert_eq!(circuit.set_switch(switch, true), Ok(false));
        assert_eq!(circuit.toggle_switch(switch), Ok(false));
        assert_eq!(circuit.set_switch(light, true), Err(CircuitError::NotASwitch(light)));
    }

    #[test]
    fn test_tick_clocks_reports_clocks() {
        let mut circuit = Circuit::new();
        let clock = circuit.add(Component::clock());
        circuit.add(Component::switch());

        assert_eq!(circuit.tick_clocks(), vec![clock]);
        assert_eq!(
            circuit.state(clock),
            Some(ComponentState::Clock { high: true, phase: 1 })
        );
    }
}

//! Integration tests for subgraph duplication.
//!
//! These tests verify:
//! - Only wires between selected components are recreated
//! - Copies get fresh names, shifted positions and copied state
//! - Duplicated feedback circuits behave independently of the original
//! - Copying into a different circuit

use gatesim::{
    Circuit, CircuitError, Component, ComponentId, DuplicationPlan, EngineConfig, GateOp,
    Position, PropagationEngine, duplicate_into,
};

// ============================================================================
// Helpers
// ============================================================================

fn engine() -> PropagationEngine {
    PropagationEngine::new(EngineConfig::default())
}

fn high(circuit: &Circuit, id: ComponentId) -> bool {
    circuit.state(id).map(|s| s.is_high()).unwrap_or(false)
}

/// Builds a NAND latch and returns (set, reset, top, bottom, q).
fn add_latch(circuit: &mut Circuit) -> [ComponentId; 5] {
    let set = circuit.add(Component::switch().with_position(0, 0));
    let reset = circuit.add(Component::switch().with_position(0, 40));
    let top = circuit.add(Component::gate(GateOp::Nand, 2).unwrap().with_position(40, 0));
    let bottom = circuit.add(Component::gate(GateOp::Nand, 2).unwrap().with_position(40, 40));
    let q = circuit.add(Component::light().with_position(80, 0));
    circuit.connect(set, 0, top, 0).unwrap();
    circuit.connect(reset, 0, bottom, 1).unwrap();
    circuit.connect(bottom, 0, top, 1).unwrap();
    circuit.connect(top, 0, bottom, 0).unwrap();
    circuit.connect(top, 0, q, 0).unwrap();
    circuit.set_switch(set, true).unwrap();
    circuit.set_switch(reset, true).unwrap();
    [set, reset, top, bottom, q]
}

// ============================================================================
// Wiring
// ============================================================================

#[test]
fn test_external_input_is_left_unconnected() {
    let mut circuit = Circuit::new();
    let a = circuit.add(Component::switch());
    let b = circuit.add(Component::gate(GateOp::Or, 2).unwrap());
    let c = circuit.add(Component::switch());
    circuit.connect(a, 0, b, 0).unwrap();
    circuit.connect(c, 0, b, 1).unwrap();

    let copy = circuit.duplicate(&[a, b], Position::new(0, 50)).unwrap();
    assert_eq!(copy.components.len(), 2);
    assert_eq!(copy.wires.len(), 1);

    let new_b = circuit.get(copy.mapping[&b]).unwrap();
    assert!(new_b.io().inputs()[0].is_connected());
    assert!(!new_b.io().inputs()[1].is_connected());

    let wire = circuit.wire(copy.wires[0]).unwrap();
    assert_eq!(wire.source_component(), copy.mapping[&a]);
    assert_eq!(wire.dest_component(), copy.mapping[&b]);

    // The original keeps both of its wires.
    assert!(circuit.get(b).unwrap().io().inputs()[1].is_connected());
    assert_eq!(circuit.wire_count(), 3);
}

#[test]
fn test_outgoing_wires_are_dropped() {
    let mut circuit = Circuit::new();
    let switch = circuit.add(Component::switch());
    let light = circuit.add(Component::light());
    circuit.connect(switch, 0, light, 0).unwrap();

    let copy = circuit.duplicate(&[switch], Position::default()).unwrap();
    assert!(copy.wires.is_empty());
    assert!(!circuit.get(copy.components[0]).unwrap().io().outputs()[0].is_connected());
}

#[test]
fn test_plan_fails_without_side_effects() {
    let mut circuit = Circuit::new();
    let a = circuit.add(Component::switch());
    let mut other = Circuit::new();
    let foreign = other.add(Component::light());

    let err = DuplicationPlan::build(&circuit, &[a, foreign], Position::default()).unwrap_err();
    assert!(matches!(err, CircuitError::ForeignComponent { .. }));
    assert!(circuit.duplicate(&[a, foreign], Position::default()).is_err());
    assert_eq!(circuit.len(), 1);
}

#[test]
fn test_empty_selection() {
    let mut circuit = Circuit::new();
    circuit.add(Component::switch());
    let copy = circuit.duplicate(&[], Position::default()).unwrap();
    assert!(copy.components.is_empty());
    assert!(copy.mapping.is_empty());
    assert_eq!(circuit.len(), 1);
}

// ============================================================================
// Attributes
// ============================================================================

#[test]
fn test_names_get_suffix_when_taken() {
    let mut circuit = Circuit::new();
    let a = circuit.add(Component::switch().with_name("enable"));

    let first = circuit.duplicate(&[a], Position::default()).unwrap();
    let second = circuit.duplicate(&[a], Position::default()).unwrap();
    assert_eq!(circuit.get(first.components[0]).unwrap().name(), "enable_1");
    assert_eq!(circuit.get(second.components[0]).unwrap().name(), "enable_2");
    assert_eq!(circuit.find_by_name("enable"), Some(a));
}

#[test]
fn test_positions_are_offset() {
    let mut circuit = Circuit::new();
    let a = circuit.add(Component::light().with_position(10, 20));
    let copy = circuit.duplicate(&[a], Position::new(5, -30)).unwrap();
    assert_eq!(
        circuit.get(copy.components[0]).unwrap().position(),
        Position::new(15, -10)
    );
}

#[test]
fn test_state_is_copied() {
    let mut circuit = Circuit::new();
    let switch = circuit.add(Component::switch());
    let light = circuit.add(Component::light());
    circuit.connect(switch, 0, light, 0).unwrap();
    circuit.set_switch(switch, true).unwrap();
    engine().run(&mut circuit, [switch]);

    let copy = circuit.duplicate(&[switch, light], Position::default()).unwrap();
    assert!(high(&circuit, copy.mapping[&switch]));
    assert!(high(&circuit, copy.mapping[&light]));
    // The recreated wire carries the copied signal.
    assert!(circuit.read_input(copy.mapping[&light], 0));
}

// ============================================================================
// Behaviour
// ============================================================================

#[test]
fn test_copied_latch_is_independent() {
    let mut circuit = Circuit::new();
    let [set, _, _, _, q] = add_latch(&mut circuit);
    let seeds: Vec<_> = circuit.component_ids().collect();
    engine().run(&mut circuit, seeds);

    let ids: Vec<_> = circuit.component_ids().collect();
    let copy = circuit.duplicate(&ids, Position::new(0, 100)).unwrap();
    assert_eq!(copy.components.len(), 5);
    assert_eq!(copy.wires.len(), 5);
    let copy_reset = copy.mapping[&ids[1]];
    let copy_q = copy.mapping[&q];

    // Set the original, reset the copy.
    circuit.set_switch(set, false).unwrap();
    engine().run(&mut circuit, [set]);
    circuit.set_switch(set, true).unwrap();
    engine().run(&mut circuit, [set]);
    circuit.set_switch(copy_reset, false).unwrap();
    engine().run(&mut circuit, [copy_reset]);

    assert!(high(&circuit, q));
    assert!(!high(&circuit, copy_q));
}

#[test]
fn test_duplicate_into_other_circuit() {
    let mut source = Circuit::new();
    let a = source.add(Component::switch().with_name("a"));
    let not = source.add(Component::not());
    let light = source.add(Component::light().with_name("out"));
    source.connect(a, 0, not, 0).unwrap();
    source.connect(not, 0, light, 0).unwrap();

    let mut target = Circuit::new();
    let copy = duplicate_into(&source, &[a, not, light], Position::default(), &mut target).unwrap();

    assert_eq!(target.len(), 3);
    assert_eq!(target.wire_count(), 2);
    assert_eq!(source.wire_count(), 2);
    // Names are free in the target, so they are kept.
    assert_eq!(target.find_by_name("a"), Some(copy.mapping[&a]));
    assert_eq!(target.find_by_name("out"), Some(copy.mapping[&light]));
    assert!(copy.components.iter().all(|id| id.circuit == target.id()));

    let seeds: Vec<_> = target.component_ids().collect();
    engine().run(&mut target, seeds);
    assert!(high(&target, copy.mapping[&light]));
}

//! Integration tests for configuration-driven circuits.
//!
//! These tests verify:
//! - Custom definitions that build on earlier ones (full adder from half adders)
//! - Running a configured circuit through the Scheduler
//! - Loading and saving configuration files

use std::time::Duration;

use gatesim::config::{ConfigError, SimConfig};
use gatesim::{Circuit, ComponentId, Scheduler};

const FULL_ADDER: &str = r#"
engine:
  max_updates: 10000
scheduler:
  event_capacity: 64
logging:
  level: warn
customs:
  - name: HALF_ADDER
    label: HA
    circuit:
      components:
        - { name: a, type: SWITCH, position: { x: 0, y: 0 } }
        - { name: b, type: SWITCH, position: { x: 0, y: 20 } }
        - { name: x, type: XOR }
        - { name: c, type: AND }
        - { name: sum, type: LIGHT, position: { x: 60, y: 0 } }
        - { name: carry, type: LIGHT, position: { x: 60, y: 20 } }
      wires:
        - { from: a, to: x, input: 0 }
        - { from: b, to: x, input: 1 }
        - { from: a, to: c, input: 0 }
        - { from: b, to: c, input: 1 }
        - { from: x, to: sum }
        - { from: c, to: carry }
    boundary:
      left: [a, b]
      right: [sum, carry]
  - name: FULL_ADDER
    circuit:
      components:
        - { name: a, type: SWITCH }
        - { name: b, type: SWITCH }
        - { name: cin, type: SWITCH }
        - { name: h1, type: HALF_ADDER }
        - { name: h2, type: HALF_ADDER }
        - { name: carry_or, type: OR }
        - { name: sum, type: LIGHT }
        - { name: cout, type: LIGHT }
      wires:
        - { from: a, to: h1, input: 0 }
        - { from: b, to: h1, input: 1 }
        - { from: h1, output: 0, to: h2, input: 0 }
        - { from: cin, to: h2, input: 1 }
        - { from: h1, output: 1, to: carry_or, input: 0 }
        - { from: h2, output: 1, to: carry_or, input: 1 }
        - { from: h2, output: 0, to: sum }
        - { from: carry_or, to: cout }
    boundary:
      left: [a, b, cin]
      right: [sum, cout]
circuit:
  components:
    - { name: x, type: SWITCH }
    - { name: y, type: SWITCH }
    - { name: z, type: SWITCH }
    - { name: adder, type: FULL_ADDER }
    - { name: s, type: LIGHT }
    - { name: co, type: LIGHT }
  wires:
    - { from: x, to: adder, input: 0 }
    - { from: y, to: adder, input: 1 }
    - { from: z, to: adder, input: 2 }
    - { from: adder, output: 0, to: s }
    - { from: adder, output: 1, to: co }
"#;

const TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Helpers
// ============================================================================

fn named(circuit: &Circuit, name: &str) -> ComponentId {
    circuit.find_by_name(name).unwrap()
}

fn high(circuit: &Circuit, id: ComponentId) -> bool {
    circuit.state(id).map(|s| s.is_high()).unwrap_or(false)
}

// ============================================================================
// Custom Libraries
// ============================================================================

#[test]
fn test_full_adder_truth_table() {
    let config = SimConfig::from_yaml(FULL_ADDER).unwrap();
    let circuit = config.build_circuit().unwrap();
    let inputs = [named(&circuit, "x"), named(&circuit, "y"), named(&circuit, "z")];
    let sum = named(&circuit, "s");
    let carry = named(&circuit, "co");

    let scheduler = Scheduler::spawn(circuit, config.scheduler_config()).unwrap();
    for bits in 0u8..8 {
        scheduler.with_circuit(|c| {
            for (i, &input) in inputs.iter().enumerate() {
                c.set_switch(input, bits & (1 << i) != 0).unwrap();
            }
        });
        scheduler.request_all().unwrap();
        let events = scheduler.wait_for_idle(TIMEOUT).unwrap();
        assert!(events
            .iter()
            .all(|e| !matches!(e, gatesim::SchedulerEvent::PassCompleted(r) if !r.is_stable())));

        let total = bits.count_ones();
        let (s, co) = scheduler.read(|c| (high(c, sum), high(c, carry)));
        assert_eq!(s, total % 2 == 1, "sum for inputs {bits:03b}");
        assert_eq!(co, total >= 2, "carry for inputs {bits:03b}");
    }
}

#[test]
fn test_custom_labels_and_pins() {
    let config = SimConfig::from_yaml(FULL_ADDER).unwrap();
    assert_eq!(config.find_custom("HALF_ADDER").unwrap().label.as_deref(), Some("HA"));

    let registry = config.registry().unwrap();
    let half = registry.create("HALF_ADDER", &Default::default()).unwrap();
    assert_eq!(half.as_custom().unwrap().label(), "HA");
    assert_eq!(half.io().num_inputs(), 2);
    assert_eq!(half.io().num_outputs(), 2);

    let full = registry.create("FULL_ADDER", &Default::default()).unwrap();
    let custom = full.as_custom().unwrap();
    assert_eq!(custom.label(), "FULL_ADDER");
    assert_eq!(custom.num_inputs(), 3);
    assert_eq!(custom.inner().len(), 8);
    assert!(custom.is_stateful());
}

#[test]
fn test_custom_used_before_definition_fails() {
    let yaml = r#"
customs:
  - name: OUTER
    circuit:
      components:
        - { name: i, type: INNER }
  - name: INNER
    circuit:
      components:
        - { name: l, type: LIGHT }
    boundary:
      right: [l]
"#;
    let config = SimConfig::from_yaml(yaml).unwrap();
    assert!(matches!(config.registry(), Err(ConfigError::Circuit(_))));
}

#[test]
fn test_invalid_boundary_element() {
    let yaml = r#"
customs:
  - name: BAD
    circuit:
      components:
        - { name: g, type: AND }
    boundary:
      left: [g]
"#;
    let config = SimConfig::from_yaml(yaml).unwrap();
    assert!(matches!(
        config.registry(),
        Err(ConfigError::Circuit(gatesim::CircuitError::InvalidBoundary { .. }))
    ));
}

#[test]
fn test_custom_cannot_shadow_builtin() {
    let yaml = r#"
customs:
  - name: and
    circuit: {}
"#;
    assert!(matches!(SimConfig::from_yaml(yaml), Err(ConfigError::Validation(_))));
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_load_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adder.yaml");
    std::fs::write(&path, FULL_ADDER).unwrap();

    let config = SimConfig::from_file(&path).unwrap();
    assert_eq!(config.engine.max_updates, 10_000);
    assert_eq!(config.scheduler.event_capacity, 64);
    assert_eq!(config.logging.level, "warn");
    assert_eq!(config.customs.len(), 2);
}

#[test]
fn test_json_file_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let config = SimConfig::from_yaml(FULL_ADDER).unwrap();

    let path = dir.path().join("adder.json");
    config.to_json_file(&path).unwrap();
    let loaded = SimConfig::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.build_circuit().unwrap().wire_count(), 5);
}

#[test]
fn test_unknown_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("adder.toml");
    std::fs::write(&path, FULL_ADDER).unwrap();
    assert!(matches!(
        SimConfig::from_file(&path),
        Err(ConfigError::UnknownFormat(ext)) if ext == "toml"
    ));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        SimConfig::from_file(dir.path().join("missing.yml")),
        Err(ConfigError::Io(_))
    ));
}

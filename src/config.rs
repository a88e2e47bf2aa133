//! Configuration system.
//!
//! This module provides YAML/JSON configuration file support for defining
//! simulations declaratively: engine and scheduler settings, logging, a
//! library of Custom node definitions and the top-level circuit.
//!
//! # Configuration File Structure
//!
//! ```yaml
//! engine:
//!   max_updates: 100000
//!
//! scheduler:
//!   clock_period_ms: 500
//!   event_capacity: 256
//!
//! logging:
//!   level: info
//!
//! customs:
//!   - name: HALF_ADDER
//!     circuit:
//!       components:
//!         - { name: a, type: SWITCH, position: { x: 0, y: 0 } }
//!         - { name: b, type: SWITCH, position: { x: 0, y: 20 } }
//!         - { name: x, type: XOR }
//!         - { name: c, type: AND }
//!         - { name: sum, type: LIGHT, position: { x: 60, y: 0 } }
//!         - { name: carry, type: LIGHT, position: { x: 60, y: 20 } }
//!       wires:
//!         - { from: a, to: x, input: 0 }
//!         - { from: b, to: x, input: 1 }
//!         - { from: a, to: c, input: 0 }
//!         - { from: b, to: c, input: 1 }
//!         - { from: x, to: sum }
//!         - { from: c, to: carry }
//!     boundary:
//!       left: [a, b]
//!       right: [sum, carry]
//!
//! circuit:
//!   components:
//!     - { name: in1, type: SWITCH }
//!     - { name: in2, type: SWITCH, attrs: { on: "true" } }
//!     - { name: ha, type: HALF_ADDER }
//!   wires:
//!     - { from: in1, to: ha, input: 0 }
//!     - { from: in2, to: ha, input: 1 }
//! ```

use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::circuit::Circuit;
use crate::component::{Component, ComponentType};
use crate::custom::BoundaryLayout;
use crate::engine::EngineConfig;
use crate::error::CircuitError;
use crate::registry::{create_default_registry, ComponentRegistry};
use crate::scheduler::SchedulerConfig;
use crate::types::{ComponentId, PinIndex, Position, Side};

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unknown file format: {0}")]
    UnknownFormat(String),

    #[error("Circuit error: {0}")]
    Circuit(#[from] CircuitError),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

fn default_log_level() -> String {
    "info".to_string()
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter (trace, debug, info, warn, error); `RUST_LOG` wins
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// One component of a circuit definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfig {
    /// Unique name, referenced by wires and boundaries
    pub name: String,

    /// Registered type name
    #[serde(rename = "type")]
    pub component_type: String,

    #[serde(default)]
    pub position: Position,

    #[serde(default)]
    pub rotation: Side,

    /// Factory attributes
    #[serde(default)]
    pub attrs: HashMap<String, String>,
}

/// One wire of a circuit definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireConfig {
    /// Source component name
    pub from: String,

    #[serde(default)]
    pub output: PinIndex,

    /// Destination component name
    pub to: String,

    #[serde(default)]
    pub input: PinIndex,
}

/// A declarative circuit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitConfig {
    #[serde(default)]
    pub components: Vec<ComponentConfig>,

    #[serde(default)]
    pub wires: Vec<WireConfig>,
}

impl CircuitConfig {
    /// Checks that names are unique and every wire names known components.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut names = HashSet::new();
        for component in &self.components {
            if component.name.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "Component of type {} has no name",
                    component.component_type
                )));
            }
            if !names.insert(component.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate component name: {}",
                    component.name
                )));
            }
        }

        for wire in &self.wires {
            for end in [&wire.from, &wire.to] {
                if !names.contains(end.as_str()) {
                    return Err(ConfigError::Validation(format!(
                        "Wire references unknown component: {}",
                        end
                    )));
                }
            }
        }
        Ok(())
    }

    /// Instantiates the circuit through `registry`.
    ///
    /// Returns the circuit and the id of every named component.
    pub fn build(&self, registry: &ComponentRegistry) -> ConfigResult<(Circuit, HashMap<String, ComponentId>)> {
        let mut circuit = Circuit::new();
        let mut ids = HashMap::with_capacity(self.components.len());

        for config in &self.components {
            let component = registry
                .create(&config.component_type, &config.attrs)?
                .with_name(config.name.clone())
                .with_position(config.position.x, config.position.y)
                .with_rotation(config.rotation);
            ids.insert(config.name.clone(), circuit.add(component));
        }

        for wire in &self.wires {
            let from = lookup(&ids, &wire.from)?;
            let to = lookup(&ids, &wire.to)?;
            circuit.connect(from, wire.output, to, wire.input)?;
        }

        Ok((circuit, ids))
    }

    pub fn component_count(&self) -> usize {
        self.components.len()
    }

    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }
}

fn lookup(ids: &HashMap<String, ComponentId>, name: &str) -> ConfigResult<ComponentId> {
    ids.get(name)
        .copied()
        .ok_or_else(|| ConfigError::Validation(format!("Unknown component name: {}", name)))
}

/// Boundary elements of a Custom definition, by inner component name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    #[serde(default)]
    pub right: Vec<String>,
    #[serde(default)]
    pub down: Vec<String>,
    #[serde(default)]
    pub left: Vec<String>,
    #[serde(default)]
    pub up: Vec<String>,
}

impl BoundaryConfig {
    fn side(&self, side: Side) -> &[String] {
        match side {
            Side::Right => &self.right,
            Side::Down => &self.down,
            Side::Left => &self.left,
            Side::Up => &self.up,
        }
    }

    fn names(&self) -> impl Iterator<Item = &String> {
        Side::ALL.into_iter().flat_map(move |side| self.side(side).iter())
    }
}

/// A named Custom node definition, usable as a component type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomConfig {
    /// Type name components refer to
    pub name: String,

    /// Label shown on the body; defaults to the name
    #[serde(default)]
    pub label: Option<String>,

    pub circuit: CircuitConfig,

    #[serde(default)]
    pub boundary: BoundaryConfig,
}

impl CustomConfig {
    /// Builds a prototype instance through `registry`.
    pub fn build(&self, registry: &ComponentRegistry) -> ConfigResult<Component> {
        let (inner, ids) = self.circuit.build(registry)?;
        let mut layout = BoundaryLayout::new();
        for side in Side::ALL {
            let elements = self
                .boundary
                .side(side)
                .iter()
                .map(|name| lookup(&ids, name))
                .collect::<ConfigResult<Vec<_>>>()?;
            *layout.side_mut(side) = elements;
        }
        let label = self.label.clone().unwrap_or_else(|| self.name.clone());
        Ok(Component::custom(label, inner, layout)?)
    }
}

/// Complete simulation configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Custom definitions, in dependency order
    #[serde(default)]
    pub customs: Vec<CustomConfig>,

    #[serde(default)]
    pub circuit: CircuitConfig,
}

impl SimConfig {
    /// Creates a new empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Loads configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a file, auto-detecting format.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml_file(path),
            "json" => Self::from_json_file(path),
            _ => Err(ConfigError::UnknownFormat(ext.to_string())),
        }
    }

    /// Validates the entire configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.engine.max_updates == 0 {
            return Err(ConfigError::Validation(
                "engine.max_updates must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.event_capacity == 0 {
            return Err(ConfigError::Validation(
                "scheduler.event_capacity must be greater than zero".to_string(),
            ));
        }
        if self.scheduler.clock_period_ms == Some(0) {
            return Err(ConfigError::Validation(
                "scheduler.clock_period_ms must be greater than zero".to_string(),
            ));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Validation(format!(
                "Unknown log level: {}",
                self.logging.level
            )));
        }

        let mut custom_names = HashSet::new();
        for custom in &self.customs {
            if ComponentType::from_name(&custom.name).is_some() {
                return Err(ConfigError::Validation(format!(
                    "Custom definition shadows built-in type: {}",
                    custom.name
                )));
            }
            if !custom_names.insert(custom.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "Duplicate custom definition: {}",
                    custom.name
                )));
            }
            custom.circuit.validate()?;

            let inner: HashSet<&str> = custom.circuit.components.iter().map(|c| c.name.as_str()).collect();
            if let Some(missing) = custom.boundary.names().find(|n| !inner.contains(n.as_str())) {
                return Err(ConfigError::Validation(format!(
                    "Custom {} boundary references unknown component: {}",
                    custom.name, missing
                )));
            }
        }

        self.circuit.validate()
    }

    /// Settings for [`Scheduler::spawn`](crate::scheduler::Scheduler::spawn).
    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            engine: self.engine,
            ..self.scheduler.clone()
        }
    }

    /// Registers every Custom definition in `registry`, in order, so later
    /// definitions may use earlier ones.
    pub fn register_customs(&self, registry: &mut ComponentRegistry) -> ConfigResult<()> {
        for custom in &self.customs {
            let prototype = custom.build(registry)?;
            registry.register_prototype(custom.name.clone(), prototype);
        }
        Ok(())
    }

    /// The default registry extended with this configuration's customs.
    pub fn registry(&self) -> ConfigResult<ComponentRegistry> {
        let mut registry = create_default_registry();
        self.register_customs(&mut registry)?;
        Ok(registry)
    }

    /// Builds the top-level circuit.
    pub fn build_circuit(&self) -> ConfigResult<Circuit> {
        let registry = self.registry()?;
        let (circuit, _) = self.circuit.build(&registry)?;
        Ok(circuit)
    }

    /// Saves configuration to a YAML file.
    pub fn to_yaml_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Saves configuration to a JSON file.
    pub fn to_json_file<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Converts to YAML string.
    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Converts to JSON string.
    pub fn to_json(&self) -> ConfigResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Finds a component definition of the top-level circuit by name.
    pub fn find_component(&self, name: &str) -> Option<&ComponentConfig> {
        self.circuit.components.iter().find(|c| c.name == name)
    }

    pub fn find_custom(&self, name: &str) -> Option<&CustomConfig> {
        self.customs.iter().find(|c| c.name == name)
    }
}

/// Builder for creating SimConfig programmatically.
#[derive(Default)]
pub struct SimConfigBuilder {
    config: SimConfig,
}

impl SimConfigBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the per-pass update ceiling.
    pub fn max_updates(mut self, max_updates: u64) -> Self {
        self.config.engine.max_updates = max_updates;
        self
    }

    /// Sets the clock period.
    pub fn clock_period_ms(mut self, period: u64) -> Self {
        self.config.scheduler.clock_period_ms = Some(period);
        self
    }

    /// Sets the notification queue capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.scheduler.event_capacity = capacity;
        self
    }

    /// Sets the log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Adds a component to the top-level circuit.
    pub fn add_component(mut self, name: impl Into<String>, component_type: impl Into<String>) -> Self {
        self.config.circuit.components.push(ComponentConfig {
            name: name.into(),
            component_type: component_type.into(),
            position: Position::default(),
            rotation: Side::default(),
            attrs: HashMap::new(),
        });
        self
    }

    /// Adds a component with factory attributes.
    pub fn add_component_with_attrs(
        mut self,
        name: impl Into<String>,
        component_type: impl Into<String>,
        attrs: HashMap<String, String>,
    ) -> Self {
        self = self.add_component(name, component_type);
        if let Some(last) = self.config.circuit.components.last_mut() {
            last.attrs = attrs;
        }
        self
    }

    /// Adds a wire between two named components.
    pub fn add_wire(
        mut self,
        from: impl Into<String>,
        output: PinIndex,
        to: impl Into<String>,
        input: PinIndex,
    ) -> Self {
        self.config.circuit.wires.push(WireConfig {
            from: from.into(),
            output,
            to: to.into(),
            input,
        });
        self
    }

    /// Adds a Custom definition.
    pub fn add_custom(mut self, custom: CustomConfig) -> Self {
        self.config.customs.push(custom);
        self
    }

    /// Builds and validates the configuration.
    pub fn build(self) -> ConfigResult<SimConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

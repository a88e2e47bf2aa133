//! Component factory registry.
//!
//! The registry maps type names to component factories, enabling
//! configuration-driven circuit setup. Besides the built-in primitives it
//! can hold Custom node prototypes: creating one of those duplicates the
//! prototype, inner circuit included.
//!
//! # Example
//!
//! ```
//! use std::collections::HashMap;
//! use gatesim::registry::create_default_registry;
//! use gatesim::ComponentType;
//!
//! let registry = create_default_registry();
//! let mut attrs = HashMap::new();
//! attrs.insert("inputs".to_string(), "3".to_string());
//!
//! let gate = registry.create("XOR", &attrs).unwrap();
//! assert_eq!(gate.component_type(), ComponentType::Xor);
//! assert_eq!(gate.io().num_inputs(), 3);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::component::{Component, ComponentType};
use crate::error::{CircuitError, Result};
use crate::nodes::{GateOp, DEFAULT_GATE_INPUTS};
use crate::types::Position;

/// Type alias for component factory functions.
pub type ComponentFactory = Arc<dyn Fn(&HashMap<String, String>) -> Result<Component> + Send + Sync>;

/// A registry of component factories.
#[derive(Default)]
pub struct ComponentRegistry {
    factories: HashMap<String, ComponentFactory>,
}

impl ComponentRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a factory under `name`, replacing any previous one.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F)
    where
        F: Fn(&HashMap<String, String>) -> Result<Component> + Send + Sync + 'static,
    {
        self.factories.insert(name.into(), Arc::new(factory));
    }

    /// Registers a Custom node prototype. Every instance is an independent
    /// deep copy of it.
    pub fn register_prototype(&mut self, name: impl Into<String>, prototype: Component) {
        self.register(name, move |_| prototype.make_copy(Position::default()));
    }

    /// Creates a component by type name.
    pub fn create(&self, type_name: &str, attrs: &HashMap<String, String>) -> Result<Component> {
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| CircuitError::UnknownComponentType(type_name.to_string()))?;
        factory(attrs)
    }

    /// Returns true if a type is registered.
    pub fn contains(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Returns an iterator over registered type names.
    pub fn type_names(&self) -> impl Iterator<Item = &String> {
        self.factories.keys()
    }

    /// Unregisters a type.
    pub fn unregister(&mut self, type_name: &str) -> bool {
        self.factories.remove(type_name).is_some()
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("registered_types", &self.factories.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Parses attribute `name`, falling back to `default` when it is absent.
fn parse_attr<T: std::str::FromStr>(attrs: &HashMap<String, String>, name: &str, default: T) -> Result<T> {
    match attrs.get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| CircuitError::InvalidAttribute {
            name: name.to_string(),
            value: value.clone(),
        }),
    }
}

fn gate_factory(op: GateOp) -> impl Fn(&HashMap<String, String>) -> Result<Component> + Send + Sync {
    move |attrs: &HashMap<String, String>| {
        let inputs = parse_attr(attrs, "inputs", DEFAULT_GATE_INPUTS)?;
        Component::gate(op, inputs)
    }
}

/// Creates a registry with every built-in primitive, keyed by its
/// upper-case type name.
///
/// Attributes:
/// - gates: `inputs` - input count, 2..=8 (default 2)
/// - `SWITCH`: `on` - initial state, `true` or `false`
pub fn create_default_registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();

    for ty in ComponentType::ALL {
        if let Some(op) = ty.gate_op() {
            registry.register(ty.name(), gate_factory(op));
            continue;
        }
        match ty {
            ComponentType::Custom => {}
            ComponentType::Switch => registry.register(ty.name(), |attrs| {
                let mut switch = Component::switch();
                if parse_attr(attrs, "on", false)? {
                    switch.set_switch_state(true);
                }
                Ok(switch)
            }),
            _ => registry.register(ty.name(), move |_| {
                Component::primitive(ty).ok_or_else(|| CircuitError::UnknownComponentType(ty.name().to_string()))
            }),
        }
    }

    registry
}

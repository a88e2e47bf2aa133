//! Error types for circuit editing.

use thiserror::Error;

use crate::types::{CircuitId, ComponentId, PinDirection, PinIndex, WireId};

/// Result type alias using `CircuitError`.
pub type Result<T> = std::result::Result<T, CircuitError>;

/// Structural violations rejected by circuit-editing operations.
///
/// Every operation that can return one of these validates first and only
/// then mutates, so a rejected edit leaves the circuit untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CircuitError {
    /// The id does not name a live component of this circuit.
    #[error("Unknown component: {0}")]
    UnknownComponent(ComponentId),

    /// The id belongs to a different circuit (e.g. a Custom node's interior).
    #[error("Component {component} belongs to {actual}, not {expected}")]
    ForeignComponent {
        component: ComponentId,
        expected: CircuitId,
        actual: CircuitId,
    },

    /// The id does not name a live wire of this circuit.
    #[error("Unknown wire: {0}")]
    UnknownWire(WireId),

    /// The component has no such pin.
    #[error("Component {component} has no {direction} pin {index}")]
    NoSuchPin {
        component: ComponentId,
        direction: PinDirection,
        index: PinIndex,
    },

    /// An input pin already carries a wire.
    #[error("Input pin {index} of {component} is already driven by {wire}")]
    InputOccupied {
        component: ComponentId,
        index: PinIndex,
        wire: WireId,
    },

    /// Another component already uses this name.
    #[error("Component name already in use: {0}")]
    DuplicateName(String),

    /// A boundary layout entry is not an inner switch or light.
    #[error("Component {component} cannot be a boundary element: {reason}")]
    InvalidBoundary {
        component: ComponentId,
        reason: String,
    },

    /// A boundary element appears on more than one side or twice on one side.
    #[error("Component {0} appears more than once in the boundary layout")]
    DuplicateBoundaryElement(ComponentId),

    /// Gate input count out of range.
    #[error("Gate input count {requested} is outside {min}..={max}")]
    InvalidArity {
        requested: usize,
        min: usize,
        max: usize,
    },

    /// The component is not a switch or button.
    #[error("Component {0} is not a switch")]
    NotASwitch(ComponentId),

    /// No factory is registered under this type name.
    #[error("Unknown component type: {0}")]
    UnknownComponentType(String),

    /// A factory attribute could not be parsed.
    #[error("Invalid value {value:?} for attribute {name}")]
    InvalidAttribute { name: String, value: String },
}

impl CircuitError {
    /// Returns true for errors describing an illegal graph shape, as opposed
    /// to lookups of things that do not exist.
    pub fn is_structural_violation(&self) -> bool {
        matches!(
            self,
            CircuitError::ForeignComponent { .. }
                | CircuitError::InputOccupied { .. }
                | CircuitError::DuplicateName(_)
                | CircuitError::InvalidBoundary { .. }
                | CircuitError::DuplicateBoundaryElement(_)
                | CircuitError::InvalidArity { .. }
        )
    }
}

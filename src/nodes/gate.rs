//! Combinational gate functions.
//!
//! # Example
//!
//! ```rust
//! use gatesim::nodes::GateOp;
//!
//! assert!(GateOp::Nand.evaluate(&[true, false]));
//! assert!(!GateOp::Nand.evaluate(&[true, true]));
//! // XOR is odd parity for wider gates
//! assert!(GateOp::Xor.evaluate(&[true, true, true]));
//! ```

use serde::{Deserialize, Serialize};

/// Smallest input count of a multi-input gate.
pub const MIN_GATE_INPUTS: usize = 2;
/// Largest input count of a multi-input gate.
pub const MAX_GATE_INPUTS: usize = 8;
/// Input count of a freshly placed gate.
pub const DEFAULT_GATE_INPUTS: usize = 2;

/// Multi-input gate operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum GateOp {
    And,
    Or,
    Nand,
    Nor,
    Xor,
    Xnor,
}

impl GateOp {
    /// Folds `inputs` into the gate's single output.
    pub fn evaluate(self, inputs: &[bool]) -> bool {
        match self {
            GateOp::And => inputs.iter().all(|&v| v),
            GateOp::Or => inputs.iter().any(|&v| v),
            GateOp::Nand => !inputs.iter().all(|&v| v),
            GateOp::Nor => !inputs.iter().any(|&v| v),
            GateOp::Xor => parity(inputs),
            GateOp::Xnor => !parity(inputs),
        }
    }

    /// Upper-case type name, as used by the registry and config files.
    pub fn name(self) -> &'static str {
        match self {
            GateOp::And => "AND",
            GateOp::Or => "OR",
            GateOp::Nand => "NAND",
            GateOp::Nor => "NOR",
            GateOp::Xor => "XOR",
            GateOp::Xnor => "XNOR",
        }
    }
}

fn parity(inputs: &[bool]) -> bool {
    inputs.iter().filter(|&&v| v).count() % 2 == 1
}

/// Inverter.
pub fn not(input: bool) -> bool {
    !input
}

/// Buffer.
pub fn buffer(input: bool) -> bool {
    input
}

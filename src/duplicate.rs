//! Subgraph duplication.
//!
//! Copies a set of components together with the wires running between
//! them. Wires leaving or entering the set are dropped, so the copy never
//! references anything outside itself.
//!
//! Duplication runs in two phases. [`DuplicationPlan::build`] only reads
//! the source circuit and fails without side effects; [`DuplicationPlan::apply`]
//! inserts the copies into a destination, which may be the source itself
//! or a fresh circuit (used to copy the interior of Custom nodes).
//!
//! # Example
//!
//! ```rust
//! use gatesim::{Circuit, Component, Position};
//!
//! let mut circuit = Circuit::new();
//! let switch = circuit.add(Component::switch());
//! let light = circuit.add(Component::light());
//! circuit.connect(switch, 0, light, 0).unwrap();
//!
//! let copy = circuit.duplicate(&[switch, light], Position::new(0, 100)).unwrap();
//! assert_eq!(copy.components.len(), 2);
//! assert_eq!(copy.wires.len(), 1);
//! assert_eq!(circuit.wire_count(), 2);
//! ```

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::circuit::Circuit;
use crate::component::Component;
use crate::error::Result;
use crate::types::{ComponentId, PinIndex, PinRef, Position, WireId};

/// Result of a duplication.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Duplicated {
    /// New components, in the order the originals were given
    pub components: Vec<ComponentId>,
    /// Recreated internal wires
    pub wires: Vec<WireId>,
    /// Original id -> copy id
    pub mapping: HashMap<ComponentId, ComponentId>,
}

#[derive(Debug)]
struct InternalWire {
    source: ComponentId,
    output: PinIndex,
    dest: ComponentId,
    input: PinIndex,
    signal: bool,
}

/// A validated duplication, ready to be applied.
#[derive(Debug)]
pub struct DuplicationPlan {
    originals: Vec<ComponentId>,
    copies: Vec<Component>,
    wires: Vec<InternalWire>,
}

impl DuplicationPlan {
    /// Copies `ids` out of `src`, shifted by `offset`.
    ///
    /// Repeated ids are copied once. A wire is internal when it feeds an
    /// input pin of the set that holds exactly one wire and its source is
    /// also in the set.
    pub fn build(src: &Circuit, ids: &[ComponentId], offset: Position) -> Result<Self> {
        let mut originals = Vec::with_capacity(ids.len());
        let mut members = HashSet::with_capacity(ids.len());
        for &id in ids {
            src.get(id)?;
            if members.insert(id) {
                originals.push(id);
            }
        }

        let mut copies = Vec::with_capacity(originals.len());
        let mut wires = Vec::new();
        for &id in &originals {
            let original = src.get(id)?;
            copies.push(original.make_copy(offset)?);

            for pin in original.io().inputs() {
                if pin.num_wires() != 1 {
                    continue;
                }
                let Some(wire) = pin.wire().and_then(|w| src.wire(w)) else {
                    continue;
                };
                if members.contains(&wire.source_component()) {
                    wires.push(InternalWire {
                        source: wire.source_component(),
                        output: wire.source.index,
                        dest: id,
                        input: pin.index(),
                        signal: wire.signal,
                    });
                }
            }
        }

        Ok(Self {
            originals,
            copies,
            wires,
        })
    }

    pub fn component_count(&self) -> usize {
        self.copies.len()
    }

    /// Number of wires that will be recreated.
    pub fn wire_count(&self) -> usize {
        self.wires.len()
    }

    /// Inserts the copies and their internal wires into `dst`.
    pub fn apply(self, dst: &mut Circuit) -> Duplicated {
        let mut result = Duplicated::default();

        for (original, copy) in self.originals.into_iter().zip(self.copies) {
            let id = dst.add(copy);
            result.mapping.insert(original, id);
            result.components.push(id);
        }

        for wire in self.wires {
            let (Some(&source), Some(&dest)) =
                (result.mapping.get(&wire.source), result.mapping.get(&wire.dest))
            else {
                continue;
            };
            let id = dst.insert_wire(
                PinRef::output(source, wire.output),
                PinRef::input(dest, wire.input),
                wire.signal,
            );
            result.wires.push(id);
        }

        debug!(
            circuit = %dst.id(),
            components = result.components.len(),
            wires = result.wires.len(),
            "duplicated components"
        );
        result
    }
}

/// Duplicates `ids` from `src` into `dst`.
pub fn duplicate_into(
    src: &Circuit,
    ids: &[ComponentId],
    offset: Position,
    dst: &mut Circuit,
) -> Result<Duplicated> {
    Ok(DuplicationPlan::build(src, ids, offset)?.apply(dst))
}

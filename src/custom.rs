//! Hierarchical Custom nodes.
//!
//! A Custom node wraps a private inner [`Circuit`] and exposes some of its
//! switches and lights as boundary pins. Inner switches become inputs, inner
//! lights become outputs. Which element sits on which side of the body is
//! described by a [`BoundaryLayout`]; pin indices are allocated side by side
//! in the order right, down, left, up.
//!
//! Evaluating a Custom node runs a nested [`PropagationEngine`] over the
//! inner circuit synchronously, inside the pass that reached the node.
//!
//! # Example
//!
//! ```rust
//! use gatesim::{BoundaryLayout, Circuit, Component, Side};
//!
//! let mut inner = Circuit::new();
//! let input = inner.add(Component::switch());
//! let output = inner.add(Component::light());
//! inner.connect(input, 0, output, 0).unwrap();
//!
//! let layout = BoundaryLayout::new()
//!     .with_side(Side::Left, vec![input])
//!     .with_side(Side::Right, vec![output]);
//! let wrapper = Component::custom("BUF", inner, layout).unwrap();
//! assert_eq!(wrapper.io().num_inputs(), 1);
//! assert_eq!(wrapper.io().num_outputs(), 1);
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::circuit::Circuit;
use crate::component::ComponentType;
use crate::engine::{EvalContext, PropagationEngine};
use crate::error::{CircuitError, Result};
use crate::io::IoManager;
use crate::types::{ComponentId, PinDirection, PinIndex, Position, Side};

/// Inner boundary elements of a Custom node, per side of its body.
///
/// Each side lists its elements in ascending scan-axis order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundaryLayout {
    #[serde(default)]
    pub right: Vec<ComponentId>,
    #[serde(default)]
    pub down: Vec<ComponentId>,
    #[serde(default)]
    pub left: Vec<ComponentId>,
    #[serde(default)]
    pub up: Vec<ComponentId>,
}

impl BoundaryLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_side(mut self, side: Side, elements: Vec<ComponentId>) -> Self {
        *self.side_mut(side) = elements;
        self
    }

    pub fn side(&self, side: Side) -> &[ComponentId] {
        match side {
            Side::Right => &self.right,
            Side::Down => &self.down,
            Side::Left => &self.left,
            Side::Up => &self.up,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut Vec<ComponentId> {
        match side {
            Side::Right => &mut self.right,
            Side::Down => &mut self.down,
            Side::Left => &mut self.left,
            Side::Up => &mut self.up,
        }
    }

    /// Every element with its side, in pin allocation order.
    pub fn iter(&self) -> impl Iterator<Item = (Side, ComponentId)> + '_ {
        Side::ALL
            .into_iter()
            .flat_map(move |side| self.side(side).iter().map(move |&id| (side, id)))
    }

    /// The side `element` sits on.
    pub fn side_of(&self, element: ComponentId) -> Option<Side> {
        self.iter().find(|&(_, id)| id == element).map(|(side, _)| side)
    }

    pub fn len(&self) -> usize {
        Side::ALL.iter().map(|&side| self.side(side).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inserts `element` into `side`, keeping the side sorted by the scan
    /// coordinate of each element in `circuit`. Ties go after existing equals.
    pub fn insert_sorted(&mut self, side: Side, element: ComponentId, circuit: &Circuit) {
        let coordinate = |id: ComponentId| {
            circuit
                .component(id)
                .map(|c| side.scan_coordinate(c.position()))
                .unwrap_or(i32::MAX)
        };
        let value = coordinate(element);
        let list = self.side_mut(side);
        let at = list.partition_point(|&other| coordinate(other) <= value);
        list.insert(at, element);
    }

    /// Copy of this layout with every side sorted by scan coordinate.
    /// Elements with equal coordinates keep their relative order.
    pub fn sorted(&self, circuit: &Circuit) -> Self {
        let mut sorted = Self::new();
        for (side, element) in self.iter() {
            sorted.insert_sorted(side, element, circuit);
        }
        sorted
    }
}

/// A component owning a private sub-circuit.
#[derive(Debug)]
pub struct Custom {
    label: String,
    inner: Circuit,
    layout: BoundaryLayout,
    /// Boundary input index -> inner switch
    inputs: BTreeMap<PinIndex, ComponentId>,
    /// Boundary output index -> inner light
    outputs: BTreeMap<PinIndex, ComponentId>,
    /// Set once the whole inner circuit has been evaluated
    primed: bool,
}

impl Custom {
    /// Validates `layout` against `inner` and allocates the boundary pins.
    ///
    /// Each side is first ordered by scan coordinate, so pin numbering only
    /// depends on where the boundary elements sit. Returns the node together
    /// with its pin set; the output pins start with the current states of
    /// their inner lights.
    pub fn build(label: String, inner: Circuit, layout: BoundaryLayout) -> Result<(Self, IoManager)> {
        let layout = layout.sorted(&inner);
        let mut io = IoManager::new();
        let mut inputs = BTreeMap::new();
        let mut outputs = BTreeMap::new();
        let mut seen = HashSet::new();

        for (side, id) in layout.iter() {
            if !seen.insert(id) {
                return Err(CircuitError::DuplicateBoundaryElement(id));
            }
            let component = inner.get(id)?;
            match component.component_type() {
                ComponentType::Switch => {
                    inputs.insert(io.add_pin(PinDirection::Input), id);
                }
                ComponentType::Light => {
                    let index = io.add_pin(PinDirection::Output);
                    io.set_output_signal(index, component.state().is_high());
                    outputs.insert(index, id);
                }
                other => {
                    return Err(CircuitError::InvalidBoundary {
                        component: id,
                        reason: format!("{other} on the {side:?} side is neither a switch nor a light"),
                    });
                }
            }
        }

        let custom = Self {
            label,
            inner,
            layout,
            inputs,
            outputs,
            primed: false,
        };
        Ok((custom, io))
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn inner(&self) -> &Circuit {
        &self.inner
    }

    pub fn layout(&self) -> &BoundaryLayout {
        &self.layout
    }

    /// Inner switch behind boundary input `index`.
    pub fn input_element(&self, index: PinIndex) -> Option<ComponentId> {
        self.inputs.get(&index).copied()
    }

    /// Inner light behind boundary output `index`.
    pub fn output_element(&self, index: PinIndex) -> Option<ComponentId> {
        self.outputs.get(&index).copied()
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Whether the inner circuit contains a switch, button, clock or a
    /// stateful Custom node.
    pub fn is_stateful(&self) -> bool {
        self.inner.components().any(|(_, c)| c.is_stateful())
    }

    pub fn is_primed(&self) -> bool {
        self.primed
    }

    /// Maps boundary inputs onto inner switches, settles the inner circuit
    /// and returns the inner light states as boundary outputs.
    pub(crate) fn evaluate(&mut self, inputs: &[bool], ctx: &mut EvalContext) -> Vec<bool> {
        let mut seeds = Vec::new();
        if !self.primed {
            seeds.extend(self.inner.component_ids());
            self.primed = true;
        }

        for (&index, &switch) in &self.inputs {
            let value = inputs.get(index).copied().unwrap_or(false);
            if let Ok(true) = self.inner.set_switch(switch, value) {
                seeds.push(switch);
            }
        }
        seeds.extend(self.inner.stateful_ids());

        let engine = PropagationEngine::new(ctx.config());
        let outcome = engine.run(&mut self.inner, seeds);
        if !outcome.is_stable() {
            warn!(
                label = %self.label,
                circuit = %self.inner.id(),
                updates = outcome.stats.updates,
                "inner circuit did not stabilize"
            );
        }
        ctx.record_nested(&outcome);

        (0..self.outputs.len())
            .map(|index| {
                self.output_element(index)
                    .and_then(|light| self.inner.component(light))
                    .map(|light| light.state().is_high())
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Deep-copies the inner circuit and rebuilds the boundary from it.
    ///
    /// Copied switches and lights go back onto the side their original sat
    /// on, sorted by scan coordinate; pin indices are then reallocated and
    /// match the original's.
    pub fn duplicate(&self) -> Result<(Self, IoManager)> {
        let ids: Vec<ComponentId> = self.inner.component_ids().collect();
        let mut inner = Circuit::new();
        let copied = crate::duplicate::duplicate_into(&self.inner, &ids, Position::default(), &mut inner)?;

        let mut layout = BoundaryLayout::new();
        for (side, original) in self.layout.iter() {
            if let Some(&copy) = copied.mapping.get(&original) {
                layout.insert_sorted(side, copy, &inner);
            }
        }

        let (mut custom, io) = Self::build(self.label.clone(), inner, layout)?;
        custom.primed = self.primed;
        Ok((custom, io))
    }

    /// Advances every inner clock; returns whether any was found.
    pub(crate) fn tick_clocks(&mut self) -> bool {
        !self.inner.tick_clocks().is_empty()
    }

    /// Deletes every inner component.
    pub(crate) fn clear(&mut self) {
        self.inner.clear();
        self.inputs.clear();
        self.outputs.clear();
        self.layout = BoundaryLayout::new();
    }
}

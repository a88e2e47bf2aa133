//! Wire definitions.
//!
//! A wire is a directed signal carrier from exactly one output pin to
//! exactly one input pin. It caches the last value propagated across it, so
//! reading an input never requires recomputing the driving component.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{ComponentId, PinRef, WireId};

/// Wire arena of one circuit, keyed (and therefore iterated) in creation order.
pub type WireMap = BTreeMap<WireId, Wire>;

/// A directed edge between an output pin and an input pin.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wire {
    /// The driving output pin
    pub source: PinRef,
    /// The driven input pin
    pub dest: PinRef,
    /// The last propagated signal
    pub signal: bool,
}

impl Wire {
    /// Creates a new wire carrying `signal`.
    pub fn new(source: PinRef, dest: PinRef, signal: bool) -> Self {
        Self {
            source,
            dest,
            signal,
        }
    }

    /// Component that drives this wire.
    pub fn source_component(&self) -> ComponentId {
        self.source.component
    }

    /// Component whose input this wire feeds.
    pub fn dest_component(&self) -> ComponentId {
        self.dest.component
    }

    /// Returns true if either end of the wire is on `component`.
    pub fn touches(&self, component: ComponentId) -> bool {
        self.source.component == component || self.dest.component == component
    }
}

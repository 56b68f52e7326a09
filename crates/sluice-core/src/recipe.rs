//! Recipe lookup by (fluid, mesh, input).
//!
//! The station only consumes the [`RecipeResolver`] seam; [`RecipeTable`] is
//! the in-memory implementation the data loader fills.

use crate::fixed::Fixed64;
use crate::id::{FluidId, ItemTypeId};
use crate::mesh::Mesh;
use serde::{Deserialize, Serialize};

/// One possible output and its independent drop probability in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeCandidate {
    pub item_type: ItemTypeId,
    pub quantity: u32,
    pub probability: Fixed64,
}

impl RecipeCandidate {
    pub fn new(item_type: ItemTypeId, probability: Fixed64) -> Self {
        Self {
            item_type,
            quantity: 1,
            probability,
        }
    }
}

/// Result of a recipe lookup. Built fresh for every lookup, never persisted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeDescriptor {
    /// Ticks per cycle before tier and upgrade modifiers.
    pub processing_time_base: u32,
    /// Fluid per cycle before tier and upgrade modifiers.
    pub fluid_used_base: u32,
    /// Upper bound on accepted candidates per cycle.
    pub max_drops: u32,
    pub candidates: Vec<RecipeCandidate>,
}

impl RecipeDescriptor {
    /// The "no such recipe" answer.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

/// Answers recipe questions for a fixed recipe-table snapshot. Both methods
/// must be pure functions of their arguments.
pub trait RecipeResolver {
    /// Look up the recipe. Returns [`RecipeDescriptor::empty`] when nothing
    /// matches.
    fn resolve(&self, fluid: FluidId, mesh: Mesh, input: ItemTypeId) -> RecipeDescriptor;

    /// Whether `input` is processable with `mesh` under any fluid.
    fn accepts_input(&self, mesh: Mesh, input: ItemTypeId) -> bool;
}

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// A single recipe row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeEntry {
    pub fluid: FluidId,
    pub meshes: Vec<Mesh>,
    pub input: ItemTypeId,
    pub processing_time: u32,
    pub fluid_used: u32,
    pub max_drops: u32,
    pub outputs: Vec<RecipeCandidate>,
}

impl RecipeEntry {
    fn matches(&self, fluid: FluidId, mesh: Mesh, input: ItemTypeId) -> bool {
        self.fluid == fluid && self.input == input && self.meshes.contains(&mesh)
    }

    fn descriptor(&self) -> RecipeDescriptor {
        RecipeDescriptor {
            processing_time_base: self.processing_time,
            fluid_used_base: self.fluid_used,
            max_drops: self.max_drops,
            candidates: self.outputs.clone(),
        }
    }
}

/// Ordered recipe rows. The first matching row wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeTable {
    entries: Vec<RecipeEntry>,
}

impl RecipeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, entry: RecipeEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[RecipeEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl RecipeResolver for RecipeTable {
    fn resolve(&self, fluid: FluidId, mesh: Mesh, input: ItemTypeId) -> RecipeDescriptor {
        self.entries
            .iter()
            .find(|e| e.matches(fluid, mesh, input))
            .map(RecipeEntry::descriptor)
            .unwrap_or_default()
    }

    fn accepts_input(&self, mesh: Mesh, input: ItemTypeId) -> bool {
        self.entries
            .iter()
            .any(|e| e.input == input && e.meshes.contains(&mesh))
    }
}

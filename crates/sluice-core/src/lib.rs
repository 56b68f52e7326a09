//! Sluice Core -- the simulation engine for fluid-driven sifting stations.
//!
//! A station holds one input item, a fluid tank, optionally an energy buffer
//! and an upgrade container. Each tick it either starts a cycle, advances
//! one, or finishes one and ejects weighted-random outputs. Everything is
//! deterministic given a seed: costs use Q32.32 fixed point and all
//! randomness comes from one [`rng::SimRng`] owned by the host.
//!
//! # Per-Tick State Machine
//!
//! [`station::Station::tick`] does exactly one of:
//!
//! 1. **Start** -- idle with an input, a mesh, enough fluid and enough
//!    energy: reserve the cycle's fluid budget and processing time.
//! 2. **Advance** -- bump progress, or cancel if the mesh was pulled.
//! 3. **Finish** -- roll outputs, debit fluid and energy, clear the input.
//!
//! Inputs that can never run are ejected instead of blocking the slot.
//!
//! # Key Types
//!
//! - [`station::Station`] -- The state machine and its reservoirs.
//! - [`cost::CostModel`] -- Power cost, fluid requirement and processing
//!   time for a tier, its upgrades and a recipe.
//! - [`recipe::RecipeResolver`] -- Lookup seam from (fluid, mesh, input) to
//!   a recipe; [`recipe::RecipeTable`] is the stock implementation.
//! - [`eject::StationWorld`] -- Seam to the surrounding containers and
//!   ground.
//! - [`level::Level`] -- A headless world with stations, taps and
//!   containers, stepped tick by tick.
//! - [`serialize`] -- Versioned station snapshots via bitcode.

pub mod cost;
pub mod eject;
pub mod event;
pub mod fixed;
pub mod id;
pub mod item;
pub mod level;
pub mod mesh;
pub mod output;
pub mod placement;
pub mod recipe;
pub mod reservoir;
pub mod rng;
pub mod serialize;
pub mod station;
pub mod sync;
pub mod tap;
pub mod tier;
pub mod upgrade;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

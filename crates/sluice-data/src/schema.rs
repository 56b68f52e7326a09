//! Serde data file structs for station content definitions.
//!
//! These structs define the on-disk format for items, fluids, tier overrides
//! and recipes. They are deserialized from RON, JSON, or TOML data files and
//! then resolved into engine types by the loader.

use serde::Deserialize;

// ===========================================================================
// Items and fluids
// ===========================================================================

/// An item type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
}

/// A fluid definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct FluidData {
    pub name: String,
}

// ===========================================================================
// General
// ===========================================================================

/// Settings shared by every tier. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralData {
    #[serde(default = "default_cost_base")]
    pub exponential_cost_base: f64,
    #[serde(default = "default_max_stack")]
    pub max_upgrade_stack_size: u32,
}

fn default_cost_base() -> f64 {
    1.6
}

fn default_max_stack() -> u32 {
    sluice_core::upgrade::DEFAULT_MAX_UPGRADE_STACK
}

impl Default for GeneralData {
    fn default() -> Self {
        Self {
            exponential_cost_base: default_cost_base(),
            max_upgrade_stack_size: default_max_stack(),
        }
    }
}

// ===========================================================================
// Tiers
// ===========================================================================

/// Overrides for one tier's built-in configuration. Omitted fields keep the
/// built-in value.
#[derive(Debug, Clone, Deserialize)]
pub struct TierData {
    /// Tier name: `oak`, `iron`, `diamond`, `netherite` or `empowered`.
    pub tier: String,
    #[serde(default)]
    pub energy_cost_per_use: Option<u32>,
    #[serde(default)]
    pub fluid_multiplier: Option<f64>,
    #[serde(default)]
    pub time_multiplier: Option<f64>,
    #[serde(default)]
    pub tank_capacity: Option<u32>,
    #[serde(default)]
    pub allows_io: Option<bool>,
    #[serde(default)]
    pub allows_tank: Option<bool>,
    #[serde(default)]
    pub upgradeable: Option<bool>,
}

// ===========================================================================
// Recipes
// ===========================================================================

/// A recipe output, either `("item", probability)` or the full form with a
/// stack size.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OutputData {
    Short(String, f64),
    Full {
        item: String,
        probability: f64,
        #[serde(default = "default_quantity")]
        quantity: u32,
    },
}

fn default_quantity() -> u32 {
    1
}

impl OutputData {
    pub fn item(&self) -> &str {
        match self {
            OutputData::Short(item, _) | OutputData::Full { item, .. } => item,
        }
    }

    pub fn probability(&self) -> f64 {
        match self {
            OutputData::Short(_, p) | OutputData::Full { probability: p, .. } => *p,
        }
    }

    pub fn quantity(&self) -> u32 {
        match self {
            OutputData::Short(..) => 1,
            OutputData::Full { quantity, .. } => *quantity,
        }
    }
}

/// A recipe definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub fluid: String,
    pub meshes: Vec<String>,
    pub input: String,
    pub processing_time: u32,
    pub fluid_used: u32,
    #[serde(default = "default_max_drops")]
    pub max_drops: u32,
    pub outputs: Vec<OutputData>,
}

fn default_max_drops() -> u32 {
    1
}

// ===========================================================================
// TOML wrappers
// ===========================================================================

/// TOML wrapper: `[[items]]` array of tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlItems {
    pub items: Vec<ItemData>,
}

/// TOML wrapper: `[[recipes]]` array of tables.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlRecipes {
    pub recipes: Vec<RecipeData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_short_and_full_forms() {
        let outputs: Vec<OutputData> = ron::from_str(
            r#"[("nugget", 0.5), (item: "flint", probability: 0.2, quantity: 2)]"#,
        )
        .unwrap();
        assert_eq!(outputs[0].item(), "nugget");
        assert_eq!(outputs[0].quantity(), 1);
        assert_eq!(outputs[1].item(), "flint");
        assert_eq!(outputs[1].probability(), 0.2);
        assert_eq!(outputs[1].quantity(), 2);
    }

    #[test]
    fn general_defaults() {
        let general: GeneralData = serde_json::from_str("{}").unwrap();
        assert_eq!(general.exponential_cost_base, 1.6);
        assert_eq!(general.max_upgrade_stack_size, 18);
    }

    #[test]
    fn tier_overrides_are_sparse() {
        let tier: TierData = ron::from_str(r#"(tier: "oak", tank_capacity: Some(4000))"#).unwrap();
        assert_eq!(tier.tier, "oak");
        assert_eq!(tier.tank_capacity, Some(4000));
        assert!(tier.fluid_multiplier.is_none());
    }

    #[test]
    fn recipe_max_drops_defaults_to_one() {
        let recipe: RecipeData = serde_json::from_str(
            r#"{"fluid": "water", "meshes": ["cloth"], "input": "gravel",
                "processing_time": 100, "fluid_used": 50,
                "outputs": [["nugget", 0.5]]}"#,
        )
        .unwrap();
        assert_eq!(recipe.max_drops, 1);
        assert_eq!(recipe.outputs[0].item(), "nugget");
    }
}

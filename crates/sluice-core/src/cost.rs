//! Per-cycle requirements: energy cost, fluid requirement and processing time,
//! after blending the tier configuration with installed upgrades.

use crate::fixed::{Thousandths, scaled_with_reduction};
use crate::recipe::RecipeDescriptor;
use crate::tier::{GlobalConfig, TierConfig};
use crate::upgrade::{UpgradeEffects, UpgradeKind};

/// Power cost saturates here instead of overflowing.
pub const MAX_POWER_COST: u32 = i32::MAX as u32;

/// A cycle never reserves less fluid than this.
pub const MIN_FLUID_REQUIREMENT: u32 = 40;

/// A cycle never takes fewer ticks than this.
pub const MIN_PROCESSING_TICKS: u32 = 1;

/// `value * base^exponent`, truncated and saturating at [`MAX_POWER_COST`].
///
/// Evaluated in `f64`: `base^exponent` by repeated multiplication, then
/// scaled by `value` and truncated. Monotone in `exponent` whenever
/// `base >= 1`.
pub fn exponential_scale(value: u32, base: Thousandths, exponent: u32) -> u32 {
    if value == 0 {
        return 0;
    }
    let ceiling = f64::from(MAX_POWER_COST);
    let base = base.to_f64();
    let mut factor = 1.0_f64;
    for _ in 0..exponent {
        // value >= 1, so the product has already saturated.
        if factor >= ceiling {
            break;
        }
        factor *= base;
    }
    (factor * f64::from(value)).min(ceiling) as u32
}

/// Borrowed view over everything the cost formulas depend on.
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'a> {
    pub tier: &'a TierConfig,
    pub global: &'a GlobalConfig,
    pub effects: &'a UpgradeEffects,
}

impl<'a> CostModel<'a> {
    pub fn new(tier: &'a TierConfig, global: &'a GlobalConfig, effects: &'a UpgradeEffects) -> Self {
        Self {
            tier,
            global,
            effects,
        }
    }

    /// Energy charged for one completed cycle.
    ///
    /// With no upgrades installed this is the tier's flat cost; otherwise the
    /// flat cost grows exponentially in the total installed upgrade count.
    pub fn power_cost(&self) -> u32 {
        let base = self.tier.energy_cost_per_use;
        if !self.effects.any_installed() {
            return base.min(MAX_POWER_COST);
        }
        exponential_scale(base, self.global.exponential_cost_base, self.effects.total())
    }

    /// Percentage modifier contributed by `kind`.
    pub fn effect_modifier(&self, kind: UpgradeKind) -> u32 {
        self.effects.modifier(kind)
    }

    /// Fluid reserved for a cycle of `recipe`.
    pub fn fluid_requirement(&self, recipe: &RecipeDescriptor) -> u32 {
        let scaled = scaled_with_reduction(
            recipe.fluid_used_base,
            self.tier.fluid_multiplier,
            self.effect_modifier(UpgradeKind::Consumption),
        );
        clamp_to_u32(scaled).max(MIN_FLUID_REQUIREMENT)
    }

    /// Ticks a cycle of `recipe` takes.
    pub fn processing_ticks(&self, recipe: &RecipeDescriptor) -> u32 {
        let scaled = scaled_with_reduction(
            recipe.processing_time_base,
            self.tier.time_multiplier,
            self.effect_modifier(UpgradeKind::Speed),
        );
        clamp_to_u32(scaled).max(MIN_PROCESSING_TICKS)
    }
}

fn clamp_to_u32(v: i64) -> u32 {
    v.clamp(0, i64::from(u32::MAX)) as u32
}

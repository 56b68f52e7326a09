//! Physical station variants and their immutable configuration.
//!
//! Every tier runs the same state machine; what differs is a [`TierConfig`]
//! value plus the few variant rules switched on [`Tier`] directly.

use crate::cost::{MAX_POWER_COST, exponential_scale};
use crate::fixed::{Thousandths, Ticks};
use crate::mesh::Mesh;
use crate::upgrade::DEFAULT_MAX_UPGRADE_STACK;
use serde::{Deserialize, Serialize};

/// Ticks per second of game time.
pub const TICKS_PER_SECOND: Ticks = 20;

// ---------------------------------------------------------------------------
// Tier
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Oak,
    Iron,
    Diamond,
    Netherite,
    Empowered,
}

impl Tier {
    pub const ALL: [Tier; 5] = [
        Tier::Oak,
        Tier::Iron,
        Tier::Diamond,
        Tier::Netherite,
        Tier::Empowered,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tier::Oak => "oak",
            Tier::Iron => "iron",
            Tier::Diamond => "diamond",
            Tier::Netherite => "netherite",
            Tier::Empowered => "empowered",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    /// How long an ejected drop lingers before despawning. Low tiers are
    /// slow, so their drops stay around longer.
    pub fn despawn_ticks(self) -> Ticks {
        match self {
            Tier::Oak | Tier::Iron => 60 * TICKS_PER_SECOND,
            Tier::Diamond | Tier::Netherite | Tier::Empowered => 10 * TICKS_PER_SECOND,
        }
    }

    /// Whether `mesh` may be installed in this tier.
    pub fn accepts_mesh(self, mesh: Mesh) -> bool {
        mesh != Mesh::Blazing || self == Tier::Empowered
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("exponential cost base must be greater than 1, got {0}")]
    CostBaseTooSmall(Thousandths),
    #[error("{tier:?}: {field} must be positive")]
    NonPositiveMultiplier { tier: Tier, field: &'static str },
    #[error("{0:?}: tank capacity must be positive")]
    ZeroTankCapacity(Tier),
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable per-variant configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierConfig {
    pub tier: Tier,
    /// Energy charged per completed cycle. Zero means the tier is not
    /// energy-gated at all.
    pub energy_cost_per_use: u32,
    pub fluid_multiplier: Thousandths,
    pub time_multiplier: Thousandths,
    pub tank_capacity: u32,
    /// Automation may insert items and ejected outputs go to a container.
    pub allows_io: bool,
    /// Automation may fill the fluid tank.
    pub allows_tank: bool,
    pub upgradeable: bool,
}

impl TierConfig {
    /// Built-in configuration for `tier`.
    pub fn defaults(tier: Tier) -> Self {
        let (cost, fluid, time, tank, io, tank_io, upgradeable) = match tier {
            Tier::Oak => (0, 1_000, 2_000, 1_000, false, false, false),
            Tier::Iron => (0, 1_000, 1_500, 2_000, true, true, false),
            Tier::Diamond => (0, 1_000, 1_000, 5_000, true, true, false),
            Tier::Netherite => (0, 1_000, 750, 10_000, true, true, false),
            Tier::Empowered => (40, 1_000, 500, 10_000, true, true, true),
        };
        Self {
            tier,
            energy_cost_per_use: cost,
            fluid_multiplier: Thousandths(fluid),
            time_multiplier: Thousandths(time),
            tank_capacity: tank,
            allows_io: io,
            allows_tank: tank_io,
            upgradeable,
        }
    }

    pub fn is_energy_gated(&self) -> bool {
        self.energy_cost_per_use > 0
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fluid_multiplier.0 == 0 {
            return Err(ConfigError::NonPositiveMultiplier {
                tier: self.tier,
                field: "fluid_multiplier",
            });
        }
        if self.time_multiplier.0 == 0 {
            return Err(ConfigError::NonPositiveMultiplier {
                tier: self.tier,
                field: "time_multiplier",
            });
        }
        if self.tank_capacity == 0 {
            return Err(ConfigError::ZeroTankCapacity(self.tier));
        }
        Ok(())
    }
}

/// Settings shared by every tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalConfig {
    /// Base of the power cost growth per installed upgrade.
    pub exponential_cost_base: Thousandths,
    /// Installed counts are clamped to this when building the effect cache.
    pub max_upgrade_stack_size: u32,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            exponential_cost_base: Thousandths(1_600),
            max_upgrade_stack_size: DEFAULT_MAX_UPGRADE_STACK,
        }
    }
}

impl GlobalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.exponential_cost_base <= Thousandths::ONE {
            return Err(ConfigError::CostBaseTooSmall(self.exponential_cost_base));
        }
        Ok(())
    }

    /// Energy buffer size for a tier: enough for one cycle with every slot
    /// at the clamp, plus one extra factor of headroom.
    pub fn energy_capacity(&self, tier: &TierConfig) -> u32 {
        if !tier.is_energy_gated() {
            return 0;
        }
        let exponent = self.max_upgrade_stack_size.saturating_mul(3).saturating_add(1);
        exponential_scale(tier.energy_cost_per_use, self.exponential_cost_base, exponent)
            .min(MAX_POWER_COST)
    }
}

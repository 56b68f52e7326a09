//! Upgrade items, the three-slot upgrade container and the effect cache
//! derived from it.
//!
//! The container is the source of truth; [`UpgradeEffects`] is a plain value
//! recomputed from it after every mutation and never persisted on its own.

use serde::{Deserialize, Serialize};

/// Maximum items per upgrade slot.
pub const UPGRADE_SLOT_LIMIT: u32 = 64;

/// Default clamp applied to installed counts when building the effect cache.
pub const DEFAULT_MAX_UPGRADE_STACK: u32 = 18;

// ---------------------------------------------------------------------------
// Upgrade kinds
// ---------------------------------------------------------------------------

/// What an upgrade does. Each kind owns exactly one container slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Adds to every candidate's drop probability.
    Luck,
    /// Reduces fluid consumed per cycle.
    Consumption,
    /// Reduces ticks per cycle.
    Speed,
}

impl UpgradeKind {
    pub const ALL: [UpgradeKind; 3] = [
        UpgradeKind::Luck,
        UpgradeKind::Consumption,
        UpgradeKind::Speed,
    ];

    /// Percentage points contributed per installed upgrade.
    pub const fn effect_magnitude(self) -> u32 {
        match self {
            UpgradeKind::Luck => 2,
            UpgradeKind::Consumption => 5,
            UpgradeKind::Speed => 5,
        }
    }

    /// The container slot this kind is stored in.
    pub const fn slot_index(self) -> usize {
        match self {
            UpgradeKind::Luck => 0,
            UpgradeKind::Consumption => 1,
            UpgradeKind::Speed => 2,
        }
    }

    /// Inverse of [`slot_index`](Self::slot_index).
    pub fn for_slot(slot: usize) -> Option<Self> {
        Self::ALL.get(slot).copied()
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Reasons an upgrade insertion is refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpgradeError {
    #[error("{kind:?} upgrades belong in slot {expected}, not slot {slot}")]
    WrongSlot {
        kind: UpgradeKind,
        slot: usize,
        expected: usize,
    },
    #[error("slot {0} does not exist")]
    NoSuchSlot(usize),
    #[error("this station does not accept upgrades")]
    NotUpgradeable,
}

// ---------------------------------------------------------------------------
// Container
// ---------------------------------------------------------------------------

/// Three upgrade slots, one per [`UpgradeKind`]; the kind is implied by the slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpgradeInventory {
    slots: [u32; 3],
}

impl UpgradeInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `kind` may be placed in `slot`.
    pub fn is_valid_for_slot(slot: usize, kind: UpgradeKind) -> bool {
        kind.slot_index() == slot
    }

    /// Items currently held for `kind` (not clamped).
    pub fn count(&self, kind: UpgradeKind) -> u32 {
        self.slots[kind.slot_index()]
    }

    /// Raw slot contents in slot order.
    pub fn slots(&self) -> [u32; 3] {
        self.slots
    }

    /// Insert into the kind's own slot. Returns the overflow.
    #[must_use = "overflow count indicates upgrades that did not fit"]
    pub fn insert(&mut self, kind: UpgradeKind, quantity: u32) -> u32 {
        let slot = &mut self.slots[kind.slot_index()];
        let space = UPGRADE_SLOT_LIMIT.saturating_sub(*slot);
        let moved = quantity.min(space);
        *slot += moved;
        quantity - moved
    }

    /// Insert into an explicit slot, refusing upgrades of the wrong kind.
    pub fn insert_into_slot(
        &mut self,
        slot: usize,
        kind: UpgradeKind,
        quantity: u32,
    ) -> Result<u32, UpgradeError> {
        if slot >= self.slots.len() {
            return Err(UpgradeError::NoSuchSlot(slot));
        }
        if !Self::is_valid_for_slot(slot, kind) {
            return Err(UpgradeError::WrongSlot {
                kind,
                slot,
                expected: kind.slot_index(),
            });
        }
        Ok(self.insert(kind, quantity))
    }

    /// Remove up to `quantity`. Returns the amount removed.
    #[must_use = "returns the quantity actually removed"]
    pub fn extract(&mut self, kind: UpgradeKind, quantity: u32) -> u32 {
        let slot = &mut self.slots[kind.slot_index()];
        let removed = quantity.min(*slot);
        *slot -= removed;
        removed
    }

    /// Restore from persisted slot counts, clamping each to the slot limit.
    pub fn from_slots(slots: [u32; 3]) -> Self {
        Self {
            slots: slots.map(|c| c.min(UPGRADE_SLOT_LIMIT)),
        }
    }
}

// ---------------------------------------------------------------------------
// Effect cache
// ---------------------------------------------------------------------------

/// Installed upgrade counts per kind, clamped to the configured maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpgradeEffects {
    counts: [u32; 3],
}

impl UpgradeEffects {
    /// Rebuild from the container contents.
    pub fn from_inventory(inventory: &UpgradeInventory, max_stack: u32) -> Self {
        Self {
            counts: inventory.slots().map(|c| c.min(max_stack)),
        }
    }

    /// Clamped installed count for `kind`.
    pub fn installed(&self, kind: UpgradeKind) -> u32 {
        self.counts[kind.slot_index()]
    }

    /// Total installed across every kind, unweighted.
    pub fn total(&self) -> u32 {
        self.counts.iter().sum()
    }

    pub fn any_installed(&self) -> bool {
        self.counts.iter().any(|&c| c > 0)
    }

    /// Percentage modifier for `kind`: installed count times magnitude.
    pub fn modifier(&self, kind: UpgradeKind) -> u32 {
        self.installed(kind) * kind.effect_magnitude()
    }
}

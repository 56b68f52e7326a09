use crate::id::{FluidId, ItemTypeId};
use serde::{Deserialize, Serialize};

/// A stack of fungible items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self {
            item_type,
            quantity,
        }
    }

    /// A single item of the given type.
    pub fn one(item_type: ItemTypeId) -> Self {
        Self::new(item_type, 1)
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }

    /// Copy of this stack with a different quantity.
    pub fn with_quantity(&self, quantity: u32) -> Self {
        Self::new(self.item_type, quantity)
    }
}

/// An amount of a single fluid kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStack {
    pub fluid: FluidId,
    pub amount: u32,
}

impl FluidStack {
    pub fn new(fluid: FluidId, amount: u32) -> Self {
        Self { fluid, amount }
    }
}

// ---------------------------------------------------------------------------
// Item sinks
// ---------------------------------------------------------------------------

/// Anything that can receive an ejected stack (chests, hoppers, ...).
pub trait ItemSink {
    /// Insert as much of `stack` as fits, merging with existing stacks first.
    /// Returns the remainder that did not fit (quantity 0 if everything fit).
    fn insert_stacked(&mut self, stack: ItemStack) -> ItemStack;
}

/// A simple capacity-bounded multi-type container, used for output chests.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemBuffer {
    pub stacks: Vec<ItemStack>,
    pub capacity: u32,
}

impl ItemBuffer {
    pub fn new(capacity: u32) -> Self {
        Self {
            stacks: Vec::new(),
            capacity,
        }
    }

    /// Add fungible items. Returns the amount that didn't fit.
    #[must_use = "overflow count indicates items that did not fit"]
    pub fn add(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let space = self.capacity.saturating_sub(self.total());
        let to_add = quantity.min(space);
        let overflow = quantity - to_add;

        if to_add > 0 {
            if let Some(stack) = self.stacks.iter_mut().find(|s| s.item_type == item_type) {
                stack.quantity += to_add;
            } else {
                self.stacks.push(ItemStack::new(item_type, to_add));
            }
        }

        overflow
    }

    /// Remove fungible items. Returns the amount actually removed.
    #[must_use = "returns the quantity actually removed, which may be less than requested"]
    pub fn remove(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        if let Some(stack) = self.stacks.iter_mut().find(|s| s.item_type == item_type) {
            let to_remove = quantity.min(stack.quantity);
            stack.quantity -= to_remove;
            if stack.quantity == 0 {
                self.stacks.retain(|s| s.quantity > 0);
            }
            to_remove
        } else {
            0
        }
    }

    /// Get quantity of a specific item type.
    pub fn quantity(&self, item_type: ItemTypeId) -> u32 {
        self.stacks
            .iter()
            .find(|s| s.item_type == item_type)
            .map(|s| s.quantity)
            .unwrap_or(0)
    }

    /// Total items across all types.
    pub fn total(&self) -> u32 {
        self.stacks.iter().map(|s| s.quantity).sum()
    }
}

impl ItemSink for ItemBuffer {
    fn insert_stacked(&mut self, stack: ItemStack) -> ItemStack {
        let overflow = self.add(stack.item_type, stack.quantity);
        stack.with_quantity(overflow)
    }
}

//! Capacity-bounded stores owned by a station: the single input slot, the
//! fluid tank and the energy buffer.
//!
//! A host engine with its own container types only needs to mirror the
//! transfer semantics documented on each method.

use crate::id::FluidId;
use crate::item::{FluidStack, ItemStack};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Item slot
// ---------------------------------------------------------------------------

/// A single item slot holding at most `limit` items of one type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSlot {
    stack: Option<ItemStack>,
    limit: u32,
}

impl ItemSlot {
    pub fn new(limit: u32) -> Self {
        Self { stack: None, limit }
    }

    pub fn stack(&self) -> Option<&ItemStack> {
        self.stack.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_none()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Insert into the slot, merging with a stack of the same type.
    /// Returns what did not fit, if anything.
    pub fn insert(&mut self, incoming: ItemStack) -> Option<ItemStack> {
        if incoming.is_empty() {
            return None;
        }
        match &mut self.stack {
            None => {
                let moved = incoming.quantity.min(self.limit);
                if moved > 0 {
                    self.stack = Some(incoming.with_quantity(moved));
                }
                let rest = incoming.quantity - moved;
                (rest > 0).then(|| incoming.with_quantity(rest))
            }
            Some(held) if held.item_type == incoming.item_type => {
                let space = self.limit.saturating_sub(held.quantity);
                let moved = incoming.quantity.min(space);
                held.quantity += moved;
                let rest = incoming.quantity - moved;
                (rest > 0).then(|| incoming.with_quantity(rest))
            }
            Some(_) => Some(incoming),
        }
    }

    /// Remove and return the whole stack.
    pub fn take(&mut self) -> Option<ItemStack> {
        self.stack.take()
    }

    /// Replace the slot contents (used by restore), clamped to the limit.
    pub fn set(&mut self, stack: Option<ItemStack>) {
        self.stack = stack
            .filter(|s| !s.is_empty() && self.limit > 0)
            .map(|s| s.with_quantity(s.quantity.min(self.limit)));
    }
}

// ---------------------------------------------------------------------------
// Fluid tank
// ---------------------------------------------------------------------------

/// A tank holding a single fluid kind up to `capacity` units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidTank {
    contents: Option<FluidStack>,
    capacity: u32,
}

impl FluidTank {
    pub fn new(capacity: u32) -> Self {
        Self {
            contents: None,
            capacity,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn amount(&self) -> u32 {
        self.contents.as_ref().map_or(0, |c| c.amount)
    }

    pub fn fluid(&self) -> Option<FluidId> {
        self.contents.as_ref().map(|c| c.fluid)
    }

    pub fn contents(&self) -> Option<&FluidStack> {
        self.contents.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.amount() == 0
    }

    pub fn space(&self) -> u32 {
        self.capacity.saturating_sub(self.amount())
    }

    /// Fill with `stack`. A non-empty tank only accepts its own fluid.
    /// Returns the amount accepted; nothing changes when `simulate` is set.
    pub fn fill(&mut self, stack: &FluidStack, simulate: bool) -> u32 {
        if stack.amount == 0 {
            return 0;
        }
        if let Some(current) = self.fluid()
            && current != stack.fluid
        {
            return 0;
        }
        let accepted = stack.amount.min(self.space());
        if !simulate && accepted > 0 {
            let amount = self.amount() + accepted;
            self.contents = Some(FluidStack::new(stack.fluid, amount));
        }
        accepted
    }

    /// Drain up to `amount` units. Returns what was removed.
    pub fn drain(&mut self, amount: u32) -> Option<FluidStack> {
        let current = self.contents.as_mut()?;
        let drained = amount.min(current.amount);
        if drained == 0 {
            return None;
        }
        current.amount -= drained;
        let fluid = current.fluid;
        if current.amount == 0 {
            self.contents = None;
        }
        Some(FluidStack::new(fluid, drained))
    }

    /// Replace contents verbatim (used by restore). Amounts above capacity
    /// are clamped.
    pub fn set_contents(&mut self, contents: Option<FluidStack>) {
        self.contents = contents
            .filter(|c| c.amount > 0)
            .map(|c| FluidStack::new(c.fluid, c.amount.min(self.capacity)));
    }
}

// ---------------------------------------------------------------------------
// Energy store
// ---------------------------------------------------------------------------

/// An energy buffer with a fixed capacity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnergyStore {
    stored: u32,
    capacity: u32,
}

impl EnergyStore {
    pub fn new(capacity: u32) -> Self {
        Self {
            stored: 0,
            capacity,
        }
    }

    pub fn stored(&self) -> u32 {
        self.stored
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Accept up to `amount` units. Returns the amount accepted.
    pub fn receive(&mut self, amount: u32, simulate: bool) -> u32 {
        let accepted = amount.min(self.capacity.saturating_sub(self.stored));
        if !simulate {
            self.stored += accepted;
        }
        accepted
    }

    /// Remove up to `amount` units. Returns the amount removed.
    pub fn consume(&mut self, amount: u32) -> u32 {
        let removed = amount.min(self.stored);
        self.stored -= removed;
        removed
    }

    /// Replace the stored amount (used by restore), clamped to capacity.
    pub fn set_stored(&mut self, stored: u32) {
        self.stored = stored.min(self.capacity);
    }
}

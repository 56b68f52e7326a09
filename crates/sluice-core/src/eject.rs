//! Moving stacks out of a station: into an output container when the tier
//! allows automation, otherwise (or for whatever does not fit) as a dropped
//! item at the outlet.

use crate::fixed::{Fixed64, Ticks, f64_to_fixed64};
use crate::item::{ItemSink, ItemStack};
use crate::placement::{BlockPos, Placement};
use crate::rng::SimRng;

/// The slice of the surrounding world a station touches while ejecting.
pub trait StationWorld {
    /// A container at `pos`, if any. Other stations never count as
    /// containers.
    fn container_at(&mut self, pos: BlockPos) -> Option<&mut dyn ItemSink>;

    /// Spawn a loose item.
    fn spawn_drop(&mut self, drop: DroppedItem);
}

/// A loose item stack lying in the world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroppedItem {
    /// Block the item spawned in; it sits at the block center.
    pub block: BlockPos,
    pub stack: ItemStack,
    /// Ticks left before it disappears.
    pub despawn_ticks: Ticks,
    /// Initial upward velocity in blocks per tick.
    pub lift: Fixed64,
}

impl DroppedItem {
    /// Block-center coordinates.
    pub fn center(&self) -> [Fixed64; 3] {
        let half = Fixed64::from_num(0.5);
        [
            Fixed64::from_num(self.block.x) + half,
            Fixed64::from_num(self.block.y) + half,
            Fixed64::from_num(self.block.z) + half,
        ]
    }
}

/// Where ejected stacks go for one station.
#[derive(Debug, Clone, Copy)]
pub struct EjectRoute {
    pub placement: Placement,
    pub auto_output: bool,
    pub despawn_ticks: Ticks,
}

/// What happened to an ejected stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EjectOutcome {
    pub delivered: u32,
    pub dropped: u32,
}

/// Upward kick for a fresh drop: `0.14 * (u * 0.4)` for a uniform `u`.
fn drop_lift(rng: &mut SimRng) -> Fixed64 {
    let scale = f64_to_fixed64(0.14 * 0.4);
    rng.next_fraction().saturating_mul(scale)
}

/// Send `stack` along `route`.
pub fn eject_stack(
    world: &mut dyn StationWorld,
    rng: &mut SimRng,
    route: &EjectRoute,
    stack: ItemStack,
) -> EjectOutcome {
    let total = stack.quantity;
    let mut rest = stack;

    if route.auto_output
        && let Some(sink) = world.container_at(route.placement.output_container())
    {
        rest = sink.insert_stacked(rest);
    }

    let outcome = EjectOutcome {
        delivered: total - rest.quantity,
        dropped: rest.quantity,
    };

    if !rest.is_empty() {
        let lift = drop_lift(rng);
        world.spawn_drop(DroppedItem {
            block: route.placement.outlet(),
            stack: rest,
            despawn_ticks: route.despawn_ticks,
            lift,
        });
    }
    outcome
}

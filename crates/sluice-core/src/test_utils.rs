//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::eject::{DroppedItem, StationWorld};
use crate::fixed::Fixed64;
use crate::id::{FluidId, ItemTypeId};
use crate::item::{FluidStack, ItemBuffer, ItemSink};
use crate::mesh::Mesh;
use crate::placement::{BlockPos, Facing, Placement};
use crate::recipe::{RecipeCandidate, RecipeEntry, RecipeTable};
use crate::rng::SimRng;
use crate::station::{Side, Station, StationError, TickContext};
use crate::tier::{GlobalConfig, Tier, TierConfig};
use std::collections::BTreeMap;

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Items and fluids
// ===========================================================================

pub fn gravel() -> ItemTypeId {
    ItemTypeId(0)
}
pub fn nugget() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn flint() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn sand() -> ItemTypeId {
    ItemTypeId(3)
}
pub fn diamond() -> ItemTypeId {
    ItemTypeId(4)
}

pub const WATER: FluidId = FluidId(0);
pub const LAVA: FluidId = FluidId(1);

pub fn water(amount: u32) -> FluidStack {
    FluidStack::new(WATER, amount)
}
pub fn lava(amount: u32) -> FluidStack {
    FluidStack::new(LAVA, amount)
}

// ===========================================================================
// Recipes
// ===========================================================================

/// Gravel washed in water through a cloth or iron mesh:
/// time 100, fluid 50, up to 3 drops of nugget (0.5) and flint (0.2).
pub fn scenario_entry() -> RecipeEntry {
    RecipeEntry {
        fluid: WATER,
        meshes: vec![Mesh::Cloth, Mesh::Iron],
        input: gravel(),
        processing_time: 100,
        fluid_used: 50,
        max_drops: 3,
        outputs: vec![
            RecipeCandidate::new(nugget(), fixed(0.5)),
            RecipeCandidate::new(flint(), fixed(0.2)),
        ],
    }
}

/// Sand through a diamond mesh, a rare single drop.
pub fn sand_entry() -> RecipeEntry {
    RecipeEntry {
        fluid: WATER,
        meshes: vec![Mesh::Diamond],
        input: sand(),
        processing_time: 20,
        fluid_used: 100,
        max_drops: 1,
        outputs: vec![RecipeCandidate::new(diamond(), fixed(0.05))],
    }
}

pub fn scenario_table() -> RecipeTable {
    let mut table = RecipeTable::new();
    table.add(scenario_entry());
    table.add(sand_entry());
    table
}

// ===========================================================================
// Stations
// ===========================================================================

/// Station at the origin draining east, so its output container sits at
/// `(2, 0, 0)`.
pub fn origin_placement() -> Placement {
    Placement::new(BlockPos::new(0, 0, 0), Facing::East)
}

pub fn station(tier: Tier, mesh: Option<Mesh>) -> Station {
    let mut station = Station::new(
        TierConfig::defaults(tier),
        GlobalConfig::default(),
        origin_placement(),
    );
    station.mesh = mesh;
    station
}

// ===========================================================================
// World
// ===========================================================================

/// Containers and dropped items, nothing else.
#[derive(Debug, Default)]
pub struct TestWorld {
    pub containers: BTreeMap<BlockPos, ItemBuffer>,
    pub drops: Vec<DroppedItem>,
}

impl TestWorld {
    /// A world with a roomy chest where an origin station drains.
    pub fn with_output_chest() -> Self {
        let mut world = Self::default();
        world
            .containers
            .insert(origin_placement().output_container(), ItemBuffer::new(10_000));
        world
    }
}

impl StationWorld for TestWorld {
    fn container_at(&mut self, pos: BlockPos) -> Option<&mut dyn ItemSink> {
        self.containers.get_mut(&pos).map(|c| c as &mut dyn ItemSink)
    }

    fn spawn_drop(&mut self, drop: DroppedItem) {
        self.drops.push(drop);
    }
}

// ===========================================================================
// Rig
// ===========================================================================

/// A single station with everything it needs to tick.
pub struct Rig {
    pub station: Station,
    pub recipes: RecipeTable,
    pub rng: SimRng,
    pub world: TestWorld,
    pub time: u64,
    pub side: Side,
}

impl Rig {
    pub fn new(station: Station, recipes: RecipeTable) -> Self {
        Self {
            station,
            recipes,
            rng: SimRng::new(42),
            world: TestWorld::with_output_chest(),
            time: 0,
            side: Side::Authoritative,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SimRng::new(seed);
        self
    }

    fn context(&mut self) -> (&mut Station, TickContext<'_>) {
        let ctx = TickContext {
            game_time: self.time,
            side: self.side,
            rng: &mut self.rng,
            recipes: &self.recipes,
            world: &mut self.world,
        };
        (&mut self.station, ctx)
    }

    /// One state tick followed by one heartbeat-free clock advance.
    pub fn tick(&mut self) {
        let (station, mut ctx) = self.context();
        station.tick(&mut ctx);
        self.time += 1;
    }

    /// Tick until the station is idle with an empty slot, at most `limit`
    /// times. Returns the number of ticks run.
    pub fn run_until_idle(&mut self, limit: u32) -> u32 {
        for n in 1..=limit {
            self.tick();
            if self.station.cycle().is_none() && self.station.input().is_none() {
                return n;
            }
        }
        limit
    }

    pub fn change_selector(&mut self, mesh: Option<Mesh>) -> Result<Option<Mesh>, StationError> {
        let (station, mut ctx) = self.context();
        station.change_selector(mesh, &mut ctx)
    }

    /// Items that left the station, whether into a container or dropped.
    pub fn delivered_total(&self) -> u32 {
        let chests: u32 = self.world.containers.values().map(ItemBuffer::total).sum();
        let drops: u32 = self.world.drops.iter().map(|d| d.stack.quantity).sum();
        chests + drops
    }

    /// Item types of every stack that left the station.
    pub fn delivered_types(&self) -> Vec<ItemTypeId> {
        self.world
            .containers
            .values()
            .flat_map(|c| c.stacks.iter().map(|s| s.item_type))
            .chain(self.world.drops.iter().map(|d| d.stack.item_type))
            .collect()
    }
}

//! The processing station.
//!
//! A station holds one input item, a fluid tank, an energy buffer (sized to
//! zero on tiers without an energy gate) and an upgrade container. Once per
//! tick [`Station::tick`] moves its cycle forward:
//!
//! ```text
//! Idle ──try_start──▶ Active ──advance…──▶ ReadyToFinish ──finish──▶ Idle
//!                       │
//!                       └── selector removed ──▶ cancel ──▶ Idle
//! ```
//!
//! Preconditions that are not met are never errors; the station simply tries
//! again on the next tick. Observer resync is a separate callback,
//! [`Station::heartbeat`], which the tick driver composes with `tick`.

use crate::cost::CostModel;
use crate::eject::{EjectRoute, StationWorld, eject_stack};
use crate::event::{EventBuffer, StationEvent};
use crate::fixed::Ticks;
use crate::id::{FluidId, ItemTypeId};
use crate::item::{FluidStack, ItemStack};
use crate::mesh::Mesh;
use crate::output::resolve_outputs;
use crate::placement::Placement;
use crate::recipe::RecipeResolver;
use crate::reservoir::{EnergyStore, FluidTank, ItemSlot};
use crate::rng::SimRng;
use crate::sync::SyncTracker;
use crate::tier::{GlobalConfig, Tier, TierConfig};
use crate::upgrade::{UpgradeEffects, UpgradeError, UpgradeInventory, UpgradeKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

/// The input slot holds a single item.
pub const INPUT_SLOT_LIMIT: u32 = 1;

/// Observers are resynced whenever the game time is a multiple of this.
pub const HEARTBEAT_INTERVAL: Ticks = 10;

/// While a cycle runs, observers are resynced every this many ticks of
/// progress.
pub const PROGRESS_SYNC_INTERVAL: u32 = 4;

// ---------------------------------------------------------------------------
// Tick context
// ---------------------------------------------------------------------------

/// Which copy of the state a tick runs against. Only the authoritative copy
/// changes state; observers wait for resyncs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Authoritative,
    Observer,
}

/// Everything a station borrows from its host for one tick.
pub struct TickContext<'a> {
    pub game_time: Ticks,
    pub side: Side,
    pub rng: &'a mut SimRng,
    pub recipes: &'a dyn RecipeResolver,
    pub world: &'a mut dyn StationWorld,
}

impl<'a> TickContext<'a> {
    pub fn authoritative(
        game_time: Ticks,
        rng: &'a mut SimRng,
        recipes: &'a dyn RecipeResolver,
        world: &'a mut dyn StationWorld,
    ) -> Self {
        Self {
            game_time,
            side: Side::Authoritative,
            rng,
            recipes,
            world,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StationError {
    #[error("{mesh:?} mesh cannot be installed in a {tier:?} station")]
    SelectorNotAllowed { mesh: Mesh, tier: Tier },
    #[error(transparent)]
    Upgrade(#[from] UpgradeError),
}

// ---------------------------------------------------------------------------
// Cycle state
// ---------------------------------------------------------------------------

/// A cycle in progress. Absent while the station is idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveCycle {
    pub processed: u32,
    /// Always at least 1.
    pub max_processed: u32,
    /// Fluid reserved when the cycle started, debited when it finishes.
    pub fluid_usage: u32,
}

impl ActiveCycle {
    pub fn is_ready(&self) -> bool {
        self.processed >= self.max_processed
    }
}

/// Why an idle station holding an input has not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitReason {
    /// Energy-gated and the buffer is empty.
    NoEnergy,
    /// No mesh installed; the input will be thrown out.
    NoSelector,
    NoFluid,
    InsufficientEnergy { required: u32, stored: u32 },
    InsufficientFluid { required: u32, available: u32 },
    /// The input has no recipe for this fluid and mesh; it will be thrown out.
    NoRecipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StationStatus {
    /// Nothing to process.
    Idle,
    /// Holding an input that will start on the next tick.
    Ready,
    Waiting(WaitReason),
    Active { processed: u32, max_processed: u32 },
    ReadyToFinish,
}

enum StartCheck {
    NoInput,
    Wait(WaitReason),
    Reject(WaitReason),
    Start { max_processed: u32, fluid_usage: u32 },
}

struct StartEvaluation {
    check: StartCheck,
    /// Set when the evaluation got far enough to price the cycle.
    power_cost: Option<u32>,
}

// ---------------------------------------------------------------------------
// Station
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Station {
    pub(crate) config: TierConfig,
    pub(crate) global: GlobalConfig,
    pub(crate) placement: Placement,
    pub(crate) mesh: Option<Mesh>,
    pub(crate) input: ItemSlot,
    pub(crate) tank: FluidTank,
    pub(crate) energy: EnergyStore,
    pub(crate) upgrades: UpgradeInventory,
    pub(crate) effects: UpgradeEffects,
    pub(crate) cycle: Option<ActiveCycle>,
    pub(crate) last_power_cost: u32,
    pub(crate) creative: bool,
    pub(crate) sync: SyncTracker,
    pub(crate) events: EventBuffer,
}

impl Station {
    pub fn new(config: TierConfig, global: GlobalConfig, placement: Placement) -> Self {
        let energy = EnergyStore::new(global.energy_capacity(&config));
        let tank = FluidTank::new(config.tank_capacity);
        Self {
            config,
            global,
            placement,
            mesh: None,
            input: ItemSlot::new(INPUT_SLOT_LIMIT),
            tank,
            energy,
            upgrades: UpgradeInventory::new(),
            effects: UpgradeEffects::default(),
            cycle: None,
            last_power_cost: 0,
            creative: false,
            sync: SyncTracker::new(),
            events: EventBuffer::default(),
        }
    }

    /// Builder-style mesh installation, bypassing the interaction path.
    pub fn with_mesh(mut self, mesh: Mesh) -> Result<Self, StationError> {
        self.check_mesh(mesh)?;
        self.mesh = Some(mesh);
        Ok(self)
    }

    // -- Accessors --

    pub fn tier(&self) -> Tier {
        self.config.tier
    }

    pub fn config(&self) -> &TierConfig {
        &self.config
    }

    pub fn global(&self) -> &GlobalConfig {
        &self.global
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn mesh(&self) -> Option<Mesh> {
        self.mesh
    }

    pub fn input(&self) -> Option<&ItemStack> {
        self.input.stack()
    }

    pub fn tank(&self) -> &FluidTank {
        &self.tank
    }

    pub fn energy(&self) -> &EnergyStore {
        &self.energy
    }

    pub fn upgrades(&self) -> &UpgradeInventory {
        &self.upgrades
    }

    pub fn effects(&self) -> &UpgradeEffects {
        &self.effects
    }

    pub fn cycle(&self) -> Option<&ActiveCycle> {
        self.cycle.as_ref()
    }

    /// Progress of the current cycle; zero when idle.
    pub fn processed(&self) -> u32 {
        self.cycle.map_or(0, |c| c.processed)
    }

    pub fn max_processed(&self) -> Option<u32> {
        self.cycle.map(|c| c.max_processed)
    }

    pub fn fluid_usage(&self) -> Option<u32> {
        self.cycle.map(|c| c.fluid_usage)
    }

    /// Power cost as last computed while evaluating or finishing a cycle.
    pub fn last_power_cost(&self) -> u32 {
        self.last_power_cost
    }

    pub fn is_creative(&self) -> bool {
        self.creative
    }

    /// An unlimited station finishes each cycle on its first tick, yields
    /// every candidate and never consumes fluid or energy.
    pub fn set_creative(&mut self, creative: bool) {
        if self.creative != creative {
            self.creative = creative;
            self.sync.mark_dirty();
        }
    }

    pub fn sync(&self) -> &SyncTracker {
        &self.sync
    }

    pub fn sync_mut(&mut self) -> &mut SyncTracker {
        &mut self.sync
    }

    pub fn events(&self) -> &EventBuffer {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<StationEvent> {
        self.events.drain()
    }

    // -- Costs --

    pub fn cost_model(&self) -> CostModel<'_> {
        CostModel::new(&self.config, &self.global, &self.effects)
    }

    /// Energy a cycle costs with the upgrades currently installed.
    pub fn power_cost(&self) -> u32 {
        self.cost_model().power_cost()
    }

    // -- Tick --

    /// Advance the state machine by one tick.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        if ctx.side == Side::Observer {
            return;
        }

        let Some(cycle) = self.cycle else {
            self.try_start(ctx);
            return;
        };

        if cycle.is_ready() {
            self.finish(ctx);
        } else {
            if self.mesh.is_none() {
                self.cancel(ctx);
                return;
            }
            self.cycle = Some(ActiveCycle {
                processed: cycle.processed + 1,
                ..cycle
            });
            if self.creative {
                self.finish(ctx);
            }
        }

        if self.processed() % PROGRESS_SYNC_INTERVAL == 0 {
            self.sync.notify();
        }
    }

    /// Periodic resync, independent of the state machine.
    pub fn heartbeat(&mut self, game_time: Ticks, side: Side) {
        if side == Side::Authoritative && game_time % HEARTBEAT_INTERVAL == 0 {
            self.sync.notify();
        }
    }

    /// What the station would do next, in the same order `tick` checks it.
    pub fn status(&self, recipes: &dyn RecipeResolver) -> StationStatus {
        match self.cycle {
            Some(c) if c.is_ready() => StationStatus::ReadyToFinish,
            Some(c) => StationStatus::Active {
                processed: c.processed,
                max_processed: c.max_processed,
            },
            None => match self.evaluate_start(recipes).check {
                StartCheck::NoInput => StationStatus::Idle,
                StartCheck::Wait(reason) | StartCheck::Reject(reason) => {
                    StationStatus::Waiting(reason)
                }
                StartCheck::Start { .. } => StationStatus::Ready,
            },
        }
    }

    fn evaluate_start(&self, recipes: &dyn RecipeResolver) -> StartEvaluation {
        let gated = self.config.is_energy_gated();
        let wait = |reason| StartEvaluation {
            check: StartCheck::Wait(reason),
            power_cost: None,
        };

        if gated && self.energy.stored() == 0 {
            return wait(WaitReason::NoEnergy);
        }
        let Some(input) = self.input.stack() else {
            return StartEvaluation {
                check: StartCheck::NoInput,
                power_cost: None,
            };
        };
        let Some(mesh) = self.mesh else {
            return StartEvaluation {
                check: StartCheck::Reject(WaitReason::NoSelector),
                power_cost: None,
            };
        };
        let Some(fluid) = self.tank.fluid() else {
            return wait(WaitReason::NoFluid);
        };

        let mut power_cost = None;
        if gated {
            let required = self.power_cost();
            power_cost = Some(required);
            if self.energy.stored() < required {
                return StartEvaluation {
                    check: StartCheck::Wait(WaitReason::InsufficientEnergy {
                        required,
                        stored: self.energy.stored(),
                    }),
                    power_cost,
                };
            }
        }

        let recipe = recipes.resolve(fluid, mesh, input.item_type);
        let model = self.cost_model();
        let fluid_usage = model.fluid_requirement(&recipe);
        let check = if self.tank.amount() < fluid_usage {
            StartCheck::Wait(WaitReason::InsufficientFluid {
                required: fluid_usage,
                available: self.tank.amount(),
            })
        } else if recipe.is_empty() {
            StartCheck::Reject(WaitReason::NoRecipe)
        } else {
            StartCheck::Start {
                max_processed: model.processing_ticks(&recipe),
                fluid_usage,
            }
        };
        StartEvaluation { check, power_cost }
    }

    fn try_start(&mut self, ctx: &mut TickContext<'_>) {
        let evaluation = self.evaluate_start(ctx.recipes);
        if let Some(cost) = evaluation.power_cost {
            self.last_power_cost = cost;
        }

        match evaluation.check {
            StartCheck::NoInput => {}
            StartCheck::Wait(reason) => {
                trace!(pos = ?self.placement.pos, ?reason, "waiting to start");
            }
            StartCheck::Reject(reason) => self.reject_input(reason, ctx),
            StartCheck::Start {
                max_processed,
                fluid_usage,
            } => {
                let Some(input) = self.input.stack().map(|s| s.item_type) else {
                    return;
                };
                self.cycle = Some(ActiveCycle {
                    processed: 0,
                    max_processed,
                    fluid_usage,
                });
                debug!(
                    pos = ?self.placement.pos,
                    ?input,
                    max_processed,
                    fluid_usage,
                    "cycle started"
                );
                self.events.push(StationEvent::CycleStarted {
                    at: self.placement.pos,
                    input,
                    max_processed,
                    fluid_usage,
                    tick: ctx.game_time,
                });
                self.sync.notify();
            }
        }
    }

    fn finish(&mut self, ctx: &mut TickContext<'_>) {
        let Some(cycle) = self.cycle.take() else {
            return;
        };
        let input = self.input.take();

        let outputs = match (&input, self.mesh, self.tank.fluid()) {
            (Some(stack), Some(mesh), Some(fluid)) => {
                let recipe = ctx.recipes.resolve(fluid, mesh, stack.item_type);
                let luck = self.effects.modifier(UpgradeKind::Luck);
                resolve_outputs(&recipe, luck, self.creative, ctx.rng)
            }
            _ => Vec::new(),
        };
        let output_count = outputs.len() as u32;
        for stack in outputs {
            self.eject(stack, ctx);
        }

        let fluid_used = if self.creative {
            0
        } else {
            self.tank.drain(cycle.fluid_usage).map_or(0, |f| f.amount)
        };
        let energy_used = if self.config.is_energy_gated() && !self.creative {
            let cost = self.power_cost();
            self.last_power_cost = cost;
            self.energy.consume(cost)
        } else {
            0
        };

        let input = input.map(|s| s.item_type);
        debug!(
            pos = ?self.placement.pos,
            ?input,
            outputs = output_count,
            fluid_used,
            energy_used,
            "cycle finished"
        );
        self.events.push(StationEvent::CycleFinished {
            at: self.placement.pos,
            input,
            outputs: output_count,
            fluid_used,
            energy_used,
            tick: ctx.game_time,
        });
        self.sync.notify();
    }

    /// Abandon the running cycle and hand the input back. Nothing is debited.
    fn cancel(&mut self, ctx: &mut TickContext<'_>) {
        let input = self.input.take();
        let item = input.as_ref().map(|s| s.item_type);
        if let Some(stack) = input {
            self.eject(stack, ctx);
        }
        self.cycle = None;
        debug!(pos = ?self.placement.pos, input = ?item, "cycle cancelled");
        self.events.push(StationEvent::CycleCancelled {
            at: self.placement.pos,
            input: item,
            tick: ctx.game_time,
        });
        self.sync.notify();
    }

    /// Throw out an input the idle station cannot use.
    fn reject_input(&mut self, reason: WaitReason, ctx: &mut TickContext<'_>) {
        let Some(stack) = self.input.take() else {
            return;
        };
        let item = stack.item_type;
        debug!(pos = ?self.placement.pos, input = ?item, ?reason, "input rejected");
        self.eject(stack, ctx);
        self.events.push(StationEvent::InputRejected {
            at: self.placement.pos,
            input: item,
            tick: ctx.game_time,
        });
        self.sync.notify();
    }

    fn eject(&mut self, stack: ItemStack, ctx: &mut TickContext<'_>) {
        let route = EjectRoute {
            placement: self.placement,
            auto_output: self.config.allows_io,
            despawn_ticks: self.config.tier.despawn_ticks(),
        };
        let item_type = stack.item_type;
        let outcome = eject_stack(&mut *ctx.world, &mut *ctx.rng, &route, stack);
        if route.auto_output && outcome.dropped > 0 {
            warn!(
                pos = ?self.placement.pos,
                ?item_type,
                dropped = outcome.dropped,
                "output container missing or full, dropping items"
            );
        }
        self.events.push(StationEvent::ItemEjected {
            at: self.placement.pos,
            item_type,
            delivered: outcome.delivered,
            dropped: outcome.dropped,
            tick: ctx.game_time,
        });
    }

    // -- Interaction --

    /// Hand the station one item directly. Accepted only into an empty slot,
    /// with a mesh installed that takes the item.
    pub fn accept_input(&mut self, item_type: ItemTypeId, recipes: &dyn RecipeResolver) -> bool {
        let Some(mesh) = self.mesh else {
            return false;
        };
        if !self.input.is_empty() || !recipes.accepts_input(mesh, item_type) {
            return false;
        }
        if self.input.insert(ItemStack::one(item_type)).is_some() {
            return false;
        }
        self.sync.mark_dirty();
        true
    }

    /// Pour fluid straight into the tank, ignoring the tier's automation
    /// flags. Returns the amount accepted.
    pub fn fill_fluid(&mut self, stack: &FluidStack, simulate: bool) -> u32 {
        let accepted = self.tank.fill(stack, simulate);
        if accepted > 0 && !simulate {
            self.sync.mark_dirty();
        }
        accepted
    }

    fn check_mesh(&self, mesh: Mesh) -> Result<(), StationError> {
        if self.config.tier.accepts_mesh(mesh) {
            Ok(())
        } else {
            Err(StationError::SelectorNotAllowed {
                mesh,
                tier: self.config.tier,
            })
        }
    }

    /// Swap the installed mesh. Returns the mesh that was installed before,
    /// for the caller to hand back; swapping in the same mesh returns it
    /// unchanged.
    ///
    /// A held input the new mesh does not take is thrown out at once.
    /// Removing the mesh leaves a running cycle to be cancelled by the next
    /// tick.
    pub fn change_selector(
        &mut self,
        mesh: Option<Mesh>,
        ctx: &mut TickContext<'_>,
    ) -> Result<Option<Mesh>, StationError> {
        if let Some(m) = mesh {
            self.check_mesh(m)?;
        }
        if mesh == self.mesh {
            return Ok(mesh);
        }

        let previous = std::mem::replace(&mut self.mesh, mesh);
        self.sync.notify();

        if let Some(new) = mesh
            && let Some(held) = self.input.stack().map(|s| s.item_type)
            && !ctx.recipes.accepts_input(new, held)
        {
            if self.cycle.is_some() {
                self.cancel(ctx);
            } else {
                self.reject_input(WaitReason::NoRecipe, ctx);
            }
        }
        Ok(previous)
    }

    // -- Upgrades --

    /// Insert upgrades into an explicit container slot. Returns the overflow.
    pub fn insert_upgrade(
        &mut self,
        slot: usize,
        kind: UpgradeKind,
        quantity: u32,
    ) -> Result<u32, StationError> {
        if !self.config.upgradeable {
            return Err(UpgradeError::NotUpgradeable.into());
        }
        let overflow = self.upgrades.insert_into_slot(slot, kind, quantity)?;
        self.refresh_effects();
        Ok(overflow)
    }

    /// Insert upgrades into the slot their kind belongs in.
    pub fn install_upgrade(&mut self, kind: UpgradeKind, quantity: u32) -> Result<u32, StationError> {
        self.insert_upgrade(kind.slot_index(), kind, quantity)
    }

    /// Remove up to `quantity` upgrades of `kind`. Returns the amount removed.
    pub fn extract_upgrade(&mut self, kind: UpgradeKind, quantity: u32) -> u32 {
        let removed = self.upgrades.extract(kind, quantity);
        if removed > 0 {
            self.refresh_effects();
        }
        removed
    }

    pub(crate) fn refresh_effects(&mut self) {
        self.effects =
            UpgradeEffects::from_inventory(&self.upgrades, self.global.max_upgrade_stack_size);
        self.sync.mark_dirty();
    }

    // -- Automation handlers --

    /// Item automation, on tiers that allow it.
    pub fn item_handler(&mut self) -> Option<ItemHandler<'_>> {
        if self.config.allows_io {
            Some(ItemHandler { station: self })
        } else {
            None
        }
    }

    /// Fluid automation, on tiers that allow it.
    pub fn fluid_handler(&mut self) -> Option<FluidHandler<'_>> {
        if self.config.allows_tank {
            Some(FluidHandler { station: self })
        } else {
            None
        }
    }

    /// Energy input, on energy-gated tiers.
    pub fn energy_handler(&mut self) -> Option<EnergyHandler<'_>> {
        if self.config.is_energy_gated() {
            Some(EnergyHandler { station: self })
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Automated access to the input slot. Insertion only.
pub struct ItemHandler<'a> {
    station: &'a mut Station,
}

impl ItemHandler<'_> {
    pub fn slot_limit(&self) -> u32 {
        self.station.input.limit()
    }

    pub fn stack(&self) -> Option<&ItemStack> {
        self.station.input.stack()
    }

    /// Insert as much of `stack` as fits. Returns the remainder.
    pub fn insert(
        &mut self,
        stack: ItemStack,
        recipes: &dyn RecipeResolver,
        simulate: bool,
    ) -> ItemStack {
        let Some(mesh) = self.station.mesh else {
            return stack;
        };
        if stack.is_empty() || !recipes.accepts_input(mesh, stack.item_type) {
            return stack;
        }
        let mut slot = self.station.input.clone();
        let remainder = slot
            .insert(stack.clone())
            .unwrap_or_else(|| stack.with_quantity(0));
        if !simulate && remainder.quantity < stack.quantity {
            self.station.input = slot;
            self.station.sync.mark_dirty();
        }
        remainder
    }

    /// Automation can never pull the input back out.
    pub fn extract(&mut self, _quantity: u32) -> Option<ItemStack> {
        None
    }
}

/// Automated access to the tank. Fill only.
pub struct FluidHandler<'a> {
    station: &'a mut Station,
}

impl FluidHandler<'_> {
    pub fn fluid(&self) -> Option<FluidId> {
        self.station.tank.fluid()
    }

    pub fn amount(&self) -> u32 {
        self.station.tank.amount()
    }

    pub fn capacity(&self) -> u32 {
        self.station.tank.capacity()
    }

    pub fn fill(&mut self, stack: &FluidStack, simulate: bool) -> u32 {
        self.station.fill_fluid(stack, simulate)
    }
}

/// Energy input. Receive only.
pub struct EnergyHandler<'a> {
    station: &'a mut Station,
}

impl EnergyHandler<'_> {
    pub fn stored(&self) -> u32 {
        self.station.energy.stored()
    }

    pub fn capacity(&self) -> u32 {
        self.station.energy.capacity()
    }

    pub fn receive(&mut self, amount: u32, simulate: bool) -> u32 {
        let accepted = self.station.energy.receive(amount, simulate);
        if accepted > 0 && !simulate {
            self.station.sync.mark_dirty();
        }
        accepted
    }

    pub fn extract(&mut self, _amount: u32) -> u32 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[test]
    fn new_station_is_idle() {
        let table = scenario_table();
        let station = station(Tier::Diamond, Some(Mesh::Iron));
        assert!(station.cycle().is_none());
        assert_eq!(station.processed(), 0);
        assert_eq!(station.status(&table), StationStatus::Idle);
        assert_eq!(station.energy().capacity(), 0);
    }

    #[test]
    fn scenario_start_reserves_budgets() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));

        rig.tick();
        assert_eq!(rig.station.max_processed(), Some(100));
        assert_eq!(rig.station.fluid_usage(), Some(50));
        assert_eq!(rig.station.processed(), 0);
        assert_eq!(rig.station.tank().amount(), 5000);
    }

    #[test]
    fn scenario_full_cycle_debits_fluid_and_clears_slot() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));

        rig.tick(); // start
        for _ in 0..100 {
            rig.tick();
        }
        assert_eq!(rig.station.status(&rig.recipes), StationStatus::ReadyToFinish);
        rig.tick(); // finish

        assert!(rig.station.input().is_none());
        assert!(rig.station.cycle().is_none());
        assert_eq!(rig.station.tank().amount(), 4950);
        let produced: u32 = rig.delivered_total();
        assert!(produced <= 3);
        for item in rig.delivered_types() {
            assert!(item == nugget() || item == flint(), "unexpected {item:?}");
        }
    }

    #[test]
    fn insufficient_fluid_waits() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(30), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));

        for _ in 0..20 {
            rig.tick();
            assert!(rig.station.cycle().is_none());
        }
        assert_eq!(
            rig.station.status(&rig.recipes),
            StationStatus::Waiting(WaitReason::InsufficientFluid {
                required: 50,
                available: 30
            })
        );

        rig.station.fill_fluid(&water(20), false);
        rig.tick();
        assert!(rig.station.cycle().is_some());
    }

    #[test]
    fn no_mesh_ejects_held_input() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));
        rig.station.mesh = None;

        rig.tick();
        assert!(rig.station.input().is_none());
        assert_eq!(rig.delivered_total(), 1);
    }

    #[test]
    fn unknown_recipe_ejects_after_fluid_floor() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&lava(100), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));

        rig.tick();
        assert!(rig.station.input().is_none());
        assert!(rig.station.cycle().is_none());
        assert_eq!(rig.station.tank().amount(), 100);
        assert!(rig
            .station
            .events()
            .iter()
            .any(|e| matches!(e, StationEvent::InputRejected { .. })));
    }

    #[test]
    fn accept_input_rules() {
        let table = scenario_table();
        let mut s = station(Tier::Diamond, None);
        assert!(!s.accept_input(gravel(), &table), "no mesh");
        s.mesh = Some(Mesh::Iron);
        assert!(!s.accept_input(nugget(), &table), "not an input");
        assert!(s.accept_input(gravel(), &table));
        assert!(!s.accept_input(gravel(), &table), "slot full");
    }

    #[test]
    fn cancel_restores_input_and_reservoirs() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));
        rig.tick();
        for _ in 0..10 {
            rig.tick();
        }
        assert_eq!(rig.station.processed(), 10);

        rig.station.mesh = None;
        rig.tick();

        assert!(rig.station.cycle().is_none());
        assert_eq!(rig.station.tank().amount(), 5000);
        assert_eq!(rig.delivered_types(), vec![gravel()]);
        assert_eq!(rig.delivered_total(), 1);
    }

    #[test]
    fn creative_finishes_on_first_advance() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.set_creative(true);
        rig.station.fill_fluid(&water(100), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));

        rig.tick(); // start
        rig.tick(); // advance + finish
        assert!(rig.station.cycle().is_none());
        assert_eq!(rig.station.tank().amount(), 100);
        // Every candidate, no cap.
        let mut types = rig.delivered_types();
        types.sort();
        assert_eq!(types, vec![nugget(), flint()]);
    }

    #[test]
    fn energy_gate_blocks_until_charged() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Empowered, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));

        rig.tick();
        assert!(rig.station.cycle().is_none());
        assert_eq!(
            rig.station.status(&rig.recipes),
            StationStatus::Waiting(WaitReason::NoEnergy)
        );

        let cost = rig.station.power_cost();
        let Some(mut energy) = rig.station.energy_handler() else {
            panic!("empowered tier exposes energy");
        };
        energy.receive(cost - 1, false);
        rig.tick();
        assert!(rig.station.cycle().is_none());
        assert_eq!(rig.station.last_power_cost(), cost);

        rig.station.energy.receive(1, false);
        rig.tick();
        assert!(rig.station.cycle().is_some());
    }

    #[test]
    fn energy_gated_cycle_charges_power_cost() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Empowered, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        rig.station.install_upgrade(UpgradeKind::Speed, 2).unwrap();
        let cost = rig.station.power_cost();
        assert!(cost > rig.station.config().energy_cost_per_use);
        rig.station.energy.receive(cost * 3, false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));

        rig.run_until_idle(500);
        assert_eq!(rig.station.energy().stored(), cost * 2);
        assert_eq!(rig.station.tank().amount(), 4950);
    }

    #[test]
    fn progress_never_exceeds_max() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));
        for _ in 0..150 {
            rig.tick();
            if let Some(c) = rig.station.cycle() {
                assert!(c.max_processed >= 1);
                assert!(c.processed <= c.max_processed);
            }
        }
    }

    #[test]
    fn observer_side_is_inert() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));
        rig.side = Side::Observer;
        rig.tick();
        assert!(rig.station.cycle().is_none());
        rig.station.heartbeat(0, Side::Observer);
        assert_eq!(rig.station.sync().pending_updates(), 0);
    }

    #[test]
    fn heartbeat_every_ten_ticks() {
        let mut s = station(Tier::Oak, None);
        for t in 0..30 {
            s.heartbeat(t, Side::Authoritative);
        }
        assert_eq!(s.sync().pending_updates(), 3);
    }

    #[test]
    fn blazing_mesh_rejected_below_empowered() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        let err = rig.change_selector(Some(Mesh::Blazing)).unwrap_err();
        assert_eq!(
            err,
            StationError::SelectorNotAllowed {
                mesh: Mesh::Blazing,
                tier: Tier::Diamond
            }
        );
        assert_eq!(rig.station.mesh(), Some(Mesh::Iron));
    }

    #[test]
    fn change_selector_returns_previous() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        assert_eq!(rig.change_selector(Some(Mesh::Cloth)), Ok(Some(Mesh::Iron)));
        assert_eq!(rig.change_selector(Some(Mesh::Cloth)), Ok(Some(Mesh::Cloth)));
        assert_eq!(rig.change_selector(None), Ok(Some(Mesh::Cloth)));
        assert_eq!(rig.station.mesh(), None);
    }

    #[test]
    fn change_selector_ejects_unaccepted_input() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));
        rig.tick();
        assert!(rig.station.cycle().is_some());

        // Gravel has no diamond-mesh recipe in the fixture table.
        rig.change_selector(Some(Mesh::Diamond)).unwrap();
        assert!(rig.station.cycle().is_none());
        assert!(rig.station.input().is_none());
        assert_eq!(rig.station.tank().amount(), 5000);
        assert_eq!(rig.delivered_types(), vec![gravel()]);
    }

    #[test]
    fn upgrades_refused_on_plain_tiers() {
        let mut s = station(Tier::Netherite, None);
        assert_eq!(
            s.install_upgrade(UpgradeKind::Luck, 1),
            Err(StationError::Upgrade(UpgradeError::NotUpgradeable))
        );
    }

    #[test]
    fn upgrade_changes_rebuild_effects() {
        let mut s = station(Tier::Empowered, None);
        assert_eq!(s.install_upgrade(UpgradeKind::Speed, 30), Ok(0));
        assert_eq!(s.effects().installed(UpgradeKind::Speed), 18);
        assert_eq!(
            s.insert_upgrade(0, UpgradeKind::Speed, 1),
            Err(StationError::Upgrade(UpgradeError::WrongSlot {
                kind: UpgradeKind::Speed,
                slot: 0,
                expected: 2
            }))
        );
        assert_eq!(s.extract_upgrade(UpgradeKind::Speed, 25), 25);
        assert_eq!(s.effects().installed(UpgradeKind::Speed), 5);
        assert!(s.sync().is_dirty());
    }

    #[test]
    fn handlers_follow_tier_flags() {
        let mut oak = station(Tier::Oak, None);
        assert!(oak.item_handler().is_none());
        assert!(oak.fluid_handler().is_none());
        assert!(oak.energy_handler().is_none());

        let mut iron = station(Tier::Iron, None);
        assert!(iron.item_handler().is_some());
        assert!(iron.fluid_handler().is_some());
        assert!(iron.energy_handler().is_none());

        let mut empowered = station(Tier::Empowered, None);
        assert!(empowered.energy_handler().is_some());
    }

    #[test]
    fn item_handler_inserts_one_and_never_extracts() {
        let table = scenario_table();
        let mut s = station(Tier::Iron, Some(Mesh::Iron));
        let Some(mut handler) = s.item_handler() else {
            panic!("iron allows item io");
        };
        assert_eq!(handler.slot_limit(), INPUT_SLOT_LIMIT);
        let rest = handler.insert(ItemStack::new(gravel(), 5), &table, true);
        assert_eq!(rest.quantity, 4);
        assert!(handler.stack().is_none(), "simulate must not insert");

        let rest = handler.insert(ItemStack::new(gravel(), 5), &table, false);
        assert_eq!(rest.quantity, 4);
        assert_eq!(handler.extract(1), None);
        let rest = handler.insert(ItemStack::new(nugget(), 1), &table, false);
        assert_eq!(rest.quantity, 1);
        assert_eq!(s.input(), Some(&ItemStack::one(gravel())));
    }

    #[test]
    fn progress_sync_every_four_ticks() {
        let table = scenario_table();
        let mut rig = Rig::new(station(Tier::Diamond, Some(Mesh::Iron)), table);
        rig.station.fill_fluid(&water(5000), false);
        assert!(rig.station.accept_input(gravel(), &rig.recipes));
        rig.tick();
        rig.station.sync_mut().take_updates();
        for _ in 0..8 {
            rig.tick();
        }
        assert_eq!(rig.station.sync().pending_updates(), 2);
    }
}

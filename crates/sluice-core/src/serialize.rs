//! Station persistence.
//!
//! [`StationRecord`] is the stable, field-named layout of a station's state.
//! [`encode_station`] wraps a record in a versioned `bitcode` envelope;
//! [`decode_station`] checks the header, validates the cycle invariants and
//! rebuilds the station, recomputing the upgrade effect cache from the
//! container.

use crate::item::{FluidStack, ItemStack};
use crate::mesh::Mesh;
use crate::placement::Placement;
use crate::station::{ActiveCycle, Station};
use crate::tier::{GlobalConfig, TierConfig};
use crate::upgrade::UpgradeInventory;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a serialized station.
pub const SNAPSHOT_MAGIC: u32 = 0x51C3_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

/// Sentinel for "no cycle" in `MaxProcessed` and `FluidUsage`.
pub const IDLE_SENTINEL: i32 = -1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error(
        "inconsistent cycle state: processed {processed}, max processed {max_processed}, fluid usage {fluid_usage}"
    )]
    InconsistentCycle {
        processed: i32,
        max_processed: i32,
        fluid_usage: i32,
    },
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Prepended to every encoded station for format detection and version
/// checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Game tick at which the snapshot was taken.
    pub tick: u64,
}

impl SnapshotHeader {
    pub fn new(tick: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            tick,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Persisted station state. Cycle fields use `-1` for "idle".
///
/// `Upgrades` is only written for upgrade-capable tiers and `Energy` only for
/// energy-gated tiers; both are ignored on restore for other tiers.
/// `isCreative` is only written for unlimited stations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationRecord {
    #[serde(rename = "Inventory")]
    pub inventory: Option<ItemStack>,
    #[serde(rename = "Fluid")]
    pub fluid: Option<FluidStack>,
    #[serde(rename = "Processed")]
    pub processed: i32,
    #[serde(rename = "MaxProcessed")]
    pub max_processed: i32,
    #[serde(rename = "FluidUsage")]
    pub fluid_usage: i32,
    #[serde(rename = "LastPowerCost")]
    pub last_power_cost: u32,
    #[serde(rename = "Upgrades", default)]
    pub upgrades: Option<[u32; 3]>,
    #[serde(rename = "Energy", default)]
    pub energy: Option<u32>,
    #[serde(rename = "isCreative", default)]
    pub is_creative: Option<bool>,
    #[serde(rename = "Mesh", default)]
    pub mesh: Option<Mesh>,
}

fn to_i32(v: u32) -> i32 {
    i32::try_from(v).unwrap_or(i32::MAX)
}

impl Station {
    /// Snapshot the persisted state.
    pub fn record(&self) -> StationRecord {
        let (processed, max_processed, fluid_usage) = match self.cycle {
            Some(c) => (
                to_i32(c.processed),
                to_i32(c.max_processed),
                to_i32(c.fluid_usage),
            ),
            None => (0, IDLE_SENTINEL, IDLE_SENTINEL),
        };
        StationRecord {
            inventory: self.input.stack().cloned(),
            fluid: self.tank.contents().cloned(),
            processed,
            max_processed,
            fluid_usage,
            last_power_cost: self.last_power_cost,
            upgrades: self.config.upgradeable.then(|| self.upgrades.slots()),
            energy: self.config.is_energy_gated().then(|| self.energy.stored()),
            is_creative: self.creative.then_some(true),
            mesh: self.mesh,
        }
    }

    /// Rebuild a station from a record. Fluid and energy amounts above the
    /// tier's capacities are clamped; an impossible cycle is an error.
    pub fn restore(
        config: TierConfig,
        global: GlobalConfig,
        placement: Placement,
        record: &StationRecord,
    ) -> Result<Self, DeserializeError> {
        let cycle = restore_cycle(record)?;

        let mut station = Station::new(config, global, placement);
        station.input.set(record.inventory.clone());
        station.tank.set_contents(record.fluid.clone());
        station.cycle = cycle;
        station.last_power_cost = record.last_power_cost;
        station.creative = record.is_creative.unwrap_or(false);
        station.mesh = record
            .mesh
            .filter(|m| station.config.tier.accepts_mesh(*m));

        if station.config.is_energy_gated()
            && let Some(stored) = record.energy
        {
            station.energy.set_stored(stored);
        }
        if station.config.upgradeable
            && let Some(slots) = record.upgrades
        {
            station.upgrades = UpgradeInventory::from_slots(slots);
        }
        station.refresh_effects();
        station.sync.mark_clean();
        Ok(station)
    }
}

fn restore_cycle(record: &StationRecord) -> Result<Option<ActiveCycle>, DeserializeError> {
    let inconsistent = || DeserializeError::InconsistentCycle {
        processed: record.processed,
        max_processed: record.max_processed,
        fluid_usage: record.fluid_usage,
    };

    match (record.max_processed, record.fluid_usage) {
        (IDLE_SENTINEL, IDLE_SENTINEL) if record.processed == 0 => Ok(None),
        (max, usage) if max >= 1 && usage >= 0 => {
            let processed = u32::try_from(record.processed).map_err(|_| inconsistent())?;
            let max_processed = max as u32;
            if processed > max_processed {
                return Err(inconsistent());
            }
            Ok(Some(ActiveCycle {
                processed,
                max_processed,
                fluid_usage: usage as u32,
            }))
        }
        _ => Err(inconsistent()),
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct StationSnapshot {
    header: SnapshotHeader,
    record: StationRecord,
}

/// Encode `station` behind a header stamped with `tick`.
pub fn encode_station(station: &Station, tick: u64) -> Result<Vec<u8>, SerializeError> {
    let snapshot = StationSnapshot {
        header: SnapshotHeader::new(tick),
        record: station.record(),
    };
    bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
}

/// Decode only the record, after checking the header.
pub fn decode_record(data: &[u8]) -> Result<(SnapshotHeader, StationRecord), DeserializeError> {
    let snapshot: StationSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    snapshot.header.validate()?;
    Ok((snapshot.header, snapshot.record))
}

/// Decode and rebuild a station of the given configuration.
pub fn decode_station(
    data: &[u8],
    config: TierConfig,
    global: GlobalConfig,
    placement: Placement,
) -> Result<(SnapshotHeader, Station), DeserializeError> {
    let (header, record) = decode_record(data)?;
    let station = Station::restore(config, global, placement, &record)?;
    Ok((header, station))
}

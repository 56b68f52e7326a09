//! Station events with a pre-allocated ring buffer.
//!
//! A station records what it did during a tick into its [`EventBuffer`];
//! the host drains the buffer whenever it likes. When the buffer is full the
//! oldest events are dropped and counted.

use crate::fixed::Ticks;
use crate::id::ItemTypeId;
use crate::placement::BlockPos;

/// Default number of events a station keeps before overwriting.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Something a station did. All events carry the station position and the
/// game tick at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StationEvent {
    CycleStarted {
        at: BlockPos,
        input: ItemTypeId,
        max_processed: u32,
        fluid_usage: u32,
        tick: Ticks,
    },
    CycleFinished {
        at: BlockPos,
        input: Option<ItemTypeId>,
        outputs: u32,
        fluid_used: u32,
        energy_used: u32,
        tick: Ticks,
    },
    /// A running cycle was abandoned and its input handed back.
    CycleCancelled {
        at: BlockPos,
        input: Option<ItemTypeId>,
        tick: Ticks,
    },
    /// An idle station threw out an input it cannot process.
    InputRejected {
        at: BlockPos,
        input: ItemTypeId,
        tick: Ticks,
    },
    /// A stack left the station. `delivered` went into a container,
    /// `dropped` was spawned in the world.
    ItemEjected {
        at: BlockPos,
        item_type: ItemTypeId,
        delivered: u32,
        dropped: u32,
        tick: Ticks,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationEventKind {
    CycleStarted,
    CycleFinished,
    CycleCancelled,
    InputRejected,
    ItemEjected,
}

impl StationEvent {
    pub fn kind(&self) -> StationEventKind {
        match self {
            StationEvent::CycleStarted { .. } => StationEventKind::CycleStarted,
            StationEvent::CycleFinished { .. } => StationEventKind::CycleFinished,
            StationEvent::CycleCancelled { .. } => StationEventKind::CycleCancelled,
            StationEvent::InputRejected { .. } => StationEventKind::InputRejected,
            StationEvent::ItemEjected { .. } => StationEventKind::ItemEjected,
        }
    }

    pub fn tick(&self) -> Ticks {
        match self {
            StationEvent::CycleStarted { tick, .. }
            | StationEvent::CycleFinished { tick, .. }
            | StationEvent::CycleCancelled { tick, .. }
            | StationEvent::InputRejected { tick, .. }
            | StationEvent::ItemEjected { tick, .. } => *tick,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBuffer
// ---------------------------------------------------------------------------

/// Fixed-capacity ring buffer; when full, the oldest event is overwritten.
#[derive(Debug, Clone)]
pub struct EventBuffer {
    events: Vec<Option<StationEvent>>,
    /// Next write position.
    head: usize,
    len: usize,
    total_written: u64,
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBuffer {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
        }
    }

    pub fn push(&mut self, event: StationEvent) {
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        if self.len < self.capacity() {
            self.len += 1;
        }
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Total events written since creation, dropped ones included.
    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    pub fn dropped_count(&self) -> u64 {
        self.total_written.saturating_sub(self.capacity() as u64)
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &StationEvent> + '_ {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        (0..self.len).filter_map(move |i| self.events[(start + i) % self.capacity()].as_ref())
    }

    /// Remove and return every stored event, oldest first.
    pub fn drain(&mut self) -> Vec<StationEvent> {
        let start = if self.len < self.capacity() { 0 } else { self.head };
        let cap = self.capacity();
        let out = (0..self.len)
            .filter_map(|i| self.events[(start + i) % cap].take())
            .collect();
        self.head = 0;
        self.len = 0;
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rejected(tick: Ticks) -> StationEvent {
        StationEvent::InputRejected {
            at: BlockPos::new(0, 0, 0),
            input: ItemTypeId(0),
            tick,
        }
    }

    #[test]
    fn push_and_iterate_in_order() {
        let mut buf = EventBuffer::new(4);
        for t in 0..3 {
            buf.push(rejected(t));
        }
        let ticks: Vec<Ticks> = buf.iter().map(StationEvent::tick).collect();
        assert_eq!(ticks, vec![0, 1, 2]);
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.dropped_count(), 0);
    }

    #[test]
    fn overflow_drops_oldest() {
        let mut buf = EventBuffer::new(3);
        for t in 0..5 {
            buf.push(rejected(t));
        }
        let ticks: Vec<Ticks> = buf.iter().map(StationEvent::tick).collect();
        assert_eq!(ticks, vec![2, 3, 4]);
        assert_eq!(buf.total_written(), 5);
        assert_eq!(buf.dropped_count(), 2);
    }

    #[test]
    fn drain_empties_buffer() {
        let mut buf = EventBuffer::new(2);
        for t in 0..3 {
            buf.push(rejected(t));
        }
        let drained = buf.drain();
        assert_eq!(drained.iter().map(StationEvent::tick).collect::<Vec<_>>(), vec![1, 2]);
        assert!(buf.is_empty());
        buf.push(rejected(9));
        assert_eq!(buf.iter().count(), 1);
    }

    #[test]
    fn zero_capacity_clamped() {
        let buf = EventBuffer::new(0);
        assert_eq!(buf.capacity(), 1);
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(rejected(0).kind(), StationEventKind::InputRejected);
    }
}

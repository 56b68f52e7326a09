/// Tracks whether a station needs saving and how many observer resyncs are
/// owed since the host last drained it.
///
/// The station only ever sets flags here; clearing is the host's job, via
/// [`mark_clean`](SyncTracker::mark_clean) after persisting and
/// [`take_updates`](SyncTracker::take_updates) after pushing state out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncTracker {
    dirty: bool,
    pending_updates: u32,
}

impl SyncTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Persistence should save this station.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Observers should receive a fresh copy of the state. Also marks dirty.
    pub fn notify(&mut self) {
        self.dirty = true;
        self.pending_updates = self.pending_updates.saturating_add(1);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn pending_updates(&self) -> u32 {
        self.pending_updates
    }

    /// Drain the pending resync count.
    pub fn take_updates(&mut self) -> u32 {
        std::mem::take(&mut self.pending_updates)
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracker_initially_clean() {
        let tracker = SyncTracker::new();
        assert!(!tracker.is_dirty());
        assert_eq!(tracker.pending_updates(), 0);
    }

    #[test]
    fn notify_implies_dirty() {
        let mut tracker = SyncTracker::new();
        tracker.notify();
        tracker.notify();
        assert!(tracker.is_dirty());
        assert_eq!(tracker.pending_updates(), 2);
    }

    #[test]
    fn mark_dirty_does_not_queue_update() {
        let mut tracker = SyncTracker::new();
        tracker.mark_dirty();
        assert!(tracker.is_dirty());
        assert_eq!(tracker.pending_updates(), 0);
    }

    #[test]
    fn draining_is_independent_of_clean() {
        let mut tracker = SyncTracker::new();
        tracker.notify();
        assert_eq!(tracker.take_updates(), 1);
        assert_eq!(tracker.take_updates(), 0);
        // Still dirty until persisted.
        assert!(tracker.is_dirty());
        tracker.mark_clean();
        assert!(!tracker.is_dirty());
    }
}

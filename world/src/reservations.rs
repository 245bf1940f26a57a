//! Set of target uids claimed by in-flight projectiles.

use std::collections::BTreeSet;

use slot_volley_core::TargetUid;

/// Tracks which targets currently have a projectile committed to them.
#[derive(Debug, Default)]
pub(crate) struct ReservationSet {
    reserved: BTreeSet<TargetUid>,
}

impl ReservationSet {
    /// Creates an empty reservation set.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Claims the uid. Returns `false` when it was already claimed.
    pub(crate) fn reserve(&mut self, uid: TargetUid) -> bool {
        self.reserved.insert(uid)
    }

    /// Releases the uid. Releasing an unclaimed uid is a no-op.
    pub(crate) fn release(&mut self, uid: TargetUid) -> bool {
        self.reserved.remove(&uid)
    }

    pub(crate) fn contains(&self, uid: TargetUid) -> bool {
        self.reserved.contains(&uid)
    }

    pub(crate) fn len(&self) -> usize {
        self.reserved.len()
    }

    pub(crate) fn clear(&mut self) {
        self.reserved.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_reservation_is_refused() {
        let mut set = ReservationSet::new();
        assert!(set.reserve(TargetUid::new(7)));
        assert!(!set.reserve(TargetUid::new(7)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn release_twice_equals_release_once() {
        let mut set = ReservationSet::new();
        let _ = set.reserve(TargetUid::new(3));
        assert!(set.release(TargetUid::new(3)));
        assert!(!set.release(TargetUid::new(3)));
        assert!(!set.contains(TargetUid::new(3)));
        assert_eq!(set.len(), 0);
    }
}

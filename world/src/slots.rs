//! Ordered slot row and its occupancy bookkeeping.

use slot_volley_core::{ShooterId, SlotIndex, SlotSnapshot, SlotState, WorldPoint};
use tracing::error;

#[derive(Clone, Copy, Debug)]
struct Slot {
    anchor: WorldPoint,
    state: SlotState,
}

/// Registry mapping slot indices to the shooter seated there.
#[derive(Debug, Default)]
pub(crate) struct SlotRegistry {
    slots: Vec<Slot>,
}

impl SlotRegistry {
    /// Creates a registry with one empty slot per anchor.
    pub(crate) fn with_anchors(anchors: &[WorldPoint]) -> Self {
        Self {
            slots: anchors
                .iter()
                .map(|anchor| Slot {
                    anchor: *anchor,
                    state: SlotState::Empty,
                })
                .collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn anchor(&self, index: SlotIndex) -> Option<WorldPoint> {
        self.slots.get(index.as_usize()).map(|slot| slot.anchor)
    }

    pub(crate) fn state(&self, index: SlotIndex) -> Option<SlotState> {
        self.slots.get(index.as_usize()).map(|slot| slot.state)
    }

    /// Shooter occupying the slot, if any.
    pub(crate) fn occupant(&self, index: SlotIndex) -> Option<ShooterId> {
        match self.state(index)? {
            SlotState::Occupied(shooter) => Some(shooter),
            SlotState::Empty | SlotState::ReservedForMerge => None,
        }
    }

    /// First empty slot in index order.
    pub(crate) fn leftmost_empty(&self) -> Option<SlotIndex> {
        self.slots
            .iter()
            .position(|slot| slot.state == SlotState::Empty)
            .map(|index| SlotIndex::new(index as u32))
    }

    /// Empty slot whose anchor is closest to `point`; ties go to the lower index.
    pub(crate) fn nearest_empty(&self, point: WorldPoint) -> Option<SlotIndex> {
        let mut best: Option<(usize, f32)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if slot.state != SlotState::Empty {
                continue;
            }
            let distance = slot.anchor.distance_squared(point);
            match best {
                Some((_, best_distance)) if best_distance <= distance => {}
                _ => best = Some((index, distance)),
            }
        }
        best.map(|(index, _)| SlotIndex::new(index as u32))
    }

    /// Seats `shooter` in an empty slot. Returns `false` when the slot is unavailable.
    pub(crate) fn occupy(&mut self, index: SlotIndex, shooter: ShooterId) -> bool {
        let Some(slot) = self.slots.get_mut(index.as_usize()) else {
            return false;
        };
        if slot.state != SlotState::Empty {
            error!(
                slot = index.get(),
                shooter = shooter.get(),
                state = ?slot.state,
                "slot double occupancy"
            );
            debug_assert!(false, "slot {} is not empty", index.get());
            return false;
        }
        slot.state = SlotState::Occupied(shooter);
        true
    }

    /// Clears the slot if `shooter` occupies it.
    pub(crate) fn free_for(&mut self, index: SlotIndex, shooter: ShooterId) -> bool {
        match self.slots.get_mut(index.as_usize()) {
            Some(slot) if slot.state == SlotState::Occupied(shooter) => {
                slot.state = SlotState::Empty;
                true
            }
            _ => false,
        }
    }

    /// Holds the slot for a merge keeper. The slot must already be empty.
    pub(crate) fn reserve_for_merge(&mut self, index: SlotIndex) -> bool {
        match self.slots.get_mut(index.as_usize()) {
            Some(slot) if slot.state == SlotState::Empty => {
                slot.state = SlotState::ReservedForMerge;
                true
            }
            _ => false,
        }
    }

    /// Drops a merge reservation.
    pub(crate) fn release_reservation(&mut self, index: SlotIndex) -> bool {
        match self.slots.get_mut(index.as_usize()) {
            Some(slot) if slot.state == SlotState::ReservedForMerge => {
                slot.state = SlotState::Empty;
                true
            }
            _ => false,
        }
    }

    /// Converts a merge reservation into occupancy by `shooter`.
    pub(crate) fn claim_reservation(&mut self, index: SlotIndex, shooter: ShooterId) -> bool {
        match self.slots.get_mut(index.as_usize()) {
            Some(slot) if slot.state == SlotState::ReservedForMerge => {
                slot.state = SlotState::Occupied(shooter);
                true
            }
            _ => false,
        }
    }

    /// Reports whether no slot is empty. Merge reservations count as full.
    pub(crate) fn all_full(&self) -> bool {
        !self.slots.is_empty()
            && self
                .slots
                .iter()
                .all(|slot| slot.state != SlotState::Empty)
    }

    pub(crate) fn snapshots(&self) -> Vec<SlotSnapshot> {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| SlotSnapshot {
                index: SlotIndex::new(index as u32),
                anchor: slot.anchor,
                state: slot.state,
            })
            .collect()
    }
}

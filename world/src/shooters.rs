//! Authoritative shooter storage and identifier allocation.

use std::collections::BTreeMap;

use slot_volley_core::{ColorToken, ShooterId, ShooterSnapshot, SlotIndex, WorldPoint};

/// State of a shooter stored inside the world.
#[derive(Clone, Debug)]
pub(crate) struct Shooter {
    pub(crate) id: ShooterId,
    pub(crate) color: ColorToken,
    pub(crate) ammo: u32,
    pub(crate) slot: Option<SlotIndex>,
    pub(crate) seated: bool,
    pub(crate) merge_locked: bool,
    pub(crate) depleted: bool,
    /// Last resting position, used as the origin of the next motion.
    pub(crate) position: WorldPoint,
}

impl Shooter {
    /// Reports whether the shooter may fire right now.
    pub(crate) fn ready(&self) -> bool {
        self.slot.is_some() && self.seated && !self.merge_locked && self.ammo > 0
    }

    fn snapshot(&self) -> ShooterSnapshot {
        ShooterSnapshot {
            id: self.id,
            color: self.color.clone(),
            ammo: self.ammo,
            slot: self.slot,
            seated: self.seated,
            merge_locked: self.merge_locked,
        }
    }
}

/// Registry that stores shooters and allocates identifiers.
#[derive(Debug)]
pub(crate) struct ShooterRoster {
    entries: BTreeMap<ShooterId, Shooter>,
    next_id: u32,
}

impl ShooterRoster {
    /// Creates an empty roster whose identifiers start at 1.
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Allocates a new unseated shooter in the provided slot.
    pub(crate) fn spawn(
        &mut self,
        color: ColorToken,
        ammo: u32,
        slot: SlotIndex,
        position: WorldPoint,
    ) -> ShooterId {
        let id = ShooterId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        let _ = self.entries.insert(
            id,
            Shooter {
                id,
                color,
                ammo,
                slot: Some(slot),
                seated: false,
                merge_locked: false,
                depleted: ammo == 0,
                position,
            },
        );
        id
    }

    pub(crate) fn get(&self, id: ShooterId) -> Option<&Shooter> {
        self.entries.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: ShooterId) -> Option<&mut Shooter> {
        self.entries.get_mut(&id)
    }

    pub(crate) fn remove(&mut self, id: ShooterId) -> Option<Shooter> {
        self.entries.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Shooter> {
        self.entries.values()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    pub(crate) fn snapshots(&self) -> Vec<ShooterSnapshot> {
        self.entries.values().map(Shooter::snapshot).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_volley_core::ColorCode;

    #[test]
    fn identifiers_are_never_reused() {
        let mut roster = ShooterRoster::new();
        let red = ColorToken::from(ColorCode::Red);
        let first = roster.spawn(red.clone(), 2, SlotIndex::new(0), WorldPoint::default());
        let _ = roster.remove(first);
        let second = roster.spawn(red, 2, SlotIndex::new(0), WorldPoint::default());
        assert_eq!(first, ShooterId::new(1));
        assert_eq!(second, ShooterId::new(2));
    }

    #[test]
    fn fresh_shooters_are_not_ready_until_seated() {
        let mut roster = ShooterRoster::new();
        let id = roster.spawn(
            ColorToken::from(ColorCode::Blue),
            4,
            SlotIndex::new(1),
            WorldPoint::default(),
        );
        assert!(!roster.get(id).expect("spawned").ready());
        roster.get_mut(id).expect("spawned").seated = true;
        assert!(roster.get(id).expect("spawned").ready());
        assert_eq!(roster.snapshots()[0].slot, Some(SlotIndex::new(1)));
    }
}

#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that detects three same-color shooters and asks the world to merge them.

use std::collections::BTreeMap;

use slot_volley_core::{ColorCode, Command, ShooterId, ShooterView};
use tracing::debug;

/// Number of same-color shooters that collapse into one keeper.
pub const MERGE_SIZE: usize = 3;

/// Merge detector that reuses its grouping buffers between scans.
#[derive(Debug, Default)]
pub struct MergeDetector {
    groups: BTreeMap<ColorCode, Vec<ShooterId>>,
}

impl MergeDetector {
    /// Creates a detector with empty scratch buffers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans ready shooters in slot order and emits [`Command::BeginMerge`] for
    /// the first color that reaches three members.
    ///
    /// Nothing is emitted while another merge is pending. Returns whether a
    /// merge was requested.
    pub fn handle(
        &mut self,
        shooters: &ShooterView,
        merge_pending: bool,
        out: &mut Vec<Command>,
    ) -> bool {
        if merge_pending {
            return false;
        }

        for group in self.groups.values_mut() {
            group.clear();
        }

        for shooter in shooters.iter() {
            if !shooter.can_fire() {
                continue;
            }
            let Some(color) = shooter.color.code() else {
                continue;
            };
            let group = self.groups.entry(color).or_default();
            group.push(shooter.id);
            if group.len() == MERGE_SIZE {
                debug!(color = %color, "merge trio detected");
                out.push(Command::BeginMerge {
                    members: [group[0], group[1], group[2]],
                });
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_volley_core::{ColorToken, ShooterSnapshot, SlotIndex};

    fn shooter(id: u32, slot: u32, color: ColorCode) -> ShooterSnapshot {
        ShooterSnapshot {
            id: ShooterId::new(id),
            color: ColorToken::from(color),
            ammo: 4,
            slot: Some(SlotIndex::new(slot)),
            seated: true,
            merge_locked: false,
        }
    }

    #[test]
    fn first_color_to_reach_three_in_slot_order_wins() {
        use ColorCode::{Blue, Green};
        let view = ShooterView::from_snapshots(vec![
            shooter(1, 0, Blue),
            shooter(2, 1, Green),
            shooter(3, 2, Blue),
            shooter(4, 3, Green),
            shooter(5, 4, Green),
            shooter(6, 5, Blue),
        ]);
        let mut detector = MergeDetector::new();
        let mut out = Vec::new();
        assert!(detector.handle(&view, false, &mut out));
        assert_eq!(
            out,
            vec![Command::BeginMerge {
                members: [ShooterId::new(2), ShooterId::new(4), ShooterId::new(5)],
            }]
        );
    }

    #[test]
    fn pending_merge_suppresses_detection() {
        let view = ShooterView::from_snapshots(vec![
            shooter(1, 0, ColorCode::Red),
            shooter(2, 1, ColorCode::Red),
            shooter(3, 2, ColorCode::Red),
        ]);
        let mut detector = MergeDetector::new();
        let mut out = Vec::new();
        assert!(!detector.handle(&view, true, &mut out));
        assert!(out.is_empty());
    }

    #[test]
    fn unseated_or_empty_shooters_do_not_count() {
        let mut unseated = shooter(3, 2, ColorCode::Red);
        unseated.seated = false;
        let mut empty = shooter(4, 3, ColorCode::Red);
        empty.ammo = 0;
        let view = ShooterView::from_snapshots(vec![
            shooter(1, 0, ColorCode::Red),
            shooter(2, 1, ColorCode::Red),
            unseated,
            empty,
        ]);
        let mut detector = MergeDetector::new();
        let mut out = Vec::new();
        assert!(!detector.handle(&view, false, &mut out));
    }

    #[test]
    fn scratch_groups_do_not_leak_between_scans() {
        let pair = ShooterView::from_snapshots(vec![
            shooter(1, 0, ColorCode::Red),
            shooter(2, 1, ColorCode::Red),
        ]);
        let single = ShooterView::from_snapshots(vec![shooter(3, 2, ColorCode::Red)]);
        let mut detector = MergeDetector::new();
        let mut out = Vec::new();
        assert!(!detector.handle(&pair, false, &mut out));
        assert!(!detector.handle(&single, false, &mut out));
        assert!(out.is_empty());
    }
}

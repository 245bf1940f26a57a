#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure system that splits the front row into per-slot firing queues.
//!
//! A wave is computed from a [`ShooterView`] and a [`FrontRowView`]. Every
//! eligible shooter receives a contiguous run of targets of its color in
//! ascending column order, and no target is offered to more than one slot.
//! Queues only hold candidates; the world validates each draw again before a
//! projectile is dispatched.

mod volley;

use std::collections::{BTreeMap, VecDeque};

use slot_volley_core::{
    ColorCode, Event, FrontRowView, ShooterView, SlotIndex, TargetUid, WorldPoint,
};
use tracing::debug;

pub use volley::{Volley, VolleyConfig, VolleyStatus};

/// Target offered to a slot during the current wave.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QueuedTarget {
    /// Identifier of the target cell.
    pub uid: TargetUid,
    /// Column the cell fronted when the wave was built.
    pub column: u32,
    /// World position of the cell when the wave was built.
    pub position: WorldPoint,
}

/// Errors produced when drawing from a slot queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    /// The slot has no valid candidate left for this wave.
    #[error("slot {} has no queued target left", .slot.get())]
    QueueEmpty {
        /// Slot that was drawn from.
        slot: SlotIndex,
    },
}

#[derive(Clone, Debug)]
struct SlotQueue {
    color: ColorCode,
    entries: VecDeque<QueuedTarget>,
}

/// Wave assignment engine that reuses scratch buffers between waves.
#[derive(Debug, Default)]
pub struct WaveAssignment {
    queues: BTreeMap<SlotIndex, SlotQueue>,
    by_color: BTreeMap<ColorCode, Vec<QueuedTarget>>,
}

impl WaveAssignment {
    /// Creates an engine with no queued targets.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Discards the previous wave and builds fresh per-slot queues.
    ///
    /// Returns the number of targets queued across all slots.
    pub fn begin_wave(&mut self, shooters: &ShooterView, front: &FrontRowView) -> usize {
        self.queues.clear();
        for bucket in self.by_color.values_mut() {
            bucket.clear();
        }

        for target in front.iter() {
            let Some(color) = target.color.code() else {
                continue;
            };
            self.by_color.entry(color).or_default().push(QueuedTarget {
                uid: target.uid,
                column: target.column,
                position: target.position,
            });
        }

        let mut cursors: BTreeMap<ColorCode, usize> = BTreeMap::new();
        let mut queued = 0;
        for shooter in shooters.iter() {
            if !shooter.can_fire() {
                continue;
            }
            let (Some(slot), Some(color)) = (shooter.slot, shooter.color.code()) else {
                continue;
            };
            let Some(bucket) = self.by_color.get(&color) else {
                continue;
            };
            let cursor = cursors.entry(color).or_insert(0);
            let take = (shooter.ammo as usize).min(bucket.len() - *cursor);
            if take == 0 {
                continue;
            }

            let entries: VecDeque<QueuedTarget> =
                bucket[*cursor..*cursor + take].iter().copied().collect();
            *cursor += take;
            queued += take;
            let _ = self.queues.insert(slot, SlotQueue { color, entries });
        }

        debug!(
            slots = self.queues.len(),
            targets = queued,
            eligible = front.len(),
            "wave assigned"
        );
        queued
    }

    /// Pops the next candidate of `slot` that `accept` still validates.
    ///
    /// Rejected candidates are discarded for the rest of the wave.
    pub fn draw_next(
        &mut self,
        slot: SlotIndex,
        mut accept: impl FnMut(ColorCode, &QueuedTarget) -> bool,
    ) -> Result<QueuedTarget, DrawError> {
        let queue = self
            .queues
            .get_mut(&slot)
            .ok_or(DrawError::QueueEmpty { slot })?;
        while let Some(candidate) = queue.entries.pop_front() {
            if accept(queue.color, &candidate) {
                return Ok(candidate);
            }
            debug!(
                slot = slot.get(),
                uid = candidate.uid.get(),
                "discarding stale queued target"
            );
        }
        Err(DrawError::QueueEmpty { slot })
    }

    /// Candidates still queued for `slot` in draw order.
    pub fn queued(&self, slot: SlotIndex) -> impl Iterator<Item = &QueuedTarget> {
        self.queues
            .get(&slot)
            .into_iter()
            .flat_map(|queue| queue.entries.iter())
    }

    /// Total number of candidates still queued across every slot.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.queues.values().map(|queue| queue.entries.len()).sum()
    }

    /// Drops every queue.
    pub fn clear(&mut self) {
        self.queues.clear();
    }
}

/// Reports whether an event batch should trigger a new wave.
///
/// Seating, an aborted merge, and any projectile outcome that leaves some held
/// color reachable re-run the merge check and the assignment. A stale or
/// expired shot releases its target, so the next wave offers it again.
#[must_use]
pub fn wave_requested(events: &[Event]) -> bool {
    events.iter().any(|event| {
        matches!(
            event,
            Event::ShooterSeated { .. }
                | Event::TargetResolved {
                    reachable: true,
                    ..
                }
                | Event::ProjectileStale {
                    reachable: true,
                    ..
                }
                | Event::ProjectileExpired {
                    reachable: true,
                    ..
                }
                | Event::MergeAborted { .. }
        )
    })
}

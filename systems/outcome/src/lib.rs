#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Debounced failure detection for starving volleys.
//!
//! The monitor keeps its own clock, advanced by [`Event::TimeAdvanced`], and a
//! single "suppress until" deadline. Every grace window extends the deadline to
//! the later of its current value and `now + grace`; windows never shorten one
//! another. Winning is decided by the world when the board empties, so the
//! monitor only tracks it to stop evaluating.

use std::time::Duration;

use slot_volley_core::{Command, Event, PlacementOrigin};
use tracing::{debug, info};

/// Grace windows and debounce used by the monitor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OutcomeConfig {
    /// How long a starving, fully occupied slot row must stay unreachable before failing.
    pub fail_debounce: Duration,
    /// Suppression opened by every seating.
    pub seat_grace: Duration,
    /// Suppression opened by every wave start.
    pub wave_grace: Duration,
    /// Suppression opened by a merge start; covers the gather sequence plus a margin.
    pub merge_grace: Duration,
    /// Suppression opened when a merge keeper is placed back into its slot.
    pub keeper_grace: Duration,
}

impl Default for OutcomeConfig {
    fn default() -> Self {
        Self {
            fail_debounce: Duration::from_millis(300),
            seat_grace: Duration::from_millis(200),
            wave_grace: Duration::from_millis(150),
            merge_grace: Duration::from_millis(900),
            keeper_grace: Duration::from_millis(150),
        }
    }
}

/// Facts about the world gathered when the volley reports starvation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Starvation {
    /// A merge group is gathering or its keeper is returning.
    pub merge_in_progress: bool,
    /// Some slotted shooter with ammo, seated or not, has a front target of its color.
    pub has_front_targets: bool,
    /// No slot is empty; merge reservations count as full.
    pub all_slots_full: bool,
}

/// Decision returned for a starving volley.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Keep the volley running and ask again next tick.
    KeepPolling,
    /// Stop the volley until the next wave.
    Idle,
    /// The level was declared lost; a [`Command::DeclareFailure`] was emitted.
    Failed,
}

/// Tracks grace windows and the failure debounce for one level instance.
#[derive(Debug)]
pub struct OutcomeMonitor {
    config: OutcomeConfig,
    now: Duration,
    suppress_until: Duration,
    starving_since: Option<Duration>,
    concluded: bool,
}

impl OutcomeMonitor {
    /// Creates a monitor with a fresh clock.
    #[must_use]
    pub fn new(config: OutcomeConfig) -> Self {
        Self {
            config,
            now: Duration::ZERO,
            suppress_until: Duration::ZERO,
            starving_since: None,
            concluded: false,
        }
    }

    /// Time observed since the last level reset.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Reports whether a grace window is currently open.
    #[must_use]
    pub fn suppressed(&self) -> bool {
        self.now < self.suppress_until
    }

    /// Reports whether the level already ended.
    #[must_use]
    pub fn concluded(&self) -> bool {
        self.concluded
    }

    /// Consumes world events, advancing the clock and opening grace windows.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => {
                    self.now = self.now.saturating_add(*dt);
                }
                Event::ShooterSeated { .. } => self.suppress_for(self.config.seat_grace),
                Event::MergeStarted { .. } => self.suppress_for(self.config.merge_grace),
                Event::ShooterPlaced {
                    origin: PlacementOrigin::MergeKeeper,
                    ..
                } => self.suppress_for(self.config.keeper_grace),
                Event::LevelReset { .. } => self.reset(),
                Event::LevelWon | Event::LevelFailed => {
                    self.concluded = true;
                    self.starving_since = None;
                }
                _ => {}
            }
        }
    }

    /// Records that a wave started.
    pub fn wave_started(&mut self) {
        self.suppress_for(self.config.wave_grace);
        self.starving_since = None;
    }

    /// Records a successful draw.
    pub fn note_fired(&mut self) {
        self.starving_since = None;
    }

    /// Decides what a starving volley should do next.
    pub fn evaluate(&mut self, starvation: Starvation, out: &mut Vec<Command>) -> Verdict {
        if self.concluded {
            return Verdict::Idle;
        }
        if starvation.merge_in_progress || self.suppressed() || starvation.has_front_targets {
            self.starving_since = None;
            return Verdict::KeepPolling;
        }
        if !starvation.all_slots_full {
            self.starving_since = None;
            return Verdict::Idle;
        }

        let since = *self.starving_since.get_or_insert(self.now);
        let starved_for = self.now.saturating_sub(since);
        if starved_for < self.config.fail_debounce {
            return Verdict::KeepPolling;
        }

        info!(
            starved_ms = starved_for.as_millis() as u64,
            "no reachable target with every slot full"
        );
        self.concluded = true;
        self.starving_since = None;
        out.push(Command::DeclareFailure);
        Verdict::Failed
    }

    fn suppress_for(&mut self, grace: Duration) {
        let deadline = self.now.saturating_add(grace);
        if deadline > self.suppress_until {
            self.suppress_until = deadline;
            debug!(
                until_ms = deadline.as_millis() as u64,
                "failure suppressed"
            );
        }
    }

    fn reset(&mut self) {
        self.now = Duration::ZERO;
        self.suppress_until = Duration::ZERO;
        self.starving_since = None;
        self.concluded = false;
    }
}

impl Default for OutcomeMonitor {
    fn default() -> Self {
        Self::new(OutcomeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_volley_core::{ShooterId, SlotIndex};

    const STUCK: Starvation = Starvation {
        merge_in_progress: false,
        has_front_targets: false,
        all_slots_full: true,
    };

    fn tick(monitor: &mut OutcomeMonitor, millis: u64) {
        monitor.observe(&[Event::TimeAdvanced {
            dt: Duration::from_millis(millis),
        }]);
    }

    #[test]
    fn debounce_must_elapse_before_failing() {
        let mut monitor = OutcomeMonitor::default();
        let mut out = Vec::new();
        assert_eq!(monitor.evaluate(STUCK, &mut out), Verdict::KeepPolling);
        tick(&mut monitor, 299);
        assert_eq!(monitor.evaluate(STUCK, &mut out), Verdict::KeepPolling);
        tick(&mut monitor, 1);
        assert_eq!(monitor.evaluate(STUCK, &mut out), Verdict::Failed);
        assert_eq!(out, vec![Command::DeclareFailure]);
    }

    #[test]
    fn failure_is_declared_once_until_reset() {
        let mut monitor = OutcomeMonitor::default();
        let mut out = Vec::new();
        for _ in 0..10 {
            let _ = monitor.evaluate(STUCK, &mut out);
            tick(&mut monitor, 100);
        }
        assert_eq!(out.len(), 1);

        monitor.observe(&[Event::LevelReset {
            total_targets: 1,
            slots: 5,
        }]);
        assert!(!monitor.concluded());
        assert_eq!(monitor.now(), Duration::ZERO);
    }

    #[test]
    fn reachable_targets_reset_the_debounce() {
        let mut monitor = OutcomeMonitor::default();
        let mut out = Vec::new();
        let _ = monitor.evaluate(STUCK, &mut out);
        tick(&mut monitor, 250);
        let reachable = Starvation {
            has_front_targets: true,
            ..STUCK
        };
        assert_eq!(monitor.evaluate(reachable, &mut out), Verdict::KeepPolling);
        tick(&mut monitor, 100);
        assert_eq!(monitor.evaluate(STUCK, &mut out), Verdict::KeepPolling);
        assert!(out.is_empty());
    }

    #[test]
    fn free_slot_goes_idle() {
        let mut monitor = OutcomeMonitor::default();
        let mut out = Vec::new();
        let open = Starvation {
            all_slots_full: false,
            ..STUCK
        };
        assert_eq!(monitor.evaluate(open, &mut out), Verdict::Idle);
    }

    #[test]
    fn grace_windows_take_the_latest_deadline() {
        let mut monitor = OutcomeMonitor::default();
        let mut out = Vec::new();
        monitor.observe(&[Event::MergeStarted {
            members: [ShooterId::new(1), ShooterId::new(2), ShooterId::new(3)],
            color: slot_volley_core::ColorCode::Red,
            reserved_slot: SlotIndex::new(1),
        }]);
        tick(&mut monitor, 100);
        monitor.wave_started();
        tick(&mut monitor, 500);
        assert!(monitor.suppressed());
        assert_eq!(monitor.evaluate(STUCK, &mut out), Verdict::KeepPolling);
        tick(&mut monitor, 300);
        assert!(!monitor.suppressed());
    }

    #[test]
    fn seating_opens_a_grace_window() {
        let mut monitor = OutcomeMonitor::default();
        monitor.observe(&[Event::ShooterSeated {
            shooter: ShooterId::new(1),
            slot: SlotIndex::new(0),
        }]);
        tick(&mut monitor, 199);
        assert!(monitor.suppressed());
        tick(&mut monitor, 1);
        assert!(!monitor.suppressed());
    }

    #[test]
    fn win_stops_evaluation() {
        let mut monitor = OutcomeMonitor::default();
        let mut out = Vec::new();
        monitor.observe(&[Event::LevelWon]);
        tick(&mut monitor, 1_000);
        assert_eq!(monitor.evaluate(STUCK, &mut out), Verdict::Idle);
        assert!(out.is_empty());
    }
}

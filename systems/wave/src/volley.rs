//! Serialized firing loop that drains wave queues one shot at a time.

use std::time::Duration;

use slot_volley_core::{ColorCode, Command, ShooterView, SlotIndex};
use tracing::debug;

use crate::{QueuedTarget, WaveAssignment};

/// Timing parameters of the firing loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VolleyConfig {
    fire_cooldown: Duration,
}

impl VolleyConfig {
    /// Creates a configuration with the provided delay between consecutive shots.
    #[must_use]
    pub const fn new(fire_cooldown: Duration) -> Self {
        Self { fire_cooldown }
    }

    /// Delay enforced after every shot, shared by all slots.
    #[must_use]
    pub const fn fire_cooldown(&self) -> Duration {
        self.fire_cooldown
    }
}

impl Default for VolleyConfig {
    fn default() -> Self {
        Self::new(Duration::from_millis(150))
    }
}

/// Result of advancing the firing loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VolleyStatus {
    /// The loop is not running.
    Idle,
    /// The loop is waiting out the cooldown of its previous shot.
    CoolingDown,
    /// A fire command was emitted.
    Fired,
    /// A complete pass over the snapshot fired nothing.
    Starving,
}

/// Firing loop that walks a stable snapshot of slots in index order.
///
/// Each advance emits at most one [`Command::FireProjectile`]. A pass that
/// fires at least once is followed by a fresh pass; a pass that fires nothing
/// reports [`VolleyStatus::Starving`] so the caller can decide whether to keep
/// polling.
#[derive(Debug, Default)]
pub struct Volley {
    config: VolleyConfig,
    active: bool,
    cooldown: Duration,
    pass: Vec<SlotIndex>,
    cursor: usize,
    fired_in_pass: bool,
}

impl Volley {
    /// Creates an idle firing loop.
    #[must_use]
    pub fn new(config: VolleyConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Restarts the loop without any pending cooldown.
    pub fn activate(&mut self) {
        self.active = true;
        self.cooldown = Duration::ZERO;
        self.pass.clear();
        self.cursor = 0;
        self.fired_in_pass = false;
    }

    /// Stops the loop until the next activation.
    pub fn deactivate(&mut self) {
        if self.active {
            debug!("volley idle");
        }
        self.active = false;
        self.pass.clear();
        self.cursor = 0;
    }

    /// Reports whether the loop is running.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advances the loop by `dt`, drawing at most one target.
    ///
    /// `accept` must confirm that a shooter of the given color may still claim
    /// the candidate; rejected candidates are dropped from the wave.
    pub fn advance(
        &mut self,
        dt: Duration,
        shooters: &ShooterView,
        wave: &mut WaveAssignment,
        mut accept: impl FnMut(ColorCode, &QueuedTarget) -> bool,
        out: &mut Vec<Command>,
    ) -> VolleyStatus {
        if !self.active {
            return VolleyStatus::Idle;
        }

        if !self.cooldown.is_zero() {
            self.cooldown = self.cooldown.saturating_sub(dt);
            if !self.cooldown.is_zero() {
                return VolleyStatus::CoolingDown;
            }
        }

        loop {
            if self.cursor >= self.pass.len() {
                if !self.pass.is_empty() && !self.fired_in_pass {
                    self.pass.clear();
                    self.cursor = 0;
                    return VolleyStatus::Starving;
                }
                self.start_pass(shooters);
                if self.pass.is_empty() {
                    return VolleyStatus::Starving;
                }
            }

            let slot = self.pass[self.cursor];
            self.cursor += 1;

            let ready = shooters
                .in_slot(slot)
                .is_some_and(|shooter| shooter.can_fire() && shooter.color.code().is_some());
            if !ready {
                continue;
            }

            if let Ok(target) = wave.draw_next(slot, &mut accept) {
                out.push(Command::FireProjectile {
                    slot,
                    target: target.uid,
                    column: target.column,
                });
                self.fired_in_pass = true;
                self.cooldown = self.config.fire_cooldown;
                return VolleyStatus::Fired;
            }
        }
    }

    fn start_pass(&mut self, shooters: &ShooterView) {
        self.pass.clear();
        self.pass.extend(
            shooters
                .iter()
                .filter(|shooter| shooter.can_fire())
                .filter_map(|shooter| shooter.slot),
        );
        self.cursor = 0;
        self.fired_in_pass = false;
    }
}

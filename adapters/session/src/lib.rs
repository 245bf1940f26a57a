#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level session driver for Slot Volley.
//!
//! A [`Session`] owns one world and one instance of every system. Player
//! input and elapsed time enter as commands; the session applies them, hands
//! the resulting events to the systems and to registered observers, and keeps
//! applying the commands the systems emit until the batch settles.

mod catalog;
mod config;
mod level;

use std::time::Duration;

use slot_volley_core::{
    Command, ConfigurationError, Event, LevelOutcome, LevelSpec, ShooterId, WorldPoint,
};
use slot_volley_system_choreography::Choreography;
use slot_volley_system_merge::MergeDetector;
use slot_volley_system_outcome::{OutcomeMonitor, Starvation, Verdict};
use slot_volley_system_wave::{wave_requested, Volley, VolleyStatus, WaveAssignment};
use slot_volley_world::{self as world, query, World};
use tracing::{debug, error};

pub use catalog::{CatalogEntry, EndPolicy, LevelCatalog};
pub use config::SessionConfig;
pub use level::{
    GeometrySection, LevelFile, LevelFileError, SlotSection, SupplySection, TargetSection,
};

/// Receives session notifications. Every callback defaults to doing nothing.
pub trait SessionObserver {
    /// Target counts changed.
    fn on_targets_updated(&mut self, _remaining: u32, _total: u32) {}

    /// The board was cleared.
    fn on_win(&mut self) {}

    /// Every slot stayed full without a reachable target.
    fn on_fail(&mut self) {}

    /// A level was (re)loaded.
    fn on_level_reset(&mut self) {}

    /// Raw world event, delivered before the typed callbacks.
    fn on_event(&mut self, _event: &Event) {}
}

/// Handle returned by [`Session::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u32);

/// One playable level instance with every system wired up.
pub struct Session {
    world: World,
    wave: WaveAssignment,
    volley: Volley,
    merge: MergeDetector,
    outcome: OutcomeMonitor,
    choreography: Choreography,
    observers: Vec<(ObserverId, Box<dyn SessionObserver>)>,
    next_observer: u32,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("world", &self.world)
            .field("volley", &self.volley)
            .field("outcome", &self.outcome)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Creates a session with an empty world; load a level before playing.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            world: World::new(),
            wave: WaveAssignment::new(),
            volley: Volley::new(config.volley()),
            merge: MergeDetector::new(),
            outcome: OutcomeMonitor::new(config.outcome()),
            choreography: Choreography::new(config.choreography()),
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    /// Replaces the current level. A rejected level leaves the previous one in place.
    pub fn load_level(&mut self, spec: &LevelSpec) -> Result<(), ConfigurationError> {
        let mut events = Vec::new();
        world::load_level(&mut self.world, spec, &mut events)?;
        let mut commands = Vec::new();
        self.route(&events, &mut commands);
        self.pump(commands);
        Ok(())
    }

    /// Sends the front block of a supply column to the leftmost empty slot.
    pub fn select_supply(&mut self, column: u32) {
        self.pump(vec![Command::SelectSupply { column }]);
    }

    /// Sends the front block of a supply column to the empty slot nearest `position`.
    pub fn drop_supply(&mut self, column: u32, position: WorldPoint) {
        self.pump(vec![Command::DropSupply { column, position }]);
    }

    /// Advances every sequence by `dt`, then lets the volley take at most one shot.
    pub fn tick(&mut self, dt: Duration) {
        self.pump(vec![Command::Tick { dt }]);
        self.fire(dt);
    }

    /// Registers an observer until it is unsubscribed or the session drops.
    pub fn subscribe(&mut self, observer: Box<dyn SessionObserver>) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer = self.next_observer.wrapping_add(1);
        self.observers.push((id, observer));
        id
    }

    /// Removes an observer. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(registered, _)| *registered != id);
        self.observers.len() != before
    }

    /// Reports whether the shooter finished its placement motion.
    #[must_use]
    pub fn is_seated(&self, shooter: ShooterId) -> bool {
        query::is_seated(&self.world, shooter)
    }

    /// Targets still on the board.
    #[must_use]
    pub fn remaining_targets(&self) -> u32 {
        query::remaining_targets(&self.world)
    }

    /// Targets the level started with.
    #[must_use]
    pub fn total_targets(&self) -> u32 {
        query::total_targets(&self.world)
    }

    /// Terminal outcome, once decided.
    #[must_use]
    pub fn outcome(&self) -> Option<LevelOutcome> {
        query::outcome(&self.world)
    }

    /// Time elapsed since the level was loaded.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.outcome.now()
    }

    /// Read access to the world for presenters and bots.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Read access to the running motion sequences.
    #[must_use]
    pub fn choreography(&self) -> &Choreography {
        &self.choreography
    }

    fn pump(&mut self, mut commands: Vec<Command>) {
        let mut events = Vec::new();
        while !commands.is_empty() {
            events.clear();
            for command in commands.drain(..) {
                world::apply(&mut self.world, command, &mut events);
            }
            self.route(&events, &mut commands);
        }
    }

    fn route(&mut self, events: &[Event], out: &mut Vec<Command>) {
        self.notify(events);
        self.outcome.observe(events);

        for event in events {
            match event {
                Event::FireRejected {
                    slot,
                    target,
                    reason,
                } => {
                    error!(
                        slot = slot.get(),
                        target = target.get(),
                        ?reason,
                        "validated draw was rejected by the world"
                    );
                }
                Event::LevelReset { .. } | Event::LevelWon | Event::LevelFailed => {
                    self.volley.deactivate();
                    self.wave.clear();
                }
                _ => {}
            }
        }

        self.choreography.handle(events, out);
        if wave_requested(events) {
            self.begin_auto_wave(out);
        }
    }

    fn notify(&mut self, events: &[Event]) {
        for (_, observer) in &mut self.observers {
            for event in events {
                observer.on_event(event);
                match event {
                    Event::TargetsUpdated { remaining, total } => {
                        observer.on_targets_updated(*remaining, *total);
                    }
                    Event::LevelWon => observer.on_win(),
                    Event::LevelFailed => observer.on_fail(),
                    Event::LevelReset { .. } => observer.on_level_reset(),
                    _ => {}
                }
            }
        }
    }

    fn begin_auto_wave(&mut self, out: &mut Vec<Command>) {
        if query::outcome(&self.world).is_some() {
            return;
        }
        let shooters = query::shooter_view(&self.world);
        if self
            .merge
            .handle(&shooters, query::merge_pending(&self.world), out)
        {
            return;
        }
        let queued = self
            .wave
            .begin_wave(&shooters, &query::front_row(&self.world));
        debug!(queued, "wave started");
        self.outcome.wave_started();
        self.volley.activate();
    }

    fn fire(&mut self, dt: Duration) {
        let shooters = query::shooter_view(&self.world);
        let world = &self.world;
        let mut commands = Vec::new();
        let status = self.volley.advance(
            dt,
            &shooters,
            &mut self.wave,
            |color, target| query::is_drawable(world, color, target.column, target.uid),
            &mut commands,
        );
        match status {
            VolleyStatus::Fired => {
                self.outcome.note_fired();
                self.pump(commands);
            }
            VolleyStatus::Starving => self.starving(),
            VolleyStatus::Idle | VolleyStatus::CoolingDown => {}
        }
    }

    fn starving(&mut self) {
        let starvation = Starvation {
            merge_in_progress: query::merge_pending(&self.world),
            has_front_targets: query::has_front_for_held_colors(&self.world),
            all_slots_full: query::all_slots_full(&self.world),
        };
        let mut commands = Vec::new();
        match self.outcome.evaluate(starvation, &mut commands) {
            Verdict::KeepPolling => {}
            Verdict::Idle => self.volley.deactivate(),
            Verdict::Failed => {
                self.volley.deactivate();
                self.pump(commands);
            }
        }
    }
}

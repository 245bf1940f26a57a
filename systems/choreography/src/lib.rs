#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Timed multi-phase motion sequences expressed as step lists.
//!
//! Presentation collaborators animate shooters, projectiles and merge groups;
//! the engine only needs to know when each motion completes. Every motion is
//! modelled as a list of timed steps owned by an [`Actor`]. Steps advance on
//! [`Event::TimeAdvanced`], carry leftover time into the next step, and may
//! emit a command when they finish. Cancelling an actor drops its remaining
//! steps so their completion commands are never produced.

use std::{
    collections::{BTreeMap, VecDeque},
    time::Duration,
};

use slot_volley_core::{Command, Event, ProjectileArrival, ProjectileId, ShooterId, WorldPoint};
use tracing::debug;

/// Durations and speeds of every motion sequence.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChoreographyConfig {
    /// Travel from the supply grid (or merge jump landing) to the slot.
    pub placement_travel: Duration,
    /// Settling hop once the slot is reached.
    pub placement_hop: Duration,
    /// Hop played when a shooter runs out of ammo, before its slot is released.
    pub depletion_hop: Duration,
    /// First leg of the exit motion.
    pub exit_approach: Duration,
    /// Second leg of the exit motion, after which the shooter is destroyed.
    pub exit_depart: Duration,
    /// Merge members rise above their slots.
    pub merge_rise: Duration,
    /// Merge members converge on the group center.
    pub merge_converge: Duration,
    /// Merge members collapse into one.
    pub merge_collapse: Duration,
    /// Keeper jumps to the reserved slot.
    pub keeper_jump: Duration,
    /// Projectile speed in world units per second.
    pub projectile_speed: f32,
    /// Projectiles still flying after this long expire.
    pub projectile_lifetime: Duration,
}

impl ChoreographyConfig {
    /// Total duration of the merge gather sequence.
    #[must_use]
    pub fn merge_gather(&self) -> Duration {
        self.merge_rise + self.merge_converge + self.merge_collapse
    }

    /// Flight time between two points, or `None` when the flight would outlive the projectile.
    #[must_use]
    pub fn flight_time(&self, from: WorldPoint, to: WorldPoint) -> Option<Duration> {
        if self.projectile_speed <= 0.0 {
            return None;
        }
        Duration::try_from_secs_f32(from.distance(to) / self.projectile_speed)
            .ok()
            .filter(|flight| *flight <= self.projectile_lifetime)
    }
}

impl Default for ChoreographyConfig {
    fn default() -> Self {
        Self {
            placement_travel: Duration::from_millis(400),
            placement_hop: Duration::from_millis(180),
            depletion_hop: Duration::from_millis(180),
            exit_approach: Duration::from_millis(400),
            exit_depart: Duration::from_millis(450),
            merge_rise: Duration::from_millis(250),
            merge_converge: Duration::from_millis(350),
            merge_collapse: Duration::from_millis(200),
            keeper_jump: Duration::from_millis(500),
            projectile_speed: 12.0,
            projectile_lifetime: Duration::from_secs(8),
        }
    }
}

/// Owner of a motion sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Actor {
    /// A shooter placing, hopping or exiting.
    Shooter(ShooterId),
    /// A projectile in flight.
    Projectile(ProjectileId),
    /// The merge group currently gathering or jumping.
    Merge,
}

/// Visual phase a step represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Moving into a slot.
    Travel,
    /// Settling or depletion hop.
    Hop,
    /// First exit leg.
    ExitApproach,
    /// Second exit leg.
    ExitDepart,
    /// Projectile flight.
    Flight,
    /// Merge members rising.
    Rise,
    /// Merge members converging.
    Converge,
    /// Merge members collapsing.
    Collapse,
    /// Keeper jumping to its reserved slot.
    Jump,
}

#[derive(Clone, Debug)]
struct Step {
    phase: Phase,
    duration: Duration,
    on_complete: Option<Command>,
}

impl Step {
    fn new(phase: Phase, duration: Duration) -> Self {
        Self {
            phase,
            duration,
            on_complete: None,
        }
    }

    fn then(mut self, command: Command) -> Self {
        self.on_complete = Some(command);
        self
    }
}

#[derive(Clone, Debug, Default)]
struct Sequence {
    steps: VecDeque<Step>,
    elapsed: Duration,
}

/// Scheduler that owns every running motion sequence.
#[derive(Debug)]
pub struct Choreography {
    config: ChoreographyConfig,
    sequences: BTreeMap<Actor, Sequence>,
    completed: Vec<(Duration, Command)>,
}

impl Choreography {
    /// Creates a scheduler with no running sequences.
    #[must_use]
    pub fn new(config: ChoreographyConfig) -> Self {
        Self {
            config,
            sequences: BTreeMap::new(),
            completed: Vec::new(),
        }
    }

    /// Timing parameters used by the scheduler.
    #[must_use]
    pub fn config(&self) -> &ChoreographyConfig {
        &self.config
    }

    /// Consumes world events, scheduling new sequences and advancing time.
    ///
    /// Completion commands are appended to `out` in completion order.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::TimeAdvanced { dt } => self.advance(*dt, out),
                Event::ShooterPlaced { shooter, .. } => {
                    let steps = vec![
                        Step::new(Phase::Travel, self.config.placement_travel),
                        Step::new(Phase::Hop, self.config.placement_hop)
                            .then(Command::MarkSeated { shooter: *shooter }),
                    ];
                    self.schedule(Actor::Shooter(*shooter), steps);
                }
                Event::ShooterDepleted { shooter, .. } => {
                    let steps = vec![
                        Step::new(Phase::Hop, self.config.depletion_hop)
                            .then(Command::FreeSlot { shooter: *shooter }),
                        Step::new(Phase::ExitApproach, self.config.exit_approach),
                        Step::new(Phase::ExitDepart, self.config.exit_depart)
                            .then(Command::RetireShooter { shooter: *shooter }),
                    ];
                    self.schedule(Actor::Shooter(*shooter), steps);
                }
                Event::ProjectileDispatched {
                    projectile,
                    from,
                    to,
                    ..
                } => {
                    let (duration, arrival) = match self.config.flight_time(*from, *to) {
                        Some(flight) => (flight, ProjectileArrival::Arrived),
                        None => (self.config.projectile_lifetime, ProjectileArrival::Expired),
                    };
                    let steps = vec![Step::new(Phase::Flight, duration).then(
                        Command::ResolveProjectile {
                            projectile: *projectile,
                            arrival,
                        },
                    )];
                    self.schedule(Actor::Projectile(*projectile), steps);
                }
                Event::MergeStarted { .. } => {
                    let steps = vec![
                        Step::new(Phase::Rise, self.config.merge_rise),
                        Step::new(Phase::Converge, self.config.merge_converge),
                        Step::new(Phase::Collapse, self.config.merge_collapse)
                            .then(Command::ResolveMerge),
                    ];
                    self.schedule(Actor::Merge, steps);
                }
                Event::MergeResolved { absorbed, .. } => {
                    for shooter in absorbed {
                        self.cancel(Actor::Shooter(*shooter));
                    }
                    let steps = vec![
                        Step::new(Phase::Jump, self.config.keeper_jump).then(Command::ReseatKeeper)
                    ];
                    self.schedule(Actor::Merge, steps);
                }
                Event::MergeAborted { discarded, .. } => {
                    self.cancel(Actor::Merge);
                    for shooter in discarded {
                        self.cancel(Actor::Shooter(*shooter));
                    }
                }
                Event::ShooterRetired { shooter } => self.cancel(Actor::Shooter(*shooter)),
                Event::LevelReset { .. } => self.sequences.clear(),
                _ => {}
            }
        }
    }

    /// Phase currently played by an actor.
    #[must_use]
    pub fn phase(&self, actor: Actor) -> Option<Phase> {
        self.sequences
            .get(&actor)
            .and_then(|sequence| sequence.steps.front())
            .map(|step| step.phase)
    }

    /// Number of running sequences.
    #[must_use]
    pub fn active(&self) -> usize {
        self.sequences.len()
    }

    /// Drops an actor's remaining steps without emitting their commands.
    pub fn cancel(&mut self, actor: Actor) {
        if self.sequences.remove(&actor).is_some() {
            debug!(?actor, "sequence cancelled");
        }
    }

    fn schedule(&mut self, actor: Actor, steps: Vec<Step>) {
        let replaced = self.sequences.insert(
            actor,
            Sequence {
                steps: steps.into(),
                elapsed: Duration::ZERO,
            },
        );
        if replaced.is_some() {
            debug!(?actor, "sequence replaced");
        }
    }

    fn advance(&mut self, dt: Duration, out: &mut Vec<Command>) {
        self.completed.clear();
        for sequence in self.sequences.values_mut() {
            let mut consumed = Duration::ZERO;
            while let Some(step) = sequence.steps.front() {
                let left = step.duration.saturating_sub(sequence.elapsed);
                if consumed + left > dt {
                    sequence.elapsed += dt - consumed;
                    break;
                }
                consumed += left;
                sequence.elapsed = Duration::ZERO;
                if let Some(step) = sequence.steps.pop_front() {
                    if let Some(command) = step.on_complete {
                        self.completed.push((consumed, command));
                    }
                }
            }
        }
        self.sequences.retain(|_, sequence| !sequence.steps.is_empty());

        self.completed.sort_by_key(|(at, _)| *at);
        out.extend(self.completed.drain(..).map(|(_, command)| command));
    }
}

impl Default for Choreography {
    fn default() -> Self {
        Self::new(ChoreographyConfig::default())
    }
}

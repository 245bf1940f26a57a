#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Slot Volley.
//!
//! The world owns the target board, the slot row, the supply grid, every
//! shooter and every in-flight projectile. It is mutated exclusively through
//! [`apply`] and [`load_level`], and exposes read-only snapshots through the
//! [`query`] module.

mod board;
mod reservations;
mod shooters;
mod slots;
mod supply;

use std::collections::{BTreeMap, BTreeSet};

use slot_volley_core::{
    ColorCode, ColorToken, Command, ConfigurationError, Event, FireError, LevelOutcome, LevelSpec,
    PlacementError, PlacementOrigin, ProjectileArrival, ProjectileId, ShooterId, SlotIndex,
    TargetUid, WorldPoint,
};
use tracing::{debug, info, warn};

use board::TargetBoard;
use shooters::ShooterRoster;
use slots::SlotRegistry;
use supply::SupplyGrid;

/// Represents the authoritative Slot Volley world state.
#[derive(Debug)]
pub struct World {
    board: TargetBoard,
    slots: SlotRegistry,
    supply: SupplyGrid,
    shooters: ShooterRoster,
    projectiles: BTreeMap<ProjectileId, Projectile>,
    next_projectile: u32,
    merge: Option<MergePhase>,
    outcome: Option<LevelOutcome>,
    tick_index: u64,
}

impl World {
    /// Creates an empty world. A level must be loaded before anything can happen.
    #[must_use]
    pub fn new() -> Self {
        Self {
            board: TargetBoard::new(),
            slots: SlotRegistry::default(),
            supply: SupplyGrid::default(),
            shooters: ShooterRoster::new(),
            projectiles: BTreeMap::new(),
            next_projectile: 1,
            merge: None,
            outcome: None,
            tick_index: 0,
        }
    }

    fn place_from_supply(
        &mut self,
        column: u32,
        choose: impl FnOnce(&SlotRegistry) -> Option<SlotIndex>,
        out_events: &mut Vec<Event>,
    ) {
        if self.outcome.is_some() {
            out_events.push(Event::PlacementRejected {
                reason: PlacementError::LevelOver,
            });
            return;
        }
        if self.supply.front(column).is_none() {
            warn!(column, "supply column has no front block");
            out_events.push(Event::PlacementRejected {
                reason: PlacementError::EmptySupplyColumn,
            });
            return;
        }
        let Some(slot) = choose(&self.slots) else {
            warn!(column, "no empty slot for supply block");
            out_events.push(Event::PlacementRejected {
                reason: PlacementError::NoEmptySlot,
            });
            return;
        };
        let (Some(to), Some(block)) = (self.slots.anchor(slot), self.supply.detach_front(column))
        else {
            return;
        };

        let from = self.supply.front_position(column);
        let shooter = self
            .shooters
            .spawn(block.color.clone(), block.ammo, slot, to);
        if !self.slots.occupy(slot, shooter) {
            let _ = self.shooters.remove(shooter);
            return;
        }

        debug!(
            shooter = shooter.get(),
            slot = slot.get(),
            color = %block.color,
            ammo = block.ammo,
            "shooter placed"
        );
        out_events.push(Event::ShooterPlaced {
            shooter,
            slot,
            color: block.color,
            ammo: block.ammo,
            origin: PlacementOrigin::Supply,
            from,
            to,
        });
    }

    fn fire(
        &mut self,
        slot: SlotIndex,
        target: TargetUid,
        column: u32,
        out_events: &mut Vec<Event>,
    ) {
        let verdict = self.validate_fire(slot, target, column);
        let shooter_id = match verdict {
            Ok(shooter_id) => shooter_id,
            Err(reason) => {
                warn!(
                    slot = slot.get(),
                    target = target.get(),
                    ?reason,
                    "fire rejected"
                );
                out_events.push(Event::FireRejected {
                    slot,
                    target,
                    reason,
                });
                return;
            }
        };

        let Some(to) = self
            .board
            .front_occupants()
            .find(|front| front.uid == target)
            .map(|front| front.position)
        else {
            return;
        };
        if !self.board.reserve_uid(target) {
            return;
        }
        let Some(shooter) = self.shooters.get_mut(shooter_id) else {
            self.board.release_uid(target);
            return;
        };
        shooter.ammo -= 1;
        let from = shooter.position;
        let color = shooter.color.clone();
        let depleted = shooter.ammo == 0;
        shooter.depleted = depleted;

        let projectile = ProjectileId::new(self.next_projectile);
        self.next_projectile = self.next_projectile.saturating_add(1);
        let _ = self.projectiles.insert(
            projectile,
            Projectile {
                target,
                column,
                color,
            },
        );

        out_events.push(Event::ProjectileDispatched {
            projectile,
            shooter: shooter_id,
            slot,
            target,
            column,
            from,
            to,
        });
        if depleted {
            debug!(shooter = shooter_id.get(), slot = slot.get(), "shooter depleted");
            out_events.push(Event::ShooterDepleted {
                shooter: shooter_id,
                slot,
            });
        }
    }

    fn validate_fire(
        &self,
        slot: SlotIndex,
        target: TargetUid,
        column: u32,
    ) -> Result<ShooterId, FireError> {
        let shooter = self
            .slots
            .occupant(slot)
            .and_then(|id| self.shooters.get(id))
            .ok_or(FireError::EmptySlot)?;
        if shooter.merge_locked {
            return Err(FireError::MergeLocked);
        }
        if !shooter.seated {
            return Err(FireError::NotSeated);
        }
        if shooter.depleted || shooter.ammo == 0 {
            return Err(FireError::OutOfAmmo);
        }
        self.board.check_drawable(column, target, &shooter.color)?;
        Ok(shooter.id)
    }

    fn resolve_projectile(
        &mut self,
        projectile: ProjectileId,
        arrival: ProjectileArrival,
        out_events: &mut Vec<Event>,
    ) {
        let Some(flight) = self.projectiles.remove(&projectile) else {
            debug!(projectile = projectile.get(), "projectile already resolved");
            return;
        };

        if arrival == ProjectileArrival::Expired {
            self.board.release_uid(flight.target);
            out_events.push(Event::ProjectileExpired {
                projectile,
                target: flight.target,
                reachable: self.held_colors_reachable(),
            });
            return;
        }

        let hit = if self
            .board
            .is_front_uid(flight.column, flight.target, &flight.color)
        {
            self.board.resolve_hit(flight.column, &flight.color)
        } else {
            None
        };
        let Some(hit) = hit else {
            self.board.release_uid(flight.target);
            debug!(
                projectile = projectile.get(),
                target = flight.target.get(),
                "stale projectile arrival"
            );
            out_events.push(Event::ProjectileStale {
                projectile,
                target: flight.target,
                reachable: self.held_colors_reachable(),
            });
            return;
        };

        out_events.push(Event::TargetResolved {
            target: hit.uid,
            column: flight.column,
            position: hit.position,
            reachable: self.held_colors_reachable(),
        });
        out_events.push(Event::TargetsUpdated {
            remaining: self.board.remaining(),
            total: self.board.total(),
        });

        if hit.board_cleared && self.outcome.is_none() {
            self.outcome = Some(LevelOutcome::Won);
            info!(total = self.board.total(), "level won");
            out_events.push(Event::LevelWon);
        }
    }

    fn free_slot(&mut self, shooter_id: ShooterId, out_events: &mut Vec<Event>) {
        let Some(shooter) = self.shooters.get_mut(shooter_id) else {
            return;
        };
        let Some(slot) = shooter.slot.take() else {
            return;
        };
        shooter.seated = false;
        if self.slots.free_for(slot, shooter_id) {
            out_events.push(Event::SlotFreed {
                shooter: shooter_id,
                slot,
            });
        }
    }

    fn begin_merge(&mut self, members: [ShooterId; 3], out_events: &mut Vec<Event>) {
        if self.merge.is_some() || self.outcome.is_some() {
            debug!("merge request ignored while another merge is pending");
            return;
        }

        let mut seats: Vec<(SlotIndex, ShooterId)> = Vec::with_capacity(3);
        let mut color: Option<ColorCode> = None;
        for id in members {
            let Some(shooter) = self.shooters.get(id).filter(|shooter| shooter.ready()) else {
                warn!(shooter = id.get(), "merge member is not ready");
                return;
            };
            let (Some(slot), Some(code)) = (shooter.slot, shooter.color.code()) else {
                return;
            };
            if color.is_some_and(|existing| existing != code) || seats.iter().any(|s| s.1 == id) {
                warn!(shooter = id.get(), "merge members do not form a trio");
                return;
            }
            color = Some(code);
            seats.push((slot, id));
        }
        let Some(color) = color else {
            return;
        };
        seats.sort();

        let reserved_slot = seats[1].0;
        let keeper_origin = self.slots.anchor(seats[0].0).unwrap_or_default();
        for (slot, id) in &seats {
            let _ = self.slots.free_for(*slot, *id);
            if let Some(shooter) = self.shooters.get_mut(*id) {
                shooter.slot = None;
                shooter.seated = false;
                shooter.merge_locked = true;
            }
        }
        let _ = self.slots.reserve_for_merge(reserved_slot);

        let ordered = [seats[0].1, seats[1].1, seats[2].1];
        debug!(
            color = %color,
            reserved_slot = reserved_slot.get(),
            "merge started"
        );
        self.merge = Some(MergePhase::Gathering(PendingMerge {
            members: ordered,
            reserved_slot,
            keeper_origin,
        }));
        out_events.push(Event::MergeStarted {
            members: ordered,
            color,
            reserved_slot,
        });
    }

    fn resolve_merge(&mut self, out_events: &mut Vec<Event>) {
        let pending = match self.merge.take() {
            Some(MergePhase::Gathering(pending)) => pending,
            other => {
                self.merge = other;
                debug!("no gathering merge to resolve");
                return;
            }
        };

        let survivors: Vec<ShooterId> = pending
            .members
            .iter()
            .copied()
            .filter(|id| self.shooters.get(*id).is_some())
            .collect();
        if survivors.len() != pending.members.len() {
            self.abort_merge(pending.reserved_slot, survivors, out_events);
            return;
        }

        let [keeper, first, second] = pending.members;
        let mut ammo = 0_u32;
        for id in [first, second] {
            if let Some(absorbed) = self.shooters.remove(id) {
                ammo = ammo.saturating_add(absorbed.ammo);
            }
        }
        let Some(shooter) = self.shooters.get_mut(keeper) else {
            return;
        };
        ammo = ammo.saturating_add(shooter.ammo);
        shooter.ammo = ammo;
        shooter.depleted = ammo == 0;
        shooter.position = pending.keeper_origin;

        debug!(keeper = keeper.get(), ammo, "merge resolved");
        self.merge = Some(MergePhase::Reseating {
            keeper,
            slot: pending.reserved_slot,
        });
        out_events.push(Event::MergeResolved {
            keeper,
            absorbed: [first, second],
            ammo,
            slot: pending.reserved_slot,
        });
    }

    fn reseat_keeper(&mut self, out_events: &mut Vec<Event>) {
        let (keeper, slot) = match self.merge.take() {
            Some(MergePhase::Reseating { keeper, slot }) => (keeper, slot),
            other => {
                self.merge = other;
                debug!("no merge keeper awaiting its slot");
                return;
            }
        };

        let Some(to) = self.slots.anchor(slot) else {
            return;
        };
        let Some(shooter) = self.shooters.get_mut(keeper) else {
            self.abort_merge(slot, Vec::new(), out_events);
            return;
        };
        if !self.slots.claim_reservation(slot, keeper) {
            warn!(slot = slot.get(), "merge reservation vanished before reseating");
            return;
        }

        let from = shooter.position;
        shooter.slot = Some(slot);
        shooter.seated = false;
        shooter.merge_locked = false;
        shooter.position = to;
        out_events.push(Event::ShooterPlaced {
            shooter: keeper,
            slot,
            color: shooter.color.clone(),
            ammo: shooter.ammo,
            origin: PlacementOrigin::MergeKeeper,
            from,
            to,
        });
    }

    fn abort_merge(
        &mut self,
        reserved_slot: SlotIndex,
        discarded: Vec<ShooterId>,
        out_events: &mut Vec<Event>,
    ) {
        let _ = self.slots.release_reservation(reserved_slot);
        for id in &discarded {
            let _ = self.shooters.remove(*id);
        }
        warn!(
            reserved_slot = reserved_slot.get(),
            discarded = discarded.len(),
            "merge aborted"
        );
        self.merge = None;
        out_events.push(Event::MergeAborted {
            reserved_slot,
            discarded,
        });
    }

    /// Reports whether some slotted shooter with ammo still has a front
    /// target of its color. Shooters still travelling to their slot count,
    /// as do reserved front cells.
    fn held_colors_reachable(&self) -> bool {
        let held: BTreeSet<ColorCode> = self
            .shooters
            .iter()
            .filter(|shooter| shooter.slot.is_some() && shooter.ammo > 0)
            .filter_map(|shooter| shooter.color.code())
            .collect();
        self.board.has_any_front_for_colors(&held)
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug)]
struct Projectile {
    target: TargetUid,
    column: u32,
    color: ColorToken,
}

#[derive(Clone, Debug)]
struct PendingMerge {
    members: [ShooterId; 3],
    reserved_slot: SlotIndex,
    keeper_origin: WorldPoint,
}

#[derive(Clone, Debug)]
enum MergePhase {
    Gathering(PendingMerge),
    Reseating { keeper: ShooterId, slot: SlotIndex },
}

/// Replaces the current level with the provided one.
///
/// Every spec is validated before the world is touched, so a rejected level
/// leaves the previous one playable. On success every slot, shooter and
/// projectile is cleared and the outcome is reset.
pub fn load_level(
    world: &mut World,
    spec: &LevelSpec,
    out_events: &mut Vec<Event>,
) -> Result<(), ConfigurationError> {
    if spec.slots.is_empty() {
        return Err(ConfigurationError::NoSlots);
    }
    let supply = SupplyGrid::from_spec(&spec.supply)?;
    world.board.build_from_spec(&spec.board)?;

    world.supply = supply;
    world.slots = SlotRegistry::with_anchors(&spec.slots);
    world.shooters.clear();
    world.projectiles.clear();
    world.merge = None;
    world.outcome = None;

    info!(
        targets = world.board.total(),
        slots = world.slots.len(),
        "level loaded"
    );
    out_events.push(Event::LevelReset {
        total_targets: world.board.total(),
        slots: world.slots.len() as u32,
    });
    out_events.push(Event::TargetsUpdated {
        remaining: world.board.remaining(),
        total: world.board.total(),
    });
    Ok(())
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::SelectSupply { column } => {
            world.place_from_supply(column, SlotRegistry::leftmost_empty, out_events);
        }
        Command::DropSupply { column, position } => {
            world.place_from_supply(
                column,
                |slots| slots.nearest_empty(position),
                out_events,
            );
        }
        Command::MarkSeated { shooter } => {
            let Some(state) = world.shooters.get_mut(shooter) else {
                return;
            };
            let Some(slot) = state.slot.filter(|_| !state.seated && !state.merge_locked) else {
                return;
            };
            state.seated = true;
            debug!(shooter = shooter.get(), slot = slot.get(), "shooter seated");
            out_events.push(Event::ShooterSeated { shooter, slot });
        }
        Command::FireProjectile {
            slot,
            target,
            column,
        } => world.fire(slot, target, column, out_events),
        Command::ResolveProjectile {
            projectile,
            arrival,
        } => world.resolve_projectile(projectile, arrival, out_events),
        Command::FreeSlot { shooter } => world.free_slot(shooter, out_events),
        Command::RetireShooter { shooter } => {
            world.free_slot(shooter, out_events);
            if world.shooters.remove(shooter).is_some() {
                out_events.push(Event::ShooterRetired { shooter });
            }
        }
        Command::BeginMerge { members } => world.begin_merge(members, out_events),
        Command::ResolveMerge => world.resolve_merge(out_events),
        Command::ReseatKeeper => world.reseat_keeper(out_events),
        Command::DeclareFailure => {
            if world.outcome.is_none() {
                world.outcome = Some(LevelOutcome::Failed);
                info!(
                    remaining = world.board.remaining(),
                    "level failed"
                );
                out_events.push(Event::LevelFailed);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use slot_volley_core::{
        ColorCode, FrontRowView, LevelOutcome, ShooterId, ShooterView, SlotView, SupplyBlock,
        TargetUid,
    };

    use super::{MergePhase, World};

    /// Captures the unreserved front row in column order.
    #[must_use]
    pub fn front_row(world: &World) -> FrontRowView {
        FrontRowView::from_targets(world.board.front_row())
    }

    /// Captures every live shooter ordered by slot.
    #[must_use]
    pub fn shooter_view(world: &World) -> ShooterView {
        ShooterView::from_snapshots(world.shooters.snapshots())
    }

    /// Captures every slot ordered by index.
    #[must_use]
    pub fn slot_view(world: &World) -> SlotView {
        SlotView::from_snapshots(world.slots.snapshots())
    }

    /// Reports whether a shooter of `color` may still claim `target` in `column`.
    #[must_use]
    pub fn is_drawable(world: &World, color: ColorCode, column: u32, target: TargetUid) -> bool {
        world
            .board
            .check_drawable(column, target, &color.into())
            .is_ok()
    }

    /// Reports whether the shooter finished its placement motion.
    #[must_use]
    pub fn is_seated(world: &World, shooter: ShooterId) -> bool {
        world
            .shooters
            .get(shooter)
            .is_some_and(|state| state.seated)
    }

    /// Targets still on the board.
    #[must_use]
    pub fn remaining_targets(world: &World) -> u32 {
        world.board.remaining()
    }

    /// Targets the current board was built with.
    #[must_use]
    pub fn total_targets(world: &World) -> u32 {
        world.board.total()
    }

    /// Number of targets currently claimed by in-flight projectiles.
    #[must_use]
    pub fn reserved_targets(world: &World) -> usize {
        world.board.reservations().len()
    }

    /// Reports whether a target uid is currently claimed.
    #[must_use]
    pub fn is_reserved(world: &World, target: TargetUid) -> bool {
        world.board.reservations().contains(target)
    }

    /// Number of projectiles still in flight.
    #[must_use]
    pub fn projectiles_in_flight(world: &World) -> usize {
        world.projectiles.len()
    }

    /// Reports whether a merge group is gathering or its keeper is travelling back.
    #[must_use]
    pub fn merge_pending(world: &World) -> bool {
        world.merge.is_some()
    }

    /// Reports whether the merge group is still gathering.
    #[must_use]
    pub fn merge_gathering(world: &World) -> bool {
        matches!(world.merge, Some(MergePhase::Gathering(_)))
    }

    /// Reports whether any slotted shooter with ammo, seated or still on its
    /// way, has a front target of its color.
    #[must_use]
    pub fn has_front_for_held_colors(world: &World) -> bool {
        world.held_colors_reachable()
    }

    /// Reports whether no slot is empty. Merge reservations count as full.
    #[must_use]
    pub fn all_slots_full(world: &World) -> bool {
        world.slots.all_full()
    }

    /// Selectable block of every supply column, in column order.
    #[must_use]
    pub fn supply_fronts(world: &World) -> Vec<(u32, Option<SupplyBlock>)> {
        (0..world.supply.column_count())
            .map(|column| (column, world.supply.front(column).cloned()))
            .collect()
    }

    /// Terminal outcome of the level, once decided.
    #[must_use]
    pub fn outcome(world: &World) -> Option<LevelOutcome> {
        world.outcome
    }

    /// Number of ticks processed since the world was created.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slot_volley_core::{BoardGeometry, BoardSpec, SupplyBlock, SupplySpec};

    fn level(targets: &[&str], supply: &[(ColorCode, u32)], slots: usize) -> LevelSpec {
        let cells: Vec<Vec<Option<ColorToken>>> = targets
            .iter()
            .map(|row| {
                row.chars()
                    .map(|c| ColorCode::from_letter(c).map(ColorToken::from))
                    .collect()
            })
            .collect();
        let mut blocks: Vec<Option<SupplyBlock>> = supply
            .iter()
            .map(|(color, ammo)| {
                Some(SupplyBlock {
                    color: ColorToken::from(*color),
                    ammo: *ammo,
                })
            })
            .collect();
        if blocks.is_empty() {
            blocks.push(None);
        }
        LevelSpec {
            board: BoardSpec {
                columns: cells[0].len() as u32,
                rows: cells.len() as u32,
                cells,
                geometry: BoardGeometry::default(),
            },
            supply: SupplySpec {
                columns: blocks.len() as u32,
                rows: 1,
                cells: vec![blocks],
                geometry: BoardGeometry::default(),
            },
            slots: (0..slots)
                .map(|index| WorldPoint::new(index as f32 * 2.0, 0.0, -4.0))
                .collect(),
        }
    }

    fn seated_world(spec: &LevelSpec, columns: &[u32]) -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        load_level(&mut world, spec, &mut events).expect("valid level");
        for column in columns {
            apply(&mut world, Command::SelectSupply { column: *column }, &mut events);
        }
        for snapshot in query::shooter_view(&world).into_vec() {
            apply(
                &mut world,
                Command::MarkSeated {
                    shooter: snapshot.id,
                },
                &mut events,
            );
        }
        world
    }

    #[test]
    fn load_level_reports_counts() {
        let mut world = World::new();
        let mut events = Vec::new();
        load_level(&mut world, &level(&["R.G"], &[], 3), &mut events).expect("valid level");
        assert_eq!(
            events,
            vec![
                Event::LevelReset {
                    total_targets: 2,
                    slots: 3,
                },
                Event::TargetsUpdated {
                    remaining: 2,
                    total: 2,
                },
            ]
        );
    }

    #[test]
    fn level_without_slots_is_rejected() {
        let mut world = World::new();
        let mut events = Vec::new();
        let error = load_level(&mut world, &level(&["R"], &[], 0), &mut events)
            .expect_err("no slots");
        assert_eq!(error, ConfigurationError::NoSlots);
        assert!(events.is_empty());
    }

    #[test]
    fn selection_fills_leftmost_slot_and_rejects_when_full() {
        let spec = level(&["R"], &[(ColorCode::Red, 1), (ColorCode::Blue, 1)], 1);
        let mut world = World::new();
        let mut events = Vec::new();
        load_level(&mut world, &spec, &mut events).expect("valid level");
        events.clear();

        apply(&mut world, Command::SelectSupply { column: 0 }, &mut events);
        apply(&mut world, Command::SelectSupply { column: 1 }, &mut events);
        apply(&mut world, Command::SelectSupply { column: 0 }, &mut events);

        assert!(matches!(
            events[0],
            Event::ShooterPlaced {
                slot,
                origin: PlacementOrigin::Supply,
                ..
            } if slot == SlotIndex::new(0)
        ));
        assert_eq!(
            events[1],
            Event::PlacementRejected {
                reason: PlacementError::NoEmptySlot
            }
        );
        assert_eq!(
            events[2],
            Event::PlacementRejected {
                reason: PlacementError::EmptySupplyColumn
            }
        );
    }

    #[test]
    fn unseated_shooters_cannot_fire() {
        let spec = level(&["R"], &[(ColorCode::Red, 1)], 1);
        let mut world = World::new();
        let mut events = Vec::new();
        load_level(&mut world, &spec, &mut events).expect("valid level");
        apply(&mut world, Command::SelectSupply { column: 0 }, &mut events);
        events.clear();

        apply(
            &mut world,
            Command::FireProjectile {
                slot: SlotIndex::new(0),
                target: TargetUid::new(1),
                column: 0,
            },
            &mut events,
        );
        assert_eq!(
            events,
            vec![Event::FireRejected {
                slot: SlotIndex::new(0),
                target: TargetUid::new(1),
                reason: FireError::NotSeated,
            }]
        );
    }

    #[test]
    fn firing_reserves_uid_and_depletes_last_round() {
        let spec = level(&["R"], &[(ColorCode::Red, 1)], 1);
        let mut world = seated_world(&spec, &[0]);
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::FireProjectile {
                slot: SlotIndex::new(0),
                target: TargetUid::new(1),
                column: 0,
            },
            &mut events,
        );
        assert!(matches!(events[0], Event::ProjectileDispatched { .. }));
        assert!(matches!(events[1], Event::ShooterDepleted { .. }));
        assert!(query::is_reserved(&world, TargetUid::new(1)));
        assert!(query::front_row(&world).is_empty());
    }

    #[test]
    fn reserved_uid_cannot_be_fired_at_twice() {
        let spec = level(&["R"], &[(ColorCode::Red, 2), (ColorCode::Red, 2)], 2);
        let mut world = seated_world(&spec, &[0, 1]);
        let mut events = Vec::new();
        for slot in [0, 1] {
            apply(
                &mut world,
                Command::FireProjectile {
                    slot: SlotIndex::new(slot),
                    target: TargetUid::new(1),
                    column: 0,
                },
                &mut events,
            );
        }
        assert_eq!(
            events.last(),
            Some(&Event::FireRejected {
                slot: SlotIndex::new(1),
                target: TargetUid::new(1),
                reason: FireError::AlreadyReserved,
            })
        );
        assert_eq!(query::reserved_targets(&world), 1);
    }

    #[test]
    fn expired_arrival_releases_reservation() {
        let spec = level(&["R", "R"], &[(ColorCode::Red, 3)], 1);
        let mut world = seated_world(&spec, &[0]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::FireProjectile {
                slot: SlotIndex::new(0),
                target: TargetUid::new(1),
                column: 0,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::ResolveProjectile {
                projectile: ProjectileId::new(1),
                arrival: ProjectileArrival::Arrived,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::FireProjectile {
                slot: SlotIndex::new(0),
                target: TargetUid::new(2),
                column: 0,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::ResolveProjectile {
                projectile: ProjectileId::new(2),
                arrival: ProjectileArrival::Expired,
            },
            &mut events,
        );
        assert_eq!(
            events.last(),
            Some(&Event::ProjectileExpired {
                projectile: ProjectileId::new(2),
                target: TargetUid::new(2),
                reachable: true,
            })
        );
        assert!(!query::is_reserved(&world, TargetUid::new(2)));
        assert_eq!(query::remaining_targets(&world), 1);
        assert_eq!(query::projectiles_in_flight(&world), 0);
    }

    #[test]
    fn arrival_after_front_changed_is_stale() {
        let mut world = World::new();
        let mut events = Vec::new();
        load_level(&mut world, &level(&["RRRRRR"], &[], 1), &mut events).expect("valid level");
        let spec = level(&["..R", "..R"], &[(ColorCode::Red, 3)], 1);
        load_level(&mut world, &spec, &mut events).expect("valid level");
        apply(&mut world, Command::SelectSupply { column: 0 }, &mut events);
        apply(
            &mut world,
            Command::MarkSeated {
                shooter: ShooterId::new(1),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::FireProjectile {
                slot: SlotIndex::new(0),
                target: TargetUid::new(7),
                column: 2,
            },
            &mut events,
        );
        assert!(query::is_reserved(&world, TargetUid::new(7)));

        let red = ColorToken::from(ColorCode::Red);
        let _ = world.board.resolve_hit(2, &red).expect("front matches");
        events.clear();
        apply(
            &mut world,
            Command::ResolveProjectile {
                projectile: ProjectileId::new(1),
                arrival: ProjectileArrival::Arrived,
            },
            &mut events,
        );

        assert_eq!(
            events,
            vec![Event::ProjectileStale {
                projectile: ProjectileId::new(1),
                target: TargetUid::new(7),
                reachable: true,
            }]
        );
        assert!(!query::is_reserved(&world, TargetUid::new(7)));
        assert_eq!(query::remaining_targets(&world), 1);
        let front: Vec<u32> = query::front_row(&world).iter().map(|t| t.uid.get()).collect();
        assert_eq!(front, vec![8]);
    }

    #[test]
    fn clearing_the_board_wins_once_and_blocks_failure() {
        let spec = level(&["R"], &[(ColorCode::Red, 1)], 1);
        let mut world = seated_world(&spec, &[0]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::FireProjectile {
                slot: SlotIndex::new(0),
                target: TargetUid::new(1),
                column: 0,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::ResolveProjectile {
                projectile: ProjectileId::new(1),
                arrival: ProjectileArrival::Arrived,
            },
            &mut events,
        );
        apply(&mut world, Command::DeclareFailure, &mut events);

        let wins = events.iter().filter(|e| **e == Event::LevelWon).count();
        assert_eq!(wins, 1);
        assert!(!events.contains(&Event::LevelFailed));
        assert_eq!(query::outcome(&world), Some(LevelOutcome::Won));
    }

    #[test]
    fn merge_reserves_median_slot_and_keeper_takes_sum() {
        let spec = level(
            &["B"],
            &[
                (ColorCode::Green, 10),
                (ColorCode::Green, 20),
                (ColorCode::Green, 30),
            ],
            4,
        );
        let mut world = seated_world(&spec, &[0, 1, 2]);
        let mut events = Vec::new();
        let ids = [ShooterId::new(3), ShooterId::new(1), ShooterId::new(2)];

        apply(&mut world, Command::BeginMerge { members: ids }, &mut events);
        assert!(query::merge_gathering(&world));
        assert_eq!(
            events[0],
            Event::MergeStarted {
                members: [ShooterId::new(1), ShooterId::new(2), ShooterId::new(3)],
                color: ColorCode::Green,
                reserved_slot: SlotIndex::new(1),
            }
        );
        assert!(!query::all_slots_full(&world));

        apply(&mut world, Command::ResolveMerge, &mut events);
        apply(&mut world, Command::ReseatKeeper, &mut events);
        apply(
            &mut world,
            Command::MarkSeated {
                shooter: ShooterId::new(1),
            },
            &mut events,
        );

        let view = query::shooter_view(&world);
        let shooters: Vec<_> = view.iter().collect();
        assert_eq!(shooters.len(), 1);
        assert_eq!(shooters[0].id, ShooterId::new(1));
        assert_eq!(shooters[0].ammo, 60);
        assert_eq!(shooters[0].slot, Some(SlotIndex::new(1)));
        assert!(query::is_seated(&world, ShooterId::new(1)));
        assert!(!query::merge_pending(&world));
    }

    #[test]
    fn merge_with_missing_member_aborts_and_discards_survivors() {
        let spec = level(
            &["B"],
            &[
                (ColorCode::Green, 1),
                (ColorCode::Green, 1),
                (ColorCode::Green, 1),
            ],
            3,
        );
        let mut world = seated_world(&spec, &[0, 1, 2]);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::BeginMerge {
                members: [ShooterId::new(1), ShooterId::new(2), ShooterId::new(3)],
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::RetireShooter {
                shooter: ShooterId::new(2),
            },
            &mut events,
        );
        events.clear();
        apply(&mut world, Command::ResolveMerge, &mut events);

        assert_eq!(
            events,
            vec![Event::MergeAborted {
                reserved_slot: SlotIndex::new(1),
                discarded: vec![ShooterId::new(1), ShooterId::new(3)],
            }]
        );
        assert_eq!(query::shooter_view(&world).iter().count(), 0);
        assert!(query::slot_view(&world)
            .iter()
            .all(|slot| slot.state == slot_volley_core::SlotState::Empty));
    }

    #[test]
    fn drop_uses_nearest_empty_slot() {
        let spec = level(&["R"], &[(ColorCode::Red, 1)], 3);
        let mut world = World::new();
        let mut events = Vec::new();
        load_level(&mut world, &spec, &mut events).expect("valid level");
        events.clear();
        apply(
            &mut world,
            Command::DropSupply {
                column: 0,
                position: WorldPoint::new(3.8, 0.0, -4.0),
            },
            &mut events,
        );
        assert!(matches!(
            events[0],
            Event::ShooterPlaced { slot, .. } if slot == SlotIndex::new(2)
        ));
    }
}

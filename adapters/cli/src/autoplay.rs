//! Placement bot used to play levels without input.

use std::time::Duration;

use slot_volley_session::Session;
use slot_volley_world::query;
use tracing::debug;

/// Places supply blocks whose color is currently exposed on the front row.
#[derive(Debug)]
pub(crate) struct Autoplay {
    interval: Duration,
    cooldown: Duration,
}

impl Autoplay {
    pub(crate) fn new(interval: Duration) -> Self {
        Self {
            interval,
            cooldown: Duration::ZERO,
        }
    }

    /// Picks at most one supply column per interval. Returns the column placed, if any.
    pub(crate) fn act(&mut self, session: &mut Session, dt: Duration) -> Option<u32> {
        self.cooldown = self.cooldown.saturating_sub(dt);
        if !self.cooldown.is_zero() {
            return None;
        }

        let column = choose_column(session)?;
        debug!(column, "autoplay selects supply column");
        session.select_supply(column);
        self.cooldown = self.interval;
        Some(column)
    }
}

fn choose_column(session: &Session) -> Option<u32> {
    let world = session.world();
    if query::outcome(world).is_some()
        || query::merge_pending(world)
        || query::all_slots_full(world)
    {
        return None;
    }

    let front = query::front_row(world);
    let fronts = query::supply_fronts(world);
    let matching = fronts.iter().find_map(|(column, block)| {
        let block = block.as_ref()?;
        front
            .iter()
            .any(|target| block.color.matches(&target.color))
            .then_some(*column)
    });
    if matching.is_some() {
        return matching;
    }

    // Nothing matches the front row; only commit a block while no shooter is waiting to fire.
    if query::shooter_view(world).iter().next().is_some() || query::projectiles_in_flight(world) > 0
    {
        return None;
    }
    fronts
        .iter()
        .find_map(|(column, block)| block.as_ref().map(|_| *column))
}

use std::time::Duration;

use serde::Deserialize;
use slot_volley_system_choreography::ChoreographyConfig;
use slot_volley_system_outcome::OutcomeConfig;
use slot_volley_system_wave::VolleyConfig;

/// Tunable timings of a session, expressed in milliseconds.
///
/// Every field is optional in the TOML form; missing fields keep their
/// defaults.
///
/// ```toml
/// fire_cooldown_ms = 150
/// fail_debounce_ms = 300
/// projectile_speed = 12.0
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Serialized delay between two shots of the volley.
    pub fire_cooldown_ms: u64,
    /// Starvation time with every slot full before the level fails.
    pub fail_debounce_ms: u64,
    /// Failure suppression after a seating.
    pub seat_grace_ms: u64,
    /// Failure suppression after a wave start.
    pub wave_grace_ms: u64,
    /// Extra suppression on top of the merge gather sequence.
    pub merge_grace_margin_ms: u64,
    /// Failure suppression after a merge keeper is re-placed.
    pub keeper_grace_ms: u64,
    /// Supply to slot travel.
    pub placement_travel_ms: u64,
    /// Settling hop after travel.
    pub placement_hop_ms: u64,
    /// Hop played by a shooter that ran out of ammo.
    pub depletion_hop_ms: u64,
    /// First exit leg.
    pub exit_approach_ms: u64,
    /// Second exit leg.
    pub exit_depart_ms: u64,
    /// Merge members rising.
    pub merge_rise_ms: u64,
    /// Merge members converging.
    pub merge_converge_ms: u64,
    /// Merge members collapsing.
    pub merge_collapse_ms: u64,
    /// Keeper jump to the reserved slot.
    pub keeper_jump_ms: u64,
    /// Projectile speed in world units per second.
    pub projectile_speed: f32,
    /// Projectile lifetime.
    pub projectile_lifetime_ms: u64,
}

impl SessionConfig {
    /// Parses a configuration from TOML text.
    pub fn from_toml(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Volley settings.
    #[must_use]
    pub fn volley(&self) -> VolleyConfig {
        VolleyConfig::new(millis(self.fire_cooldown_ms))
    }

    /// Choreography settings.
    #[must_use]
    pub fn choreography(&self) -> ChoreographyConfig {
        ChoreographyConfig {
            placement_travel: millis(self.placement_travel_ms),
            placement_hop: millis(self.placement_hop_ms),
            depletion_hop: millis(self.depletion_hop_ms),
            exit_approach: millis(self.exit_approach_ms),
            exit_depart: millis(self.exit_depart_ms),
            merge_rise: millis(self.merge_rise_ms),
            merge_converge: millis(self.merge_converge_ms),
            merge_collapse: millis(self.merge_collapse_ms),
            keeper_jump: millis(self.keeper_jump_ms),
            projectile_speed: self.projectile_speed,
            projectile_lifetime: millis(self.projectile_lifetime_ms),
        }
    }

    /// Outcome monitor settings. The merge window spans the gather sequence plus the margin.
    #[must_use]
    pub fn outcome(&self) -> OutcomeConfig {
        OutcomeConfig {
            fail_debounce: millis(self.fail_debounce_ms),
            seat_grace: millis(self.seat_grace_ms),
            wave_grace: millis(self.wave_grace_ms),
            merge_grace: self.choreography().merge_gather() + millis(self.merge_grace_margin_ms),
            keeper_grace: millis(self.keeper_grace_ms),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            fire_cooldown_ms: 150,
            fail_debounce_ms: 300,
            seat_grace_ms: 200,
            wave_grace_ms: 150,
            merge_grace_margin_ms: 100,
            keeper_grace_ms: 150,
            placement_travel_ms: 400,
            placement_hop_ms: 180,
            depletion_hop_ms: 180,
            exit_approach_ms: 400,
            exit_depart_ms: 450,
            merge_rise_ms: 250,
            merge_converge_ms: 350,
            merge_collapse_ms: 200,
            keeper_jump_ms: 500,
            projectile_speed: 12.0,
            projectile_lifetime_ms: 8_000,
        }
    }
}

fn millis(value: u64) -> Duration {
    Duration::from_millis(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_system_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.volley(), VolleyConfig::default());
        assert_eq!(config.choreography(), ChoreographyConfig::default());
        assert_eq!(config.outcome(), OutcomeConfig::default());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = SessionConfig::from_toml("fail_debounce_ms = 500\nprojectile_speed = 6.0\n")
            .expect("valid config");
        assert_eq!(config.fail_debounce_ms, 500);
        assert_eq!(config.projectile_speed, 6.0);
        assert_eq!(config.fire_cooldown_ms, 150);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(SessionConfig::from_toml("fire_rate = 3").is_err());
    }
}

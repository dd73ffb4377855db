//! Tunable battle rules, loadable from RON.

use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Most living combatants a side may field when summoning or reviving.
    pub side_cap: usize,
    pub revive_hp_fraction: f32,
    pub crit_multiplier: f32,
    /// AI scores receive a uniform jitter of +/- this amount.
    pub ai_jitter: f32,
    /// Percent chance that an AI attacker follows a taunt marker.
    pub taunt_follow_chance: u8,
    /// Flat parry chance granted by the `Parry` status.
    pub legacy_parry_chance: f32,
    /// Multiplier share used for the second target of a pierce skill.
    pub pierce_secondary_fraction: f32,
    /// Damage-taken multiplier of the one-turn defend stance.
    pub defend_damage_taken: f32,
    /// Safety valve: the battle is called after this many turns.
    pub max_turns: u32,
    /// Seeds the battle RNG. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            side_cap: 3,
            revive_hp_fraction: 0.5,
            crit_multiplier: 1.5,
            ai_jitter: 10.0,
            taunt_follow_chance: 80,
            legacy_parry_chance: 0.5,
            pierce_secondary_fraction: 0.5,
            defend_damage_taken: 0.5,
            max_turns: 500,
            seed: None,
        }
    }
}

impl BattleConfig {
    /// Parses a config from RON text. Missing fields take their defaults.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let config: BattleConfig =
            ron::from_str(text).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.side_cap == 0 {
            return Err(ConfigError::OutOfRange {
                field: "side_cap",
                reason: "must be at least 1".to_string(),
            });
        }
        for (field, value) in [
            ("revive_hp_fraction", self.revive_hp_fraction),
            ("legacy_parry_chance", self.legacy_parry_chance),
            ("pierce_secondary_fraction", self.pierce_secondary_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange {
                    field,
                    reason: format!("{} is not a fraction", value),
                });
            }
        }
        for (field, value) in [
            ("crit_multiplier", self.crit_multiplier),
            ("ai_jitter", self.ai_jitter),
            ("defend_damage_taken", self.defend_damage_taken),
        ] {
            if value < 0.0 {
                return Err(ConfigError::OutOfRange {
                    field,
                    reason: format!("{} is negative", value),
                });
            }
        }
        if self.taunt_follow_chance > 100 {
            return Err(ConfigError::OutOfRange {
                field: "taunt_follow_chance",
                reason: format!("{} is above 100", self.taunt_follow_chance),
            });
        }
        Ok(())
    }
}

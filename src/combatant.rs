use crate::battle::ai::Intent;
use crate::battle::buffs::{ActiveBuff, CombatModifiers};
use crate::battle::conditions::StatusEffect;
use crate::battle::stats::{derive_stats, DerivedStats};
use schema::{Attributes, Element, MonsterData, StatusKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena handle of a combatant inside a `Battle`. Handles stay valid for the whole
/// battle because combatants are never removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CombatantId(pub u32);

impl fmt::Display for CombatantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Hero,
    Enemy,
}

impl Side {
    pub fn opponent(self) -> Side {
        match self {
            Side::Hero => Side::Enemy,
            Side::Enemy => Side::Hero,
        }
    }

    pub fn index(self) -> usize {
        match self {
            Side::Hero => 0,
            Side::Enemy => 1,
        }
    }
}

/// Who picks this combatant's actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Controller {
    Player,
    Ai,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combatant {
    pub id: CombatantId,
    pub name: String,
    /// Key of the static definition this combatant was hydrated from.
    pub definition_id: String,
    pub side: Side,
    pub controller: Controller,
    pub is_summon: bool,
    pub level: u32,
    pub base_attributes: Attributes,
    /// Base attributes as captured by the first stat recompute.
    pub(crate) attribute_snapshot: Option<Attributes>,
    /// Base attributes plus every active buff/debuff delta.
    pub attributes: Attributes,
    pub stats: DerivedStats,
    pub hp: u32,
    pub mana: u32,
    pub status_effects: Vec<StatusEffect>,
    pub buffs: Vec<ActiveBuff>,
    pub debuffs: Vec<ActiveBuff>,
    pub skills: Vec<String>,
    pub element: Option<Element>,
    pub modifiers: CombatModifiers,
    pub next_intent: Option<Intent>,
}

impl Combatant {
    /// Hydrates a combatant from a static definition at the given level,
    /// with full hp and mana.
    pub fn from_definition(
        id: CombatantId,
        definition: &MonsterData,
        level: u32,
        side: Side,
        controller: Controller,
    ) -> Self {
        let level = level.max(1);
        let stats = derive_stats(level, &definition.attributes);
        Combatant {
            id,
            name: definition.name.clone(),
            definition_id: definition.id.clone(),
            side,
            controller,
            is_summon: false,
            level,
            base_attributes: definition.attributes,
            attribute_snapshot: None,
            attributes: definition.attributes,
            stats,
            hp: stats.max_hp,
            mana: stats.max_mana,
            status_effects: Vec::new(),
            buffs: Vec::new(),
            debuffs: Vec::new(),
            skills: definition.skills.clone(),
            element: definition.element,
            modifiers: CombatModifiers::default(),
            next_intent: None,
        }
    }

    pub fn max_hp(&self) -> u32 {
        self.stats.max_hp
    }

    pub fn max_mana(&self) -> u32 {
        self.stats.max_mana
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_dead(&self) -> bool {
        self.hp == 0
    }

    /// Current hp as a percentage of max hp, `0.0..=100.0`.
    pub fn hp_percent(&self) -> f32 {
        if self.max_hp() == 0 {
            return 0.0;
        }
        self.hp as f32 * 100.0 / self.max_hp() as f32
    }

    pub fn mana_percent(&self) -> f32 {
        if self.max_mana() == 0 {
            return 100.0;
        }
        self.mana as f32 * 100.0 / self.max_mana() as f32
    }

    pub fn status(&self, kind: StatusKind) -> Option<&StatusEffect> {
        self.status_effects.iter().find(|s| s.kind == kind)
    }

    pub fn has_status(&self, kind: StatusKind) -> bool {
        self.status(kind).is_some()
    }

    pub fn has_negative_status(&self) -> bool {
        self.status_effects.iter().any(|s| s.kind.is_negative())
    }

    /// Stunned or frozen: the combatant cannot act this round.
    pub fn is_incapacitated(&self) -> bool {
        self.status_effects.iter().any(|s| s.kind.is_incapacitating())
    }

    /// Sets hp, clamped to `0..=max_hp`.
    pub fn set_hp(&mut self, hp: u32) {
        self.hp = hp.min(self.max_hp());
    }

    pub fn set_mana(&mut self, mana: u32) {
        self.mana = mana.min(self.max_mana());
    }

    /// Removes up to `amount` hp. Returns the hp actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.hp);
        self.hp -= lost;
        lost
    }

    /// Restores up to `amount` hp. Returns the hp actually gained.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let gained = amount.min(self.max_hp() - self.hp);
        self.hp += gained;
        gained
    }

    pub fn restore_mana(&mut self, amount: u32) -> u32 {
        let gained = amount.min(self.max_mana() - self.mana);
        self.mana += gained;
        gained
    }

    /// Clamps hp and mana after a max-value change.
    pub(crate) fn clamp_resources(&mut self) {
        self.hp = self.hp.min(self.max_hp());
        self.mana = self.mana.min(self.max_mana());
    }

    pub fn knows_skill(&self, skill_id: &str) -> bool {
        self.skills.iter().any(|s| s == skill_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn blank_monster() -> MonsterData {
        MonsterData {
            id: "dummy".to_string(),
            name: "Dummy".to_string(),
            attributes: Attributes::new(10, 10, 10, 10, 10, 10),
            skills: vec!["power_strike".to_string()],
            element: None,
            rewards: Default::default(),
        }
    }

    #[test]
    fn hydration_fills_resources() {
        let c = Combatant::from_definition(CombatantId(0), &blank_monster(), 5, Side::Enemy, Controller::Ai);
        assert_eq!(c.max_hp(), 5 * 100 + 10 * 25);
        assert_eq!(c.hp, c.max_hp());
        assert_eq!(c.mana, c.max_mana());
        assert!(c.knows_skill("power_strike"));
    }

    #[test]
    fn damage_and_heal_are_clamped() {
        let mut c = Combatant::from_definition(CombatantId(0), &blank_monster(), 1, Side::Hero, Controller::Player);
        let max = c.max_hp();
        assert_eq!(c.heal(50), 0);
        assert_eq!(c.take_damage(max + 100), max);
        assert!(c.is_dead());
        assert_eq!(c.take_damage(10), 0);
        assert_eq!(c.heal(30), 30);
        c.set_hp(u32::MAX);
        assert_eq!(c.hp, max);
    }

    #[test]
    fn level_zero_is_treated_as_one() {
        let c = Combatant::from_definition(CombatantId(0), &blank_monster(), 0, Side::Hero, Controller::Player);
        assert_eq!(c.level, 1);
    }
}

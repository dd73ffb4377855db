use crate::combat_types::{
    AttributeDeltas, Attributes, DamageType, Element, StatDeltas, StatusKind, TargetShape,
};
use serde::{Deserialize, Serialize};

fn one_hit() -> u8 {
    1
}

/// A status effect a skill may attach to the targets it strikes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAttachment {
    pub kind: StatusKind,
    /// Application chance in `0.0..=1.0`.
    pub chance: f32,
    pub duration: u32,
}

/// The optional-field payload of a buff or debuff.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuffPayload {
    pub attributes: AttributeDeltas,
    pub stats: StatDeltas,
    /// Multiplier on damage the bearer deals.
    pub damage_dealt: Option<f32>,
    /// Multiplier on damage the bearer takes.
    pub damage_taken: Option<f32>,
    /// Added crit chance, as a fraction (0.1 = +10 percentage points).
    pub crit_bonus: Option<f32>,
    pub parry_chance: Option<f32>,
    pub taunt_chance: Option<f32>,
    /// Fraction of incoming damage sent back to the attacker.
    pub reflect: Option<f32>,
}

impl BuffPayload {
    /// A short human-readable description used to synthesize identities
    /// for buffs that carry neither an explicit id nor a source skill.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        let a = &self.attributes;
        for (name, value) in [
            ("str", a.strength),
            ("agi", a.agility),
            ("vit", a.vitality),
            ("int", a.intelligence),
            ("dex", a.dexterity),
            ("luk", a.luck),
        ] {
            if value != 0 {
                parts.push(format!("{name}{value:+}"));
            }
        }
        let s = &self.stats;
        for (name, value) in [
            ("atk", s.atk),
            ("matk", s.matk),
            ("softdef", s.soft_def),
            ("harddef", s.hard_def),
            ("mdef", s.mdef),
            ("hit", s.hit),
            ("flee", s.flee),
            ("crit", s.crit),
            ("aspd", s.aspd),
        ] {
            if value != 0 {
                parts.push(format!("{name}{value:+}"));
            }
        }
        for (name, value) in [
            ("dealt", self.damage_dealt),
            ("taken", self.damage_taken),
            ("critbonus", self.crit_bonus),
            ("parry", self.parry_chance),
            ("taunt", self.taunt_chance),
            ("reflect", self.reflect),
        ] {
            if let Some(value) = value {
                parts.push(format!("{name}x{value}"));
            }
        }
        if parts.is_empty() {
            "empty".to_string()
        } else {
            parts.join(",")
        }
    }

    /// Whether the payload only ever hurts its bearer. A damage-free skill
    /// carrying such a payload is aimed at opponents.
    pub fn is_harmful(&self) -> bool {
        let a = &self.attributes;
        let s = &self.stats;
        let attr_values = [
            a.strength,
            a.agility,
            a.vitality,
            a.intelligence,
            a.dexterity,
            a.luck,
        ];
        let stat_values = [
            s.atk, s.matk, s.soft_def, s.hard_def, s.mdef, s.hit, s.flee, s.crit, s.aspd,
        ];
        let any_positive = attr_values.iter().chain(stat_values.iter()).any(|v| *v > 0)
            || self.damage_dealt.is_some_and(|m| m > 1.0)
            || self.damage_taken.is_some_and(|m| m < 1.0)
            || self.crit_bonus.is_some_and(|c| c > 0.0)
            || self.parry_chance.is_some()
            || self.taunt_chance.is_some()
            || self.reflect.is_some();
        !any_positive
    }
}

/// A buff or debuff as authored on a skill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuffTemplate {
    #[serde(default)]
    pub id: Option<String>,
    pub duration: u32,
    pub payload: BuffPayload,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillData {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mana_cost: u32,
    /// Damage multiplier applied to ATK/MATK. Zero for support skills.
    #[serde(default)]
    pub multiplier: f32,
    pub damage_type: DamageType,
    pub target: TargetShape,
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(default)]
    pub statuses: Vec<StatusAttachment>,
    /// Applied to allied targets for support skills, to the caster for offensive ones.
    #[serde(default)]
    pub buff: Option<BuffTemplate>,
    /// Applied to every struck target on the first hit, or to every target of a hindrance.
    #[serde(default)]
    pub debuff: Option<BuffTemplate>,
    #[serde(default = "one_hit")]
    pub hits: u8,
    /// Added crit chance as a fraction.
    #[serde(default)]
    pub crit_bonus: f32,
    /// Fraction of the target's defense ignored, `0.0..=1.0`.
    #[serde(default)]
    pub ignore_def: f32,
    #[serde(default)]
    pub ultimate: bool,
    /// Monster id summoned by a `Summon` skill. Each key is usable once per side per battle.
    #[serde(default)]
    pub summon: Option<String>,
    /// Healing as a multiplier of the caster's MATK.
    #[serde(default)]
    pub heal: Option<f32>,
    #[serde(default)]
    pub restore_mana: Option<u32>,
    #[serde(default)]
    pub extra_turn: bool,
}

impl SkillData {
    pub fn is_offensive(&self) -> bool {
        self.multiplier > 0.0
    }

    pub fn is_support(&self) -> bool {
        !self.is_offensive()
            && (self.heal.is_some() || self.restore_mana.is_some() || self.buff.is_some())
    }

    /// Deals no damage but weakens its targets: negative statuses or a harmful debuff.
    pub fn is_hindrance(&self) -> bool {
        !self.is_offensive()
            && !self.is_support()
            && (self.statuses.iter().any(|s| s.kind.is_negative())
                || self.debuff.as_ref().is_some_and(|d| d.payload.is_harmful()))
    }

    /// Whether single targets are picked from the opposing side.
    pub fn targets_opponents(&self) -> bool {
        self.is_offensive() || self.is_hindrance()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewards {
    pub exp: u32,
    pub gold: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonsterData {
    pub id: String,
    pub name: String,
    pub attributes: Attributes,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub element: Option<Element>,
    #[serde(default)]
    pub rewards: Rewards,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemEffect {
    Heal(u32),
    RestoreMana(u32),
    /// Removes every negative status effect.
    Cure,
    /// Revives a fallen ally under the same rules as a revive skill.
    Revive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemData {
    pub id: String,
    pub name: String,
    pub effect: ItemEffect,
}

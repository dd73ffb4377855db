use serde::{Deserialize, Serialize};
use std::fmt;
use strum::EnumIter;

/// Elemental affinity of an attack or a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, EnumIter)]
pub enum Element {
    Fire,
    Water,
    Earth,
    Wind,
    Holy,
    Shadow,
    Poison,
    Undead,
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl Element {
    /// Damage multiplier for an attacking element against a defending element.
    /// Returns: > 1.0 = weakness, 1.0 = neutral, < 1.0 = resisted,
    /// 0.0 = immune, negative = the defender absorbs the hit as healing.
    pub fn multiplier(attacking: Element, defending: Element) -> f32 {
        use Element::*;

        match (attacking, defending) {
            // The four natural elements form a cycle: Fire > Earth > Wind > Water > Fire
            (Fire, Earth) | (Earth, Wind) | (Wind, Water) | (Water, Fire) => 1.5,
            (Fire, Water) | (Earth, Fire) | (Wind, Earth) | (Water, Wind) => 0.75,
            (Fire, Fire) | (Earth, Earth) | (Wind, Wind) | (Water, Water) => 0.25,
            (Fire, Undead) => 1.25,

            // Holy
            (Holy, Undead) => 2.0,
            (Holy, Shadow) => 1.75,
            (Holy, Holy) => 0.0,

            // Shadow
            (Shadow, Holy) => 1.75,
            (Shadow, Shadow) => 0.0,
            (Shadow, Undead) => -1.0,

            // Poison
            (Poison, Poison) => -0.5,
            (Poison, Undead) => 0.0,

            // Undead
            (Undead, Holy) => 0.5,

            _ => 1.0,
        }
    }
}

/// How a hit is mitigated. `Status` is reserved for damage-over-time ticks,
/// which bypass mitigation and can never miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum DamageType {
    Physical,
    Magic,
    Status,
}

/// The target shape of a skill. The resolver forces the canonical target list
/// for the shapes that have one (`SelfOnly`, `Aoe`, `AoeHeal`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum TargetShape {
    Single,
    Aoe,
    Pierce,
    SelfOnly,
    AoeHeal,
    Summon,
    Revive,
}

impl TargetShape {
    pub fn is_area(self) -> bool {
        matches!(self, TargetShape::Aoe | TargetShape::AoeHeal)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash, EnumIter, strum::Display)]
pub enum StatusKind {
    Poison,
    Burn,
    Bleed,
    Stun,
    Freeze,
    Paralyze,
    /// Marker status: forces enemy targeting priority onto the bearer.
    Taunt,
    /// Marker status: flat parry chance independent of buffs.
    Parry,
}

impl StatusKind {
    /// Whether the status is harmful to its bearer. Cure effects only remove these.
    pub fn is_negative(self) -> bool {
        !matches!(self, StatusKind::Taunt | StatusKind::Parry)
    }

    /// Whether the status prevents the bearer from acting.
    pub fn is_incapacitating(self) -> bool {
        matches!(self, StatusKind::Stun | StatusKind::Freeze)
    }
}

/// The six primary attributes every combatant is built from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Attributes {
    pub strength: u32,
    pub agility: u32,
    pub vitality: u32,
    pub intelligence: u32,
    pub dexterity: u32,
    pub luck: u32,
}

impl Attributes {
    pub fn new(
        strength: u32,
        agility: u32,
        vitality: u32,
        intelligence: u32,
        dexterity: u32,
        luck: u32,
    ) -> Self {
        Self {
            strength,
            agility,
            vitality,
            intelligence,
            dexterity,
            luck,
        }
    }

    /// Applies signed deltas, flooring every attribute at zero.
    pub fn with_deltas(self, deltas: &AttributeDeltas) -> Self {
        let apply = |base: u32, delta: i32| (base as i64 + delta as i64).max(0) as u32;
        Self {
            strength: apply(self.strength, deltas.strength),
            agility: apply(self.agility, deltas.agility),
            vitality: apply(self.vitality, deltas.vitality),
            intelligence: apply(self.intelligence, deltas.intelligence),
            dexterity: apply(self.dexterity, deltas.dexterity),
            luck: apply(self.luck, deltas.luck),
        }
    }
}

/// Signed attribute changes carried by a buff or debuff. Debuff values are negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeDeltas {
    pub strength: i32,
    pub agility: i32,
    pub vitality: i32,
    pub intelligence: i32,
    pub dexterity: i32,
    pub luck: i32,
}

impl AttributeDeltas {
    pub fn accumulate(&mut self, other: &AttributeDeltas) {
        self.strength += other.strength;
        self.agility += other.agility;
        self.vitality += other.vitality;
        self.intelligence += other.intelligence;
        self.dexterity += other.dexterity;
        self.luck += other.luck;
    }
}

/// Signed flat changes to derived stats, overlaid after re-derivation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatDeltas {
    pub atk: i32,
    pub matk: i32,
    pub soft_def: i32,
    pub hard_def: i32,
    pub mdef: i32,
    pub hit: i32,
    pub flee: i32,
    pub crit: i32,
    pub aspd: i32,
}

impl StatDeltas {
    pub fn accumulate(&mut self, other: &StatDeltas) {
        self.atk += other.atk;
        self.matk += other.matk;
        self.soft_def += other.soft_def;
        self.hard_def += other.hard_def;
        self.mdef += other.mdef;
        self.hit += other.hit;
        self.flee += other.flee;
        self.crit += other.crit;
        self.aspd += other.aspd;
    }
}

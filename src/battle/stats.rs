use schema::{Attributes, Element, StatDeltas};
use serde::{Deserialize, Serialize};

/// Combat stats derived from level and attributes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedStats {
    pub max_hp: u32,
    pub max_mana: u32,
    pub atk: u32,
    pub matk: u32,
    pub soft_def: u32,
    pub hard_def: u32,
    pub mdef: u32,
    pub hit: u32,
    pub flee: u32,
    pub crit: u32,
    pub aspd: u32,
}

impl DerivedStats {
    /// Overlays flat deltas that do not pass through re-derivation.
    /// Stats floor at zero.
    pub fn with_deltas(self, deltas: &StatDeltas) -> Self {
        let apply = |base: u32, delta: i32| (base as i64 + delta as i64).max(0) as u32;
        Self {
            max_hp: self.max_hp,
            max_mana: self.max_mana,
            atk: apply(self.atk, deltas.atk),
            matk: apply(self.matk, deltas.matk),
            soft_def: apply(self.soft_def, deltas.soft_def),
            hard_def: apply(self.hard_def, deltas.hard_def),
            mdef: apply(self.mdef, deltas.mdef),
            hit: apply(self.hit, deltas.hit),
            flee: apply(self.flee, deltas.flee),
            crit: apply(self.crit, deltas.crit),
            aspd: apply(self.aspd, deltas.aspd),
        }
    }
}

/// Derive every combat stat from level and the six primary attributes.
///
/// The coefficients are all multiples of one tenth, so each formula is evaluated
/// in tenths and floored once at the end to stay exact.
pub fn derive_stats(level: u32, attrs: &Attributes) -> DerivedStats {
    let lv = level as u64;
    let str_ = attrs.strength as u64;
    let agi = attrs.agility as u64;
    let vit = attrs.vitality as u64;
    let int = attrs.intelligence as u64;
    let dex = attrs.dexterity as u64;
    let luk = attrs.luck as u64;

    let tenths = |sum: u64| (sum / 10) as u32;

    DerivedStats {
        max_hp: (lv * 100 + vit * 25) as u32,
        max_mana: (lv * 15 + int * 8) as u32,
        atk: tenths(str_ * 20 + lv * 15 + dex * 5 + luk * 3) + 50,
        matk: tenths(int * 20 + lv * 12 + dex * 4 + luk * 3) + 30,
        soft_def: tenths(vit * 8 + agi * 3 + lv * 5),
        hard_def: tenths(200 + lv * 3),
        hit: tenths(1750 + lv * 20 + dex * 15 + luk * 5),
        flee: tenths(1000 + lv * 20 + agi * 15 + luk * 5),
        crit: tenths(10 + luk * 4 + lv),
        aspd: tenths(1500 + agi * 5 + dex * 3 + lv * 2),
        mdef: tenths(int * 12 + vit * 6 + lv * 8),
    }
}

/// Bonus for out-levelling the target: +2% per level of gap, capped at 2x.
pub fn level_gap_multiplier(attacker_level: u32, target_level: u32) -> f32 {
    if attacker_level <= target_level {
        return 1.0;
    }
    let gap = (attacker_level - target_level) as f32;
    (1.0 + 0.02 * gap).min(2.0)
}

/// Elemental multiplier for an optional attack element against an optional affinity.
/// Either side being elementless is neutral.
pub fn element_multiplier(attack: Option<Element>, defender: Option<Element>) -> f32 {
    match (attack, defender) {
        (Some(a), Some(d)) => Element::multiplier(a, d),
        _ => 1.0,
    }
}

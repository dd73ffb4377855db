//! The damage resolution pipeline: raw power in, hp delta out.

use crate::battle::state::{Battle, BattleEvent, EventBus, TurnRng};
use crate::battle::stats::{element_multiplier, level_gap_multiplier};
use crate::combatant::{Combatant, CombatantId};
use schema::{DamageType, Element, StatusKind};

/// Hard defense is a diminishing-returns divisor around this constant.
const HARD_DEF_SCALE: f32 = 4000.0;

/// One call into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DamageRequest {
    /// Power before any pipeline step; crit scaling is already applied by the caller.
    pub raw: f32,
    pub is_crit: bool,
    pub damage_type: DamageType,
    pub element: Option<Element>,
    pub attacker: Option<CombatantId>,
    /// Fraction of the target's defense to ignore.
    pub ignore_def: f32,
    /// Reflected hits never reflect again.
    pub is_reflected: bool,
}

impl DamageRequest {
    pub fn new(raw: f32, damage_type: DamageType, attacker: CombatantId) -> Self {
        Self {
            raw,
            is_crit: false,
            damage_type,
            element: None,
            attacker: Some(attacker),
            ignore_def: 0.0,
            is_reflected: false,
        }
    }

    /// A damage-over-time tick: cannot miss and bypasses every modifier.
    pub fn status_tick(amount: u32) -> Self {
        Self {
            raw: amount as f32,
            is_crit: false,
            damage_type: DamageType::Status,
            element: None,
            attacker: None,
            ignore_def: 0.0,
            is_reflected: false,
        }
    }

    pub fn with_crit(mut self, is_crit: bool) -> Self {
        self.is_crit = is_crit;
        self
    }

    pub fn with_element(mut self, element: Option<Element>) -> Self {
        self.element = element;
        self
    }

    pub fn ignoring_def(mut self, fraction: f32) -> Self {
        self.ignore_def = fraction.clamp(0.0, 1.0);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DamageOutcome {
    /// The target was already dead or does not exist.
    Ignored,
    Missed,
    Immune,
    Absorbed { healed: u32 },
    Parried,
    Dealt { amount: u32, killed: bool },
}

impl DamageOutcome {
    /// Whether the hit connected, for first-hit-only attachments.
    pub fn landed(&self) -> bool {
        matches!(self, DamageOutcome::Dealt { .. })
    }
}

/// `max(1, floor((damage - soft) * 4000 / (4000 + hard)))` with both defenses
/// scaled by the part not ignored.
pub fn mitigate_physical(damage: f32, soft_def: u32, hard_def: u32, ignore_def: f32) -> f32 {
    let keep = 1.0 - ignore_def;
    let after_soft = damage - soft_def as f32 * keep;
    let mitigated = (after_soft * HARD_DEF_SCALE / (HARD_DEF_SCALE + hard_def as f32 * keep)).floor();
    mitigated.max(1.0)
}

/// `max(1, damage - mdef)` with mdef scaled by the part not ignored.
pub fn mitigate_magic(damage: f32, mdef: u32, ignore_def: f32) -> f32 {
    (damage - mdef as f32 * (1.0 - ignore_def)).max(1.0)
}

/// Power before the pipeline: ATK for physical, MATK for magic.
pub fn raw_power(attacker: &Combatant, damage_type: DamageType, multiplier: f32) -> f32 {
    let base = match damage_type {
        DamageType::Magic => attacker.stats.matk,
        DamageType::Physical | DamageType::Status => attacker.stats.atk,
    };
    base as f32 * multiplier
}

/// Crit chance in percent: base crit plus skill and buff bonuses.
pub fn crit_chance(attacker: &Combatant, skill_crit_bonus: f32) -> f32 {
    attacker.stats.crit as f32 + skill_crit_bonus * 100.0 + attacker.modifiers.crit_bonus * 100.0
}

/// Deterministic forecast of a non-crit hit that lands, for AI scoring.
pub fn estimate_damage(
    attacker: &Combatant,
    target: &Combatant,
    damage_type: DamageType,
    multiplier: f32,
    element: Option<Element>,
    ignore_def: f32,
) -> u32 {
    let mut damage = raw_power(attacker, damage_type, multiplier);
    damage *= level_gap_multiplier(attacker.level, target.level);
    let element_mult = element_multiplier(element, target.element);
    if element_mult <= 0.0 {
        return 0;
    }
    damage *= element_mult;
    damage *= attacker.modifiers.damage_dealt;
    damage = match damage_type {
        DamageType::Magic => mitigate_magic(damage, target.stats.mdef, ignore_def),
        DamageType::Physical => {
            mitigate_physical(damage, target.stats.soft_def, target.stats.hard_def, ignore_def)
        }
        DamageType::Status => damage,
    };
    damage *= target.modifiers.damage_taken;
    damage.floor().max(0.0) as u32
}

/// Runs the pipeline against `target_id`. Each step may end resolution early:
/// miss, elemental immunity or absorption, and parry leave the target's hp
/// untouched (absorption heals instead).
pub fn resolve_damage(
    battle: &mut Battle,
    target_id: CombatantId,
    request: DamageRequest,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> DamageOutcome {
    let Some(target) = battle.get(target_id) else {
        return DamageOutcome::Ignored;
    };
    if target.is_dead() {
        return DamageOutcome::Ignored;
    }
    let target = target.clone();
    let attacker = request
        .attacker
        .and_then(|id| battle.get(id))
        .cloned();
    let is_status = request.damage_type == DamageType::Status;
    let mut damage = request.raw;

    if !is_status {
        // 1. Hit check
        if let Some(attacker) = &attacker {
            if request.damage_type == DamageType::Physical && !request.is_crit && !request.is_reflected {
                let hit_chance = 100.0 + attacker.stats.hit as f32 - target.stats.flee as f32;
                if !rng.roll_percent(hit_chance, "Hit Check") {
                    bus.push(BattleEvent::Missed {
                        attacker: attacker.id,
                        target: target_id,
                    });
                    return DamageOutcome::Missed;
                }
            }

            // 2. Level gap
            damage *= level_gap_multiplier(attacker.level, target.level);
        }

        // 3. Element
        let element_mult = element_multiplier(request.element, target.element);
        if element_mult == 0.0 {
            bus.push(BattleEvent::ElementalImmunity { target: target_id });
            return DamageOutcome::Immune;
        }
        if element_mult < 0.0 {
            let amount = (damage * element_mult.abs()).floor() as u32;
            let healed = battle
                .get_mut(target_id)
                .map(|t| t.heal(amount))
                .unwrap_or(0);
            bus.push(BattleEvent::DamageAbsorbed {
                target: target_id,
                amount: healed,
            });
            return DamageOutcome::Absorbed { healed };
        }
        damage *= element_mult;

        // 4. Attacker's dealt multiplier
        if let Some(attacker) = &attacker {
            damage *= attacker.modifiers.damage_dealt;
        }

        // 5. Mitigation. Crits skip it entirely.
        if !request.is_crit {
            damage = match request.damage_type {
                DamageType::Magic => mitigate_magic(damage, target.stats.mdef, request.ignore_def),
                _ => mitigate_physical(
                    damage,
                    target.stats.soft_def,
                    target.stats.hard_def,
                    request.ignore_def,
                ),
            };
        }

        // 6. Target's taken multiplier
        damage *= target.modifiers.damage_taken;

        // 7. Parry
        let mut parry_chance = target.modifiers.parry_chance;
        if target.has_status(StatusKind::Parry) {
            parry_chance = parry_chance.max(battle.config.legacy_parry_chance);
        }
        if rng.roll_chance(parry_chance, "Parry Check") {
            bus.push(BattleEvent::Parried { target: target_id });
            return DamageOutcome::Parried;
        }
    }

    let amount = damage.floor().max(0.0) as u32;

    // 8. Reflect, one level deep
    if !is_status && !request.is_reflected && target.modifiers.reflect > 0.0 {
        if let Some(attacker) = attacker.as_ref().filter(|a| a.is_alive()) {
            let reflected = (amount as f32 * target.modifiers.reflect).floor();
            if reflected >= 1.0 {
                bus.push(BattleEvent::Reflected {
                    reflector: target_id,
                    attacker: attacker.id,
                    amount: reflected as u32,
                });
                let bounce = DamageRequest {
                    raw: reflected,
                    is_crit: false,
                    damage_type: request.damage_type,
                    element: None,
                    attacker: Some(target_id),
                    ignore_def: 0.0,
                    is_reflected: true,
                };
                resolve_damage(battle, attacker.id, bounce, rng, bus);
            }
        }
    }

    // 9. Apply
    apply_hp_loss(battle, target_id, amount, request.is_crit, bus)
}

fn apply_hp_loss(
    battle: &mut Battle,
    target_id: CombatantId,
    amount: u32,
    is_crit: bool,
    bus: &mut EventBus,
) -> DamageOutcome {
    let Some(target) = battle.get_mut(target_id) else {
        return DamageOutcome::Ignored;
    };
    let dealt = target.take_damage(amount);
    let remaining_hp = target.hp;
    let killed = target.is_dead();
    bus.push(BattleEvent::DamageApplied {
        target: target_id,
        amount: dealt,
        is_crit,
        remaining_hp,
    });
    if killed {
        tracing::info!(target = %target_id, "combatant defeated");
        bus.push(BattleEvent::Death { target: target_id });
        battle.scheduler.mark_dirty();
    }
    DamageOutcome::Dealt {
        amount: dealt,
        killed,
    }
}

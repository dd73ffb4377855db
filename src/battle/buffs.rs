//! Timed buffs and debuffs, and the stat recompute they drive.

use crate::battle::conditions::TickTiming;
use crate::battle::state::{Battle, BattleEvent, EventBus};
use crate::battle::stats::derive_stats;
use crate::combatant::{Combatant, CombatantId};
use schema::{AttributeDeltas, BuffPayload, BuffTemplate, StatDeltas};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuffKind {
    Buff,
    Debuff,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ActiveBuff {
    pub id: String,
    /// Display name of whoever applied it.
    pub source: String,
    pub duration: u32,
    /// Turn counter value when the entry was applied.
    pub applied_turn: u32,
    pub payload: BuffPayload,
    pub kind: BuffKind,
}

impl ActiveBuff {
    pub fn is_debuff(&self) -> bool {
        self.kind == BuffKind::Debuff
    }
}

/// Aggregated multiplicative and chance modifiers of every active buff and debuff.
/// Rebuilt as a whole by `recalculate_stats`; the damage pipeline only reads it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct CombatModifiers {
    /// Product over all sources.
    pub damage_dealt: f32,
    /// Product over all sources.
    pub damage_taken: f32,
    /// Sum over all sources, as a fraction.
    pub crit_bonus: f32,
    /// Maximum over all sources.
    pub parry_chance: f32,
    /// Maximum over all sources.
    pub taunt_chance: f32,
    /// Maximum over all sources.
    pub reflect: f32,
}

impl Default for CombatModifiers {
    fn default() -> Self {
        Self {
            damage_dealt: 1.0,
            damage_taken: 1.0,
            crit_bonus: 0.0,
            parry_chance: 0.0,
            taunt_chance: 0.0,
            reflect: 0.0,
        }
    }
}

impl CombatModifiers {
    pub fn aggregate<'a>(payloads: impl IntoIterator<Item = &'a BuffPayload>) -> Self {
        payloads
            .into_iter()
            .fold(Self::default(), |mut acc, payload| {
                if let Some(m) = payload.damage_dealt {
                    acc.damage_dealt *= m;
                }
                if let Some(m) = payload.damage_taken {
                    acc.damage_taken *= m;
                }
                if let Some(c) = payload.crit_bonus {
                    acc.crit_bonus += c;
                }
                if let Some(p) = payload.parry_chance {
                    acc.parry_chance = acc.parry_chance.max(p);
                }
                if let Some(t) = payload.taunt_chance {
                    acc.taunt_chance = acc.taunt_chance.max(t);
                }
                if let Some(r) = payload.reflect {
                    acc.reflect = acc.reflect.max(r);
                }
                acc
            })
    }
}

/// Stable identity: the explicit id, else the originating skill, else a
/// description of the payload.
pub fn buff_identity(template: &BuffTemplate, source_skill: Option<&str>) -> String {
    template
        .id
        .clone()
        .or_else(|| source_skill.map(str::to_string))
        .unwrap_or_else(|| format!("buff:{}", template.payload.describe()))
}

pub fn apply_buff(
    battle: &mut Battle,
    target_id: CombatantId,
    template: &BuffTemplate,
    source: &str,
    source_skill: Option<&str>,
    bus: &mut EventBus,
) -> bool {
    push_entry(battle, target_id, template, source, source_skill, BuffKind::Buff, bus)
}

pub fn apply_debuff(
    battle: &mut Battle,
    target_id: CombatantId,
    template: &BuffTemplate,
    source: &str,
    source_skill: Option<&str>,
    bus: &mut EventBus,
) -> bool {
    push_entry(battle, target_id, template, source, source_skill, BuffKind::Debuff, bus)
}

fn push_entry(
    battle: &mut Battle,
    target_id: CombatantId,
    template: &BuffTemplate,
    source: &str,
    source_skill: Option<&str>,
    kind: BuffKind,
    bus: &mut EventBus,
) -> bool {
    let applied_turn = battle.turn_count;
    let Some(target) = battle.get_mut(target_id) else {
        return false;
    };
    if target.is_dead() || template.duration == 0 {
        return false;
    }

    let entry = ActiveBuff {
        id: buff_identity(template, source_skill),
        source: source.to_string(),
        duration: template.duration,
        applied_turn,
        payload: template.payload.clone(),
        kind,
    };
    let event = BattleEvent::BuffApplied {
        target: target_id,
        buff_id: entry.id.clone(),
        is_debuff: entry.is_debuff(),
        duration: entry.duration,
    };
    match kind {
        BuffKind::Buff => target.buffs.push(entry),
        BuffKind::Debuff => target.debuffs.push(entry),
    }
    recalculate_stats(target);
    bus.push(event);
    true
}

/// Turn-end bookkeeping for one combatant. Entries applied during the current
/// turn are left alone; everything else loses one turn and expired entries go.
pub fn process_buffs(battle: &mut Battle, target_id: CombatantId, timing: TickTiming, bus: &mut EventBus) {
    if timing != TickTiming::TurnEnd {
        return;
    }
    let current_turn = battle.turn_count;
    let Some(target) = battle.get_mut(target_id) else {
        return;
    };

    let mut expired = Vec::new();
    for list in [&mut target.buffs, &mut target.debuffs] {
        list.retain_mut(|entry| {
            if entry.applied_turn != current_turn {
                entry.duration = entry.duration.saturating_sub(1);
            }
            if entry.duration == 0 {
                expired.push((entry.id.clone(), entry.is_debuff()));
                false
            } else {
                true
            }
        });
    }

    if expired.is_empty() {
        return;
    }
    recalculate_stats(target);
    for (buff_id, is_debuff) in expired {
        bus.push(BattleEvent::BuffExpired {
            target: target_id,
            buff_id,
            is_debuff,
        });
    }
}

/// Rebuilds attributes, derived stats and combat modifiers from the base
/// attributes and every active entry, then clamps hp and mana.
pub fn recalculate_stats(combatant: &mut Combatant) {
    let base = *combatant
        .attribute_snapshot
        .get_or_insert(combatant.base_attributes);

    let mut attribute_deltas = AttributeDeltas::default();
    let mut stat_deltas = StatDeltas::default();
    for entry in combatant.buffs.iter().chain(combatant.debuffs.iter()) {
        attribute_deltas.accumulate(&entry.payload.attributes);
        stat_deltas.accumulate(&entry.payload.stats);
    }

    let attributes = base.with_deltas(&attribute_deltas);
    combatant.attributes = attributes;
    combatant.stats = derive_stats(combatant.level, &attributes).with_deltas(&stat_deltas);
    combatant.modifiers = CombatModifiers::aggregate(
        combatant
            .buffs
            .iter()
            .chain(combatant.debuffs.iter())
            .map(|entry| &entry.payload),
    );
    combatant.clamp_resources();
}

/// Drops every buff and debuff and recomputes.
pub fn clear_all(combatant: &mut Combatant) {
    combatant.buffs.clear();
    combatant.debuffs.clear();
    recalculate_stats(combatant);
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn payload(damage_taken: Option<f32>, parry: Option<f32>, crit: Option<f32>) -> BuffPayload {
        BuffPayload {
            damage_taken,
            parry_chance: parry,
            crit_bonus: crit,
            ..Default::default()
        }
    }

    #[test]
    fn test_modifier_aggregation_rules() {
        let a = payload(Some(0.5), Some(0.3), Some(0.1));
        let b = payload(Some(0.8), Some(0.2), Some(0.15));
        let modifiers = CombatModifiers::aggregate([&a, &b]);
        assert!((modifiers.damage_taken - 0.4).abs() < 1e-6);
        assert_eq!(modifiers.damage_dealt, 1.0);
        assert_eq!(modifiers.parry_chance, 0.3);
        assert!((modifiers.crit_bonus - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_identity_fallbacks() {
        let mut template = BuffTemplate {
            id: Some("guard".to_string()),
            duration: 2,
            payload: payload(Some(0.5), None, None),
        };
        assert_eq!(buff_identity(&template, Some("iron_wall")), "guard");
        template.id = None;
        assert_eq!(buff_identity(&template, Some("iron_wall")), "iron_wall");
        assert_eq!(buff_identity(&template, None), "buff:takenx0.5");
    }
}

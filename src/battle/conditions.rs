//! Status effects: damage-over-time and incapacitation with resist rolls.

use crate::battle::damage::{resolve_damage, DamageRequest};
use crate::battle::state::{Battle, BattleEvent, EventBus, TurnRng};
use crate::combatant::{Combatant, CombatantId};
use schema::{Attributes, StatusAttachment, StatusKind};
use serde::{Deserialize, Serialize};

/// Resist chances never exceed this many percent.
const MAX_RESIST_PERCENT: f32 = 50.0;
const POISON_TICK_DAMAGE: u32 = 35;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusEffect {
    pub kind: StatusKind,
    /// Remaining turn-start ticks.
    pub duration: u32,
}

/// When in an actor's turn a tick is being processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickTiming {
    TurnStart,
    TurnEnd,
}

/// Percent chance that `attrs` shrugs off a status of this kind.
pub fn resist_chance(kind: StatusKind, attrs: &Attributes) -> f32 {
    let raw = match kind {
        StatusKind::Stun | StatusKind::Poison | StatusKind::Freeze => attrs.vitality as f32 * 0.5,
        StatusKind::Burn | StatusKind::Paralyze => attrs.intelligence as f32 * 0.5,
        StatusKind::Bleed => (attrs.agility + attrs.vitality) as f32 * 0.25,
        StatusKind::Taunt | StatusKind::Parry => 0.0,
    };
    raw.min(MAX_RESIST_PERCENT)
}

/// Fixed damage a ticking status deals to its bearer this turn, or `None` for
/// statuses that do not deal damage.
pub fn tick_damage(kind: StatusKind, bearer: &Combatant) -> Option<u32> {
    match kind {
        StatusKind::Burn => Some((bearer.max_hp() / 20).max(1)),
        StatusKind::Bleed => Some((bearer.hp / 10).max(1)),
        StatusKind::Poison => Some(POISON_TICK_DAMAGE),
        _ => None,
    }
}

/// Upserts a status, keeping the longer of the existing and incoming durations.
pub fn upsert_status(target: &mut Combatant, kind: StatusKind, duration: u32) -> u32 {
    match target.status_effects.iter_mut().find(|s| s.kind == kind) {
        Some(existing) => {
            existing.duration = existing.duration.max(duration);
            existing.duration
        }
        None => {
            target.status_effects.push(StatusEffect { kind, duration });
            duration
        }
    }
}

/// Rolls the attachment's chance, then the target's resist. Returns whether the
/// status landed. Dead or missing targets are ignored.
pub fn apply_status(
    battle: &mut Battle,
    target_id: CombatantId,
    attachment: &StatusAttachment,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> bool {
    let Some(target) = battle.get_mut(target_id) else {
        return false;
    };
    if target.is_dead() || attachment.duration == 0 {
        return false;
    }

    if !rng.roll_chance(attachment.chance, "Status Application") {
        return false;
    }

    let resist = resist_chance(attachment.kind, &target.attributes);
    if rng.roll_percent(resist, "Status Resist") {
        tracing::debug!(target = %target_id, kind = %attachment.kind, resist, "status resisted");
        bus.push(BattleEvent::StatusResisted {
            target: target_id,
            kind: attachment.kind,
        });
        return false;
    }

    let duration = upsert_status(target, attachment.kind, attachment.duration);
    bus.push(BattleEvent::StatusApplied {
        target: target_id,
        kind: attachment.kind,
        duration,
    });
    true
}

/// Runs an actor's status ticks. Only `TurnStart` does anything: damage ticks go
/// through the damage pipeline, incapacitation is checked, then every effect is
/// decremented once and expired ones are purged.
///
/// Returns whether the actor's turn must be skipped.
pub fn process_status_effects(
    battle: &mut Battle,
    actor_id: CombatantId,
    timing: TickTiming,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> bool {
    if timing != TickTiming::TurnStart {
        return false;
    }
    let Some(actor) = battle.get(actor_id) else {
        return false;
    };
    if actor.is_dead() {
        return true;
    }
    let effects = actor.status_effects.clone();

    // 1. Damage ticks
    for effect in &effects {
        let Some(actor) = battle.get(actor_id) else {
            break;
        };
        if actor.is_dead() {
            break;
        }
        if let Some(amount) = tick_damage(effect.kind, actor) {
            bus.push(BattleEvent::StatusDamage {
                target: actor_id,
                kind: effect.kind,
                amount,
            });
            resolve_damage(battle, actor_id, DamageRequest::status_tick(amount), rng, bus);
        }
    }

    let died = battle.get(actor_id).map_or(true, |c| c.is_dead());

    // 2. Incapacitation
    let mut skip_cause = None;
    if !died {
        for effect in &effects {
            let skipped = match effect.kind {
                StatusKind::Stun | StatusKind::Freeze => true,
                StatusKind::Paralyze => rng.roll_percent(50.0, "Paralysis Check"),
                _ => false,
            };
            if skipped {
                skip_cause = Some(effect.kind);
                break;
            }
        }
    }

    // 3. Single decrement point, then purge
    if let Some(actor) = battle.get_mut(actor_id) {
        let mut expired = Vec::new();
        actor.status_effects.retain_mut(|effect| {
            effect.duration = effect.duration.saturating_sub(1);
            if effect.duration == 0 {
                expired.push(effect.kind);
                false
            } else {
                true
            }
        });
        for kind in expired {
            bus.push(BattleEvent::StatusExpired {
                target: actor_id,
                kind,
            });
        }
    }

    if let Some(cause) = skip_cause {
        tracing::debug!(actor = %actor_id, %cause, "turn skipped");
        bus.push(BattleEvent::TurnSkipped {
            actor: actor_id,
            cause,
        });
    }

    died || skip_cause.is_some()
}

/// Removes every negative status. Returns the kinds removed.
pub fn cure_negative_statuses(target: &mut Combatant) -> Vec<StatusKind> {
    let cured: Vec<StatusKind> = target
        .status_effects
        .iter()
        .filter(|s| s.kind.is_negative())
        .map(|s| s.kind)
        .collect();
    target.status_effects.retain(|s| !s.kind.is_negative());
    cured
}

//! A module for defining AI behaviors for battle opponents.

use crate::battle::buffs::buff_identity;
use crate::battle::damage::estimate_damage;
use crate::battle::resolver::PlayerAction;
use crate::battle::state::{Battle, BattleEvent, EventBus, TurnRng};
use crate::combatant::{Combatant, CombatantId, Controller};
use crate::content::ContentLibrary;
use ordered_float::OrderedFloat;
use schema::{DamageType, ItemEffect, SkillData, StatusKind, TargetShape};
use serde::{Deserialize, Serialize};

const ATTACK_BASE_SCORE: f32 = 10.0;
const KILL_CONFIRM_ATTACK: f32 = 500.0;
const KILL_CONFIRM_SKILL: f32 = 250.0;
const OFFENSIVE_SKILL_SCALE: f32 = 20.0;
const INCAPACITATE_VALUE: f32 = 60.0;
const AFFLICT_VALUE: f32 = 30.0;
const DEBUFF_VALUE: f32 = 25.0;

/// A forecast of what an AI combatant will do on its next turn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Intent {
    pub action: PlayerAction,
    pub score: f32,
}

impl Intent {
    /// The primary target, if the action has one.
    pub fn target(&self) -> Option<CombatantId> {
        match &self.action {
            PlayerAction::Attack { target } => Some(*target),
            PlayerAction::UseSkill { targets, .. } => targets.first().copied(),
            PlayerAction::UseItem { target, .. } => *target,
            PlayerAction::Defend => None,
        }
    }
}

/// A trait for any system that can decide on a battle action.
/// This provides a common interface for different AI difficulties or strategies.
pub trait Behavior {
    /// Inspects the battle and decides on the next action for the given combatant.
    /// Returns `None` when the combatant cannot act at all.
    fn decide_action(
        &self,
        actor: CombatantId,
        battle: &Battle,
        content: &ContentLibrary,
        rng: &mut TurnRng,
    ) -> Option<Intent>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScoringAI;

impl ScoringAI {
    pub fn new() -> Self {
        Self
    }

    /// Taunters are followed with the configured chance, scaled by the taunt buff.
    /// Otherwise the most wounded opponent is picked.
    fn pick_offense_target(&self, actor: &Combatant, battle: &Battle, rng: &mut TurnRng) -> Option<CombatantId> {
        let follow = battle.config.taunt_follow_chance as f32;
        let taunter = battle
            .living(actor.side.opponent())
            .filter_map(|c| {
                let strength = if c.has_status(StatusKind::Taunt) {
                    1.0
                } else {
                    c.modifiers.taunt_chance.min(1.0)
                };
                (strength > 0.0).then_some((c.id, follow * strength))
            })
            .fold(None, |best: Option<(CombatantId, f32)>, (id, chance)| match best {
                Some((_, best_chance)) if best_chance >= chance => best,
                _ => Some((id, chance)),
            });

        if let Some((id, chance)) = taunter {
            if rng.roll_percent(chance, "Taunt Follow") {
                return Some(id);
            }
        }
        lowest_hp(battle.living(actor.side.opponent())).map(|c| c.id)
    }

    fn score_attack(&self, actor: &Combatant, target: &Combatant) -> f32 {
        let estimate = estimate_damage(actor, target, DamageType::Physical, 1.0, actor.element, 0.0);
        if estimate >= target.hp {
            ATTACK_BASE_SCORE + KILL_CONFIRM_ATTACK
        } else {
            ATTACK_BASE_SCORE + (100.0 - target.hp_percent()) * 0.5
        }
    }

    fn score_skill(
        &self,
        actor: &Combatant,
        skill: &SkillData,
        offense_target: &Combatant,
        battle: &Battle,
        rng: &mut TurnRng,
    ) -> Option<(PlayerAction, f32)> {
        if skill.mana_cost > actor.mana {
            return None;
        }
        let use_on = |targets: Vec<CombatantId>| PlayerAction::UseSkill {
            skill: skill.id.clone(),
            targets,
        };
        let has_room = battle.living_count(actor.side) < battle.config.side_cap;

        match skill.target {
            TargetShape::Summon => {
                let key = skill.summon.as_ref()?;
                let unused = !battle.side_state(actor.side).used_summons.contains(key);
                return (unused && has_room).then(|| (use_on(Vec::new()), 60.0));
            }
            TargetShape::Revive => {
                let fallen = first_fallen_ally(actor, battle)?;
                return has_room.then(|| (use_on(vec![fallen]), 150.0));
            }
            _ => {}
        }

        if skill.is_offensive() {
            let targets: Vec<&Combatant> = if skill.target == TargetShape::Aoe {
                battle.living(actor.side.opponent()).collect()
            } else {
                vec![offense_target]
            };
            let hits = skill.hits.max(1) as u32;
            let mut score = OFFENSIVE_SKILL_SCALE * skill.multiplier * hits as f32;

            let projects_kill = targets.iter().any(|t| {
                let per_hit = estimate_damage(
                    actor,
                    t,
                    skill.damage_type,
                    skill.multiplier,
                    skill.element,
                    skill.ignore_def,
                );
                per_hit * hits >= t.hp
            });
            if projects_kill {
                score += KILL_CONFIRM_SKILL;
            }

            if skill.ultimate {
                let turn = battle.turn_count;
                if turn < 4 {
                    score -= 100.0;
                }
                if actor.hp_percent() < 30.0 || turn > 8 {
                    score += 80.0;
                }
            }

            if skill.target.is_area() {
                let count = targets.len();
                if count == 1 {
                    score -= 50.0;
                } else {
                    score += 15.0 * count as f32;
                }
            }

            let ids = targets.iter().map(|t| t.id).collect();
            return Some((use_on(ids), score));
        }

        if skill.is_hindrance() {
            let targets: Vec<&Combatant> = match skill.target {
                TargetShape::Aoe => battle.living(actor.side.opponent()).collect(),
                TargetShape::Single | TargetShape::Pierce => vec![offense_target],
                _ => return None,
            };
            let score: f32 = targets.iter().map(|t| hindrance_value(skill, t)).sum();
            if score <= 0.0 {
                return None;
            }
            let ids = targets.iter().map(|t| t.id).collect();
            return Some((use_on(ids), score));
        }

        if !skill.is_support() {
            return None;
        }

        if skill.heal.is_some() {
            if skill.target == TargetShape::SelfOnly {
                let hp = actor.hp_percent();
                let score = if hp < 40.0 { 120.0 + (40.0 - hp) * 2.0 } else { -20.0 };
                return Some((use_on(vec![actor.id]), score));
            }
            let worst = lowest_hp(battle.living(actor.side))?;
            let hp = worst.hp_percent();
            let score = if hp < 60.0 { 60.0 + (60.0 - hp) * 2.0 } else { -20.0 };
            return Some((use_on(vec![worst.id]), score));
        }

        if skill.restore_mana.is_some() {
            let score = if actor.mana_percent() < 30.0 { 50.0 } else { -10.0 };
            return Some((use_on(vec![actor.id]), score));
        }

        // Plain buff: a flat score some of the time.
        let recipient = match skill.target {
            TargetShape::SelfOnly => actor.id,
            _ => lowest_hp(battle.living(actor.side))?.id,
        };
        let score = if rng.roll_percent(30.0, "Buff Gate") { 35.0 } else { 0.0 };
        Some((use_on(vec![recipient]), score))
    }

    fn score_items(&self, actor: &Combatant, battle: &Battle, content: &ContentLibrary) -> Vec<(PlayerAction, f32)> {
        let mut scored = Vec::new();
        for stack in &battle.side_state(actor.side).inventory {
            if stack.quantity == 0 {
                continue;
            }
            let Ok(item) = content.item(&stack.item) else {
                tracing::warn!(item = %stack.item, "inventory holds an unknown item");
                continue;
            };
            let choice = match item.effect {
                ItemEffect::Heal(_) => lowest_hp(battle.living(actor.side)).and_then(|worst| {
                    let hp = worst.hp_percent();
                    if hp < 30.0 {
                        Some((worst.id, 150.0))
                    } else if hp < 60.0 {
                        Some((worst.id, 50.0))
                    } else {
                        None
                    }
                }),
                ItemEffect::RestoreMana(_) => {
                    let mp = actor.mana_percent();
                    if mp < 20.0 {
                        Some((actor.id, 90.0))
                    } else if mp < 50.0 {
                        Some((actor.id, 30.0))
                    } else {
                        None
                    }
                }
                ItemEffect::Cure => battle
                    .living(actor.side)
                    .find(|c| c.has_negative_status())
                    .map(|c| (c.id, 110.0)),
                ItemEffect::Revive => {
                    let has_room = battle.living_count(actor.side) < battle.config.side_cap;
                    first_fallen_ally(actor, battle)
                        .filter(|_| has_room)
                        .map(|id| (id, 140.0))
                }
            };
            if let Some((target, score)) = choice {
                scored.push((
                    PlayerAction::UseItem {
                        item: item.id.clone(),
                        target: Some(target),
                    },
                    score,
                ));
            }
        }
        scored
    }
}

/// What a hindrance adds against one target: statuses it does not already
/// carry, weighted by their chance, plus the debuff if it is not already on.
fn hindrance_value(skill: &SkillData, target: &Combatant) -> f32 {
    let statuses: f32 = skill
        .statuses
        .iter()
        .filter(|a| a.kind.is_negative() && !target.has_status(a.kind))
        .map(|a| {
            let value = if a.kind.is_incapacitating() { INCAPACITATE_VALUE } else { AFFLICT_VALUE };
            value * a.chance.clamp(0.0, 1.0)
        })
        .sum();
    let debuff = match &skill.debuff {
        Some(template) => {
            let id = buff_identity(template, Some(&skill.id));
            if target.debuffs.iter().any(|d| d.id == id) {
                0.0
            } else {
                DEBUFF_VALUE
            }
        }
        None => 0.0,
    };
    statuses + debuff
}

fn lowest_hp<'a>(combatants: impl Iterator<Item = &'a Combatant>) -> Option<&'a Combatant> {
    combatants.min_by_key(|c| OrderedFloat(c.hp_percent()))
}

fn first_fallen_ally(actor: &Combatant, battle: &Battle) -> Option<CombatantId> {
    battle
        .combatants
        .iter()
        .find(|c| c.side == actor.side && c.is_dead())
        .map(|c| c.id)
}

impl Behavior for ScoringAI {
    fn decide_action(
        &self,
        actor_id: CombatantId,
        battle: &Battle,
        content: &ContentLibrary,
        rng: &mut TurnRng,
    ) -> Option<Intent> {
        let actor = battle
            .get(actor_id)
            .filter(|c| c.is_alive() && !c.is_incapacitated())?;
        let target_id = self.pick_offense_target(actor, battle, rng)?;
        let target = battle.get(target_id)?;

        // --- Phase 1: Gather candidates ---
        let mut candidates = vec![(
            PlayerAction::Attack { target: target_id },
            self.score_attack(actor, target),
        )];
        for skill_id in &actor.skills {
            let Ok(skill) = content.skill(skill_id) else {
                tracing::warn!(actor = %actor_id, skill = %skill_id, "combatant knows an unknown skill");
                continue;
            };
            if let Some(candidate) = self.score_skill(actor, skill, target, battle, rng) {
                candidates.push(candidate);
            }
        }
        candidates.extend(self.score_items(actor, battle, content));

        // --- Phase 2: Jitter to break ties and loops ---
        let jitter = battle.config.ai_jitter;
        for (action, score) in candidates.iter_mut() {
            *score += rng.jitter(jitter, "AI Score Jitter");
            tracing::trace!(actor = %actor_id, ?action, score = *score, "candidate scored");
        }

        // --- Phase 3: Pick the best positive candidate ---
        let intent = candidates
            .into_iter()
            .filter(|(_, score)| *score > 0.0)
            .max_by_key(|(_, score)| OrderedFloat(*score))
            .map(|(action, score)| Intent { action, score })
            .unwrap_or(Intent {
                action: PlayerAction::Attack { target: target_id },
                score: 0.0,
            });

        tracing::debug!(actor = %actor_id, action = ?intent.action, score = intent.score, "AI decided");
        Some(intent)
    }
}

/// Recomputes the forecast of every living AI combatant. An `IntentDeclared`
/// event goes out whenever a forecast action changes.
pub fn refresh_intents(
    battle: &mut Battle,
    content: &ContentLibrary,
    behavior: &dyn Behavior,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) {
    let ai_ids: Vec<CombatantId> = battle
        .combatants
        .iter()
        .filter(|c| c.controller == Controller::Ai && c.is_alive())
        .map(|c| c.id)
        .collect();

    for id in ai_ids {
        let intent = behavior.decide_action(id, battle, content, rng);
        let Some(combatant) = battle.get_mut(id) else {
            continue;
        };
        let changed = match (&combatant.next_intent, &intent) {
            (Some(old), Some(new)) => old.action != new.action,
            (None, Some(_)) => true,
            _ => false,
        };
        combatant.next_intent = intent.clone();
        if let (true, Some(intent)) = (changed, intent) {
            bus.push(BattleEvent::IntentDeclared { actor: id, intent });
        }
    }
}

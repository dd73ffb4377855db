//! Validates and executes a chosen action through the damage, status and buff engines.

use crate::battle::buffs::{apply_buff, apply_debuff, clear_all};
use crate::battle::conditions::{apply_status, cure_negative_statuses};
use crate::battle::damage::{crit_chance, raw_power, resolve_damage, DamageOutcome, DamageRequest};
use crate::battle::state::{Battle, BattleEvent, EventBus, TurnRng};
use crate::combatant::{Combatant, CombatantId, Controller, Side};
use crate::content::ContentLibrary;
use crate::errors::{ActionError, ActionResult, CapacityReason};
use schema::{BuffPayload, BuffTemplate, DamageType, ItemData, ItemEffect, SkillData, TargetShape};
use serde::{Deserialize, Serialize};

/// The single decision fed back into the battle per turn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum PlayerAction {
    Attack {
        target: CombatantId,
    },
    /// Targets are ignored for shapes with a canonical target list.
    UseSkill {
        skill: String,
        targets: Vec<CombatantId>,
    },
    /// Without a target the item is used on the actor.
    UseItem {
        item: String,
        target: Option<CombatantId>,
    },
    Defend,
}

/// An action that passed validation, with its target list settled.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolvedAction {
    Attack {
        target: CombatantId,
    },
    Skill {
        skill: SkillData,
        targets: Vec<CombatantId>,
    },
    Item {
        item: ItemData,
        target: CombatantId,
    },
    Defend,
}

/// Side effects the caller has to act on once resolution is done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionReport {
    pub extra_turn_requested: bool,
}

fn living_on(battle: &Battle, id: CombatantId, side: Side) -> ActionResult<()> {
    match battle.get(id) {
        Some(c) if c.is_alive() && c.side == side => Ok(()),
        _ => Err(ActionError::InvalidTarget(id)),
    }
}

fn check_side_capacity(battle: &Battle, side: Side) -> ActionResult<()> {
    let cap = battle.config.side_cap;
    if battle.living_count(side) >= cap {
        return Err(ActionError::CapacityExceeded(CapacityReason::SideFull { cap }));
    }
    Ok(())
}

/// A revive target must be a fallen member of the reviver's side, and the side
/// must have room for one more living combatant.
fn check_revive_target(battle: &Battle, side: Side, target: Option<CombatantId>) -> ActionResult<CombatantId> {
    let target = target.ok_or(ActionError::MissingTarget)?;
    match battle.get(target) {
        Some(c) if c.is_dead() && c.side == side => {}
        _ => return Err(ActionError::InvalidTarget(target)),
    }
    check_side_capacity(battle, side)?;
    Ok(target)
}

/// Checks everything that could reject the action. Nothing is mutated, so a
/// rejected action costs nothing.
pub fn validate_action(
    battle: &Battle,
    content: &ContentLibrary,
    actor_id: CombatantId,
    action: &PlayerAction,
) -> ActionResult<ResolvedAction> {
    let actor = battle
        .get(actor_id)
        .filter(|c| c.is_alive())
        .ok_or(ActionError::NotYourTurn(actor_id))?;
    let allies = actor.side;
    let opponents = actor.side.opponent();

    match action {
        PlayerAction::Attack { target } => {
            living_on(battle, *target, opponents)?;
            Ok(ResolvedAction::Attack { target: *target })
        }
        PlayerAction::Defend => Ok(ResolvedAction::Defend),
        PlayerAction::UseSkill { skill, targets } => {
            let data = content
                .skill(skill)
                .map_err(|_| ActionError::UnknownSkill(skill.clone()))?;
            if !actor.knows_skill(skill) {
                return Err(ActionError::SkillNotLearned(skill.clone()));
            }

            let targets = match data.target {
                TargetShape::SelfOnly => vec![actor_id],
                TargetShape::Aoe => battle.living_ids(opponents),
                TargetShape::AoeHeal => battle.living_ids(allies),
                TargetShape::Single | TargetShape::Pierce => {
                    let target = *targets.first().ok_or(ActionError::MissingTarget)?;
                    let side = if data.targets_opponents() { opponents } else { allies };
                    living_on(battle, target, side)?;
                    vec![target]
                }
                TargetShape::Summon => {
                    let key = data
                        .summon
                        .as_ref()
                        .ok_or_else(|| ActionError::UnknownSkill(skill.clone()))?;
                    content
                        .monster(key)
                        .map_err(|_| ActionError::UnknownSkill(skill.clone()))?;
                    if battle.side_state(allies).used_summons.contains(key) {
                        return Err(ActionError::CapacityExceeded(
                            CapacityReason::SummonAlreadyUsed(key.clone()),
                        ));
                    }
                    check_side_capacity(battle, allies)?;
                    Vec::new()
                }
                TargetShape::Revive => vec![check_revive_target(battle, allies, targets.first().copied())?],
            };

            if actor.mana < data.mana_cost {
                return Err(ActionError::InsufficientResource {
                    needed: data.mana_cost,
                    available: actor.mana,
                });
            }
            Ok(ResolvedAction::Skill {
                skill: data.clone(),
                targets,
            })
        }
        PlayerAction::UseItem { item, target } => {
            let data = content
                .item(item)
                .map_err(|_| ActionError::UnknownItem(item.clone()))?;
            if battle.side_state(allies).quantity(item) == 0 {
                return Err(ActionError::ItemUnavailable(item.clone()));
            }
            let target = match data.effect {
                ItemEffect::Revive => check_revive_target(battle, allies, *target)?,
                _ => {
                    let target = target.unwrap_or(actor_id);
                    living_on(battle, target, allies)?;
                    target
                }
            };
            Ok(ResolvedAction::Item {
                item: data.clone(),
                target,
            })
        }
    }
}

/// Validates, then commits the action. Mana and items are only spent once
/// validation has passed.
pub fn execute_action(
    battle: &mut Battle,
    content: &ContentLibrary,
    actor_id: CombatantId,
    action: &PlayerAction,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> ActionResult<ActionReport> {
    let resolved = validate_action(battle, content, actor_id, action)?;
    let mut report = ActionReport::default();

    match resolved {
        ResolvedAction::Attack { target } => {
            bus.push(BattleEvent::ActionUsed {
                actor: actor_id,
                description: "Attack".to_string(),
            });
            let element = battle.get(actor_id).and_then(|c| c.element);
            strike(battle, actor_id, target, DamageType::Physical, 1.0, element, 0.0, 0.0, rng, bus);
        }
        ResolvedAction::Defend => {
            bus.push(BattleEvent::ActionUsed {
                actor: actor_id,
                description: "Defend".to_string(),
            });
            let stance = BuffTemplate {
                id: Some("defend".to_string()),
                duration: 1,
                payload: BuffPayload {
                    damage_taken: Some(battle.config.defend_damage_taken),
                    ..Default::default()
                },
            };
            let source = battle.display_name(actor_id);
            apply_buff(battle, actor_id, &stance, &source, None, bus);
        }
        ResolvedAction::Skill { skill, targets } => {
            if let Some(actor) = battle.get_mut(actor_id) {
                actor.mana -= skill.mana_cost;
            }
            bus.push(BattleEvent::ActionUsed {
                actor: actor_id,
                description: skill.name.clone(),
            });
            resolve_skill(battle, content, actor_id, &skill, &targets, rng, bus)?;
            report.extra_turn_requested = skill.extra_turn;
        }
        ResolvedAction::Item { item, target } => {
            let side = battle.get(actor_id).map(|c| c.side).unwrap_or(Side::Hero);
            if !battle.side_state_mut(side).consume(&item.id) {
                return Err(ActionError::ItemUnavailable(item.id));
            }
            bus.push(BattleEvent::ItemUsed {
                actor: actor_id,
                item: item.name.clone(),
                target,
            });
            use_item(battle, actor_id, &item, target, bus);
        }
    }

    Ok(report)
}

fn resolve_skill(
    battle: &mut Battle,
    content: &ContentLibrary,
    actor_id: CombatantId,
    skill: &SkillData,
    targets: &[CombatantId],
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> ActionResult<()> {
    let source = battle.display_name(actor_id);

    match skill.target {
        TargetShape::Summon => {
            let key = skill
                .summon
                .as_ref()
                .ok_or_else(|| ActionError::UnknownSkill(skill.id.clone()))?;
            let definition = content
                .monster(key)
                .map_err(|_| ActionError::UnknownSkill(skill.id.clone()))?;
            summon(battle, actor_id, key, definition.clone(), bus);
            return Ok(());
        }
        TargetShape::Revive => {
            for target in targets {
                revive(battle, *target, actor_id, bus);
            }
            return Ok(());
        }
        _ => {}
    }

    if skill.is_offensive() {
        for (index, target) in targets.iter().enumerate() {
            hit_target(battle, actor_id, *target, skill, skill.multiplier, rng, bus);

            if skill.target == TargetShape::Pierce && index == 0 {
                let others: Vec<CombatantId> = battle
                    .living_ids(battle.get(*target).map(|c| c.side).unwrap_or(Side::Enemy))
                    .into_iter()
                    .filter(|id| id != target)
                    .collect();
                if !others.is_empty() {
                    let secondary = others[rng.pick(others.len(), "Pierce Secondary")];
                    let multiplier = skill.multiplier * battle.config.pierce_secondary_fraction;
                    hit_target(battle, actor_id, secondary, skill, multiplier, rng, bus);
                }
            }
        }
        if let Some(buff) = &skill.buff {
            apply_buff(battle, actor_id, buff, &source, Some(&skill.id), bus);
        }
        return Ok(());
    }

    if skill.is_hindrance() {
        for target in targets {
            afflict(battle, &source, *target, skill, rng, bus);
        }
        return Ok(());
    }

    // Support
    let matk = battle.get(actor_id).map(|c| c.stats.matk).unwrap_or(0);
    for target in targets {
        if let Some(factor) = skill.heal {
            let amount = (matk as f32 * factor).floor() as u32;
            heal_target(battle, *target, amount, bus);
        }
        if let Some(amount) = skill.restore_mana {
            restore_target(battle, *target, amount, bus);
        }
        if let Some(buff) = &skill.buff {
            apply_buff(battle, *target, buff, &source, Some(&skill.id), bus);
        }
        for attachment in &skill.statuses {
            apply_status(battle, *target, attachment, rng, bus);
        }
    }
    Ok(())
}

/// Every hit of an offensive skill against one target. Status and debuff
/// attachments only ride on the first hit, and only if it connected.
fn hit_target(
    battle: &mut Battle,
    actor_id: CombatantId,
    target: CombatantId,
    skill: &SkillData,
    multiplier: f32,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) {
    let source = battle.display_name(actor_id);
    for hit in 0..skill.hits.max(1) {
        if battle.get(target).map_or(true, |c| c.is_dead()) {
            break;
        }
        let outcome = strike(
            battle,
            actor_id,
            target,
            skill.damage_type,
            multiplier,
            skill.element,
            skill.crit_bonus,
            skill.ignore_def,
            rng,
            bus,
        );
        if hit == 0 && outcome.landed() {
            afflict(battle, &source, target, skill, rng, bus);
        }
    }
}

/// Lands a skill's status attachments and debuff on one target.
fn afflict(
    battle: &mut Battle,
    source: &str,
    target: CombatantId,
    skill: &SkillData,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) {
    for attachment in &skill.statuses {
        apply_status(battle, target, attachment, rng, bus);
    }
    if let Some(debuff) = &skill.debuff {
        apply_debuff(battle, target, debuff, source, Some(&skill.id), bus);
    }
}

/// Rolls crit for one hit and sends it through the damage pipeline.
#[allow(clippy::too_many_arguments)]
fn strike(
    battle: &mut Battle,
    actor_id: CombatantId,
    target: CombatantId,
    damage_type: DamageType,
    multiplier: f32,
    element: Option<schema::Element>,
    skill_crit_bonus: f32,
    ignore_def: f32,
    rng: &mut TurnRng,
    bus: &mut EventBus,
) -> DamageOutcome {
    let Some(attacker) = battle.get(actor_id) else {
        return DamageOutcome::Ignored;
    };
    let is_crit = rng.roll_percent(crit_chance(attacker, skill_crit_bonus), "Critical Hit Check");
    let mut raw = raw_power(attacker, damage_type, multiplier);
    if is_crit {
        raw *= battle.config.crit_multiplier;
        bus.push(BattleEvent::CriticalHit {
            attacker: actor_id,
            target,
        });
    }
    let request = DamageRequest::new(raw, damage_type, actor_id)
        .with_crit(is_crit)
        .with_element(element)
        .ignoring_def(ignore_def);
    resolve_damage(battle, target, request, rng, bus)
}

fn heal_target(battle: &mut Battle, target: CombatantId, amount: u32, bus: &mut EventBus) {
    if let Some(c) = battle.get_mut(target).filter(|c| c.is_alive()) {
        let healed = c.heal(amount);
        bus.push(BattleEvent::HealApplied {
            target,
            amount: healed,
            new_hp: c.hp,
        });
    }
}

fn restore_target(battle: &mut Battle, target: CombatantId, amount: u32, bus: &mut EventBus) {
    if let Some(c) = battle.get_mut(target).filter(|c| c.is_alive()) {
        let restored = c.restore_mana(amount);
        bus.push(BattleEvent::ManaRestored {
            target,
            amount: restored,
        });
    }
}

fn use_item(battle: &mut Battle, actor_id: CombatantId, item: &ItemData, target: CombatantId, bus: &mut EventBus) {
    match item.effect {
        ItemEffect::Heal(amount) => heal_target(battle, target, amount, bus),
        ItemEffect::RestoreMana(amount) => restore_target(battle, target, amount, bus),
        ItemEffect::Cure => {
            if let Some(c) = battle.get_mut(target) {
                for kind in cure_negative_statuses(c) {
                    bus.push(BattleEvent::StatusCured { target, kind });
                }
            }
        }
        ItemEffect::Revive => revive(battle, target, actor_id, bus),
    }
}

/// Brings a fallen combatant back with a clean slate: statuses, buffs and
/// debuffs are dropped, hp is set to the configured fraction and mana refilled.
pub fn revive(battle: &mut Battle, target: CombatantId, by: CombatantId, bus: &mut EventBus) {
    let fraction = battle.config.revive_hp_fraction;
    let Some(c) = battle.get_mut(target).filter(|c| c.is_dead()) else {
        return;
    };
    c.status_effects.clear();
    clear_all(c);
    let hp = ((c.max_hp() as f32 * fraction).floor() as u32).max(1);
    c.set_hp(hp);
    c.set_mana(c.max_mana());
    tracing::info!(target = %target, by = %by, hp, "combatant revived");
    bus.push(BattleEvent::Revived { target, by });
    battle.scheduler.mark_dirty();
}

fn summon(
    battle: &mut Battle,
    summoner_id: CombatantId,
    key: &str,
    definition: schema::MonsterData,
    bus: &mut EventBus,
) {
    let Some(summoner) = battle.get(summoner_id) else {
        return;
    };
    let (side, level) = (summoner.side, summoner.level);
    let mut creature = Combatant::from_definition(summoner_id, &definition, level, side, Controller::Ai);
    creature.is_summon = true;
    battle.side_state_mut(side).used_summons.insert(key.to_string());
    let summon = battle.insert(creature);
    tracing::info!(summoner = %summoner_id, summon = %summon, key, "summoned");
    bus.push(BattleEvent::Summoned {
        summoner: summoner_id,
        summon,
    });
}

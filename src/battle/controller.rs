//! Drives a battle from start to finish: scheduling, tick phases, AI turns and
//! player input.

use crate::battle::ai::{refresh_intents, Behavior, ScoringAI};
use crate::battle::buffs::process_buffs;
use crate::battle::conditions::{process_status_effects, TickTiming};
use crate::battle::resolver::{execute_action, validate_action, ActionReport, PlayerAction};
use crate::battle::state::{Battle, BattleEvent, BattleOutcome, BattlePhase, EventBus, TurnRng};
use crate::battle::turn_order::{step_turn, TurnStep};
use crate::combatant::{CombatantId, Controller, Side};
use crate::config::BattleConfig;
use crate::content::ContentLibrary;
use crate::errors::{ActionError, BattleResult, ContentError};
use schema::Rewards;
use serde::{Deserialize, Serialize};

/// End-of-battle snapshot of one combatant.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CombatantReport {
    pub id: CombatantId,
    pub name: String,
    pub side: Side,
    pub is_summon: bool,
    pub hp: u32,
    pub max_hp: u32,
    pub mana: u32,
    pub max_mana: u32,
}

/// What the campaign layer gets back once the battle is over.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct BattleSummary {
    pub outcome: BattleOutcome,
    pub turns: u32,
    pub survivors: Vec<CombatantReport>,
    pub fallen: Vec<CombatantReport>,
    /// Exp and gold of every defeated non-summon enemy. Empty on defeat.
    pub rewards: Rewards,
}

impl BattleSummary {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Owns the battle aggregate and everything needed to run it.
pub struct BattleController {
    battle: Battle,
    content: ContentLibrary,
    rng: TurnRng,
    bus: EventBus,
    behavior: Box<dyn Behavior>,
    started: bool,
    /// Whether the actor currently up is taking an extra action.
    extra_action: bool,
}

impl BattleController {
    pub fn new(
        battle_id: impl Into<String>,
        content: ContentLibrary,
        config: BattleConfig,
    ) -> BattleResult<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => TurnRng::seeded(seed),
            None => TurnRng::from_entropy(),
        };
        Ok(Self {
            battle: Battle::new(battle_id, config),
            content,
            rng,
            bus: EventBus::new(),
            behavior: Box::new(ScoringAI::new()),
            started: false,
            extra_action: false,
        })
    }

    pub fn with_rng(mut self, rng: TurnRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_behavior(mut self, behavior: Box<dyn Behavior>) -> Self {
        self.behavior = behavior;
        self
    }

    /// Enrolls a combatant. Heroes are player-controlled, enemies AI-controlled.
    pub fn add_combatant(&mut self, monster_id: &str, level: u32, side: Side) -> BattleResult<CombatantId> {
        let controller = match side {
            Side::Hero => Controller::Player,
            Side::Enemy => Controller::Ai,
        };
        self.add_combatant_with(monster_id, level, side, controller)
    }

    pub fn add_combatant_with(
        &mut self,
        monster_id: &str,
        level: u32,
        side: Side,
        controller: Controller,
    ) -> BattleResult<CombatantId> {
        let definition = self.content.monster(monster_id)?;
        let id = self.battle.add_combatant(definition, level, side, controller);
        tracing::debug!(id = %id, monster = monster_id, level, ?side, "combatant enrolled");
        Ok(id)
    }

    /// Puts items into a side's shared inventory.
    pub fn give_items(&mut self, side: Side, item_id: &str, quantity: u32) -> BattleResult<()> {
        self.content.item(item_id)?;
        self.battle.side_state_mut(side).add_item(item_id, quantity);
        Ok(())
    }

    pub fn battle(&self) -> &Battle {
        &self.battle
    }

    /// Direct access for scenario setup before the battle starts.
    pub fn battle_mut(&mut self) -> &mut Battle {
        &mut self.battle
    }

    pub fn content(&self) -> &ContentLibrary {
        &self.content
    }

    pub fn events(&self) -> &[BattleEvent] {
        self.bus.events()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Hands the collected events to the presentation layer.
    pub fn take_events(&mut self) -> Vec<BattleEvent> {
        self.bus.drain()
    }

    pub fn phase(&self) -> BattlePhase {
        self.battle.phase
    }

    /// The actor waiting for a player decision, if any.
    pub fn awaiting_input(&self) -> Option<CombatantId> {
        match self.battle.phase {
            BattlePhase::AwaitingInput { actor } => Some(actor),
            _ => None,
        }
    }

    pub fn start(&mut self) {
        if self.started {
            return;
        }
        self.started = true;
        tracing::info!(
            battle = %self.battle.battle_id,
            heroes = self.battle.living_count(Side::Hero),
            enemies = self.battle.living_count(Side::Enemy),
            "battle started"
        );
        self.refresh_intents();
        self.advance();
    }

    /// Runs the loop until a player decision is needed or the battle ends.
    pub fn advance(&mut self) {
        loop {
            if matches!(
                self.battle.phase,
                BattlePhase::Ended(_) | BattlePhase::AwaitingInput { .. }
            ) {
                return;
            }

            if self.battle.turn_count >= self.battle.config.max_turns {
                tracing::warn!(turns = self.battle.turn_count, "turn limit reached");
                self.bus.push(BattleEvent::TurnLimitReached {
                    turns: self.battle.turn_count,
                });
                self.end(BattleOutcome::Defeat);
                return;
            }

            let (actor, extra) = match step_turn(&mut self.battle, &mut self.bus) {
                TurnStep::Finished(outcome) => {
                    self.end(outcome);
                    return;
                }
                TurnStep::Actor { id, extra } => (id, extra),
            };
            self.extra_action = extra;

            // Extra actions skip both tick phases.
            if !extra {
                let skip = process_status_effects(
                    &mut self.battle,
                    actor,
                    TickTiming::TurnStart,
                    &mut self.rng,
                    &mut self.bus,
                );
                if skip {
                    if self.battle.get(actor).is_some_and(|c| c.is_alive()) {
                        process_buffs(&mut self.battle, actor, TickTiming::TurnEnd, &mut self.bus);
                    }
                    self.after_turn();
                    continue;
                }
            }

            let controller = self.battle.get(actor).map(|c| c.controller);
            match controller {
                Some(Controller::Player) => {
                    self.battle.phase = BattlePhase::AwaitingInput { actor };
                    return;
                }
                Some(Controller::Ai) => self.take_ai_turn(actor),
                None => self.after_turn(),
            }
        }
    }

    /// Commits the waiting player's action. A rejected action changes nothing:
    /// an `ActionRejected` event is emitted and the same actor keeps the turn.
    pub fn submit_action(&mut self, action: PlayerAction) -> BattleResult<()> {
        let actor = match self.battle.phase {
            BattlePhase::AwaitingInput { actor } => actor,
            BattlePhase::Ended(_) => return Err(ActionError::BattleOver.into()),
            _ => return Err(ActionError::NotAwaitingInput.into()),
        };

        self.battle.phase = BattlePhase::Acting { actor };
        match execute_action(
            &mut self.battle,
            &self.content,
            actor,
            &action,
            &mut self.rng,
            &mut self.bus,
        ) {
            Ok(report) => {
                self.finish_action(actor, report);
                self.advance();
                Ok(())
            }
            Err(error) => {
                tracing::warn!(actor = %actor, %error, "action rejected");
                self.bus.push(BattleEvent::ActionRejected {
                    actor,
                    reason: error.to_string(),
                });
                self.battle.phase = BattlePhase::AwaitingInput { actor };
                Err(error.into())
            }
        }
    }

    /// Runs the battle to the end, letting the AI behavior decide for
    /// player-controlled combatants as well.
    pub fn run_to_completion(&mut self) -> BattleOutcome {
        self.start();
        loop {
            match self.battle.phase {
                BattlePhase::Ended(outcome) => return outcome,
                BattlePhase::AwaitingInput { actor } => {
                    self.battle.phase = BattlePhase::Acting { actor };
                    self.take_ai_turn(actor);
                    self.advance();
                }
                _ => self.advance(),
            }
        }
    }

    /// The result summary, once the battle has ended.
    pub fn summary(&self) -> Option<BattleSummary> {
        let BattlePhase::Ended(outcome) = self.battle.phase else {
            return None;
        };
        let report = |c: &crate::combatant::Combatant| CombatantReport {
            id: c.id,
            name: c.name.clone(),
            side: c.side,
            is_summon: c.is_summon,
            hp: c.hp,
            max_hp: c.max_hp(),
            mana: c.mana,
            max_mana: c.max_mana(),
        };

        let mut rewards = Rewards::default();
        if outcome == BattleOutcome::Victory {
            for c in self
                .battle
                .combatants
                .iter()
                .filter(|c| c.side == Side::Enemy && c.is_dead() && !c.is_summon)
            {
                match self.content.monster(&c.definition_id) {
                    Ok(definition) => {
                        rewards.exp += definition.rewards.exp;
                        rewards.gold += definition.rewards.gold;
                    }
                    Err(ContentError::MonsterNotFound(id)) => {
                        tracing::warn!(monster = %id, "no reward entry for defeated enemy")
                    }
                    Err(error) => tracing::warn!(%error, "reward lookup failed"),
                }
            }
        }

        Some(BattleSummary {
            outcome,
            turns: self.battle.turn_count,
            survivors: self
                .battle
                .combatants
                .iter()
                .filter(|c| c.is_alive())
                .map(report)
                .collect(),
            fallen: self
                .battle
                .combatants
                .iter()
                .filter(|c| c.is_dead())
                .map(report)
                .collect(),
            rewards,
        })
    }

    fn take_ai_turn(&mut self, actor: CombatantId) {
        self.battle.phase = BattlePhase::Acting { actor };

        // Act on the telegraphed intent while it is still legal, otherwise re-plan.
        let planned = self
            .battle
            .get(actor)
            .and_then(|c| c.next_intent.clone())
            .filter(|intent| validate_action(&self.battle, &self.content, actor, &intent.action).is_ok());
        let intent = match planned {
            Some(intent) => Some(intent),
            None => self
                .behavior
                .decide_action(actor, &self.battle, &self.content, &mut self.rng),
        };

        let Some(intent) = intent else {
            self.after_turn();
            return;
        };

        match execute_action(
            &mut self.battle,
            &self.content,
            actor,
            &intent.action,
            &mut self.rng,
            &mut self.bus,
        ) {
            Ok(report) => self.finish_action(actor, report),
            Err(error) => {
                tracing::warn!(actor = %actor, %error, "AI action rejected");
                self.bus.push(BattleEvent::ActionRejected {
                    actor,
                    reason: error.to_string(),
                });
                self.finish_action(actor, ActionReport::default());
            }
        }
    }

    /// Turn-end processing for the actor that just acted.
    fn finish_action(&mut self, actor: CombatantId, report: ActionReport) {
        let alive = self.battle.get(actor).is_some_and(|c| c.is_alive());
        if !self.extra_action && alive {
            process_buffs(&mut self.battle, actor, TickTiming::TurnEnd, &mut self.bus);
        }
        if report.extra_turn_requested && !self.extra_action && alive {
            self.battle.scheduler.grant_extra_turn(actor);
            self.bus.push(BattleEvent::ExtraTurnGranted { actor });
        }
        self.after_turn();
    }

    fn after_turn(&mut self) {
        self.extra_action = false;
        self.battle.phase = BattlePhase::Idle;
        if let Some(outcome) = self.battle.check_outcome() {
            self.end(outcome);
            return;
        }
        self.refresh_intents();
    }

    fn refresh_intents(&mut self) {
        refresh_intents(
            &mut self.battle,
            &self.content,
            self.behavior.as_ref(),
            &mut self.rng,
            &mut self.bus,
        );
    }

    fn end(&mut self, outcome: BattleOutcome) {
        if self.battle.is_over() {
            return;
        }
        tracing::info!(?outcome, turns = self.battle.turn_count, "battle ended");
        self.battle.phase = BattlePhase::Ended(outcome);
        self.battle.active = None;
        self.bus.push(BattleEvent::BattleEnded { outcome });
    }
}

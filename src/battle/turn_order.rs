use crate::battle::state::{Battle, BattleEvent, BattleOutcome, EventBus};
use crate::combatant::CombatantId;
use serde::{Deserialize, Serialize};

/// Round order plus the pointer state layered over it. The order is re-sorted
/// at every round boundary and whenever it is marked dirty; turns advance by index.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TurnScheduler {
    order: Vec<CombatantId>,
    /// Set when the roster changed (death, revive, summon) and the order is stale.
    dirty: bool,
    /// Actor that acts again before the pointer moves on.
    pending_extra_turn: Option<CombatantId>,
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            dirty: true,
            pending_extra_turn: None,
        }
    }

    pub fn order(&self) -> &[CombatantId] {
        &self.order
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn grant_extra_turn(&mut self, actor: CombatantId) {
        self.pending_extra_turn = Some(actor);
    }

    pub fn pending_extra_turn(&self) -> Option<CombatantId> {
        self.pending_extra_turn
    }
}

/// What the scheduler decided for the next step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStep {
    Actor {
        id: CombatantId,
        /// An extra action: no counter increment and no tick phases.
        extra: bool,
    },
    Finished(BattleOutcome),
}

/// Every living combatant, fastest first. Equal speeds keep roster order.
pub fn determine_turn_order(battle: &Battle) -> Vec<CombatantId> {
    let mut living: Vec<_> = battle.combatants.iter().filter(|c| c.is_alive()).collect();
    living.sort_by_key(|c| std::cmp::Reverse(c.stats.aspd));
    living.into_iter().map(|c| c.id).collect()
}

fn refresh_order(battle: &mut Battle) {
    let order = determine_turn_order(battle);
    tracing::debug!(order = ?order, "turn order recomputed");
    battle.scheduler.order = order;
    battle.scheduler.dirty = false;
}

fn next_living_from(battle: &Battle, start: usize) -> Option<CombatantId> {
    let order = &battle.scheduler.order;
    let len = order.len();
    (0..len)
        .map(|offset| order[(start + offset) % len])
        .find(|id| battle.get(*id).is_some_and(|c| c.is_alive()))
}

/// Checks the terminal conditions, then selects the next actor.
pub fn step_turn(battle: &mut Battle, bus: &mut EventBus) -> TurnStep {
    if let Some(outcome) = battle.check_outcome() {
        return TurnStep::Finished(outcome);
    }

    if let Some(id) = battle.scheduler.pending_extra_turn.take() {
        if battle.get(id).is_some_and(|c| c.is_alive()) {
            battle.active = Some(id);
            tracing::debug!(actor = %id, turn = battle.turn_count, "extra turn");
            return TurnStep::Actor { id, extra: true };
        }
    }

    // Each round starts from a fresh speed sort.
    let round_start = battle.turn_count as usize % battle.scheduler.order.len().max(1) == 0;
    if battle.scheduler.dirty || round_start {
        refresh_order(battle);
    }

    let start = battle.turn_count as usize % battle.scheduler.order.len().max(1);
    let next = match next_living_from(battle, start) {
        Some(id) => Some(id),
        None => {
            // Stale order: someone left the roster without the order being invalidated.
            refresh_order(battle);
            let start = battle.turn_count as usize % battle.scheduler.order.len().max(1);
            next_living_from(battle, start)
        }
    };

    match next {
        Some(id) => {
            battle.turn_count += 1;
            battle.active = Some(id);
            tracing::debug!(actor = %id, turn = battle.turn_count, "turn started");
            bus.push(BattleEvent::TurnStarted {
                turn_number: battle.turn_count,
                actor: id,
            });
            TurnStep::Actor { id, extra: false }
        }
        // check_outcome above guarantees a living actor.
        None => TurnStep::Finished(BattleOutcome::Defeat),
    }
}

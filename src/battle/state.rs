use crate::battle::ai::Intent;
use crate::battle::turn_order::TurnScheduler;
use crate::combatant::{Combatant, CombatantId, Controller, Side};
use crate::config::BattleConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use schema::{MonsterData, StatusKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Victory,
    Defeat,
}

/// Where the battle loop currently stands.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattlePhase {
    /// Between actors. The next scheduler step picks who acts.
    Idle,
    /// A player-controlled actor is selecting an action. Nothing mutates until commit.
    AwaitingInput { actor: CombatantId },
    /// An action is being resolved.
    Acting { actor: CombatantId },
    Ended(BattleOutcome),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum BattleEvent {
    // Turn Management
    TurnStarted {
        turn_number: u32,
        actor: CombatantId,
    },
    TurnSkipped {
        actor: CombatantId,
        cause: StatusKind,
    },
    ExtraTurnGranted {
        actor: CombatantId,
    },

    // Actions
    ActionUsed {
        actor: CombatantId,
        description: String,
    },
    ActionRejected {
        actor: CombatantId,
        reason: String,
    },
    IntentDeclared {
        actor: CombatantId,
        intent: Intent,
    },
    ItemUsed {
        actor: CombatantId,
        item: String,
        target: CombatantId,
    },

    // Hits
    Missed {
        attacker: CombatantId,
        target: CombatantId,
    },
    CriticalHit {
        attacker: CombatantId,
        target: CombatantId,
    },
    ElementalImmunity {
        target: CombatantId,
    },
    DamageAbsorbed {
        target: CombatantId,
        amount: u32,
    },
    Parried {
        target: CombatantId,
    },
    Reflected {
        reflector: CombatantId,
        attacker: CombatantId,
        amount: u32,
    },
    DamageApplied {
        target: CombatantId,
        amount: u32,
        is_crit: bool,
        remaining_hp: u32,
    },
    HealApplied {
        target: CombatantId,
        amount: u32,
        new_hp: u32,
    },
    ManaRestored {
        target: CombatantId,
        amount: u32,
    },

    // Status Effects
    StatusApplied {
        target: CombatantId,
        kind: StatusKind,
        duration: u32,
    },
    StatusResisted {
        target: CombatantId,
        kind: StatusKind,
    },
    StatusDamage {
        target: CombatantId,
        kind: StatusKind,
        amount: u32,
    },
    StatusExpired {
        target: CombatantId,
        kind: StatusKind,
    },
    StatusCured {
        target: CombatantId,
        kind: StatusKind,
    },

    // Buffs
    BuffApplied {
        target: CombatantId,
        buff_id: String,
        is_debuff: bool,
        duration: u32,
    },
    BuffExpired {
        target: CombatantId,
        buff_id: String,
        is_debuff: bool,
    },

    // Roster
    Death {
        target: CombatantId,
    },
    Summoned {
        summoner: CombatantId,
        summon: CombatantId,
    },
    Revived {
        target: CombatantId,
        by: CombatantId,
    },

    // Battle End
    TurnLimitReached {
        turns: u32,
    },
    BattleEnded {
        outcome: BattleOutcome,
    },
}

impl BattleEvent {
    /// Formats the event into a human-readable string using battle context.
    /// Returns None for silent events that should not produce user-visible text.
    pub fn format(&self, battle: &Battle) -> Option<String> {
        let name = |id: &CombatantId| battle.display_name(*id);
        match self {
            // === Turn Management Events ===
            BattleEvent::TurnStarted { turn_number, actor } => {
                Some(format!("=== Turn {}: {} ===", turn_number, name(actor)))
            }
            BattleEvent::TurnSkipped { actor, cause } => Some(format!(
                "{} {}",
                name(actor),
                Self::format_skip_cause(*cause)
            )),
            BattleEvent::ExtraTurnGranted { actor } => {
                Some(format!("{} moves again!", name(actor)))
            }

            // === Action Events ===
            BattleEvent::ActionUsed { actor, description } => {
                Some(format!("{} used {}!", name(actor), description))
            }
            BattleEvent::ActionRejected { reason, .. } => Some(format!("But it failed: {}.", reason)),
            BattleEvent::IntentDeclared { .. } => None, // Consumed by the telegraph UI
            BattleEvent::ItemUsed { actor, item, target } => {
                if actor == target {
                    Some(format!("{} used a {}.", name(actor), item))
                } else {
                    Some(format!("{} used a {} on {}.", name(actor), item, name(target)))
                }
            }

            // === Hit Events ===
            BattleEvent::Missed { attacker, .. } => Some(format!("{}'s attack missed!", name(attacker))),
            BattleEvent::CriticalHit { .. } => Some("A critical hit!".to_string()),
            BattleEvent::ElementalImmunity { target } => {
                Some(format!("It had no effect on {}!", name(target)))
            }
            BattleEvent::DamageAbsorbed { target, amount } => {
                Some(format!("{} absorbed the attack and recovered {} HP!", name(target), amount))
            }
            BattleEvent::Parried { target } => Some(format!("{} parried the blow!", name(target))),
            BattleEvent::Reflected {
                reflector,
                attacker,
                amount,
            } => Some(format!(
                "{}'s shield reflected {} damage back at {}!",
                name(reflector),
                amount,
                name(attacker)
            )),
            BattleEvent::DamageApplied { target, amount, .. } => {
                Some(format!("{} took {} damage!", name(target), amount))
            }
            BattleEvent::HealApplied { target, amount, .. } => {
                Some(format!("{} recovered {} HP!", name(target), amount))
            }
            BattleEvent::ManaRestored { target, amount } => {
                Some(format!("{} recovered {} MP!", name(target), amount))
            }

            // === Status Events ===
            BattleEvent::StatusApplied { target, kind, .. } => Some(format!(
                "{} {}",
                name(target),
                Self::format_status_applied(*kind)
            )),
            BattleEvent::StatusResisted { target, kind } => {
                Some(format!("{} resisted {}!", name(target), kind))
            }
            BattleEvent::StatusDamage { target, kind, amount } => Some(format!(
                "{} is hurt by {}! ({} damage)",
                name(target),
                kind,
                amount
            )),
            BattleEvent::StatusExpired { target, kind } => {
                Some(format!("{}'s {} wore off.", name(target), kind))
            }
            BattleEvent::StatusCured { target, kind } => {
                Some(format!("{} was cured of {}.", name(target), kind))
            }

            // === Buff Events ===
            BattleEvent::BuffApplied {
                target,
                buff_id,
                is_debuff,
                ..
            } => {
                if *is_debuff {
                    Some(format!("{} is weakened by {}.", name(target), buff_id))
                } else {
                    Some(format!("{} is empowered by {}.", name(target), buff_id))
                }
            }
            BattleEvent::BuffExpired { target, buff_id, .. } => {
                Some(format!("{}'s {} wore off.", name(target), buff_id))
            }

            // === Roster Events ===
            BattleEvent::Death { target } => Some(format!("{} was defeated!", name(target))),
            BattleEvent::Summoned { summoner, summon } => {
                Some(format!("{} summoned {}!", name(summoner), name(summon)))
            }
            BattleEvent::Revived { target, .. } => Some(format!("{} was revived!", name(target))),

            // === Battle End Events ===
            BattleEvent::TurnLimitReached { turns } => {
                Some(format!("The battle dragged on for {} turns and was called off.", turns))
            }
            BattleEvent::BattleEnded { outcome } => match outcome {
                BattleOutcome::Victory => Some("Victory!".to_string()),
                BattleOutcome::Defeat => Some("The party has fallen...".to_string()),
            },
        }
    }

    // --- Private Helper Functions ---

    fn format_skip_cause(kind: StatusKind) -> &'static str {
        match kind {
            StatusKind::Stun => "is stunned and cannot move!",
            StatusKind::Freeze => "is frozen solid!",
            StatusKind::Paralyze => "is fully paralyzed!",
            _ => "cannot act!",
        }
    }

    fn format_status_applied(kind: StatusKind) -> &'static str {
        match kind {
            StatusKind::Poison => "was poisoned!",
            StatusKind::Burn => "was set ablaze!",
            StatusKind::Bleed => "is bleeding!",
            StatusKind::Stun => "was stunned!",
            StatusKind::Freeze => "was frozen solid!",
            StatusKind::Paralyze => "is paralyzed! It may be unable to move!",
            StatusKind::Taunt => "draws the enemy's attention!",
            StatusKind::Parry => "takes a parrying stance.",
        }
    }
}

/// Event bus for collecting battle events in the order they happened.
/// The presentation layer replays it at its own pace.
#[derive(Debug, Clone, Default)]
pub struct EventBus {
    events: Vec<BattleEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn push(&mut self, event: BattleEvent) {
        tracing::trace!(?event, "battle event");
        self.events.push(event);
    }

    pub fn events(&self) -> &[BattleEvent] {
        &self.events
    }

    /// Moves every collected event out, leaving the bus empty.
    pub fn drain(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    /// Print all events in debug format with indentation.
    pub fn print_debug(&self) {
        for event in &self.events {
            println!("  {:?}", event);
        }
    }

    /// Print all events in debug format with a custom prefix message.
    pub fn print_debug_with_message(&self, message: &str) {
        println!("{}", message);
        self.print_debug();
    }

    /// Print all events using their formatted text (when available) along with battle context.
    pub fn print_formatted(&self, battle: &Battle) {
        for event in &self.events {
            if let Some(formatted) = event.format(battle) {
                println!("  {}", formatted);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }
}

impl std::fmt::Display for EventBus {
    /// Format the EventBus for printing. Shows debug format of all events.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in &self.events {
            writeln!(f, "  {:?}", event)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
enum RngSource {
    Scripted { outcomes: Vec<u8>, index: usize },
    Seeded(StdRng),
}

/// Source of every roll in a battle. Each roll is a percentile outcome in `1..=100`.
///
/// Rolls whose result is already certain (a chance of 0 or of 100 and above,
/// a pick among fewer than two options) do not consume an outcome.
#[derive(Debug, Clone)]
pub struct TurnRng {
    source: RngSource,
}

impl TurnRng {
    /// Replays a fixed script of outcomes. Running out of outcomes is a test bug.
    pub fn new_for_test(outcomes: Vec<u8>) -> Self {
        Self {
            source: RngSource::Scripted { outcomes, index: 0 },
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            source: RngSource::Seeded(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            source: RngSource::Seeded(StdRng::from_os_rng()),
        }
    }

    pub fn next_outcome(&mut self, reason: &str) -> u8 {
        let outcome = match &mut self.source {
            RngSource::Scripted { outcomes, index } => {
                if *index >= outcomes.len() {
                    // Add the reason to the panic message for better debugging!
                    panic!(
                        "TurnRng exhausted! Tried to get a value for: '{}'. Need more random values.",
                        reason
                    );
                }
                let outcome = outcomes[*index];
                *index += 1;
                outcome
            }
            RngSource::Seeded(rng) => rng.random_range(1..=100),
        };
        tracing::trace!(outcome, reason, "rng consumed");
        outcome
    }

    /// Succeeds when the roll is at or under `chance` percent.
    pub fn roll_percent(&mut self, chance: f32, reason: &str) -> bool {
        if chance <= 0.0 {
            return false;
        }
        if chance >= 100.0 {
            return true;
        }
        self.next_outcome(reason) as f32 <= chance
    }

    /// Like `roll_percent` with the chance given as a fraction.
    pub fn roll_chance(&mut self, chance: f32, reason: &str) -> bool {
        self.roll_percent(chance * 100.0, reason)
    }

    /// Uniform offset in `-amount..=amount`.
    pub fn jitter(&mut self, amount: f32, reason: &str) -> f32 {
        if amount <= 0.0 {
            return 0.0;
        }
        let unit = (self.next_outcome(reason) as f32 - 1.0) / 99.0;
        (unit * 2.0 - 1.0) * amount
    }

    /// Uniform index in `0..len`.
    pub fn pick(&mut self, len: usize, reason: &str) -> usize {
        if len <= 1 {
            return 0;
        }
        let outcome = self.next_outcome(reason) as usize;
        ((outcome - 1) * len / 100).min(len - 1)
    }
}

/// Items available to a side.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub item: String,
    pub quantity: u32,
}

/// Per-side bookkeeping that outlives individual combatants.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SideState {
    pub inventory: Vec<ItemStack>,
    /// Summon keys this side has already used.
    pub used_summons: HashSet<String>,
}

impl SideState {
    pub fn quantity(&self, item: &str) -> u32 {
        self.inventory
            .iter()
            .find(|stack| stack.item == item)
            .map(|stack| stack.quantity)
            .unwrap_or(0)
    }

    pub fn add_item(&mut self, item: &str, quantity: u32) {
        match self.inventory.iter_mut().find(|stack| stack.item == item) {
            Some(stack) => stack.quantity += quantity,
            None => self.inventory.push(ItemStack {
                item: item.to_string(),
                quantity,
            }),
        }
    }

    /// Takes one item out of the inventory. Returns false if none was left.
    pub fn consume(&mut self, item: &str) -> bool {
        match self
            .inventory
            .iter_mut()
            .find(|stack| stack.item == item && stack.quantity > 0)
        {
            Some(stack) => {
                stack.quantity -= 1;
                true
            }
            None => false,
        }
    }
}

/// The battle aggregate. Owns every combatant and all per-battle state; engine
/// functions borrow it rather than reaching into shared state.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Battle {
    pub battle_id: String,
    pub combatants: Vec<Combatant>,
    pub sides: [SideState; 2],
    /// Monotonic count of turns taken so far.
    pub turn_count: u32,
    pub active: Option<CombatantId>,
    pub phase: BattlePhase,
    pub scheduler: TurnScheduler,
    pub config: BattleConfig,
}

impl Battle {
    pub fn new(battle_id: impl Into<String>, config: BattleConfig) -> Self {
        Self {
            battle_id: battle_id.into(),
            combatants: Vec::new(),
            sides: [SideState::default(), SideState::default()],
            turn_count: 0,
            active: None,
            phase: BattlePhase::Idle,
            scheduler: TurnScheduler::new(),
            config,
        }
    }

    /// Hydrates a combatant from its definition and enrolls it. Roster size at
    /// battle start is not limited by the side cap.
    pub fn add_combatant(
        &mut self,
        definition: &MonsterData,
        level: u32,
        side: Side,
        controller: Controller,
    ) -> CombatantId {
        let id = CombatantId(self.combatants.len() as u32);
        let combatant = Combatant::from_definition(id, definition, level, side, controller);
        self.insert(combatant)
    }

    /// Enrolls an already-built combatant, re-assigning its handle.
    pub fn insert(&mut self, mut combatant: Combatant) -> CombatantId {
        let id = CombatantId(self.combatants.len() as u32);
        combatant.id = id;
        self.combatants.push(combatant);
        self.scheduler.mark_dirty();
        id
    }

    pub fn get(&self, id: CombatantId) -> Option<&Combatant> {
        self.combatants.get(id.0 as usize)
    }

    pub fn get_mut(&mut self, id: CombatantId) -> Option<&mut Combatant> {
        self.combatants.get_mut(id.0 as usize)
    }

    pub fn display_name(&self, id: CombatantId) -> String {
        self.get(id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("{}", id))
    }

    pub fn living(&self, side: Side) -> impl Iterator<Item = &Combatant> + '_ {
        self.combatants
            .iter()
            .filter(move |c| c.side == side && c.is_alive())
    }

    pub fn living_ids(&self, side: Side) -> Vec<CombatantId> {
        self.living(side).map(|c| c.id).collect()
    }

    pub fn living_count(&self, side: Side) -> usize {
        self.living(side).count()
    }

    pub fn side_state(&self, side: Side) -> &SideState {
        &self.sides[side.index()]
    }

    pub fn side_state_mut(&mut self, side: Side) -> &mut SideState {
        &mut self.sides[side.index()]
    }

    /// The natural terminal conditions. Heroes are checked first, so a mutual wipe is a defeat.
    pub fn check_outcome(&self) -> Option<BattleOutcome> {
        if self.living_count(Side::Hero) == 0 {
            Some(BattleOutcome::Defeat)
        } else if self.living_count(Side::Enemy) == 0 {
            Some(BattleOutcome::Victory)
        } else {
            None
        }
    }

    pub fn is_over(&self) -> bool {
        matches!(self.phase, BattlePhase::Ended(_))
    }
}

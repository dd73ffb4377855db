use crate::battle::conditions::StatusEffect;
use crate::battle::controller::BattleController;
use crate::battle::state::{Battle, TurnRng};
use crate::battle::stats::DerivedStats;
use crate::combatant::{Combatant, CombatantId, Controller, Side};
use crate::config::BattleConfig;
use crate::content::ContentLibrary;
use crate::errors::BattleResult;
use schema::{Attributes, Element, MonsterData, Rewards, StatusKind};

/// A builder for creating test combatants with common defaults.
///
/// Attributes default to zero, so resist rolls never fire, and crit is zeroed
/// so scripted RNG sequences only need to cover the rolls a test cares about.
///
/// # Example
/// ```
/// let foe = TestCombatantBuilder::new("Foe", Side::Enemy)
///     .with_stats(|s| s.soft_def = 20)
///     .with_status(StatusKind::Burn, 3)
///     .build();
/// ```
pub struct TestCombatantBuilder {
    name: String,
    side: Side,
    controller: Controller,
    level: u32,
    attributes: Attributes,
    element: Option<Element>,
    skills: Vec<String>,
    statuses: Vec<StatusEffect>,
    stat_overrides: Vec<Box<dyn FnOnce(&mut DerivedStats)>>,
    hp: Option<u32>,
    mana: Option<u32>,
}

impl TestCombatantBuilder {
    /// Creates a new builder. Heroes are player-controlled, enemies AI-controlled.
    pub fn new(name: &str, side: Side) -> Self {
        let controller = match side {
            Side::Hero => Controller::Player,
            Side::Enemy => Controller::Ai,
        };
        Self {
            name: name.to_string(),
            side,
            controller,
            level: 1,
            attributes: Attributes::default(),
            element: None,
            skills: Vec::new(),
            statuses: Vec::new(),
            stat_overrides: vec![Box::new(|s: &mut DerivedStats| s.crit = 0)],
            hp: None,
            mana: None,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = attributes;
        self
    }

    pub fn with_element(mut self, element: Element) -> Self {
        self.element = Some(element);
        self
    }

    pub fn with_skills(mut self, skills: &[&str]) -> Self {
        self.skills = skills.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_controller(mut self, controller: Controller) -> Self {
        self.controller = controller;
        self
    }

    pub fn with_status(mut self, kind: StatusKind, duration: u32) -> Self {
        self.statuses.push(StatusEffect { kind, duration });
        self
    }

    /// Overrides derived stats after hydration. Applied in call order.
    pub fn with_stats(mut self, f: impl FnOnce(&mut DerivedStats) + 'static) -> Self {
        self.stat_overrides.push(Box::new(f));
        self
    }

    /// Sets the current HP. If not set, HP will be max.
    pub fn with_hp(mut self, hp: u32) -> Self {
        self.hp = Some(hp);
        self
    }

    /// Sets the current mana. If not set, mana will be max.
    pub fn with_mana(mut self, mana: u32) -> Self {
        self.mana = Some(mana);
        self
    }

    /// Builds the `Combatant`. Its id is reassigned when it joins a battle.
    pub fn build(self) -> Combatant {
        let definition = MonsterData {
            id: self.name.to_lowercase(),
            name: self.name,
            attributes: self.attributes,
            skills: self.skills,
            element: self.element,
            rewards: Rewards::default(),
        };
        let mut combatant = Combatant::from_definition(
            CombatantId(0),
            &definition,
            self.level,
            self.side,
            self.controller,
        );
        for apply in self.stat_overrides {
            apply(&mut combatant.stats);
        }
        combatant.hp = self.hp.unwrap_or(combatant.max_hp()).min(combatant.max_hp());
        combatant.mana = self.mana.unwrap_or(combatant.max_mana()).min(combatant.max_mana());
        combatant.status_effects = self.statuses;
        combatant
    }
}

/// Rules used by scenario tests: stock values, but no AI jitter.
pub fn test_config() -> BattleConfig {
    BattleConfig {
        ai_jitter: 0.0,
        ..BattleConfig::default()
    }
}

/// Creates a battle holding the given combatants. Ids follow the order given,
/// starting at `CombatantId(0)`.
pub fn create_test_battle(combatants: Vec<Combatant>) -> Battle {
    let mut battle = Battle::new("test_battle", test_config());
    for combatant in combatants {
        battle.insert(combatant);
    }
    battle
}

/// Built-in content plus two scenario monsters: a `training_dummy` with zeroed
/// attributes and a very durable `sandbag`.
pub fn test_content() -> ContentLibrary {
    let mut content = match ContentLibrary::builtin() {
        Ok(content) => content,
        Err(err) => panic!("Failed to load built-in content: {}", err),
    };
    content.insert_monster(MonsterData {
        id: "training_dummy".to_string(),
        name: "Training Dummy".to_string(),
        attributes: Attributes::default(),
        skills: Vec::new(),
        element: None,
        rewards: Rewards { exp: 5, gold: 3 },
    });
    content.insert_monster(MonsterData {
        id: "sandbag".to_string(),
        name: "Sandbag".to_string(),
        attributes: Attributes::new(0, 0, 200, 0, 0, 0),
        skills: Vec::new(),
        element: None,
        rewards: Rewards { exp: 1, gold: 1 },
    });
    content
}

/// A controller over `test_content()` with a predictable RNG.
pub fn test_controller(config: BattleConfig) -> BattleController {
    let controller = assert_ok(BattleController::new("test_battle", test_content(), config));
    controller.with_rng(predictable_rng())
}

/// Creates a `TurnRng` instance with a long list of default values (50).
/// Useful for tests where the specific RNG outcome is not important, preventing panics from exhaustion.
pub fn predictable_rng() -> TurnRng {
    TurnRng::new_for_test(vec![50; 500]) // Provide a generous buffer of RNG values
}

/// Helper function to assert that a Result is Ok and return the value.
/// Provides clear error messages in tests when functions unexpectedly fail.
pub fn assert_ok<T>(result: BattleResult<T>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => panic!("Expected Ok but got error: {}", err),
    }
}

// In: src/lib.rs

//! Tactics Battle Engine
//!
//! The combat resolution core of a turn-based tactical RPG: speed-ordered
//! turns, stat derivation, status effects, timed buffs, the damage pipeline
//! and the enemy AI. The core is fully synchronous and reports everything it
//! does through an ordered event log.

// --- MODULE DECLARATIONS ---
pub mod battle;
pub mod combatant;
pub mod config;
pub mod content;
pub mod errors;

// --- PUBLIC API RE-EXPORTS ---

// --- From the `schema` crate ---
// Re-export the static content definitions.
pub use schema::{
    AttributeDeltas,
    // Core Data Structs
    Attributes,
    BuffPayload,
    BuffTemplate,
    // Core Enums
    DamageType,
    Element,
    ItemData,
    ItemEffect,
    MonsterData,
    Rewards,
    SkillData,
    StatDeltas,
    StatusAttachment,
    StatusKind,
    TargetShape,
};

// --- From this crate's modules (`src/`) ---

// Battle driver and state.
pub use battle::controller::{BattleController, BattleSummary, CombatantReport};
pub use battle::resolver::PlayerAction;
pub use battle::state::{Battle, BattleEvent, BattleOutcome, BattlePhase, EventBus, TurnRng};

// Core runtime types for a battle.
pub use combatant::{Combatant, CombatantId, Controller, Side};

// Content and configuration.
pub use config::BattleConfig;
pub use content::ContentLibrary;

// Crate-specific error and result types.
pub use errors::{
    ActionError, ActionResult, BattleError, BattleResult, CapacityReason, ConfigError,
    ContentError, ContentResult,
};

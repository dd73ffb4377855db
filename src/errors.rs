use crate::combatant::CombatantId;

/// Main error type for the tactics battle engine
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BattleError {
    /// Error related to static content lookup or parsing
    #[error("Content error: {0}")]
    Content(#[from] ContentError),
    /// Error related to battle configuration
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// Error related to a rejected battle action
    #[error("Action error: {0}")]
    Action(#[from] ActionError),
}

/// Errors related to the static content source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContentError {
    #[error("Skill not found: {0}")]
    SkillNotFound(String),
    #[error("Monster not found: {0}")]
    MonsterNotFound(String),
    #[error("Item not found: {0}")]
    ItemNotFound(String),
    /// Content file could not be parsed
    #[error("Malformed content in {file}: {details}")]
    MalformedData { file: String, details: String },
    /// Content file could not be read
    #[error("Could not read {file}: {details}")]
    Io { file: String, details: String },
}

/// Errors related to battle configuration
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Malformed battle config: {0}")]
    Malformed(String),
    #[error("Invalid value for {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

/// Why a summon or revive was refused.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize, thiserror::Error)]
pub enum CapacityReason {
    /// The side already fields the maximum number of living combatants.
    #[error("the side already has {cap} combatants standing")]
    SideFull { cap: usize },
    /// This summon was already used by the side during this battle.
    #[error("{0} has already been summoned this battle")]
    SummonAlreadyUsed(String),
}

/// Errors related to player or AI actions. All of these are recovered locally:
/// the action is rejected before any resource is spent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    /// Target is dead, on the wrong side, or does not exist
    #[error("Invalid target: {0}")]
    InvalidTarget(CombatantId),
    /// The action needs a target and none was given
    #[error("No target selected")]
    MissingTarget,
    #[error("Not enough mana: needs {needed}, has {available}")]
    InsufficientResource { needed: u32, available: u32 },
    #[error("Cannot do that: {0}")]
    CapacityExceeded(CapacityReason),
    #[error("Unknown skill: {0}")]
    UnknownSkill(String),
    #[error("Skill {0} is not known by the actor")]
    SkillNotLearned(String),
    #[error("Unknown item: {0}")]
    UnknownItem(String),
    #[error("No {0} left in the inventory")]
    ItemUnavailable(String),
    #[error("It is not {0}'s turn")]
    NotYourTurn(CombatantId),
    #[error("The battle is not waiting for input")]
    NotAwaitingInput,
    #[error("The battle is over")]
    BattleOver,
}

/// Type alias for Results using BattleError
pub type BattleResult<T> = Result<T, BattleError>;

/// Type alias for Results using ActionError
pub type ActionResult<T> = Result<T, ActionError>;

/// Type alias for Results using ContentError
pub type ContentResult<T> = Result<T, ContentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_messages_nest() {
        let err = ActionError::CapacityExceeded(CapacityReason::SummonAlreadyUsed("wolf".to_string()));
        assert_eq!(err.to_string(), "Cannot do that: wolf has already been summoned this battle");

        let err = BattleError::from(ActionError::CapacityExceeded(CapacityReason::SideFull { cap: 4 }));
        assert!(err.to_string().contains("the side already has 4 combatants standing"));
    }
}

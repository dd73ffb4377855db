// Tactics Battle Schema - Shared content definitions
// This crate contains the static records (skills, monsters, items) and the small
// enums shared between the battle engine and anything that authors content for it.
// Everything here is plain data with serde derives so it can be read from RON.

// Re-export the main types
pub use combat_types::*;
pub use content_data::*;

pub mod combat_types;
pub mod content_data;

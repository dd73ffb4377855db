//! Runs a demo battle between two AI-controlled parties and prints the log.
//!
//! ```bash
//! # Fixed seed, debug diagnostics
//! RUST_LOG=tactics_battle=debug cargo run -- 42
//! ```

use std::process::ExitCode;
use tactics_battle::{
    BattleConfig, BattleController, BattleResult, ContentLibrary, Controller, Side,
};
use tracing_subscriber::EnvFilter;

fn setup_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
}

fn run(seed: Option<u64>) -> BattleResult<()> {
    let content = ContentLibrary::builtin()?;
    let config = BattleConfig {
        seed,
        ..BattleConfig::default()
    };
    let mut controller = BattleController::new("demo", content, config)?;

    // Heroes
    for hero in ["knight", "mage", "cleric"] {
        controller.add_combatant_with(hero, 10, Side::Hero, Controller::Ai)?;
    }
    // Enemies
    controller.add_combatant("orc_warlord", 11, Side::Enemy)?;
    controller.add_combatant("shadow_wraith", 9, Side::Enemy)?;
    controller.add_combatant("skeleton", 8, Side::Enemy)?;

    controller.give_items(Side::Hero, "potion", 2)?;
    controller.give_items(Side::Hero, "phoenix_down", 1)?;
    controller.give_items(Side::Enemy, "ether", 1)?;

    let outcome = controller.run_to_completion();
    tracing::info!(?outcome, "demo finished");

    controller.bus().print_formatted(controller.battle());

    if let Some(summary) = controller.summary() {
        match summary.to_json() {
            Ok(json) => println!("{}", json),
            Err(e) => tracing::error!(error = %e, "could not serialize the summary"),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    setup_logging();

    let seed = match std::env::args().nth(1).map(|arg| arg.parse::<u64>()) {
        None => None,
        Some(Ok(seed)) => Some(seed),
        Some(Err(e)) => {
            eprintln!("Seed must be a non-negative integer: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(seed) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

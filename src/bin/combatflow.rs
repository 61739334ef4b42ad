//! combatflow - live combat log viewer
//!
//! Tails a combat log and shows running damage, healing, skill, XP and misc
//! statistics in the terminal.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin combatflow -- path/to/combat.log
//! ```
//!
//! ## Environment Variables
//!
//! - COMBATFLOW_LOG_PATH - Log file to open when no path argument is given
//! - COMBATFLOW_TAIL - Keep following the file past EOF (default: true)
//! - COMBATFLOW_POLL_INTERVAL_MS - EOF poll interval (default: 100)
//! - COMBATFLOW_PET_NAMES - Comma-separated names always treated as allies
//! - COMBATFLOW_NORMALIZE_SKILLS - Merge skill ranks such as `Fireball II` (default: false)
//! - COMBATFLOW_IDLE_RESET_SECS - Idle gap that restarts rolling rates (default: 10)
//! - RUST_LOG - Logging level (optional, default: info)

use combatflow::{
    config::Config,
    session::Session,
    ui::{run_ui, UiExit},
};
use std::{env, sync::Arc};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Logs go to stderr; the viewer owns stdout through the alternate screen
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = Config::from_env(env::args().nth(1))?;

    log::info!("🚀 Starting combatflow...");
    log::info!("📊 Configuration:");
    log::info!("   Log file: {}", config.log_path.display());
    log::info!("   Tail: {}", config.tail);
    log::info!("   Poll interval: {:?}", config.poll_interval);
    if !config.pet_names.is_empty() {
        log::info!("   Pet names: {:?}", config.pet_names);
    }

    let mut session = Session::open(
        &config.log_path,
        config.open_options(),
        Arc::new(config.settings()),
    )
    .await?;

    let exit = run_ui(&session).await;
    let shutdown = session.shutdown().await;

    match exit? {
        UiExit::Quit => log::info!("Viewer closed"),
        UiExit::SessionEnded => {
            eprintln!(
                "Session for {} ended; no more updates will arrive.",
                config.log_path.display()
            );
        }
    }
    shutdown?;

    Ok(())
}

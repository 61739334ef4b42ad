//! combatflow_scan - one-shot summary of a combat log
//!
//! Reads the file once to EOF and prints every aggregator as pretty JSON.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin combatflow_scan -- [--prescan] [--user NAME] path/to/combat.log
//! ```
//!
//! - `--prescan` prints the login markers found in the file instead
//! - `--user NAME` only counts the time windows in which NAME was logged in
//!
//! Honors the same environment variables as `combatflow`; `COMBATFLOW_TAIL`
//! is ignored.

use combatflow::{
    config::Config,
    prescan,
    session::{OpenOptions, Scope, Session},
};
use std::{env, sync::Arc};

#[derive(Debug, Default)]
struct ScanArgs {
    prescan_only: bool,
    user: Option<String>,
    path: Option<String>,
}

fn parse_args() -> ScanArgs {
    let mut args = ScanArgs::default();
    let mut iter = env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--prescan" => args.prescan_only = true,
            "--user" => args.user = iter.next(),
            _ => args.path = Some(arg),
        }
    }
    args
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let args = parse_args();
    let config = Config::from_env(args.path.clone())?;

    let mut options = OpenOptions {
        tail: false,
        ..config.open_options()
    };

    if args.prescan_only || args.user.is_some() {
        let report = prescan::scan_logins(&config.log_path).await?;
        if args.prescan_only {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        if let Some(user) = &args.user {
            let windows: Vec<_> = prescan::windows_from_logins(&report)
                .into_iter()
                .filter(|window| window.username.as_deref() == Some(user.as_str()))
                .collect();
            let Some(first) = report.logins.iter().find(|mark| &mark.name == user) else {
                return Err(format!("no logins by {} in {}", user, config.log_path.display()).into());
            };
            log::info!("Scoping to {} windows for {}", windows.len(), user);
            options.resume_offset = first.offset;
            options.scope = Scope::new(windows);
        }
    }

    summarize(&config, options).await
}

async fn summarize(config: &Config, options: OpenOptions) -> Result<(), Box<dyn std::error::Error>> {
    let mut session = Session::open(&config.log_path, options, Arc::new(config.settings())).await?;
    session.wait().await?;

    let registry = session.read().await;
    println!("{}", serde_json::to_string_pretty(&registry.summary())?);
    Ok(())
}

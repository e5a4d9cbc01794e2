use clap::Subcommand;
use travelfund_core::{Config, Controller, Database, Event, SystemClock, TokioCountdown};

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum SessionAction {
    /// Pledge and start a focus session
    Start {
        /// Stay attached and count down until the session completes
        #[arg(long)]
        watch: bool,
    },
    /// Give up the running session (pledge returned, penalty recorded)
    Abandon,
    /// Print current session state as JSON
    Status,
    /// Count down the running session in the foreground
    Watch,
}

pub fn run(action: SessionAction) -> CliResult {
    match action {
        SessionAction::Start { watch: follow } => {
            let (mut app, _) = open_app()?;
            match app.start()? {
                Some(event) => print_json(&event)?,
                None => {
                    eprintln!("a session is already running");
                    print_json(&app.status())?;
                }
            }
            drop(app);
            if follow {
                watch()?;
            }
        }
        SessionAction::Abandon => {
            let (mut app, _) = open_app()?;
            match app.abandon()? {
                Some(event) => print_json(&event)?,
                None => eprintln!("no session is running"),
            }
        }
        SessionAction::Status => {
            let (app, event) = open_app()?;
            if let Some(event @ Event::SessionLapsed { .. }) = event {
                print_json(&event)?;
            }
            print_json(&app.status())?;
        }
        SessionAction::Watch => watch()?,
    }
    Ok(())
}

/// Drive the countdown on a single-threaded runtime until the session
/// leaves `Running`, here or in another process. Each event is printed as
/// one JSON line.
fn watch() -> CliResult {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    runtime.block_on(follow_session())
}

async fn follow_session() -> CliResult {
    let config = Config::load()?;
    let db = Database::open()?;
    let (countdown, mut ticks) = TokioCountdown::new();
    let (mut app, event) = Controller::open(db, countdown, SystemClock, config)?;
    if let Some(event) = event {
        println!("{}", serde_json::to_string(&event)?);
    }
    if !app.machine().is_running() {
        eprintln!("no session is running");
        return Ok(());
    }

    while let Some(tick) = ticks.recv().await {
        // Another process may have abandoned or restarted the session.
        match app.reload() {
            Ok(Some(event)) => println!("{}", serde_json::to_string(&event)?),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "could not re-read stored state"),
        }
        if !app.machine().is_running() {
            break;
        }
        if let Some(event) = app.on_tick(tick)? {
            println!("{}", serde_json::to_string(&event)?);
        }
        if !app.machine().is_running() {
            break;
        }
    }
    Ok(())
}

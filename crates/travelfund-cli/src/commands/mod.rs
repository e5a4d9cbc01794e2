pub mod config;
pub mod fund;
pub mod history;
pub mod session;

use serde::Serialize;
use travelfund_core::{Config, Controller, Database, Event, ManualScheduler, SystemClock};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Controller for commands that do one thing and exit. No countdown runs;
/// a stored session is only reconciled against the clock.
pub type OneShotApp = Controller<Database, ManualScheduler, SystemClock>;

pub fn open_app() -> Result<(OneShotApp, Option<Event>), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let db = Database::open()?;
    let (app, event) = Controller::open(db, ManualScheduler::new(), SystemClock, config)?;
    Ok((app, event))
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

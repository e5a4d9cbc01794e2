use clap::Subcommand;

use super::{open_app, print_json, CliResult};

#[derive(Subcommand)]
pub enum HistoryAction {
    /// List records, newest first
    List,
    /// Delete a record and reverse its amount
    Delete {
        /// Record ID
        id: String,
    },
}

pub fn run(action: HistoryAction) -> CliResult {
    let (mut app, _) = open_app()?;

    match action {
        HistoryAction::List => print_json(&app.records())?,
        HistoryAction::Delete { id } => match app.delete(&id)? {
            Some(event) => print_json(&event)?,
            None => eprintln!("no record with id {id}"),
        },
    }
    Ok(())
}

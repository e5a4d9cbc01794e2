use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(name = "travelfund", version, about = "Travelfund focus-pledge CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Focus session control
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// History records
    History {
        #[command(subcommand)]
        action: commands::history::HistoryAction,
    },
    /// Spend a spin credit on a reward draw
    Spin,
    /// Show the reward table
    Rewards,
    /// Fund progress and totals
    Summary,
    /// Write a backup of the stored data
    Export {
        /// Directory to write the backup into
        #[arg(long, default_value = ".")]
        dir: std::path::PathBuf,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    let filter = EnvFilter::try_from_env("TRAVELFUND_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Session { action } => commands::session::run(action),
        Commands::History { action } => commands::history::run(action),
        Commands::Spin => commands::fund::spin(),
        Commands::Rewards => commands::fund::rewards(),
        Commands::Summary => commands::fund::summary(),
        Commands::Export { dir } => commands::fund::export(&dir),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

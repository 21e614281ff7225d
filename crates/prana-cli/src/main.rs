use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod console;

#[derive(Parser)]
#[command(name = "prana", version, about = "Guided breathing timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a breathing session until it finishes or Ctrl-C
    Breathe(commands::breathe::BreatheArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
    /// Session history statistics
    Stats(commands::stats::StatsArgs),
    /// Print the breathing cycle
    Stages,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PRANA_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Breathe(args) => commands::breathe::run(args),
        Commands::Config { action } => commands::config::run(action),
        Commands::Stats(args) => commands::stats::run(args),
        Commands::Stages => commands::stages::run(),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

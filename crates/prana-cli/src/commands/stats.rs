use clap::Args;
use prana_core::SessionLog;

#[derive(Args)]
pub struct StatsArgs {
    /// List the most recent sessions instead of totals
    #[arg(long, value_name = "N")]
    recent: Option<usize>,
}

pub fn run(args: StatsArgs) -> Result<(), Box<dyn std::error::Error>> {
    let log = SessionLog::open()?;

    match args.recent {
        Some(limit) => {
            let sessions = log.recent(limit)?;
            println!("{}", serde_json::to_string_pretty(&sessions)?);
        }
        None => {
            let stats = log.stats()?;
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

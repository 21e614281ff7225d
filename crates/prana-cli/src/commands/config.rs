use clap::Subcommand;
use prana_core::{Settings, SettingsStore, TomlSettingsStore};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "breathing.base_count", "durations.hold")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = TomlSettingsStore::open_default()?;
    match action {
        ConfigAction::Get { key } => {
            let settings = store.load()?;
            match settings.get(&key) {
                Some(value) => println!("{value}"),
                None => {
                    eprintln!("unknown key: {key}");
                    std::process::exit(1);
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let mut settings = store.load()?;
            settings.set(&key, &value)?;
            store.save(&settings)?;
            println!("ok");
        }
        ConfigAction::List => {
            let settings = store.load()?;
            let json = serde_json::to_string_pretty(&settings)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            store.save(&Settings::default())?;
            println!("config reset to defaults");
        }
    }
    Ok(())
}

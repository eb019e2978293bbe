use clap::Subcommand;
use tomate_core::storage::{CYCLE_CHOICES, DURATION_CHOICES_MIN};
use tomate_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Get a config value
    Get {
        /// Config key (e.g. "cycle_count", "durations.pomodoro")
        key: String,
    },
    /// Set a config value
    Set {
        /// Config key (use "overrides.<slot>" for a per-slot length in seconds)
        key: String,
        /// New value
        value: String,
    },
    /// List all config values
    List,
    /// Reset config to defaults
    Reset,
    /// Show the values offered by the settings panel
    Choices,
}

pub fn run(action: ConfigAction) -> anyhow::Result<()> {
    match action {
        ConfigAction::Get { key } => {
            let config = Config::load()?;
            match config.get(&key) {
                Some(value) => println!("{value}"),
                None => anyhow::bail!("unknown key: {key}"),
            }
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            println!("ok");
        }
        ConfigAction::List => {
            let config = Config::load()?;
            let json = serde_json::to_string_pretty(&config)?;
            println!("{json}");
        }
        ConfigAction::Reset => {
            let config = Config::default();
            config.save()?;
            println!("config reset to defaults");
        }
        ConfigAction::Choices => {
            let cycles: Vec<String> = CYCLE_CHOICES.map(|n| n.to_string()).collect();
            let minutes: Vec<String> = DURATION_CHOICES_MIN
                .iter()
                .map(|m| tomate_core::format_clock(m * 60))
                .collect();
            println!("cycles: {}", cycles.join(", "));
            println!("durations: {}", minutes.join(", "));
        }
    }
    Ok(())
}

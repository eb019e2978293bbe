use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod sound;

#[derive(Parser)]
#[command(name = "tomate", version, about = "Don Tomate pomodoro timer")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the timer interactively (commands are read from stdin)
    Run(commands::run::RunArgs),
    /// Print the session chain
    Chain(commands::chain::ChainArgs),
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tomate=info,tomate_core=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run(args) => commands::run::run(args),
        Commands::Chain(args) => commands::chain::run(args),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

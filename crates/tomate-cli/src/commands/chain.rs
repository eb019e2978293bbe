use clap::Args;
use tomate_core::{format_clock, Config, SessionChain};

#[derive(Args)]
pub struct ChainArgs {
    /// Number of pomodoros (defaults to the configured cycle count)
    #[arg(long)]
    pub cycles: Option<u32>,
    /// Print the chain as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ChainArgs) -> anyhow::Result<()> {
    let config = Config::load_or_default();
    let cycles = args.cycles.unwrap_or(config.cycle_count);
    let chain = SessionChain::build_with_overrides(
        cycles,
        &config.durations.to_slot_durations(),
        &config.overrides,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(chain.slots())?);
        return Ok(());
    }

    for slot in chain.slots() {
        println!(
            "{:<12} {:<14} {}  -> {}",
            slot.id.as_str(),
            slot.display_name,
            format_clock(slot.duration_seconds),
            slot.successor_id
        );
    }
    println!(
        "{} slots, {} total",
        chain.len(),
        format_clock(chain.total_duration_seconds())
    );
    Ok(())
}

//! Interactive host: a one-second interval delivers ticks, stdin lines are
//! user commands aimed at the slot currently on display (silence and reset
//! follow a pending alert instead).
//!
//! Both sources are multiplexed on a single-threaded runtime, so the engine
//! is only ever touched from one task.

use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::MissedTickBehavior;
use tomate_core::{AlertSound, Config, Event, ManualTicker, SessionEngine, TimerPhase};

use crate::sound::HostAlert;

#[derive(Args)]
pub struct RunArgs {
    /// Number of pomodoros (defaults to the configured cycle count)
    #[arg(long)]
    pub cycles: Option<u32>,
    /// Print events as JSON lines
    #[arg(long)]
    pub json: bool,
    /// Tick period in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub tick_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Stop,
    Toggle,
    Reset,
    Silence,
    Next,
    Prev,
    Cycles(u32),
    Set { slot: String, minutes: u64 },
    Status,
    Chain,
    Help,
    Quit,
}

const HELP: &str = "commands: start | stop | toggle | reset | silence | next | prev | \
cycles <n> | set <slot> <minutes> | status | chain | quit";

pub fn parse_command(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Err(HELP.to_string());
    };
    let cmd = match verb {
        "start" => Command::Start,
        "stop" | "pause" => Command::Stop,
        "toggle" | "p" => Command::Toggle,
        "reset" => Command::Reset,
        "silence" | "mute" => Command::Silence,
        "next" | "n" => Command::Next,
        "prev" | "b" => Command::Prev,
        "cycles" => {
            let n = words
                .next()
                .ok_or("usage: cycles <n>")?
                .parse::<u32>()
                .map_err(|e| format!("cycles: {e}"))?;
            Command::Cycles(n)
        }
        "set" => {
            let slot = words.next().ok_or("usage: set <slot> <minutes>")?;
            let minutes = words
                .next()
                .ok_or("usage: set <slot> <minutes>")?
                .parse::<u64>()
                .map_err(|e| format!("set: {e}"))?;
            Command::Set {
                slot: slot.to_string(),
                minutes,
            }
        }
        "status" | "s" => Command::Status,
        "chain" => Command::Chain,
        "help" | "?" => Command::Help,
        "quit" | "q" | "exit" => Command::Quit,
        other => return Err(format!("unknown command '{other}'; {HELP}")),
    };
    Ok(cmd)
}

pub fn run(args: RunArgs) -> anyhow::Result<()> {
    let mut config = Config::load_or_default();
    if let Some(cycles) = args.cycles {
        config.cycle_count = cycles;
    }
    let engine = SessionEngine::from_config(&config, ManualTicker::new(), HostAlert::detect())?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(drive(engine, args.json, Duration::from_millis(args.tick_ms.max(1))))
}

async fn drive<A: AlertSound>(
    mut engine: SessionEngine<ManualTicker, A>,
    json: bool,
    period: Duration,
) -> anyhow::Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if !json {
        println!("{}", engine.current_view().status_line());
    }

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let events = engine.pump();
                emit(&events, json)?;
                if !json {
                    if let Some(running) = engine.views().into_iter().find(|v| v.phase == TimerPhase::Running) {
                        println!("{}", running.status_line());
                    }
                }
            }
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if line.trim().is_empty() {
                    continue;
                }
                let cmd = match parse_command(&line) {
                    Ok(cmd) => cmd,
                    Err(msg) => {
                        eprintln!("{msg}");
                        continue;
                    }
                };
                if cmd == Command::Quit {
                    break;
                }
                let events = apply(&mut engine, cmd, json);
                // Align the first countdown second with the start press.
                if events.iter().any(|e| matches!(e, Event::TimerStarted { .. })) {
                    interval.reset();
                }
                emit(&events, json)?;
            }
        }
    }
    Ok(())
}

fn apply<A: AlertSound>(
    engine: &mut SessionEngine<ManualTicker, A>,
    cmd: Command,
    json: bool,
) -> Vec<Event> {
    let current = engine.current_slot_id().as_str().to_string();
    let result = match cmd {
        Command::Start => Ok(engine.start(&current)),
        Command::Stop => Ok(engine.stop(&current)),
        Command::Toggle => Ok(engine.toggle(&current)),
        Command::Reset => {
            let target = alert_target(engine);
            Ok(engine.reset(&target))
        }
        Command::Silence => {
            let target = alert_target(engine);
            Ok(engine.silence_alert(&target))
        }
        Command::Next => Ok(engine.advance_forward()),
        Command::Prev => Ok(engine.advance_backward()),
        Command::Cycles(n) => engine.set_cycle_count(n),
        Command::Set { slot, minutes } => {
            engine.apply_duration_override(&slot, minutes.saturating_mul(60))
        }
        Command::Status => {
            print_status(engine, json);
            Ok(Vec::new())
        }
        Command::Chain => {
            for slot in engine.chain().slots() {
                println!("{} ({})", slot.id, slot.display_name);
            }
            Ok(Vec::new())
        }
        Command::Help => {
            println!("{HELP}");
            Ok(Vec::new())
        }
        Command::Quit => Ok(Vec::new()),
    };

    match result {
        Ok(events) => {
            if events.is_empty() {
                tracing::debug!(slot = %current, "command had no effect");
            }
            events
        }
        Err(e) => {
            eprintln!("error: {e}");
            Vec::new()
        }
    }
}

/// Expiry moves the display on, so the slot that is ringing is usually not
/// the one on screen. Silence and reset go to the finished slot holding the
/// active claim, or to the displayed slot when nothing is pending or the
/// displayed slot is itself finished.
fn alert_target<A: AlertSound>(engine: &SessionEngine<ManualTicker, A>) -> String {
    let current = engine.current_slot_id();
    let finished = |id: &str| engine.phase(id).is_some_and(TimerPhase::is_finished);
    if finished(current.as_str()) {
        return current.as_str().to_string();
    }
    engine
        .context()
        .active()
        .filter(|id| finished(id.as_str()))
        .unwrap_or(current)
        .as_str()
        .to_string()
}

fn print_status<A: AlertSound>(engine: &SessionEngine<ManualTicker, A>, json: bool) {
    if json {
        match serde_json::to_string(&engine.views()) {
            Ok(line) => println!("{line}"),
            Err(e) => eprintln!("error: {e}"),
        }
        return;
    }
    for view in engine.views() {
        let marker = if view.is_current { ">" } else { " " };
        let done = if view.completed { "done" } else { "" };
        println!("{marker} {} {done}", view.status_line());
    }
}

fn emit(events: &[Event], json: bool) -> anyhow::Result<()> {
    for event in events {
        if json {
            println!("{}", serde_json::to_string(event)?);
        } else {
            println!("{}", event.describe());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tomate_core::{AlertHandle, AudioError, SlotDurations};

    #[test]
    fn parses_simple_verbs() {
        assert_eq!(parse_command("start"), Ok(Command::Start));
        assert_eq!(parse_command("  p "), Ok(Command::Toggle));
        assert_eq!(parse_command("q"), Ok(Command::Quit));
        assert_eq!(parse_command("mute"), Ok(Command::Silence));
    }

    #[test]
    fn parses_arguments() {
        assert_eq!(parse_command("cycles 3"), Ok(Command::Cycles(3)));
        assert_eq!(
            parse_command("set break_1 10"),
            Ok(Command::Set {
                slot: "break_1".into(),
                minutes: 10
            })
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_command("").is_err());
        assert!(parse_command("cycles").is_err());
        assert!(parse_command("cycles many").is_err());
        assert!(parse_command("set main").is_err());
        assert!(parse_command("dance").is_err());
    }

    #[test]
    fn commands_target_the_displayed_slot() {
        let mut engine = SessionEngine::with_defaults(2).unwrap();
        let events = apply(&mut engine, Command::Start, false);
        assert!(matches!(events[0], Event::TimerStarted { .. }));

        apply(&mut engine, Command::Next, false);
        // break_1 is on display but main has not finished yet.
        assert!(apply(&mut engine, Command::Start, false).is_empty());
        assert!(engine.timer("main").unwrap().is_running());
    }

    #[derive(Debug, Default)]
    struct Ringer {
        next: u64,
        sounding: Vec<AlertHandle>,
    }

    impl AlertSound for Ringer {
        fn play(&mut self, _resource: &str) -> Result<AlertHandle, AudioError> {
            self.next += 1;
            self.sounding.push(AlertHandle(self.next));
            Ok(AlertHandle(self.next))
        }

        fn stop(&mut self, handle: AlertHandle) -> Result<(), AudioError> {
            self.sounding.retain(|h| *h != handle);
            Ok(())
        }
    }

    fn ringing_engine(cycles: u32) -> SessionEngine<ManualTicker, Ringer> {
        let durations = SlotDurations {
            pomodoro: 2,
            short_break: 1,
            long_break: 1,
        };
        SessionEngine::new(cycles, durations, ManualTicker::new(), Ringer::default()).unwrap()
    }

    fn expire_displayed(engine: &mut SessionEngine<ManualTicker, Ringer>) {
        assert!(matches!(
            apply(engine, Command::Start, false)[0],
            Event::TimerStarted { .. }
        ));
        while engine.views().iter().any(|v| v.phase == TimerPhase::Running) {
            engine.pump();
        }
    }

    #[test]
    fn silence_reaches_the_slot_that_expired() {
        let mut engine = ringing_engine(2);
        expire_displayed(&mut engine);
        assert_eq!(engine.phase("main"), Some(TimerPhase::AlertActive));
        assert_eq!(engine.current_slot_id().as_str(), "break_1");

        let events = apply(&mut engine, Command::Silence, false);
        assert!(matches!(events[0], Event::AlertSilenced { .. }));
        assert!(engine.alert().sounding.is_empty());
        assert_eq!(engine.phase("main"), Some(TimerPhase::Idle));
    }

    #[test]
    fn reset_after_expiry_stops_the_alert() {
        let mut engine = ringing_engine(2);
        expire_displayed(&mut engine);

        let events = apply(&mut engine, Command::Reset, false);
        assert!(matches!(events[0], Event::TimerReset { hard: true, .. }));
        assert!(engine.alert().sounding.is_empty());
        assert_eq!(engine.phase("main"), Some(TimerPhase::Idle));
        assert_eq!(engine.remaining_seconds("main"), Some(2));
    }

    #[test]
    fn silencing_the_long_break_starts_a_new_cycle() {
        let mut engine = ringing_engine(1);
        expire_displayed(&mut engine);
        apply(&mut engine, Command::Silence, false);
        expire_displayed(&mut engine);
        // The pointer wrapped back to main while long_break rings.
        assert_eq!(engine.current_slot_id().as_str(), "main");

        let events = apply(&mut engine, Command::Silence, false);
        assert!(matches!(events[0], Event::AlertSilenced { .. }));
        assert!(matches!(events.last(), Some(Event::ChainRebuilt { .. })));
        assert!(engine.context().registry_is_empty());
    }

    #[test]
    fn invalid_cycle_count_is_reported_not_applied() {
        let mut engine = SessionEngine::with_defaults(2).unwrap();
        assert!(apply(&mut engine, Command::Cycles(0), false).is_empty());
        assert_eq!(engine.cycle_count(), 2);
    }
}

//! Integration tests for session sequencing.
//!
//! Drives the engine through whole cycles the way the display layer and the
//! tick scheduler would, and checks gating, expiry, acknowledgment and
//! rebuild behaviour end to end.

use tomate_core::{
    AlertHandle, AlertSound, AudioError, Config, Event, ManualTicker, SessionEngine, SlotDurations,
    SlotId, TimerPhase,
};

/// Audio backend that always plays and tracks what is sounding.
#[derive(Debug, Default)]
struct Speaker {
    next: u64,
    sounding: Vec<AlertHandle>,
    resources: Vec<String>,
}

impl AlertSound for Speaker {
    fn play(&mut self, resource: &str) -> Result<AlertHandle, AudioError> {
        self.next += 1;
        self.resources.push(resource.to_string());
        let handle = AlertHandle(self.next);
        self.sounding.push(handle);
        Ok(handle)
    }

    fn stop(&mut self, handle: AlertHandle) -> Result<(), AudioError> {
        self.sounding.retain(|h| *h != handle);
        Ok(())
    }
}

/// Audio backend whose device never opens.
#[derive(Debug, Default)]
struct BrokenSpeaker;

impl AlertSound for BrokenSpeaker {
    fn play(&mut self, _resource: &str) -> Result<AlertHandle, AudioError> {
        Err(AudioError::Unavailable("no device".into()))
    }

    fn stop(&mut self, _handle: AlertHandle) -> Result<(), AudioError> {
        Ok(())
    }
}

fn default_engine(cycles: u32) -> SessionEngine<ManualTicker, Speaker> {
    SessionEngine::new(
        cycles,
        SlotDurations::default(),
        ManualTicker::new(),
        Speaker::default(),
    )
    .unwrap()
}

fn tiny_engine(cycles: u32) -> SessionEngine<ManualTicker, Speaker> {
    let durations = SlotDurations {
        pomodoro: 2,
        short_break: 1,
        long_break: 1,
    };
    SessionEngine::new(cycles, durations, ManualTicker::new(), Speaker::default()).unwrap()
}

/// Start `id`, tick it to zero and acknowledge the alert.
fn complete(engine: &mut SessionEngine<ManualTicker, Speaker>, id: &str) -> Vec<Event> {
    let mut events = engine.start(id);
    assert!(
        matches!(events.first(), Some(Event::TimerStarted { .. })),
        "{id} did not start"
    );
    while engine.phase(id) == Some(TimerPhase::Running) {
        events.extend(engine.pump());
    }
    events.extend(engine.silence_alert(id));
    events
}

#[test]
fn two_cycle_scenario() {
    let mut engine = default_engine(2);

    let slots: Vec<(&str, &str, u64)> = engine
        .chain()
        .slots()
        .iter()
        .map(|s| (s.id.as_str(), s.display_name.as_str(), s.duration_seconds))
        .collect();
    assert_eq!(
        slots,
        vec![
            ("main", "Pomodoro 1", 1500),
            ("break_1", "Short Break 1", 300),
            ("main_2", "Pomodoro 2", 1500),
            ("long_break", "Long Break", 900),
        ]
    );
    assert_eq!(engine.chain().successor("long_break").unwrap().id, "main");

    assert!(!engine.start("main").is_empty());

    let mut expired = 0;
    for _ in 0..1500 {
        for event in engine.on_tick("main") {
            if matches!(event, Event::TimerExpired { .. }) {
                expired += 1;
            }
        }
    }
    assert_eq!(expired, 1);
    assert_eq!(engine.remaining_seconds("main"), Some(0));
    assert!(engine.phase("main").unwrap().is_finished());
    assert_eq!(engine.current_slot_id(), &SlotId::from("break_1"));
    assert!(engine.context().is_completed(&"main".into()));

    assert!(!engine.start("break_1").is_empty());
    assert_eq!(engine.phase("break_1"), Some(TimerPhase::Running));

    assert!(engine.start("main_2").is_empty());
    assert_eq!(engine.phase("main_2"), Some(TimerPhase::Idle));
}

#[test]
fn ticks_after_expiry_do_not_change_remaining() {
    let mut engine = tiny_engine(1);
    engine.start("main");
    engine.on_tick("main");
    engine.on_tick("main");
    assert_eq!(engine.phase("main"), Some(TimerPhase::AlertActive));

    for _ in 0..5 {
        assert!(engine.on_tick("main").is_empty());
    }
    assert_eq!(engine.remaining_seconds("main"), Some(0));
    assert_eq!(engine.ticks().armed_count(), 0);
}

#[test]
fn gated_start_leaves_state_unchanged() {
    let mut engine = default_engine(3);
    let before = engine.views();
    for id in ["break_1", "main_2", "break_2", "main_3", "long_break"] {
        assert!(engine.start(id).is_empty(), "{id} should be gated");
    }
    assert_eq!(engine.views(), before);
    assert!(engine.context().active().is_none());
    assert_eq!(engine.ticks().armed_count(), 0);
}

#[test]
fn reset_restores_duration_from_every_phase() {
    let mut engine = tiny_engine(2);

    // Idle
    engine.reset("main");
    assert_eq!(engine.remaining_seconds("main"), Some(2));

    // Running
    engine.start("main");
    engine.on_tick("main");
    engine.reset("main");
    assert_eq!(engine.phase("main"), Some(TimerPhase::Idle));
    assert_eq!(engine.remaining_seconds("main"), Some(2));

    // AlertActive
    engine.start("main");
    engine.pump();
    engine.pump();
    assert_eq!(engine.phase("main"), Some(TimerPhase::AlertActive));
    engine.reset("main");
    assert_eq!(engine.phase("main"), Some(TimerPhase::Idle));
    assert_eq!(engine.remaining_seconds("main"), Some(2));
    assert!(engine.alert().sounding.is_empty());
    assert!(engine.context().active().is_none());
}

#[test]
fn full_cycle_acknowledgment_rebuilds_same_cycle_count() {
    let mut engine = tiny_engine(2);
    for id in ["main", "break_1", "main_2"] {
        complete(&mut engine, id);
    }
    assert_eq!(engine.context().completed_count(), 3);

    let events = complete(&mut engine, "long_break");
    let rebuilt = events
        .iter()
        .filter(|e| matches!(e, Event::ChainRebuilt { cycle_count: 2, slot_count: 4, .. }))
        .count();
    assert_eq!(rebuilt, 1);
    assert!(engine.context().registry_is_empty());
    assert!(engine.context().active().is_none());
    assert_eq!(engine.current_slot_id(), &SlotId::from("main"));
    assert!(engine.timers().iter().all(|t| t.phase() == TimerPhase::Idle));

    // A fresh cycle starts at the entry slot again.
    assert!(!engine.start("main").is_empty());
}

#[test]
fn entry_startable_between_full_cycle_and_acknowledgment() {
    let mut engine = tiny_engine(1);
    complete(&mut engine, "main");
    engine.start("long_break");
    engine.pump();
    assert_eq!(engine.phase("long_break"), Some(TimerPhase::AlertActive));

    // Every slot has completed, so the entry slot is open again.
    assert!(engine.view("main").unwrap().startable);
}

#[test]
fn missing_audio_still_expires_and_can_be_acknowledged() {
    let durations = SlotDurations {
        pomodoro: 1,
        short_break: 1,
        long_break: 1,
    };
    let mut engine =
        SessionEngine::new(1, durations, ManualTicker::new(), BrokenSpeaker).unwrap();
    engine.start("main");
    let events = engine.pump();

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Event::TimerExpired { .. }));
    assert_eq!(engine.phase("main"), Some(TimerPhase::Expired));

    let events = engine.silence_alert("main");
    assert!(matches!(events[0], Event::AlertSilenced { .. }));
    assert_eq!(engine.phase("main"), Some(TimerPhase::Idle));
}

#[test]
fn disabled_alerts_never_reach_the_backend() {
    let mut engine = tiny_engine(1).with_alerts_enabled(false);
    engine.start("main");
    engine.pump();
    engine.pump();
    assert_eq!(engine.phase("main"), Some(TimerPhase::Expired));
    assert!(engine.alert().resources.is_empty());
}

#[test]
fn engine_from_config_uses_overrides_and_sound() {
    let mut config = Config::default();
    config.cycle_count = 2;
    config.durations.long_break = 30;
    config.overrides.insert("break_1".into(), 1);
    config.alert.sound = "bell.ogg".into();

    let mut engine =
        SessionEngine::from_config(&config, ManualTicker::new(), Speaker::default()).unwrap();
    assert_eq!(engine.remaining_seconds("long_break"), Some(30 * 60));
    assert_eq!(engine.remaining_seconds("break_1"), Some(1));

    engine.apply_duration_override("main", 1).unwrap();
    engine.start("main");
    engine.pump();
    assert_eq!(engine.alert().resources, vec!["bell.ogg".to_string()]);

    // Configured lengths outlive a rebuild; the in-session change does not.
    engine.rebuild().unwrap();
    assert_eq!(engine.remaining_seconds("break_1"), Some(1));
    assert_eq!(engine.remaining_seconds("main"), Some(25 * 60));
}

#[test]
fn toggle_acts_as_play_pause() {
    let mut engine = tiny_engine(2);
    assert!(matches!(engine.toggle("main")[0], Event::TimerStarted { .. }));
    assert!(matches!(engine.toggle("main")[0], Event::TimerStopped { .. }));
    assert!(engine.context().active().is_none());
    assert!(matches!(engine.toggle("main")[0], Event::TimerStarted { .. }));
}

#[test]
fn cycle_count_change_mid_session_starts_clean() {
    let mut engine = tiny_engine(2);
    complete(&mut engine, "main");
    engine.start("break_1");
    engine.advance_forward();

    engine.set_cycle_count(1).unwrap();
    assert_eq!(engine.chain().len(), 2);
    assert!(engine.timer("break_1").is_none());
    assert!(engine.context().registry_is_empty());
    assert_eq!(engine.ticks().armed_count(), 0);
    assert!(engine.on_tick("break_1").is_empty());
}

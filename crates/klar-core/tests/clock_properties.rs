//! Property tests for the countdown state machine.
//!
//! Drives a `ClockEngine` through arbitrary command sequences and checks the
//! invariants that must hold after every step.

use klar_core::{ClockEngine, DailyStats, Durations, Event, Phase};
use proptest::prelude::*;

#[derive(Debug, Clone, Copy)]
enum Op {
    Start,
    Pause,
    Stop,
    Tick(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Start),
        Just(Op::Pause),
        Just(Op::Stop),
        (1u16..40).prop_map(Op::Tick),
    ]
}

fn apply(engine: &mut ClockEngine, op: Op) -> Vec<Event> {
    match op {
        Op::Start => engine.start().into_iter().collect(),
        Op::Pause => engine.pause().into_iter().collect(),
        Op::Stop => engine.stop().into_iter().collect(),
        Op::Tick(n) => (0..n).filter_map(|_| engine.tick()).collect(),
    }
}

proptest! {
    #[test]
    fn state_invariants_hold_for_any_sequence(
        work in 1u64..60,
        brk in 1u64..30,
        ops in prop::collection::vec(op(), 0..60),
    ) {
        let durations = Durations::new(work, brk).unwrap();
        let mut engine = ClockEngine::new(durations, DailyStats::today());

        for op in ops {
            apply(&mut engine, op);
            let state = engine.state();

            prop_assert!(!state.is_paused || state.is_running, "paused while not running");
            prop_assert!(state.seconds_remaining <= engine.phase_total());
            prop_assert!(state.seconds_remaining >= 1, "countdown rested at zero");
            let progress = engine.progress();
            prop_assert!((0.0..100.0).contains(&progress), "progress {progress}");
            if !state.is_running {
                prop_assert_eq!(state.seconds_remaining, durations.for_phase(state.phase));
                prop_assert!(state.session_id.is_none());
            }
        }
    }

    #[test]
    fn completions_alternate_phases(
        work in 1u64..20,
        brk in 1u64..20,
        completions in 0usize..8,
    ) {
        let durations = Durations::new(work, brk).unwrap();
        let mut engine = ClockEngine::new(durations, DailyStats::today());
        let mut work_done = 0u64;
        let mut breaks_done = 0u32;

        for _ in 0..completions {
            prop_assert!(engine.start().is_some());
            let mut completed = None;
            while completed.is_none() {
                completed = engine.tick();
            }
            match completed {
                Some(Event::PhaseCompleted { phase: Phase::Work, next_phase, .. }) => {
                    prop_assert_eq!(next_phase, Phase::Break);
                    work_done += 1;
                }
                Some(Event::PhaseCompleted { phase: Phase::Break, next_phase, .. }) => {
                    prop_assert_eq!(next_phase, Phase::Work);
                    breaks_done += 1;
                }
                other => prop_assert!(false, "unexpected event {other:?}"),
            }
            prop_assert!(!engine.state().is_running);
        }

        let expected = if completions % 2 == 0 { Phase::Work } else { Phase::Break };
        prop_assert_eq!(engine.state().phase, expected);
        prop_assert_eq!(engine.stats().focus_seconds_today, work_done * work);
        prop_assert_eq!(engine.stats().breaks_taken, breaks_done);
    }

    #[test]
    fn ticks_without_start_change_nothing(ticks in 0u16..500) {
        let mut engine = ClockEngine::new(Durations::default(), DailyStats::today());
        let before = engine.state().clone();
        prop_assert!(apply(&mut engine, Op::Tick(ticks)).is_empty());
        prop_assert_eq!(engine.state(), &before);
    }
}

#[test]
fn full_pomodoro_then_break_workflow() {
    let mut engine = ClockEngine::new(Durations::default(), DailyStats::today());

    // Work runs for 1500 ticks and completes exactly on the last one.
    engine.start();
    for _ in 0..1499 {
        assert!(engine.tick().is_none());
    }
    assert_eq!(engine.state().seconds_remaining, 1);
    assert!(matches!(engine.tick(), Some(Event::PhaseCompleted { phase: Phase::Work, .. })));
    assert_eq!(engine.state().phase, Phase::Break);
    assert_eq!(engine.state().seconds_remaining, 300);
    assert!(!engine.state().is_running);
    assert_eq!(engine.stats().focus_seconds_today, 1500);

    // Stopping a started break counts as missed, not taken.
    engine.start();
    for _ in 0..10 {
        engine.tick();
    }
    assert!(matches!(engine.stop(), Some(Event::TimerStopped { phase: Phase::Break, elapsed_secs: 10, .. })));
    assert_eq!(engine.stats().breaks_missed, 1);
    assert_eq!(engine.stats().breaks_taken, 0);
    assert_eq!(engine.state().phase, Phase::Break);
    assert_eq!(engine.state().seconds_remaining, 300);
}

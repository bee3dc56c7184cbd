use std::time::Duration;

use pushup_counter::pose::PoseFrameEvent;
use pushup_counter::runtime::{ChannelEventSource, FixedTicker, Runner, WorkoutEvent};
use pushup_counter::store::{WorkoutRecord, WorkoutStore};
use pushup_counter::summary::{SaveOutcome, SessionSummary};
use pushup_counter::{Timing, WorkoutConfiguration, WorkoutMachine, WorkoutMode, WorkoutPhase};

// Headless flows through the internal runner without a pose capability:
// events are pushed straight onto the channel the runner reads from.

fn dispatch(machine: &mut WorkoutMachine, ev: WorkoutEvent) {
    match ev {
        WorkoutEvent::Tick => machine.advance(machine.timing().tick_interval),
        WorkoutEvent::Pose(frame) => machine.on_pose(&frame),
        WorkoutEvent::Finish => {
            machine.finish();
        }
        WorkoutEvent::Cancel => machine.cancel(),
    }
}

/// Feed ticks until the machine reaches `phase`, with an upper bound.
fn tick_until(machine: &mut WorkoutMachine, phase: WorkoutPhase, max_ticks: u32) {
    for _ in 0..max_ticks {
        if machine.phase() == phase {
            return;
        }
        machine.advance(machine.timing().tick_interval);
    }
    assert_eq!(machine.phase(), phase);
}

#[test]
fn headless_reps_workout_completes_and_saves_once() {
    let mut machine = WorkoutMachine::new(WorkoutConfiguration::reps(20), Timing::default());

    let (tx, es) = ChannelEventSource::channel();
    let mut runner = Runner::new(es, FixedTicker::new(Duration::from_millis(1)));

    tx.send(WorkoutEvent::Pose(PoseFrameEvent::person_found(0.0)))
        .unwrap();
    for _ in 0..2000u32 {
        dispatch(&mut machine, runner.step());
        if machine.phase() == WorkoutPhase::Active {
            break;
        }
    }
    assert_eq!(machine.phase(), WorkoutPhase::Active);

    for _ in 0..20 {
        tx.send(WorkoutEvent::Pose(PoseFrameEvent::person_found(0.1)))
            .unwrap();
        tx.send(WorkoutEvent::Pose(PoseFrameEvent::person_found(0.95)))
            .unwrap();
    }
    for _ in 0..10_000u32 {
        dispatch(&mut machine, runner.step());
        if machine.is_finished() {
            break;
        }
    }

    assert_eq!(machine.phase(), WorkoutPhase::Completed);
    let result = machine.result().unwrap();
    assert_eq!(result.completed_reps, 20);
    assert!(result.reached_target());

    let mut store = WorkoutStore::open_in_memory().unwrap();
    let mut summary = SessionSummary::new(result);
    let first = summary.save(&mut store).unwrap();
    let second = summary.save(&mut store).unwrap();
    assert_eq!(second, SaveOutcome::AlreadySaved(first.id()));
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn headless_time_workout_finishes_by_ticks() {
    let mut machine = WorkoutMachine::new(WorkoutConfiguration::time(60), Timing::default());
    machine.on_pose(&PoseFrameEvent::person_found(0.0));
    tick_until(&mut machine, WorkoutPhase::Active, 100);

    for _ in 0..600 {
        assert!(!machine.is_completed());
        machine.advance(Duration::from_millis(100));
    }

    assert_eq!(machine.phase(), WorkoutPhase::Completed);
    let result = machine.result().unwrap();
    assert_eq!(result.completed_reps, 0);
    assert!((result.duration_secs() - 60.0).abs() < 1e-9);
    assert_eq!(machine.state().remaining, Some(Duration::ZERO));
}

#[test]
fn headless_lost_tracking_never_starts_countdown() {
    let mut machine = WorkoutMachine::new(WorkoutConfiguration::reps(10), Timing::default());
    machine.on_pose(&PoseFrameEvent::person_found(0.2));
    assert!(machine.state().is_positioned);

    machine.advance(Duration::from_millis(500));
    machine.on_pose(&PoseFrameEvent::no_person());
    assert!(!machine.state().is_positioned);

    for _ in 0..30 {
        machine.advance(Duration::from_millis(100));
    }
    assert_eq!(machine.phase(), WorkoutPhase::Positioning);
}

#[test]
fn headless_finish_request_keeps_partial_result() {
    let mut machine = WorkoutMachine::new(WorkoutConfiguration::reps(50), Timing::default());
    machine.on_pose(&PoseFrameEvent::person_found(0.0));
    tick_until(&mut machine, WorkoutPhase::Active, 100);

    for _ in 0..3 {
        dispatch(&mut machine, WorkoutEvent::Pose(PoseFrameEvent::person_found(0.0)));
        dispatch(&mut machine, WorkoutEvent::Pose(PoseFrameEvent::person_found(1.0)));
        dispatch(&mut machine, WorkoutEvent::Tick);
    }
    dispatch(&mut machine, WorkoutEvent::Finish);
    dispatch(&mut machine, WorkoutEvent::Cancel);

    let result = machine.result().unwrap();
    assert_eq!(result.completed_reps, 3);
    assert_eq!(result.duration, Duration::from_millis(300));
    assert!(!machine.is_cancelled());
}

#[test]
fn history_round_trip_and_delete_unknown() {
    let store = WorkoutStore::open_in_memory().unwrap();
    let record = WorkoutRecord::new(WorkoutMode::Reps, 20, 18, 51.2, Some(0.66));
    store.append(&record).unwrap();

    let listed: Vec<_> = store.list().map(|r| r.unwrap()).collect();
    assert_eq!(listed, vec![record.clone()]);

    store.delete(uuid::Uuid::new_v4()).unwrap();
    assert_eq!(store.len().unwrap(), 1);

    store.delete(record.id).unwrap();
    assert_eq!(store.list().count(), 0);
}

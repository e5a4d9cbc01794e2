//! Integration tests for the controller: session outcomes, spin credits,
//! persistence across reloads and resume-on-load.

use std::time::Duration;

use rand::SeedableRng;
use rand_pcg::Pcg64;
use tokio::sync::mpsc::UnboundedReceiver;
use travelfund_core::{
    AppSnapshot, Config, Controller, Database, Event, KvStore, ManualClock, ManualScheduler,
    MemoryStore, RecordKind, SessionState, Tick, TokioCountdown, STORE_KEY,
};

const T0: i64 = 1_760_000_000_000;
const PERIOD: Duration = Duration::from_millis(5);

type App<'c> = Controller<MemoryStore, ManualScheduler, &'c ManualClock>;

fn open(store: MemoryStore, clock: &ManualClock) -> (App<'_>, Option<Event>) {
    Controller::open(store, ManualScheduler::new(), clock, Config::default()).unwrap()
}

/// Feed ticks until the countdown disarms. Returns how many were delivered.
fn run_to_completion(app: &mut App<'_>) -> usize {
    let mut ticks = 0;
    while let Some(tick) = app.scheduler().next_tick() {
        app.on_tick(tick).unwrap();
        ticks += 1;
    }
    ticks
}

fn complete_sessions(app: &mut App<'_>, n: usize) {
    for _ in 0..n {
        app.start().unwrap().unwrap();
        run_to_completion(app);
    }
}

fn stored_snapshot(store: &MemoryStore) -> AppSnapshot {
    serde_json::from_str(&store.get(STORE_KEY).unwrap().unwrap()).unwrap()
}

fn config_with(duration_secs: u64, pledge_amount: i64) -> Config {
    let mut config = Config::default();
    config.session.duration_secs = duration_secs;
    config.session.pledge_amount = pledge_amount;
    config
}

fn open_db<'c>(
    path: &std::path::Path,
    clock: &'c ManualClock,
) -> (Controller<Database, ManualScheduler, &'c ManualClock>, Option<Event>) {
    let db = Database::open_at(path).unwrap();
    Controller::open(db, ManualScheduler::new(), clock, Config::default()).unwrap()
}

/// Next tick from a live countdown, or `None` once it has gone quiet.
async fn next_tick(ticks: &mut UnboundedReceiver<Tick>) -> Option<Tick> {
    tokio::time::timeout(Duration::from_millis(200), ticks.recv())
        .await
        .ok()
        .flatten()
}

#[test]
fn start_then_abandon_costs_ten() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);

    app.start().unwrap().unwrap();
    assert_eq!(app.fund(), 10);
    assert!(app.records().is_empty());
    assert!(app.scheduler().armed().is_some());

    let event = app.abandon().unwrap().unwrap();
    assert!(matches!(event, Event::SessionAbandoned { fund: -10, .. }));
    assert_eq!(app.fund(), -10);
    assert_eq!(app.records().len(), 1);
    assert_eq!(app.records()[0].kind, RecordKind::Failure);
    assert_eq!(app.records()[0].amount, -10);
    assert_eq!(app.records()[0].description, "Given Up");
    assert_eq!(app.machine().state(), SessionState::Idle);
    assert!(app.scheduler().armed().is_none());
}

#[test]
fn full_countdown_completes_with_single_success() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);

    app.start().unwrap();
    let ticks = run_to_completion(&mut app);

    assert_eq!(ticks, 300);
    assert_eq!(app.fund(), 10);
    assert_eq!(app.records().len(), 1);
    assert_eq!(app.records()[0].kind, RecordKind::Success);
    assert_eq!(app.records()[0].amount, 10);
    assert_eq!(app.records()[0].description, "Focus Success");
    assert_eq!(app.credits().success_count(), 1);
    assert_eq!(app.machine().state(), SessionState::Idle);
}

#[test]
fn expire_twice_does_not_double_count() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);

    app.start().unwrap();
    assert!(app.expire().unwrap().is_some());
    assert!(app.expire().unwrap().is_none());
    assert_eq!(app.fund(), 10);
    assert_eq!(app.records().len(), 1);
}

#[test]
fn stale_tick_after_abandon_never_completes() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);

    app.start().unwrap();
    let stale = app.scheduler().next_tick().unwrap();
    app.abandon().unwrap();
    assert!(app.on_tick(stale).unwrap().is_none());

    // A new session must not accept ticks from the old one either.
    app.start().unwrap();
    for _ in 0..400 {
        assert!(app.on_tick(stale).unwrap().is_none());
    }
    assert_eq!(app.machine().remaining_secs(), 300);
    assert_eq!(app.records().len(), 1);
    assert_eq!(app.records()[0].kind, RecordKind::Failure);
}

#[test]
fn spin_credits_accrue_every_five_successes() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);

    complete_sessions(&mut app, 4);
    assert_eq!(app.credits().spins_available(), 0);
    complete_sessions(&mut app, 1);
    assert_eq!(app.credits().spins_available(), 1);
    complete_sessions(&mut app, 5);
    assert_eq!(app.credits().spins_available(), 2);
    assert_eq!(app.credits().success_count(), 10);
    assert_eq!(app.fund(), 100);
}

#[test]
fn deleting_success_keeps_counters() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    complete_sessions(&mut app, 5);

    let id = app.records()[0].id.clone();
    let event = app.delete(&id).unwrap().unwrap();
    assert!(matches!(event, Event::RecordDeleted { fund: 40, .. }));
    assert_eq!(app.fund(), 40);
    assert_eq!(app.credits().success_count(), 5);
    assert_eq!(app.credits().spins_available(), 1);
}

#[test]
fn delete_unknown_id_changes_nothing() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    complete_sessions(&mut app, 1);
    let before = app.snapshot();

    assert!(app.delete("no-such-id").unwrap().is_none());
    assert_eq!(app.snapshot(), before);
}

#[test]
fn spin_consumes_credit_and_records_lottery() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    let mut rng = Pcg64::seed_from_u64(42);

    assert!(!app.can_spin());
    assert!(app.spin(&mut rng).unwrap().is_none());

    complete_sessions(&mut app, 5);
    let fund_before = app.fund();
    let event = app.spin(&mut rng).unwrap().unwrap();

    let record = &app.records()[0];
    assert_eq!(record.kind, RecordKind::Lottery);
    assert!([10, 20, 40, 60].contains(&record.amount));
    assert_eq!(app.fund(), fund_before + record.amount);
    assert!(matches!(event, Event::SpinDrawn { spins_available: 0, .. }));
    assert!(app.spin(&mut rng).unwrap().is_none());
}

#[test]
fn precondition_violations_are_noops() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);

    assert!(app.abandon().unwrap().is_none());
    assert!(app.expire().unwrap().is_none());
    assert!(app.store().get(STORE_KEY).unwrap().is_none());

    app.start().unwrap().unwrap();
    assert!(app.start().unwrap().is_none());
    assert_eq!(app.fund(), 10);
}

#[test]
fn every_operation_persists_the_snapshot() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);

    app.start().unwrap();
    let stored = stored_snapshot(app.store());
    assert_eq!(stored.fund, 10);
    assert_eq!(stored.session_start_time, Some(T0));

    app.abandon().unwrap();
    let stored = stored_snapshot(app.store());
    assert_eq!(stored, app.snapshot());
    assert!(stored.session_start_time.is_none());
}

#[test]
fn plain_ticks_do_not_write() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    app.start().unwrap();
    let before = app.store().get(STORE_KEY).unwrap();

    let tick = app.scheduler().next_tick().unwrap();
    let event = app.on_tick(tick).unwrap().unwrap();
    assert_eq!(event, Event::SessionTicked { remaining_secs: 299 });
    assert_eq!(app.store().get(STORE_KEY).unwrap(), before);
}

#[test]
fn reload_restores_ledger_and_counters() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    complete_sessions(&mut app, 6);
    app.start().unwrap();
    app.abandon().unwrap();
    let before = app.snapshot();

    let (reloaded, event) = open(app.into_store(), &clock);
    assert!(event.is_none());
    assert_eq!(reloaded.snapshot(), before);
}

#[test]
fn resume_mid_session_keeps_running() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    app.start().unwrap();
    let store = app.into_store();

    clock.advance_secs(200);
    let (mut app, event) = open(store, &clock);
    assert!(matches!(event, Some(Event::SessionResumed { remaining_secs: 100, .. })));
    assert_eq!(app.machine().state(), SessionState::Running);
    assert_eq!(app.fund(), 10);
    assert!(app.scheduler().armed().is_some());

    assert_eq!(run_to_completion(&mut app), 100);
    assert_eq!(app.records().len(), 1);
    assert_eq!(app.records()[0].kind, RecordKind::Success);
    assert_eq!(app.fund(), 10);
}

#[test]
fn resume_after_duration_lapses_silently() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    app.start().unwrap();
    let store = app.into_store();

    clock.advance_secs(400);
    let (app, event) = open(store, &clock);
    assert!(matches!(event, Some(Event::SessionLapsed { started_at_ms: T0, .. })));
    assert_eq!(app.machine().state(), SessionState::Idle);
    assert!(app.records().is_empty());
    assert!(app.scheduler().armed().is_none());
    // The pledge is neither confirmed nor reversed.
    assert_eq!(app.fund(), 10);
    assert_eq!(app.credits().success_count(), 0);
    assert!(app.ledger().held_pledge().is_none());
    let stored = stored_snapshot(app.store());
    assert!(stored.session_start_time.is_none());
    assert!(stored.pledge_amount.is_none());
}

#[test]
fn completion_settles_pledge_held_at_start() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    app.start().unwrap().unwrap();
    let store = app.into_store();
    assert_eq!(stored_snapshot(&store).pledge_amount, Some(10));

    clock.advance_secs(10);
    let (mut app, _) =
        Controller::open(store, ManualScheduler::new(), &clock, config_with(300, 50)).unwrap();
    let event = app.expire().unwrap().unwrap();
    assert!(matches!(event, Event::SessionCompleted { fund: 10, .. }));
    assert_eq!(app.records()[0].amount, 10);
    assert_eq!(app.fund(), app.ledger().recorded_total());

    // The next session holds the new amount.
    let event = app.start().unwrap().unwrap();
    assert!(matches!(event, Event::SessionStarted { pledge: 50, fund: 60, .. }));
    app.abandon().unwrap().unwrap();
    assert_eq!(app.fund(), 0);
    assert_eq!(app.fund(), app.ledger().recorded_total());
}

#[test]
fn abandon_returns_pledge_held_at_start() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    app.start().unwrap().unwrap();
    let store = app.into_store();

    clock.advance_secs(10);
    let (mut app, _) =
        Controller::open(store, ManualScheduler::new(), &clock, config_with(300, 50)).unwrap();
    let event = app.abandon().unwrap().unwrap();
    assert!(matches!(event, Event::SessionAbandoned { fund: -10, .. }));
    assert_eq!(app.fund(), app.ledger().recorded_total());
}

#[test]
fn stored_session_without_pledge_amount_holds_ten() {
    let clock = ManualClock::new(T0 + 10_000);
    let mut store = MemoryStore::new();
    store
        .set(STORE_KEY, &format!(r#"{{"fund": 10, "sessionStartTime": {T0}}}"#))
        .unwrap();

    let (mut app, event) =
        Controller::open(store, ManualScheduler::new(), &clock, config_with(300, 50)).unwrap();
    assert!(matches!(event, Some(Event::SessionResumed { remaining_secs: 290, .. })));
    assert_eq!(app.ledger().held_pledge(), Some(10));
    app.abandon().unwrap().unwrap();
    assert_eq!(app.fund(), -10);
}

#[test]
fn malformed_store_starts_fresh() {
    let clock = ManualClock::new(T0);
    let mut store = MemoryStore::new();
    store.set(STORE_KEY, "][").unwrap();

    let (app, event) = open(store, &clock);
    assert!(event.is_none());
    assert_eq!(app.fund(), 0);
    assert!(app.records().is_empty());
}

#[test]
fn export_reflects_stored_bytes() {
    let clock = ManualClock::new(T0);
    let (mut app, _) = open(MemoryStore::new(), &clock);
    assert!(app.export().unwrap().is_none());

    app.start().unwrap();
    let file = app.export().unwrap().unwrap();
    assert_eq!(file.file_name, "travel-fund-backup-2025-10-09.json");
    assert_eq!(file.mime_type, "application/json");
    assert_eq!(Some(file.contents), app.store().get(STORE_KEY).unwrap());
}

#[test]
fn ticks_in_custom_session_length() {
    let clock = ManualClock::new(T0);
    let mut config = Config::default();
    config.session.duration_secs = 3;
    let (mut app, _) =
        Controller::open(MemoryStore::new(), ManualScheduler::new(), &clock, config).unwrap();

    app.start().unwrap();
    let generation = app.machine().generation();
    let tick = Tick { generation };
    assert!(matches!(app.on_tick(tick).unwrap(), Some(Event::SessionTicked { remaining_secs: 2 })));
    assert!(matches!(app.on_tick(tick).unwrap(), Some(Event::SessionTicked { remaining_secs: 1 })));
    assert!(matches!(app.on_tick(tick).unwrap(), Some(Event::SessionCompleted { .. })));
}

#[test]
fn sqlite_backed_controller_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("travelfund.db");
    let clock = ManualClock::new(T0);

    {
        let db = Database::open_at(&path).unwrap();
        let (mut app, _) =
            Controller::open(db, ManualScheduler::new(), &clock, Config::default()).unwrap();
        app.start().unwrap();
        app.abandon().unwrap();
    }

    let db = Database::open_at(&path).unwrap();
    let (app, _) = Controller::open(db, ManualScheduler::new(), &clock, Config::default()).unwrap();
    assert_eq!(app.fund(), -10);
    assert_eq!(app.records().len(), 1);
}

#[test]
fn reload_sees_abandon_from_another_writer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("travelfund.db");
    let clock = ManualClock::new(T0);

    let (mut watcher, _) = open_db(&path, &clock);
    watcher.start().unwrap().unwrap();
    assert!(watcher.reload().unwrap().is_none());
    let pending = watcher.scheduler().next_tick().unwrap();

    clock.advance_secs(30);
    let (mut other, event) = open_db(&path, &clock);
    assert!(matches!(event, Some(Event::SessionResumed { remaining_secs: 270, .. })));
    other.abandon().unwrap().unwrap();

    let event = watcher.reload().unwrap().unwrap();
    assert!(matches!(
        event,
        Event::StoreReloaded { state: SessionState::Idle, fund: -10, .. }
    ));
    assert!(watcher.scheduler().armed().is_none());
    assert!(watcher.on_tick(pending).unwrap().is_none());
    assert!(watcher.expire().unwrap().is_none());
    assert_eq!(watcher.snapshot(), other.snapshot());
    assert_eq!(watcher.records().len(), 1);
    assert_eq!(watcher.records()[0].kind, RecordKind::Failure);
}

#[test]
fn reload_adopts_session_started_elsewhere() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("travelfund.db");
    let clock = ManualClock::new(T0);

    let (mut watcher, _) = open_db(&path, &clock);
    assert!(watcher.reload().unwrap().is_none());

    let (mut other, _) = open_db(&path, &clock);
    other.start().unwrap().unwrap();
    clock.advance_secs(5);

    let event = watcher.reload().unwrap().unwrap();
    assert!(matches!(
        event,
        Event::StoreReloaded { state: SessionState::Running, remaining_secs: 295, fund: 10, .. }
    ));
    assert!(watcher.scheduler().armed().is_some());
    assert_eq!(watcher.ledger().held_pledge(), Some(10));
    assert!(watcher.reload().unwrap().is_none());
}

#[tokio::test]
async fn tokio_countdown_completes_exactly_once() {
    let clock = ManualClock::new(T0);
    let (countdown, mut ticks) = TokioCountdown::with_period(PERIOD);
    let (mut app, _) =
        Controller::open(MemoryStore::new(), countdown, &clock, config_with(3, 10)).unwrap();
    app.start().unwrap().unwrap();

    let mut events = Vec::new();
    while let Some(tick) = next_tick(&mut ticks).await {
        if let Some(event) = app.on_tick(tick).unwrap() {
            events.push(event);
        }
    }

    assert_eq!(events.len(), 3);
    assert_eq!(events[0], Event::SessionTicked { remaining_secs: 2 });
    assert_eq!(events[1], Event::SessionTicked { remaining_secs: 1 });
    assert!(matches!(events[2], Event::SessionCompleted { fund: 10, .. }));
    assert!(!app.scheduler().is_armed());
    assert_eq!(app.records().len(), 1);
    assert_eq!(app.credits().success_count(), 1);
}

#[tokio::test]
async fn tokio_countdown_stops_after_abandon() {
    let clock = ManualClock::new(T0);
    let (countdown, mut ticks) = TokioCountdown::with_period(PERIOD);
    let (mut app, _) =
        Controller::open(MemoryStore::new(), countdown, &clock, config_with(3, 10)).unwrap();
    app.start().unwrap().unwrap();

    let first = next_tick(&mut ticks).await.unwrap();
    assert_eq!(
        app.on_tick(first).unwrap(),
        Some(Event::SessionTicked { remaining_secs: 2 })
    );
    app.abandon().unwrap().unwrap();
    assert!(!app.scheduler().is_armed());

    while let Some(tick) = next_tick(&mut ticks).await {
        assert!(app.on_tick(tick).unwrap().is_none());
    }
    assert_eq!(app.machine().state(), SessionState::Idle);
    assert_eq!(app.records().len(), 1);
    assert_eq!(app.records()[0].kind, RecordKind::Failure);
    assert_eq!(app.fund(), -10);
}

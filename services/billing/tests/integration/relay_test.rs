use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use tokio::sync::watch;

use paydesk_billing::domain::types::{DeliveryState, EventKind, OUTBOX_MAX_RETRIES};
use paydesk_billing::infra::broker::InMemoryBroker;
use paydesk_billing::infra::db::{DbOutboxRepository, outbox};
use paydesk_billing::relay::{OutboxRelay, RelaySettings, RelayState, TickOutcome, TickReport};
use paydesk_testing::db::TestDb;

use crate::helpers::{
    GatedBroker, MockOutboxRepo, RecordingBroker, RecordingHandler, at, pending_event,
    seed_paid_event,
};

fn settings() -> RelaySettings {
    RelaySettings {
        poll_interval: Duration::from_millis(50),
        ..RelaySettings::default()
    }
}

#[tokio::test]
async fn should_complete_empty_tick_without_publishing() {
    let broker = Arc::new(RecordingBroker::default());
    let relay = OutboxRelay::new(MockOutboxRepo::new(vec![]), broker.clone(), settings());

    let outcome = relay.try_tick().await;

    assert_eq!(outcome, TickOutcome::Completed(TickReport::default()));
    assert_eq!(broker.attempts.load(Ordering::SeqCst), 0);
    assert_eq!(relay.state(), RelayState::Idle);
}

#[tokio::test]
async fn should_publish_in_occurred_at_order() {
    let t3 = pending_event(at(30));
    let t1 = pending_event(at(10));
    let t2 = pending_event(at(20));
    let repo = MockOutboxRepo::new(vec![t3.clone(), t1.clone(), t2.clone()]);
    let events = repo.events_handle();
    let broker = Arc::new(RecordingBroker::default());
    let relay = OutboxRelay::new(repo, broker.clone(), settings());

    let outcome = relay.try_tick().await;

    assert_eq!(broker.published(), vec![t1.id, t2.id, t3.id]);
    assert_eq!(
        outcome,
        TickOutcome::Completed(TickReport {
            fetched: 3,
            published: 3,
            failed: 0,
            abandoned: 0,
        })
    );
    assert!(events.lock().unwrap().iter().all(|e| e.published_at.is_some()));
}

#[tokio::test]
async fn should_fetch_at_most_batch_size_events_per_tick() {
    let events: Vec<_> = (0..12).map(|i| pending_event(at(i))).collect();
    let broker = Arc::new(RecordingBroker::default());
    let relay = OutboxRelay::new(MockOutboxRepo::new(events), broker.clone(), settings());

    relay.try_tick().await;
    assert_eq!(broker.published().len(), 10);

    relay.try_tick().await;
    assert_eq!(broker.published().len(), 12);
}

#[tokio::test]
async fn should_continue_batch_after_a_failed_publish() {
    let first = pending_event(at(1));
    let broken = pending_event(at(2));
    let last = pending_event(at(3));
    let repo = MockOutboxRepo::new(vec![first.clone(), broken.clone(), last.clone()]);
    let events = repo.events_handle();
    let broker = Arc::new(RecordingBroker::failing_for([broken.id]));
    let relay = OutboxRelay::new(repo, broker.clone(), settings());

    let outcome = relay.try_tick().await;

    assert_eq!(broker.published(), vec![first.id, last.id]);
    assert_eq!(
        outcome,
        TickOutcome::Completed(TickReport {
            fetched: 3,
            published: 2,
            failed: 1,
            abandoned: 0,
        })
    );
    let rows = events.lock().unwrap();
    let failed = rows.iter().find(|e| e.id == broken.id).unwrap();
    assert_eq!(failed.failure_count, 1);
    assert_eq!(
        failed.last_error.as_deref(),
        Some("broker unavailable: connection refused")
    );
    assert!(failed.published_at.is_none());
}

#[tokio::test]
async fn should_abandon_event_after_max_retries() {
    let poison = pending_event(at(0));
    let repo = MockOutboxRepo::new(vec![poison.clone()]);
    let events = repo.events_handle();
    let broker = Arc::new(RecordingBroker::failing_for([poison.id]));
    let relay = OutboxRelay::new(repo, broker.clone(), settings());

    for tick in 1..OUTBOX_MAX_RETRIES {
        let outcome = relay.try_tick().await;
        assert!(
            matches!(outcome, TickOutcome::Completed(r) if r.failed == 1 && r.abandoned == 0),
            "tick {tick}: {outcome:?}"
        );
    }
    let last = relay.try_tick().await;
    assert!(
        matches!(last, TickOutcome::Completed(r) if r.abandoned == 1),
        "final tick: {last:?}"
    );

    // Excluded from every later scan.
    let after = relay.try_tick().await;
    assert_eq!(after, TickOutcome::Completed(TickReport::default()));
    assert_eq!(broker.attempts.load(Ordering::SeqCst), OUTBOX_MAX_RETRIES as usize);

    let rows = events.lock().unwrap();
    assert_eq!(rows[0].failure_count, OUTBOX_MAX_RETRIES);
    assert!(rows[0].published_at.is_none());
    assert_eq!(
        rows[0].delivery_state(OUTBOX_MAX_RETRIES),
        DeliveryState::Abandoned
    );
}

#[tokio::test]
async fn should_report_failed_tick_when_pending_scan_errors() {
    let mut repo = MockOutboxRepo::new(vec![pending_event(at(0))]);
    repo.fail_listing = true;
    let broker = Arc::new(RecordingBroker::default());
    let relay = OutboxRelay::new(repo, broker.clone(), settings());

    assert_eq!(relay.try_tick().await, TickOutcome::Failed);
    assert_eq!(broker.attempts.load(Ordering::SeqCst), 0);
    assert_eq!(relay.state(), RelayState::Idle);
}

#[tokio::test]
async fn should_leave_row_pending_when_mark_published_fails() {
    let event = pending_event(at(0));
    let mut repo = MockOutboxRepo::new(vec![event.clone()]);
    repo.fail_mark_published = true;
    let events = repo.events_handle();
    let broker = Arc::new(RecordingBroker::default());
    let relay = OutboxRelay::new(repo, broker.clone(), settings());

    relay.try_tick().await;
    relay.try_tick().await;

    // Republished on the next tick; the consumer ledger absorbs the duplicate.
    assert_eq!(broker.published(), vec![event.id, event.id]);
    let rows = events.lock().unwrap();
    assert!(rows[0].published_at.is_none());
    assert_eq!(rows[0].failure_count, 0);
}

#[tokio::test]
async fn should_skip_tick_while_previous_one_is_running() {
    let broker = Arc::new(GatedBroker::new());
    let relay = Arc::new(OutboxRelay::new(
        MockOutboxRepo::new(vec![pending_event(at(0))]),
        broker.clone(),
        settings(),
    ));

    let running = {
        let relay = Arc::clone(&relay);
        tokio::spawn(async move { relay.try_tick().await })
    };
    broker.entered.notified().await;

    assert_eq!(relay.state(), RelayState::Running);
    assert_eq!(relay.try_tick().await, TickOutcome::Skipped);

    broker.gate.add_permits(1);
    let outcome = running.await.unwrap();
    assert!(matches!(outcome, TickOutcome::Completed(r) if r.published == 1));
    assert_eq!(relay.state(), RelayState::Idle);
}

#[tokio::test]
async fn should_retry_through_simulated_failures_and_then_publish() {
    let db = TestDb::migrated().await;
    let event = seed_paid_event(&db, at(0)).await;
    let handler = Arc::new(RecordingHandler::default());
    let broker = Arc::new(
        InMemoryBroker::builder()
            .subscribe(EventKind::OrderPaid, handler.clone())
            .build(),
    );
    broker.configure_failure_simulation(2);
    let relay = OutboxRelay::new(DbOutboxRepository::new(db.clone()), broker.clone(), settings());

    relay.try_tick().await;
    relay.try_tick().await;
    let stored = outbox::get(&db, event.id).await.unwrap().unwrap();
    assert_eq!(stored.failure_count, 2);
    assert_eq!(
        stored.last_error.as_deref(),
        Some("simulated broker failure 2/2")
    );
    assert!(stored.published_at.is_none());
    assert!(handler.received().is_empty());

    relay.try_tick().await;
    let stored = outbox::get(&db, event.id).await.unwrap().unwrap();
    assert!(stored.published_at.is_some());
    assert_eq!(stored.failure_count, 2, "failure history is kept");
    assert_eq!(handler.received().len(), 1);
    assert_eq!(handler.received()[0].event_id, event.id);
    assert!(!broker.failure_simulation_status().simulate_failure);
}

#[tokio::test]
async fn should_abandon_row_in_store_after_max_retries() {
    let db = TestDb::migrated().await;
    let event = seed_paid_event(&db, at(0)).await;
    let broker = Arc::new(InMemoryBroker::builder().build());
    broker.configure_failure_simulation(100);
    let relay = OutboxRelay::new(DbOutboxRepository::new(db.clone()), broker.clone(), settings());

    for _ in 0..OUTBOX_MAX_RETRIES + 2 {
        relay.try_tick().await;
    }

    let stored = outbox::get(&db, event.id).await.unwrap().unwrap();
    assert_eq!(stored.failure_count, OUTBOX_MAX_RETRIES);
    assert!(stored.published_at.is_none());
    let pending = outbox::list_pending(&db, OUTBOX_MAX_RETRIES, 10).await.unwrap();
    assert!(pending.is_empty());
    assert_eq!(
        broker.failure_simulation_status().current_failure_count,
        OUTBOX_MAX_RETRIES as u32
    );
}

#[tokio::test(start_paused = true)]
async fn should_tick_on_interval_until_shutdown() {
    let repo = MockOutboxRepo::new(vec![pending_event(at(0))]);
    let events = repo.events_handle();
    let broker = Arc::new(RecordingBroker::default());
    let relay = Arc::new(OutboxRelay::new(repo, broker.clone(), settings()));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(Arc::clone(&relay).run(shutdown_rx));
    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(broker.published().len(), 1);
    assert!(events.lock().unwrap()[0].published_at.is_some());

    shutdown_tx.send(true).unwrap();
    task.await.unwrap();
    assert_eq!(relay.state(), RelayState::Idle);
}

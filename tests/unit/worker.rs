//! Unit tests for the queue worker

use std::time::Duration;

use database_operator::controller::{
    Event, MAX_RETRIES, ObjectKey, WorkQueue, process_next_item, run_worker,
};

use crate::common::*;

fn orders() -> Event {
    Event::add(ObjectKey::new(TEST_NAMESPACE, "orders"))
}

#[tokio::test]
async fn test_success_clears_failure_history() {
    let mut harness = Harness::new();
    harness.observe(DatabaseBuilder::new("orders", TEST_NAMESPACE).build());
    harness.client.insert_secret(credentials_secret(
        TEST_NAMESPACE,
        "orders-creds",
        "app",
        "pw",
    ));

    let queue = WorkQueue::default();
    queue.add_rate_limited(orders());
    queue.add(orders());

    assert!(process_next_item(&queue, &harness.ctx).await);
    assert_eq!(queue.num_requeues(&orders()), 0);
    assert_eq!(harness.backend.creates(), 1);
}

#[tokio::test]
async fn test_conflict_is_retried() {
    let mut harness = Harness::new();
    harness.observe(DatabaseBuilder::new("orders", TEST_NAMESPACE).build());
    harness.client.insert_secret(credentials_secret(
        TEST_NAMESPACE,
        "orders-creds",
        "app",
        "pw",
    ));
    harness.client.fail_database_writes_with_conflict();

    let queue = WorkQueue::default();
    queue.add(orders());

    assert!(process_next_item(&queue, &harness.ctx).await);
    assert_eq!(queue.num_requeues(&orders()), 1);
}

#[tokio::test(start_paused = true)]
async fn test_failing_event_is_dropped_after_max_retries() {
    let mut harness = Harness::new();
    harness.observe(
        DatabaseBuilder::new("orders", TEST_NAMESPACE)
            .with_type("mysql")
            .build(),
    );

    let queue = WorkQueue::default();
    queue.add(orders());

    for attempt in 0..MAX_RETRIES {
        assert!(process_next_item(&queue, &harness.ctx).await);
        assert_eq!(queue.num_requeues(&orders()), attempt + 1);
    }

    // Final delivery exhausts the budget
    assert!(process_next_item(&queue, &harness.ctx).await);
    assert_eq!(queue.num_requeues(&orders()), 0, "dropped events are forgotten");

    let redelivered = tokio::time::timeout(Duration::from_secs(2000), queue.get()).await;
    assert!(redelivered.is_err(), "dropped event must not come back");

    let metrics = harness.health_state.metrics.encode();
    assert!(metrics.contains(
        "database_operator_dropped_events_total{namespace=\"shop\",name=\"orders\"} 1"
    ));
    assert!(metrics.contains(&format!(
        "database_operator_reconciliation_errors_total{{namespace=\"shop\",name=\"orders\"}} {}",
        MAX_RETRIES + 1
    )));
}

#[tokio::test(start_paused = true)]
async fn test_new_event_after_drop_gets_fresh_budget() {
    let mut harness = Harness::new();
    harness.observe(
        DatabaseBuilder::new("orders", TEST_NAMESPACE)
            .with_type("mysql")
            .build(),
    );

    let queue = WorkQueue::default();
    queue.add(orders());
    for _ in 0..=MAX_RETRIES {
        assert!(process_next_item(&queue, &harness.ctx).await);
    }

    queue.add(orders());
    assert!(process_next_item(&queue, &harness.ctx).await);
    assert_eq!(queue.num_requeues(&orders()), 1);
}

#[tokio::test]
async fn test_shutdown_stops_processing() {
    let harness = Harness::new();
    let queue = WorkQueue::default();
    queue.add(orders());
    queue.shut_down();

    assert!(!process_next_item(&queue, &harness.ctx).await);
}

#[tokio::test]
async fn test_run_worker_exits_on_shutdown() {
    let harness = Harness::new();
    let queue: WorkQueue<Event> = WorkQueue::default();
    let worker = tokio::spawn(run_worker(queue.clone(), harness.ctx.clone()));

    tokio::task::yield_now().await;
    queue.shut_down();

    tokio::time::timeout(Duration::from_secs(5), worker)
        .await
        .unwrap()
        .unwrap();
}

//! Queue consumer driving the reconciler
//!
//! Failed events are re-added with per-event exponential backoff until they
//! have been requeued [`MAX_RETRIES`] times, then dropped. A later event for
//! the same resource starts with a fresh retry budget.

use std::time::Instant;

use tracing::{debug, error, info, warn};

use super::context::Context;
use super::error::Error;
use super::event::Event;
use super::queue::WorkQueue;
use super::reconciler::reconcile;

/// Requeues allowed for a failing event before it is dropped
pub const MAX_RETRIES: u32 = 15;

/// Process events until the queue shuts down
pub async fn run_worker(queue: WorkQueue<Event>, ctx: Context) {
    info!("Worker started");
    while process_next_item(&queue, &ctx).await {}
    info!("Worker stopped");
}

/// Take one event off the queue and reconcile it. Returns `false` once the
/// queue has shut down.
pub async fn process_next_item(queue: &WorkQueue<Event>, ctx: &Context) -> bool {
    let Some(event) = queue.get().await else {
        return false;
    };

    let start = Instant::now();
    let result = reconcile(ctx, &event).await;
    let duration = start.elapsed().as_secs_f64();
    queue.done(&event);

    let (namespace, name) = event.new_key.split();
    let namespace = namespace.unwrap_or_default();
    if let Some(health_state) = &ctx.health_state {
        health_state
            .metrics
            .record_reconcile(namespace, name, duration);
        if result.is_err() {
            health_state.metrics.record_error(namespace, name);
        }
    }

    match result {
        Ok(()) => queue.forget(&event),
        Err(e) => handle_error(queue, ctx, event, &e),
    }

    if let Some(health_state) = &ctx.health_state {
        health_state.metrics.set_queue_depth(queue.len());
    }
    true
}

fn handle_error(queue: &WorkQueue<Event>, ctx: &Context, event: Event, err: &Error) {
    let retries = queue.num_requeues(&event);
    if retries < MAX_RETRIES {
        if err.is_conflict() {
            // Stale cached copy; the retry reads the newer version
            debug!(event = %event, retries, error = %err, "Conflict handling Database, retrying");
        } else {
            warn!(
                event = %event,
                retries,
                configuration_error = err.is_configuration_error(),
                error = %err,
                "Error handling Database, retrying"
            );
        }
        queue.add_rate_limited(event);
        return;
    }

    error!(
        event = %event,
        retries,
        error = %err,
        "Error handling Database, dropping it from the queue"
    );
    queue.forget(&event);
    if let Some(health_state) = &ctx.health_state {
        let (namespace, name) = event.new_key.split();
        health_state
            .metrics
            .record_dropped(namespace.unwrap_or_default(), name);
    }
}

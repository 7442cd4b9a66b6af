//! Delivery of controller events to presentation observers

use std::future::Future;

use tokio::sync::mpsc::UnboundedReceiver;

use crate::domain::model::BatchEvent;
use crate::ports::BatchObserver;

/// Forward events to `observer` while `until` runs, then flush whatever the
/// producer queued before `until` completed.
pub async fn forward_until<F>(
    events: &mut UnboundedReceiver<BatchEvent>,
    observer: &dyn BatchObserver,
    until: F,
) -> F::Output
where
    F: Future,
{
    tokio::pin!(until);
    let output = loop {
        tokio::select! {
            biased;
            output = &mut until => break output,
            Some(event) = events.recv() => observer.on_event(&event),
        }
    };
    drain_into(events, observer);
    output
}

/// Deliver whatever is already queued without waiting
pub fn drain_into(events: &mut UnboundedReceiver<BatchEvent>, observer: &dyn BatchObserver) -> usize {
    let mut delivered = 0;
    while let Ok(event) = events.try_recv() {
        observer.on_event(&event);
        delivered += 1;
    }
    delivered
}

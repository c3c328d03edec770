use futures::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Event type published after a project is re-ingested.
pub const BOARD_UPDATED: &str = "board_updated";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub event: String,
    pub data: Value,
}

impl BusEvent {
    pub fn new(event: impl Into<String>, data: Value) -> Self {
        Self {
            event: event.into(),
            data,
        }
    }

    /// Render as one Server-Sent Events frame.
    pub fn to_sse(&self) -> String {
        format!("event: {}\ndata: {}\n\n", self.event, self.data)
    }
}

struct Subscriber {
    id: u64,
    tx: mpsc::Sender<BusEvent>,
}

/// In-process fan-out with a bounded queue per subscriber.
///
/// `publish` never waits: a subscriber whose queue is full loses the event
/// and is disconnected.
pub struct EventBus {
    capacity: usize,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        })
    }

    fn registry(&self) -> MutexGuard<'_, Vec<Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(self: &Arc<Self>) -> Subscription {
        let (tx, rx) = mpsc::channel(self.capacity);
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry().push(Subscriber { id, tx });
        tracing::debug!(subscriber = id, "Subscriber registered");

        Subscription {
            id,
            rx,
            bus: Arc::downgrade(self),
        }
    }

    /// Returns `false` when `id` was not registered (already gone).
    pub fn unsubscribe(&self, id: u64) -> bool {
        let mut subscribers = self.registry();
        let before = subscribers.len();
        subscribers.retain(|sub| sub.id != id);
        let removed = subscribers.len() != before;
        if removed {
            tracing::debug!(subscriber = id, "Subscriber unregistered");
        }
        removed
    }

    /// Enqueue the event for every registered subscriber. Returns how many
    /// received it.
    pub fn publish(&self, event_type: &str, data: Value) -> usize {
        let event = BusEvent::new(event_type, data);
        let mut delivered = 0;

        self.registry()
            .retain(|sub| match sub.tx.try_send(event.clone()) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(subscriber = sub.id, event = %event.event, "Dropping slow subscriber");
                    false
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(subscriber = sub.id, "Removing closed subscriber");
                    false
                }
            });

        tracing::trace!(event = %event.event, delivered, "Published event");
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry().len()
    }
}

/// Receiving side of one subscription.
///
/// Dropping it unregisters from the bus. After the bus disconnects a slow
/// subscriber, the events already queued are still delivered, then the
/// stream ends.
pub struct Subscription {
    id: u64,
    rx: mpsc::Receiver<BusEvent>,
    bus: Weak<EventBus>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub async fn recv(&mut self) -> Option<BusEvent> {
        self.rx.recv().await
    }

    /// Like [`recv`](Self::recv) but yields `None` once `cancel` fires.
    pub async fn next_until(&mut self, cancel: &CancellationToken) -> Option<BusEvent> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            event = self.rx.recv() => event,
        }
    }

    pub fn try_recv(&mut self) -> Option<BusEvent> {
        self.rx.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.unsubscribe(self.id);
        }
    }
}

impl Stream for Subscription {
    type Item = BusEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

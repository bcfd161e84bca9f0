//! Event Bus for broadcasting events to subscribers
//!
//! Uses tokio broadcast channel for pub/sub. Publishing never blocks and
//! never fails the caller; with no subscribers the event is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::events::{Event, EventMessage};
use crate::shared::shutdown::ShutdownSignal;

/// Default channel capacity
const DEFAULT_CAPACITY: usize = 1024;

/// Event bus for broadcasting events to all subscribers
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventBus {
    /// Create a new event bus with default capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a new event bus with custom capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            subscriber_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Publish an event to all subscribers
    pub fn publish(&self, event: Event) {
        let message = EventMessage::new(event);
        let event_type = message.event.event_type();
        let driver_id = message.event.driver_id();

        match self.sender.send(message) {
            Ok(count) => {
                debug!(event_type, ?driver_id, subscribers = count, "Event published");
            }
            Err(_) => {
                debug!(event_type, ?driver_id, "Event published (no subscribers)");
            }
        }
    }

    /// Subscribe to receive events
    pub fn subscribe(&self) -> EventSubscriber {
        let receiver = self.sender.subscribe();
        let count = self.subscriber_count.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(subscribers = count, "New event subscriber");

        EventSubscriber {
            receiver,
            subscriber_count: self.subscriber_count.clone(),
        }
    }

    /// Get current subscriber count
    pub fn subscriber_count(&self) -> usize {
        self.subscriber_count.load(Ordering::SeqCst)
    }

    /// Forward every event to the log as a JSON line until shutdown.
    ///
    /// Stands in for the e-mail/SMS gateway, which consumes the same stream.
    pub fn spawn_log_relay(&self, shutdown: ShutdownSignal) -> JoinHandle<()> {
        let mut subscriber = self.subscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = subscriber.recv() => {
                        let Some(msg) = msg else { break };
                        match msg.to_json() {
                            Ok(json) => info!(target: "chargegrid::notify", event = msg.event.event_type(), "{}", json),
                            Err(e) => warn!(error = %e, "Failed to serialize notification"),
                        }
                    }
                    _ = shutdown.wait() => break,
                }
            }
            debug!("Notification relay stopped");
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Event subscriber that receives events from the bus
pub struct EventSubscriber {
    receiver: broadcast::Receiver<EventMessage>,
    subscriber_count: Arc<AtomicUsize>,
}

impl EventSubscriber {
    /// Receive the next event
    pub async fn recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::RecvError::Lagged(count)) => {
                    warn!("Subscriber lagged, {} events missed", count);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return None;
                }
            }
        }
    }

    /// Receive without waiting; `None` when nothing is queued
    pub fn try_recv(&mut self) -> Option<EventMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(msg) => return Some(msg),
                Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                Err(_) => return None,
            }
        }
    }
}

impl Drop for EventSubscriber {
    fn drop(&mut self) {
        self.subscriber_count.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Shared event bus type
pub type SharedEventBus = Arc<EventBus>;

/// Create a shared event bus
pub fn create_event_bus() -> SharedEventBus {
    Arc::new(EventBus::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifications::events::ReservationExpiredEvent;
    use chrono::Utc;

    #[tokio::test]
    async fn test_event_bus_publish_subscribe() {
        let bus = EventBus::new();
        let mut subscriber = bus.subscribe();

        bus.publish(Event::ReservationExpired(ReservationExpiredEvent {
            reservation_id: 1,
            driver_id: 2,
            point_id: 3,
            timestamp: Utc::now(),
        }));

        let received = tokio::time::timeout(
            std::time::Duration::from_millis(100),
            subscriber.recv(),
        )
        .await
        .expect("Timeout")
        .expect("No message");

        assert_eq!(received.event.event_type(), "reservation_expired");
    }

    #[test]
    fn test_subscriber_count() {
        let bus = EventBus::new();
        assert_eq!(bus.subscriber_count(), 0);

        let sub1 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        let _sub2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        drop(sub1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn publish_without_subscribers_is_silent() {
        let bus = EventBus::new();
        bus.publish(Event::ReservationExpired(ReservationExpiredEvent {
            reservation_id: 1,
            driver_id: 2,
            point_id: 3,
            timestamp: Utc::now(),
        }));
    }
}

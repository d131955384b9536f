//! Broadcast event bus.

use tokio::sync::broadcast;

use crate::event::LoomEvent;

/// Default number of events buffered per subscriber.
pub const DEFAULT_CAPACITY: usize = 256;

/// Fan-out channel for [`LoomEvent`]s.
///
/// Cloning the bus yields another handle to the same channel. Subscribers see
/// only events published after they subscribed; a subscriber that falls more
/// than `capacity` events behind receives `RecvError::Lagged` and skips ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LoomEvent>,
    editor_tx: broadcast::Sender<LoomEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per subscriber.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        let (editor_tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            editor_tx,
            capacity,
        }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<LoomEvent> {
        self.tx.subscribe()
    }

    /// Subscribes to future `editor.*` events only.
    pub fn subscribe_editor(&self) -> broadcast::Receiver<LoomEvent> {
        self.editor_tx.subscribe()
    }

    /// Publishes an event, returning how many subscribers received it.
    ///
    /// Fails only when nobody is subscribed.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LoomEvent,
    ) -> Result<usize, broadcast::error::SendError<LoomEvent>> {
        if event.is_editor() {
            let _ = self.editor_tx.send(event.clone());
        }
        self.tx.send(event)
    }

    /// Publishes an event, ignoring whether anyone is listening.
    pub fn publish(&self, event: LoomEvent) {
        let _ = self.emit(event);
    }

    /// Number of live subscribers to all events.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Configured per-subscriber capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.emit(LoomEvent::started(1, 2)).unwrap(), 2);
        assert_eq!(a.recv().await.unwrap().compile_id(), Some(1));
        assert_eq!(b.recv().await.unwrap().compile_id(), Some(1));
    }

    #[test]
    fn emit_without_subscribers_fails_but_publish_does_not() {
        let bus = EventBus::default();
        assert_eq!(bus.capacity(), DEFAULT_CAPACITY);
        assert!(bus.emit(LoomEvent::started(1, 0)).is_err());
        bus.publish(LoomEvent::started(2, 0));
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = EventBus::new(4);
        let _keep = bus.subscribe();
        bus.publish(LoomEvent::started(1, 1));
        let mut late = bus.subscribe();
        bus.publish(LoomEvent::started(2, 1));
        assert_eq!(late.recv().await.unwrap().compile_id(), Some(2));
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let bus = EventBus::new(2);
        let mut rx = bus.subscribe();
        for id in 0..5 {
            bus.publish(LoomEvent::started(id, 1));
        }
        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(3))));
        assert_eq!(rx.recv().await.unwrap().compile_id(), Some(3));
    }

    #[tokio::test]
    async fn editor_subscriber_skips_compiler_traffic() {
        let bus = EventBus::new(2);
        let mut all = bus.subscribe();
        let mut editor = bus.subscribe_editor();
        bus.publish(LoomEvent::active_file_changed("src/harbor.loom"));
        for id in 0..5 {
            bus.publish(LoomEvent::started(id, 1));
        }

        assert!(matches!(all.recv().await, Err(RecvError::Lagged(_))));
        let event = editor.recv().await.unwrap();
        assert_eq!(event.name(), "editor.activeFileChanged");
        assert!(matches!(editor.try_recv(), Err(TryRecvError::Empty)));
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn clones_share_the_channel() {
        let bus = EventBus::new(4);
        let clone = bus.clone();
        let _rx = clone.subscribe();
        assert_eq!(bus.subscriber_count(), 1);
    }
}

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

/// Broadcast stream that remembers the most recent event.
///
/// New subscribers are handed the current value before any live events,
/// so a late subscriber always learns the present state first.
pub struct EventStream<T: Clone + Send + 'static> {
    sender: broadcast::Sender<T>,
    last: Arc<RwLock<Option<T>>>,
}

impl<T: Clone + Send + 'static> EventStream<T> {
    /// Create a new event stream with the given channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            last: Arc::new(RwLock::new(None)),
        }
    }

    /// Create a stream whose subscribers see `initial` first.
    pub fn with_initial(capacity: usize, initial: T) -> Self {
        let stream = Self::new(capacity);
        *stream.last.write() = Some(initial);
        stream
    }

    /// Subscribe to the stream.
    ///
    /// The receiver is registered before the current value is captured,
    /// so a concurrent publish may be seen twice but is never lost.
    pub fn subscribe(&self) -> Subscriber<T> {
        let receiver = self.sender.subscribe();
        let replayed = self.last.read().clone();
        Subscriber { replayed, receiver }
    }

    /// Publish an event to all subscribers and remember it as the
    /// current value. Returns the number of live receivers.
    pub fn publish(&self, event: T) -> usize {
        *self.last.write() = Some(event.clone());
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                // No receivers yet; the value is still retained for replay.
                debug!("event published with no subscribers");
                0
            }
        }
    }

    /// The most recently published value, if any.
    pub fn current(&self) -> Option<T> {
        self.last.read().clone()
    }
}

impl<T: Clone + Send + 'static> Clone for EventStream<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            last: Arc::clone(&self.last),
        }
    }
}

/// Receiving side of an [`EventStream`]. Dropping it unsubscribes.
pub struct Subscriber<T: Clone + Send + 'static> {
    replayed: Option<T>,
    receiver: broadcast::Receiver<T>,
}

impl<T: Clone + Send + 'static> Subscriber<T> {
    /// Receive the next event, starting with the replayed current value.
    pub async fn recv(&mut self) -> Result<T, broadcast::error::RecvError> {
        if let Some(event) = self.replayed.take() {
            return Ok(event);
        }
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let stream: EventStream<u32> = EventStream::new(8);
        let mut a = stream.subscribe();
        let mut b = stream.subscribe();

        assert_eq!(stream.publish(7), 2);

        assert_eq!(a.recv().await.unwrap(), 7);
        assert_eq!(b.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn late_subscriber_sees_current_value_first() {
        let stream: EventStream<&'static str> = EventStream::new(8);
        stream.publish("first");
        stream.publish("second");

        let mut late = stream.subscribe();
        assert_eq!(late.recv().await.unwrap(), "second");

        stream.publish("third");
        assert_eq!(late.recv().await.unwrap(), "third");
    }

    #[tokio::test]
    async fn initial_value_is_replayed() {
        let stream: EventStream<Option<u8>> = EventStream::with_initial(8, None);
        let mut sub = stream.subscribe();
        assert_eq!(sub.recv().await.unwrap(), None);
    }
}

//! Process-local notification bus.
//!
//! Fans published messages out to in-process subscribers over std mpsc
//! channels — one channel per subscriber, broadcast semantics. This is the
//! bus the tests and single-node deployments run on; a real push dispatcher
//! sits behind the same [`EventBus`] trait.

use std::sync::{Mutex, mpsc};

use crate::bus::{EventBus, Subscription};

/// Error publishing to the in-memory bus.
#[derive(Debug)]
pub enum InMemoryBusError {
    /// The subscriber list lock was poisoned by a panicking publisher.
    Poisoned,
}

/// Broadcast bus backed by std mpsc channels.
///
/// Fan-out is best effort: a sender whose receiving end has been dropped is
/// pruned on the next publish. Delivery is at-least-once per the [`EventBus`]
/// contract, so subscribers must tolerate duplicates.
#[derive(Debug)]
pub struct InMemoryEventBus<M> {
    subscribers: Mutex<Vec<mpsc::Sender<M>>>,
}

impl<M> InMemoryEventBus<M> {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<M> Default for InMemoryEventBus<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M> EventBus<M> for InMemoryEventBus<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryBusError;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        let mut subscribers = self
            .subscribers
            .lock()
            .map_err(|_| InMemoryBusError::Poisoned)?;

        // Send to everyone still listening; prune the rest.
        subscribers.retain(|sender| sender.send(message.clone()).is_ok());

        Ok(())
    }

    fn subscribe(&self) -> Subscription<M> {
        let (sender, receiver) = mpsc::channel();

        // A poisoned list means publishers are already failing loudly; hand
        // back a subscription that simply never fires rather than panic in a
        // caller that only wanted to listen.
        if let Ok(mut subscribers) = self.subscribers.lock() {
            subscribers.push(sender);
        }

        Subscription::new(receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_without_subscribers_is_ok() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        bus.publish(1).unwrap();
    }

    #[test]
    fn subscribers_each_receive_published_messages() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        bus.publish(7).unwrap();

        assert_eq!(a.try_recv().unwrap(), 7);
        assert_eq!(b.try_recv().unwrap(), 7);
    }

    #[test]
    fn dead_subscribers_are_dropped_on_publish() {
        let bus: InMemoryEventBus<u32> = InMemoryEventBus::new();
        let a = bus.subscribe();
        drop(bus.subscribe());

        bus.publish(1).unwrap();
        bus.publish(2).unwrap();

        assert_eq!(a.try_recv().unwrap(), 1);
        assert_eq!(a.try_recv().unwrap(), 2);
    }
}

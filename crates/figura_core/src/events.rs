//! Publish/subscribe notification bus.
//!
//! The publisher holds only channel senders. Observers own their
//! [`Subscription`] and drain it whenever they like; dropping it detaches the
//! observer, and the bus prunes dead senders on the next publish.

use flume::{Receiver, Sender};

/// Identifies one subscription on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Receiving end handed to an observer.
#[derive(Debug)]
pub struct Subscription<E> {
    id: SubscriptionId,
    receiver: Receiver<E>,
}

impl<E> Subscription<E> {
    #[inline]
    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Next pending event, if any, without blocking.
    #[must_use]
    pub fn try_next(&self) -> Option<E> {
        self.receiver.try_recv().ok()
    }

    /// All pending events, oldest first.
    #[must_use]
    pub fn drain(&self) -> Vec<E> {
        self.receiver.try_iter().collect()
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.receiver.len()
    }
}

/// Broadcasts cloned events to every live subscription.
#[derive(Debug)]
pub struct EventBus<E> {
    subscribers: Vec<(SubscriptionId, Sender<E>)>,
    next_id: u64,
}

impl<E: Clone> EventBus<E> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe(&mut self) -> Subscription<E> {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;

        let (sender, receiver) = flume::unbounded();
        self.subscribers.push((id, sender));
        Subscription { id, receiver }
    }

    /// Detaches a subscription. Returns `false` when it was not attached.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Sends `event` to every live subscriber and returns how many received it.
    pub fn publish(&mut self, event: &E) -> usize {
        self.subscribers
            .retain(|(_, sender)| sender.send(event.clone()).is_ok());
        self.subscribers.len()
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl<E: Clone> Default for EventBus<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_subscriber_receives_each_event() {
        let mut bus = EventBus::new();
        let a = bus.subscribe();
        let b = bus.subscribe();

        assert_eq!(bus.publish(&1_u32), 2);
        assert_eq!(bus.publish(&2_u32), 2);

        assert_eq!(a.drain(), vec![1, 2]);
        assert_eq!(b.drain(), vec![1, 2]);
        assert!(a.try_next().is_none());
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let mut bus = EventBus::new();
        let kept = bus.subscribe();
        drop(bus.subscribe());

        assert_eq!(bus.publish(&"changed"), 1);
        assert_eq!(bus.subscriber_count(), 1);
        assert_eq!(kept.pending(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut bus = EventBus::new();
        let sub = bus.subscribe();

        assert!(bus.unsubscribe(sub.id()));
        assert!(!bus.unsubscribe(sub.id()));
        assert_eq!(bus.publish(&7_i32), 0);
        assert!(sub.try_next().is_none());
    }
}

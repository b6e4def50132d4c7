use slotmap::SlotMap;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;

slotmap::new_key_type! {
    /// handle returned by [`Observers::subscribe`], used to detach again
    pub struct ObserverKey;
}

/// a set of channels that each get a copy of every notification
#[derive(Debug)]
pub struct Observers<T> {
    senders: Mutex<SlotMap<ObserverKey, mpsc::UnboundedSender<T>>>,
}

impl<T: Clone> Observers<T> {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(SlotMap::with_capacity_and_key(4)),
        }
    }

    pub fn subscribe(&self) -> (ObserverKey, mpsc::UnboundedReceiver<T>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let key = self.senders().insert(sender);
        (key, receiver)
    }

    /// once this returns nothing else is delivered to that observer
    pub fn unsubscribe(&self, key: ObserverKey) -> bool {
        self.senders().remove(key).is_some()
    }

    /// deliver to everyone, forgetting receivers that were dropped
    pub fn notify(&self, item: T) {
        self.senders()
            .retain(|_, sender| sender.send(item.clone()).is_ok());
    }

    pub fn len(&self) -> usize {
        self.senders().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn senders(&self) -> MutexGuard<'_, SlotMap<ObserverKey, mpsc::UnboundedSender<T>>> {
        // a panicking observer can't leave the map half-updated
        self.senders
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<T: Clone> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_and_unsubscribe() {
        let observers = Observers::<u32>::new();
        let (a, mut rx_a) = observers.subscribe();
        let (_b, mut rx_b) = observers.subscribe();

        observers.notify(1);
        assert_eq!(rx_a.recv().await, Some(1));
        assert_eq!(rx_b.recv().await, Some(1));

        assert!(observers.unsubscribe(a));
        assert!(!observers.unsubscribe(a));
        observers.notify(2);
        assert_eq!(rx_b.recv().await, Some(2));
        // the sender was dropped with the entry
        assert_eq!(rx_a.recv().await, None);
    }

    #[test]
    fn test_dropped_receivers_are_forgotten() {
        let observers = Observers::<String>::new();
        let (_key, rx) = observers.subscribe();
        assert_eq!(observers.len(), 1);
        drop(rx);
        observers.notify("anyone?".to_string());
        assert!(observers.is_empty());
    }
}

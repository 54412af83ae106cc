//! The two subscriber primitives this crate exposes: a re-arming
//! broadcast subscriber for long-lived notifications (reorg events), and a
//! one-shot subscriber drained on first notification (waiting for one
//! specific transaction or UTXO to land).
//!
//! Grounded on the channel-per-key, `tokio::sync::broadcast`-based
//! shape a pending-UTXO waiter elsewhere uses for its one-shot waits;
//! `Broadcast` here generalizes that to the organizer's
//! reorg-handler subscription, which (unlike a UTXO arrival) fires
//! repeatedly for the lifetime of the subscription.

use tokio::sync::broadcast;

/// A long-lived, re-arming broadcast of `T`. Every subscriber added with
/// [`Broadcast::subscribe`] receives every value sent after it subscribed;
/// sending to a channel with no subscribers is a no-op.
pub struct Broadcast<T> {
    sender: broadcast::Sender<T>,
}

impl<T: Clone> Broadcast<T> {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Broadcast { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }

    /// Sends `value` to every current subscriber. Returns the number of
    /// subscribers the value was delivered to.
    pub fn send(&self, value: T) -> usize {
        self.sender.send(value).unwrap_or(0)
    }
}

/// A single pending request for a value identified by `K`, drained (and
/// removed) the first time it's resolved. Grounded directly on
/// `PendingUtxos`, generalized from `transparent::OutPoint -> Utxo` to an
/// arbitrary key/value pair so it can also back "wait for this
/// transaction to confirm" requests in the mempool.
pub struct OneshotRegistry<K, V> {
    waiters: std::collections::HashMap<K, broadcast::Sender<V>>,
}

impl<K, V> Default for OneshotRegistry<K, V>
where
    K: std::hash::Hash + Eq,
{
    fn default() -> Self {
        OneshotRegistry {
            waiters: std::collections::HashMap::new(),
        }
    }
}

impl<K, V> OneshotRegistry<K, V>
where
    K: std::hash::Hash + Eq + Clone,
    V: Clone,
{
    /// A receiver that resolves once [`OneshotRegistry::resolve`] is
    /// called for `key`.
    pub fn wait_for(&mut self, key: K) -> broadcast::Receiver<V> {
        self.waiters
            .entry(key)
            .or_insert_with(|| broadcast::channel(1).0)
            .subscribe()
    }

    /// Resolves and removes the waiter registered for `key`, if any.
    pub fn resolve(&mut self, key: &K, value: V) {
        if let Some(sender) = self.waiters.remove(key) {
            let _ = sender.send(value);
        }
    }

    /// Drops waiters whose every receiver has already been dropped.
    pub fn prune(&mut self) {
        self.waiters.retain(|_, sender| sender.receiver_count() > 0);
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broadcast_delivers_to_every_subscriber() {
        let broadcast = Broadcast::<u32>::new(4);
        let mut a = broadcast.subscribe();
        let mut b = broadcast.subscribe();

        assert_eq!(broadcast.send(7), 2);
        assert_eq!(a.recv().await.unwrap(), 7);
        assert_eq!(b.recv().await.unwrap(), 7);
    }

    #[tokio::test]
    async fn oneshot_registry_resolves_waiters() {
        let mut registry = OneshotRegistry::<u32, &'static str>::default();
        let mut receiver = registry.wait_for(1);
        assert_eq!(registry.len(), 1);

        registry.resolve(&1, "here");
        assert_eq!(receiver.recv().await.unwrap(), "here");
        assert!(registry.is_empty());
    }
}

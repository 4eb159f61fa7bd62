//! Change listeners - keyed fan-out of changed-key sets
//!
//! Every listener owns a bounded channel. Delivery uses `try_send`, so a
//! mutating caller never waits on a subscriber:
//! - full buffer: the event is dropped for that listener only
//! - closed receiver: the registration is pruned

use std::collections::HashMap;
use std::hash::Hash;

use arbor_core::{KeySet, ListenerId, SessionId};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{trace, warn};

/// One notification: the keys a mutation changed in a session
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent<K: Eq + Hash> {
    pub session: SessionId,
    pub changed: KeySet<K>,
    /// Per-session counter; a gap means events were dropped
    pub sequence: u64,
}

/// Subscription handle returned by registration
///
/// Hand it back to the registry to unregister. Dropping it without
/// unregistering also works; the entry is pruned on the next delivery.
#[derive(Debug)]
pub struct ChangeListener<K: Eq + Hash> {
    id: ListenerId,
    session: SessionId,
    receiver: mpsc::Receiver<ChangeEvent<K>>,
}

impl<K: Eq + Hash> ChangeListener<K> {
    pub fn id(&self) -> ListenerId {
        self.id
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Wait for the next event
    ///
    /// Returns `None` once the listener has been unregistered and the
    /// buffer is drained.
    pub async fn recv(&mut self) -> Option<ChangeEvent<K>> {
        self.receiver.recv().await
    }

    /// Next buffered event, if any
    pub fn try_recv(&mut self) -> Option<ChangeEvent<K>> {
        self.receiver.try_recv().ok()
    }
}

/// Outcome of one fan-out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub dropped: usize,
    pub pruned: usize,
}

/// Listener table keyed by session
#[derive(Debug)]
pub struct KeyedListeners<K: Eq + Hash> {
    senders: HashMap<SessionId, Vec<(ListenerId, mpsc::Sender<ChangeEvent<K>>)>>,
    next_id: ListenerId,
    buffer: usize,
}

impl<K> KeyedListeners<K>
where
    K: Clone + Eq + Hash,
{
    /// Create an empty table whose channels hold `buffer` events each
    pub fn new(buffer: usize) -> Self {
        KeyedListeners {
            senders: HashMap::new(),
            next_id: ListenerId::ZERO,
            buffer: buffer.max(1),
        }
    }

    pub fn register(&mut self, session: &SessionId) -> ChangeListener<K> {
        let id = self.next_id;
        self.next_id = id.next();

        let (tx, rx) = mpsc::channel(self.buffer);
        self.senders
            .entry(session.clone())
            .or_default()
            .push((id, tx));
        trace!(session = %session, listener = %id, "listener registered");

        ChangeListener {
            id,
            session: session.clone(),
            receiver: rx,
        }
    }

    /// Remove a registration under the session the handle was issued for
    ///
    /// Returns false if the handle was already pruned.
    pub fn unregister(&mut self, listener: ChangeListener<K>) -> bool {
        let session = &listener.session;
        let Some(entries) = self.senders.get_mut(session) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(id, _)| *id != listener.id);
        let removed = entries.len() < before;
        if entries.is_empty() {
            self.senders.remove(session);
        }
        if removed {
            trace!(session = %session, listener = %listener.id, "listener unregistered");
        }
        removed
    }

    /// Number of listeners registered for `session`
    pub fn count(&self, session: &SessionId) -> usize {
        self.senders.get(session).map_or(0, Vec::len)
    }

    /// Number of listeners across all sessions
    pub fn total(&self) -> usize {
        self.senders.values().map(Vec::len).sum()
    }

    /// Send `changed` to every listener of `session`
    pub fn emit(&mut self, session: &SessionId, changed: &KeySet<K>, sequence: u64) -> Delivery {
        let mut delivery = Delivery::default();
        let Some(entries) = self.senders.get_mut(session) else {
            return delivery;
        };

        entries.retain(|(id, tx)| {
            let event = ChangeEvent {
                session: session.clone(),
                changed: changed.clone(),
                sequence,
            };
            match tx.try_send(event) {
                Ok(()) => {
                    delivery.delivered += 1;
                    true
                }
                Err(TrySendError::Full(_)) => {
                    warn!(
                        session = %session,
                        listener = %id,
                        sequence,
                        "listener buffer full, dropping event"
                    );
                    delivery.dropped += 1;
                    true
                }
                Err(TrySendError::Closed(_)) => {
                    trace!(session = %session, listener = %id, "pruning closed listener");
                    delivery.pruned += 1;
                    false
                }
            }
        });
        if entries.is_empty() {
            self.senders.remove(session);
        }
        delivery
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str) -> SessionId {
        SessionId::new(name).unwrap()
    }

    #[test]
    fn test_register_unregister() {
        let mut table: KeyedListeners<u32> = KeyedListeners::new(4);
        let s = session("room");

        let a = table.register(&s);
        let b = table.register(&s);
        assert_ne!(a.id(), b.id());
        assert_eq!(table.count(&s), 2);

        assert!(table.unregister(a));
        assert_eq!(table.count(&s), 1);
        assert!(table.unregister(b));
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn test_emit_fans_out() {
        let mut table = KeyedListeners::new(4);
        let s = session("room");
        let mut a = table.register(&s);
        let mut b = table.register(&s);
        let mut other = table.register(&session("other"));

        let delivery = table.emit(&s, &KeySet::single(7u32), 0);
        assert_eq!(delivery.delivered, 2);

        for listener in [&mut a, &mut b] {
            let event = listener.try_recv().unwrap();
            assert_eq!(event.changed.sorted(), vec![7]);
            assert_eq!(event.session, s);
            assert!(listener.try_recv().is_none());
        }
        assert!(other.try_recv().is_none());
    }

    #[test]
    fn test_full_buffer_drops_newest() {
        let mut table = KeyedListeners::new(2);
        let s = session("room");
        let mut listener = table.register(&s);

        for seq in 0..4 {
            table.emit(&s, &KeySet::single(seq as u32), seq);
        }
        let delivery = table.emit(&s, &KeySet::single(9u32), 4);
        assert_eq!(delivery.dropped, 1);
        assert_eq!(table.count(&s), 1);

        assert_eq!(listener.try_recv().unwrap().sequence, 0);
        assert_eq!(listener.try_recv().unwrap().sequence, 1);
        assert!(listener.try_recv().is_none());
    }

    #[test]
    fn test_unregister_after_prune() {
        let mut table = KeyedListeners::new(1);
        let s = session("room");
        let mut listener = table.register(&s);
        listener.receiver.close();

        let delivery = table.emit(&s, &KeySet::single(1u32), 0);
        assert_eq!(delivery.pruned, 1);
        assert!(!table.unregister(listener));
        assert_eq!(table.total(), 0);
    }

    #[test]
    fn test_closed_listener_pruned() {
        let mut table = KeyedListeners::new(2);
        let s = session("room");
        let listener = table.register(&s);
        drop(listener);

        let delivery = table.emit(&s, &KeySet::single(1u32), 0);
        assert_eq!(delivery.pruned, 1);
        assert_eq!(table.count(&s), 0);
        assert_eq!(table.total(), 0);
    }
}

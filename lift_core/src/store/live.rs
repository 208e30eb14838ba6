//! Shared live queries.
//!
//! One `watch` sender per query key. Every subscriber to the same key gets a
//! receiver of the same sender, so a query is evaluated once per write no
//! matter how many consumers hold it.

use std::collections::HashMap;
use std::hash::Hash;
use tokio::sync::watch;

/// Receiver side of a live query
pub type Live<T> = watch::Receiver<T>;

pub struct LiveQueries<K, T> {
    senders: HashMap<K, watch::Sender<T>>,
}

impl<K, T> Default for LiveQueries<K, T> {
    fn default() -> Self {
        Self {
            senders: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone, T: PartialEq> LiveQueries<K, T> {
    /// Join the existing query for `key`, or start it with `current()`
    pub fn subscribe(&mut self, key: K, current: impl FnOnce() -> T) -> Live<T> {
        if let Some(tx) = self.senders.get(&key) {
            return tx.subscribe();
        }
        let (tx, rx) = watch::channel(current());
        self.senders.insert(key, tx);
        rx
    }

    /// Re-evaluate every query that still has subscribers. Emits only when
    /// the result differs. Returns how many queries emitted.
    pub fn refresh(&mut self, mut eval: impl FnMut(&K) -> T) -> usize {
        self.senders.retain(|_, tx| tx.receiver_count() > 0);

        let mut emitted = 0;
        for (key, tx) in &self.senders {
            let value = eval(key);
            let changed = tx.send_if_modified(|current| {
                if *current != value {
                    *current = value;
                    true
                } else {
                    false
                }
            });
            if changed {
                emitted += 1;
            }
        }
        emitted
    }

    /// Number of distinct live queries currently held
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

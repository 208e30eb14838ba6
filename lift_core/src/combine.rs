//! View-state composition.
//!
//! A [`Combiner`] owns every input of one screen (local slices plus the
//! latest value of each live query) and a merge function that turns those
//! inputs into one immutable snapshot. Any change to any input goes through
//! [`Combiner::update`], which republishes synchronously, so readers never
//! observe a snapshot built from a mix of old and new inputs.

use tokio::sync::watch;

pub struct Combiner<I, S> {
    inputs: I,
    merge: fn(&I) -> S,
    tx: watch::Sender<S>,
}

impl<I, S> Combiner<I, S> {
    /// Build a combiner and publish the first snapshot
    pub fn new(inputs: I, merge: fn(&I) -> S) -> Self {
        let initial = merge(&inputs);
        let (tx, _rx) = watch::channel(initial);
        Self { inputs, merge, tx }
    }

    pub fn inputs(&self) -> &I {
        &self.inputs
    }

    /// Mutate the inputs and publish the merged snapshot
    pub fn update<R>(&mut self, f: impl FnOnce(&mut I) -> R) -> R {
        let out = f(&mut self.inputs);
        self.publish();
        out
    }

    /// Re-run the merge without touching the inputs
    pub fn publish(&mut self) {
        let snapshot = (self.merge)(&self.inputs);
        self.tx.send_replace(snapshot);
    }

    /// Multi-reader view of the snapshots
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.tx.subscribe()
    }
}

impl<I, S: Clone> Combiner<I, S> {
    /// Clone of the latest snapshot
    pub fn snapshot(&self) -> S {
        self.tx.borrow().clone()
    }
}

//! One task per open screen.
//!
//! [`spawn`] moves a controller into a tokio task that owns its state.
//! Intents, store revisions and countdown ticks are all awaited in one
//! `select!` loop, so mutations of a screen's slices never interleave.
//! Intents are dispatched on the blocking pool and the loop waits for each
//! one to finish before polling again. Dropping or closing the [`ScreenHandle`] ends the task; the
//! controller is dropped with it, which cancels its countdown and releases
//! its live queries.

use crate::events::{EventSender, UiEvent};
use crate::screens::{Effect, Screen};
use crate::timer::spawn_ticker;
use crate::Result;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct ScreenHandle<S: Screen> {
    intents: mpsc::UnboundedSender<S::Intent>,
    view: watch::Receiver<S::View>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<S: Screen> ScreenHandle<S> {
    /// Queue an intent. Returns false once the screen task has ended.
    pub fn send(&self, intent: S::Intent) -> bool {
        self.intents.send(intent).is_ok()
    }

    pub fn view(&self) -> watch::Receiver<S::View> {
        self.view.clone()
    }

    pub fn snapshot(&self) -> S::View {
        self.view.borrow().clone()
    }

    /// Stop the screen and wait for its task to finish
    pub async fn close(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Screen task ended abnormally: {}", e);
            }
        }
    }
}

impl<S: Screen> Drop for ScreenHandle<S> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Run `screen` on its own task. `revisions` is the store's write counter;
/// each bump makes the screen pull its live queries. Failed writes are
/// reported on `events` when given.
///
/// Must be called from within a tokio runtime.
pub fn spawn<S: Screen>(
    screen: S,
    revisions: watch::Receiver<u64>,
    events: Option<EventSender>,
) -> ScreenHandle<S> {
    let (intents, rx) = mpsc::unbounded_channel();
    let view = screen.subscribe();
    let cancel = CancellationToken::new();
    let task = tokio::spawn(run(screen, rx, revisions, events, cancel.clone()));
    ScreenHandle {
        intents,
        view,
        cancel,
        task: Some(task),
    }
}

async fn run<S: Screen>(
    mut screen: S,
    mut intents: mpsc::UnboundedReceiver<S::Intent>,
    mut revisions: watch::Receiver<u64>,
    events: Option<EventSender>,
    cancel: CancellationToken,
) {
    let (tick_tx, mut ticks) = mpsc::unbounded_channel::<u64>();
    let mut store_open = true;
    tracing::debug!("Screen task started");

    loop {
        let effects = tokio::select! {
            _ = cancel.cancelled() => break,
            intent = intents.recv() => match intent {
                Some(intent) => {
                    let Some((returned, result)) = dispatch_blocking(screen, intent).await else {
                        break;
                    };
                    screen = returned;
                    match result {
                        Ok(effects) => effects,
                        Err(e) => {
                            tracing::warn!("Write failed: {}", e);
                            if let Some(events) = &events {
                                events.emit(UiEvent::WriteFailed(e.to_string()));
                            }
                            // Whatever did commit before the failure still shows
                            screen.refresh();
                            Vec::new()
                        }
                    }
                }
                None => break,
            },
            changed = revisions.changed(), if store_open => {
                if changed.is_err() {
                    tracing::debug!("Store closed, no more revisions");
                    store_open = false;
                } else if screen.refresh() {
                    tracing::debug!("Screen refreshed after store revision {}", *revisions.borrow());
                }
                Vec::new()
            }
            Some(generation) = ticks.recv() => screen.on_tick(generation),
        };

        for effect in effects {
            match effect {
                Effect::StartTicker(lease) => {
                    spawn_ticker(lease, tick_tx.clone());
                }
            }
        }
    }

    tracing::debug!("Screen task stopped");
}

/// Dispatch on the blocking pool, since store writes hold file locks and
/// fsync. The caller awaits the result before taking the next message, so
/// intents still apply one at a time. `None` if the dispatch panicked.
async fn dispatch_blocking<S: Screen>(
    mut screen: S,
    intent: S::Intent,
) -> Option<(S, Result<Vec<Effect>>)> {
    let task = tokio::task::spawn_blocking(move || {
        let result = screen.dispatch(intent);
        (screen, result)
    });
    match task.await {
        Ok(done) => Some(done),
        Err(e) => {
            tracing::warn!("Dispatch ended abnormally: {}", e);
            None
        }
    }
}

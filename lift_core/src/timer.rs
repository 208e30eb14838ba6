//! Rest countdown timer.
//!
//! [`Countdown`] is a plain state machine: Idle -> Running -> (elapsed) ->
//! Idle. Each start mints a new generation and a [`CancellationToken`]; the
//! owner hands the resulting [`TickerLease`] to [`spawn_ticker`], which posts
//! one tick per second tagged with that generation. Ticks from a reset or
//! replaced run carry an old generation and are ignored.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub const TICK: Duration = Duration::from_secs(1);

/// Handle given to the ticker task for one run of the countdown
#[derive(Clone, Debug)]
pub struct TickerLease {
    pub generation: u64,
    pub token: CancellationToken,
}

#[derive(Debug)]
struct Run {
    generation: u64,
    token: CancellationToken,
}

/// Result of delivering one tick
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Tick belonged to a run that is no longer active
    Stale,
    /// Countdown continues with this many seconds left
    Ticked(u32),
    /// Countdown reached zero; alert raised and remaining restored
    Elapsed,
}

#[derive(Debug)]
pub struct Countdown {
    duration_secs: u32,
    remaining_secs: u32,
    generation: u64,
    run: Option<Run>,
    alert: bool,
}

impl Countdown {
    pub fn new(duration_secs: u32) -> Self {
        let duration_secs = duration_secs.max(1);
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            generation: 0,
            run: None,
            alert: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// One-shot completion flag, cleared by [`Countdown::acknowledge_alert`]
    pub fn alert(&self) -> bool {
        self.alert
    }

    pub fn acknowledge_alert(&mut self) {
        self.alert = false;
    }

    /// Start counting down. Returns `None` if already running.
    pub fn start(&mut self) -> Option<TickerLease> {
        if self.run.is_some() {
            return None;
        }
        self.generation += 1;
        let token = CancellationToken::new();
        self.run = Some(Run {
            generation: self.generation,
            token: token.clone(),
        });
        tracing::debug!(
            "Countdown started (generation {}, {}s)",
            self.generation,
            self.remaining_secs
        );
        Some(TickerLease {
            generation: self.generation,
            token,
        })
    }

    /// Cancel any run and restore the configured duration
    pub fn reset(&mut self) {
        if let Some(run) = self.run.take() {
            run.token.cancel();
            tracing::debug!("Countdown generation {} cancelled", run.generation);
        }
        self.remaining_secs = self.duration_secs;
    }

    /// Reset, then start again immediately
    pub fn repeat(&mut self) -> Option<TickerLease> {
        self.reset();
        self.start()
    }

    /// Change the configured duration. Only allowed while idle.
    pub fn set_duration(&mut self, secs: u32) -> bool {
        if self.run.is_some() || secs == 0 {
            return false;
        }
        self.duration_secs = secs;
        self.remaining_secs = secs;
        true
    }

    /// Deliver one tick from the ticker of `generation`
    pub fn tick(&mut self, generation: u64) -> TickOutcome {
        match &self.run {
            Some(run) if run.generation == generation => {}
            _ => return TickOutcome::Stale,
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs > 0 {
            return TickOutcome::Ticked(self.remaining_secs);
        }

        if let Some(run) = self.run.take() {
            run.token.cancel();
        }
        self.alert = true;
        self.remaining_secs = self.duration_secs;
        tracing::debug!("Countdown generation {} elapsed", generation);
        TickOutcome::Elapsed
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            run.token.cancel();
        }
    }
}

/// Post one tick per second for `lease` until its token is cancelled or the
/// receiver is gone. Cancellation is checked once per tick.
pub fn spawn_ticker(lease: TickerLease, ticks: mpsc::UnboundedSender<u64>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let start = tokio::time::Instant::now() + TICK;
        let mut interval = tokio::time::interval_at(start, TICK);
        loop {
            tokio::select! {
                _ = lease.token.cancelled() => break,
                _ = interval.tick() => {
                    if lease.token.is_cancelled() || ticks.send(lease.generation).is_err() {
                        break;
                    }
                }
            }
        }
        tracing::debug!("Ticker for generation {} stopped", lease.generation);
    })
}

//! Recurring and manual polling of the metrics boundary.
//!
//! At most one poll is in flight at any time. A trigger that arrives while a
//! poll is running is rejected, never queued. `stop()` invalidates every poll
//! that started before it, so a late response cannot write state.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use valpulse_common::{Clock, ResponseEnvelope, SystemClock};
use valpulse_sdk::SdkError;

use crate::source::MetricsSource;
use crate::state::{ApiStatus, ClientPollState, SchedulerPhase};

/// What started a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Tick,
    Manual,
}

/// Result of asking for a poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The poll ran and its result was applied
    Completed,
    /// Another poll was in flight; nothing was sent
    AlreadyRefreshing,
    /// The scheduler was stopped before or during the poll
    Stopped,
}

struct Inner {
    source: Arc<dyn MetricsSource>,
    clock: Arc<dyn Clock>,
    poll_interval: Duration,
    state: Mutex<ClientPollState>,
    updates: watch::Sender<ClientPollState>,
    in_flight: AtomicBool,
    generation: AtomicU64,
    stopped: AtomicBool,
}

pub struct RefreshScheduler {
    inner: Arc<Inner>,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

impl RefreshScheduler {
    pub fn new(source: Arc<dyn MetricsSource>, poll_interval: Duration) -> Self {
        Self::with_clock(source, poll_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(
        source: Arc<dyn MetricsSource>,
        poll_interval: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (updates, _) = watch::channel(ClientPollState::default());
        Self {
            inner: Arc::new(Inner {
                source,
                clock,
                poll_interval,
                state: Mutex::new(ClientPollState::default()),
                updates,
                in_flight: AtomicBool::new(false),
                generation: AtomicU64::new(0),
                stopped: AtomicBool::new(false),
            }),
            ticker: Mutex::new(None),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.inner.poll_interval
    }

    /// Arm the recurring timer. The first tick fires immediately.
    pub fn start(&self) {
        let mut ticker = self.ticker.lock();
        if ticker.is_some() {
            warn!("Refresh scheduler already started");
            return;
        }

        {
            let _state = self.inner.state.lock();
            self.inner.stopped.store(false, Ordering::SeqCst);
        }
        let inner = self.inner.clone();
        *ticker = Some(tokio::spawn(async move {
            let mut timer = interval(inner.poll_interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                // Each poll runs on its own task so a slow cycle never delays the timer
                let poll = inner.clone();
                tokio::spawn(async move {
                    poll.poll(Trigger::Tick).await;
                });
            }
        }));

        info!(
            interval_secs = self.inner.poll_interval.as_secs(),
            "Refresh scheduler started"
        );
    }

    /// Cancel the timer and invalidate any poll still in flight
    pub fn stop(&self) {
        if let Some(handle) = self.ticker.lock().take() {
            handle.abort();
        }
        self.inner.invalidate();

        info!("Refresh scheduler stopped");
    }

    /// Manual refresh through the same path as a timer tick
    pub async fn refresh(&self) -> RefreshOutcome {
        self.inner.clone().poll(Trigger::Manual).await
    }

    pub fn state(&self) -> ClientPollState {
        self.inner.state.lock().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ClientPollState> {
        self.inner.updates.subscribe()
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.ticker.get_mut().take() {
            handle.abort();
        }
        // Spawned polls hold their own `Arc<Inner>` and may still complete
        self.inner.invalidate();
    }
}

impl Inner {
    /// Mark stopped and bump the generation under the state lock, so every
    /// poll that has not yet written is refused from here on.
    fn invalidate(&self) {
        let mut state = self.state.lock();
        self.stopped.store(true, Ordering::SeqCst);
        self.generation.fetch_add(1, Ordering::SeqCst);
        state.is_refreshing = false;
        state.phase = SchedulerPhase::Idle;
        self.updates.send_replace(state.clone());
    }

    async fn poll(self: Arc<Self>, trigger: Trigger) -> RefreshOutcome {
        // Read before the stopped check: a stop in between bumps past it
        let generation = self.generation.load(Ordering::SeqCst);
        if self.stopped.load(Ordering::SeqCst) {
            return RefreshOutcome::Stopped;
        }

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(?trigger, "Poll already in flight, trigger ignored");
            return RefreshOutcome::AlreadyRefreshing;
        }

        let started = self.clock.now();
        let began = self.update(generation, |state| {
            state.is_refreshing = true;
            state.phase = SchedulerPhase::Polling;
            state.last_attempt = Some(started);
        });
        if !began {
            self.in_flight.store(false, Ordering::Release);
            return RefreshOutcome::Stopped;
        }

        debug!(?trigger, "Polling metrics service");
        let result = self.source.get_metrics().await;

        let applied = self.update(generation, |state| apply_result(state, result));
        if applied {
            self.update(generation, |state| state.phase = SchedulerPhase::Idle);
        } else {
            debug!(?trigger, "Discarding result of a poll that outlived stop");
        }

        self.in_flight.store(false, Ordering::Release);

        if applied {
            RefreshOutcome::Completed
        } else {
            RefreshOutcome::Stopped
        }
    }

    /// Apply `change` and publish, unless stopped or `stop()` ran since
    /// `generation` was read
    fn update(&self, generation: u64, change: impl FnOnce(&mut ClientPollState)) -> bool {
        let mut state = self.state.lock();
        if self.stopped.load(Ordering::SeqCst)
            || self.generation.load(Ordering::SeqCst) != generation
        {
            return false;
        }
        change(&mut state);
        self.updates.send_replace(state.clone());
        true
    }
}

fn apply_result(state: &mut ClientPollState, result: Result<ResponseEnvelope, SdkError>) {
    state.is_refreshing = false;
    state.phase = SchedulerPhase::Displaying;

    match result {
        Ok(envelope) if envelope.success => {
            state.api_status = ApiStatus::Success;
            state.error_message = None;
            state.last_updated = Some(envelope.data.last_updated);
            state.data = Some(envelope.data);
        }
        Ok(envelope) => {
            warn!(error = ?envelope.error, "Metrics service is serving fallback data");
            state.api_status = ApiStatus::Fallback;
            state.error_message = envelope.error;
            state.last_updated = Some(envelope.data.last_updated);
            state.data = Some(envelope.data);
        }
        Err(e) => {
            warn!(error = %e, "Metrics service request failed");
            // Previous data and its timestamp stay on display
            state.api_status = ApiStatus::Error;
            state.error_message = Some(e.to_string());
        }
    }
}

/// Age of the data on display, if any
pub fn staleness(state: &ClientPollState, now: DateTime<Utc>) -> Option<chrono::Duration> {
    state.last_updated.map(|at| now - at)
}

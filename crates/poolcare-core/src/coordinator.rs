// ── Polling coordinator ──
//
// Drives authenticate → resolve device → fetch measurements on a timer
// or on demand, publishes the last good snapshot through a watch
// channel and tells listeners when a cycle ends. At most one cycle runs
// at a time; concurrent refresh requests share its outcome.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};
use poolcare_api::PoolCareClient;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::error::CoreError;
use crate::fetcher::MeasurementFetcher;
use crate::resolver::DeviceResolver;
use crate::schema::SchemaTracker;
use crate::snapshot::Snapshot;

// ── CoordinatorState ─────────────────────────────────────────────

/// Whether a cycle is currently running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CoordinatorState {
    Idle,
    Fetching,
}

// ── CycleOutcome ─────────────────────────────────────────────────

/// Result of one poll cycle, shared by every caller that waited on it.
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    Success {
        /// Number of sensors in the new snapshot.
        sensors: usize,
        /// Sensor keys never seen before this cycle.
        added: BTreeSet<String>,
        completed_at: DateTime<Utc>,
    },
    Failure {
        reason: CoreError,
        completed_at: DateTime<Utc>,
    },
}

impl CycleOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn error(&self) -> Option<&CoreError> {
        match self {
            Self::Failure { reason, .. } => Some(reason),
            Self::Success { .. } => None,
        }
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        match self {
            Self::Success { completed_at, .. } | Self::Failure { completed_at, .. } => {
                *completed_at
            }
        }
    }
}

type Listener = Arc<dyn Fn() + Send + Sync>;
type SharedCycle = Shared<BoxFuture<'static, Arc<CycleOutcome>>>;

// ── PollingCoordinator ───────────────────────────────────────────

/// Scheduled, observable poller for one account.
///
/// Cheaply cloneable via `Arc<CoordinatorInner>`. Does not poll until
/// [`start()`](Self::start) or [`request_refresh()`](Self::request_refresh)
/// is called.
#[derive(Clone)]
pub struct PollingCoordinator {
    inner: Arc<CoordinatorInner>,
}

struct CoordinatorInner {
    config: PoolConfig,
    client: PoolCareClient,
    resolver: DeviceResolver,
    fetcher: MeasurementFetcher,
    schema: Mutex<SchemaTracker>,
    snapshot: watch::Sender<Arc<Snapshot>>,
    state: watch::Sender<CoordinatorState>,
    last_outcome: Mutex<Option<Arc<CycleOutcome>>>,
    in_flight: Mutex<Option<SharedCycle>>,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_listener_id: AtomicU64,
    cancel: CancellationToken,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl PollingCoordinator {
    /// Build the HTTP client and an idle coordinator.
    pub fn new(config: PoolConfig) -> Result<Self, CoreError> {
        let client = PoolCareClient::new(config.base_url.clone(), &config.transport())?;
        Ok(Self::with_client(config, client))
    }

    /// Idle coordinator over a pre-built client.
    pub fn with_client(config: PoolConfig, client: PoolCareClient) -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Snapshot::empty()));
        let (state, _) = watch::channel(CoordinatorState::Idle);

        Self {
            inner: Arc::new(CoordinatorInner {
                resolver: DeviceResolver::new(client.clone()),
                fetcher: MeasurementFetcher::new(client.clone()),
                client,
                config,
                schema: Mutex::new(SchemaTracker::new()),
                snapshot,
                state,
                last_outcome: Mutex::new(None),
                in_flight: Mutex::new(None),
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
                cancel: CancellationToken::new(),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Run a single cycle and return its snapshot.
    ///
    /// No timer is started.
    pub async fn oneshot(config: PoolConfig) -> Result<Arc<Snapshot>, CoreError> {
        let coordinator = Self::new(config)?;
        let outcome = coordinator.request_refresh().await;
        match &*outcome {
            CycleOutcome::Success { .. } => Ok(coordinator.current_snapshot()),
            CycleOutcome::Failure { reason, .. } => Err(reason.clone()),
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    // ── Observation ──────────────────────────────────────────────

    /// The last successful snapshot, or an empty one before any success.
    pub fn current_snapshot(&self) -> Arc<Snapshot> {
        self.inner.snapshot.borrow().clone()
    }

    /// Receiver that sees every snapshot replacement.
    pub fn snapshots(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.inner.snapshot.subscribe()
    }

    pub fn state(&self) -> watch::Receiver<CoordinatorState> {
        self.inner.state.subscribe()
    }

    /// Outcome of the most recent cycle. Read from inside a listener, this
    /// is the outcome of the cycle that ran the listener.
    pub fn last_outcome(&self) -> Option<Arc<CycleOutcome>> {
        lock(&self.inner.last_outcome).clone()
    }

    /// Register a callback run after every cycle, success or failure.
    ///
    /// Listeners run synchronously on the cycle task in registration
    /// order. The listener is removed when the handle is dropped.
    pub fn subscribe<F>(&self, listener: F) -> ListenerHandle
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.listeners).push((id, Arc::new(listener)));
        ListenerHandle {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Run a cycle now, or join the one already running.
    ///
    /// The cycle runs on its own task, so dropping the returned future
    /// does not cancel it.
    pub async fn request_refresh(&self) -> Arc<CycleOutcome> {
        let cycle = {
            let mut slot = lock(&self.inner.in_flight);
            if let Some(cycle) = slot.as_ref() {
                debug!("refresh coalesced into running cycle");
                cycle.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let handle = tokio::spawn(async move {
                    let _guard = InFlightGuard(Arc::clone(&inner));
                    inner.run_cycle().await
                });
                let cycle = async move {
                    handle.await.unwrap_or_else(|e| {
                        Arc::new(CycleOutcome::Failure {
                            reason: CoreError::Internal(format!("poll cycle aborted: {e}")),
                            completed_at: Utc::now(),
                        })
                    })
                }
                .boxed()
                .shared();
                *slot = Some(cycle.clone());
                cycle
            }
        };
        cycle.await
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the timer task. The first cycle runs immediately.
    ///
    /// Calling `start` on a running coordinator does nothing. The timer
    /// stops on [`shutdown()`](Self::shutdown) or once every handle to
    /// the coordinator is dropped.
    pub fn start(&self) {
        let mut timer = lock(&self.inner.timer);
        if timer.is_some() {
            return;
        }
        let period = self.inner.config.poll_interval;
        info!(
            account = %self.inner.config.masked_account(),
            interval_secs = period.as_secs(),
            "starting poll timer"
        );
        *timer = Some(tokio::spawn(timer_task(
            Arc::downgrade(&self.inner),
            period,
            self.inner.cancel.clone(),
        )));
    }

    /// Stop the timer and wait for it to exit.
    ///
    /// A cycle that is already running may still complete.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let handle = lock(&self.inner.timer).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

impl CoordinatorInner {
    async fn run_cycle(&self) -> Arc<CycleOutcome> {
        self.state.send_replace(CoordinatorState::Fetching);
        let started = Instant::now();

        let outcome = match self.poll_once().await {
            Ok(snapshot) => {
                let added = lock(&self.schema).observe(snapshot.sensor_keys());
                let sensors = snapshot.sensor_keys().len();
                if !added.is_empty() {
                    info!(added = ?added, "new sensors discovered");
                }
                self.snapshot.send_replace(Arc::new(snapshot));
                info!(
                    sensors,
                    elapsed_ms = elapsed_ms(started),
                    "poll cycle complete"
                );
                CycleOutcome::Success {
                    sensors,
                    added,
                    completed_at: Utc::now(),
                }
            }
            Err(err) => {
                warn!(
                    error = %err,
                    transient = err.is_transient(),
                    elapsed_ms = elapsed_ms(started),
                    "poll cycle failed, next attempt on the next tick"
                );
                CycleOutcome::Failure {
                    reason: CoreError::from(err),
                    completed_at: Utc::now(),
                }
            }
        };

        let outcome = Arc::new(outcome);
        *lock(&self.last_outcome) = Some(Arc::clone(&outcome));
        self.state.send_replace(CoordinatorState::Idle);
        self.notify();
        outcome
    }

    /// Fresh credentials every cycle; the device comes from the cache
    /// when there is one.
    async fn poll_once(&self) -> Result<Snapshot, poolcare_api::Error> {
        let credentials = self
            .client
            .authenticate(&self.config.account, &self.config.secret)
            .await?;
        let device = self.resolver.resolve(&credentials).await?;

        self.fetcher
            .fetch(&credentials, &device)
            .await
            .inspect_err(|e| {
                if e.is_not_found() {
                    warn!(device = %device, status = ?e.status(), "device rejected, will re-resolve");
                    self.resolver.invalidate();
                }
            })
    }

    fn notify(&self) {
        let listeners: Vec<Listener> = lock(&self.listeners)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

impl Drop for CoordinatorInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── In-flight slot guard ─────────────────────────────────────────

/// Clears the in-flight slot when the cycle task ends, panics included.
struct InFlightGuard(Arc<CoordinatorInner>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        lock(&self.0.in_flight).take();
        self.0.state.send_replace(CoordinatorState::Idle);
    }
}

// ── ListenerHandle ───────────────────────────────────────────────

/// Keeps a listener registered. Dropping it unsubscribes.
#[must_use = "dropping the handle unsubscribes the listener"]
pub struct ListenerHandle {
    id: u64,
    inner: Weak<CoordinatorInner>,
}

impl ListenerHandle {
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ListenerHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner.listeners).retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for ListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerHandle").field("id", &self.id).finish()
    }
}

// ── Background timer ─────────────────────────────────────────────

async fn timer_task(
    weak: Weak<CoordinatorInner>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                let Some(inner) = weak.upgrade() else { break };
                let coordinator = PollingCoordinator { inner };
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    outcome = coordinator.request_refresh() => {
                        debug!(success = outcome.is_success(), "scheduled cycle finished");
                    }
                }
            }
        }
    }

    debug!("poll timer stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn elapsed_ms(started: Instant) -> u128 {
    started.elapsed().as_millis()
}

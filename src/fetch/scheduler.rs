//! Debounced, throttled and ordered viewport fetching
//!
//! Bursts of `schedule` calls are coalesced into one fetch carrying the
//! latest parameters. A fetch goes out once the input has been quiet for the
//! debounce window, or once the burst has lasted for the throttle window,
//! whichever comes first. Every issued fetch gets a fresh, strictly
//! increasing [`RequestId`]; receivers use it to drop responses that arrive
//! after a newer one has been applied.

use crate::core::config::SchedulerConfig;
use crate::core::property::{PropertyRecord, PropertyTypeFilter};
use crate::fetch::request::{FetchRequest, FetchTarget, RequestId, ScheduleOptions};
use crate::prelude::{Arc, HashMap, HashSet, Mutex};
use crate::runtime::{self, AsyncHandle};
use crate::traits::{FetchEvents, PropertyFetcher};
use crate::Result;
use std::sync::{MutexGuard, PoisonError, Weak};
use tokio::time::Instant;

/// Parameters waiting for the debounce timer
#[derive(Debug, Clone)]
struct PendingFetch {
    target: FetchTarget,
    filter: PropertyTypeFilter,
}

struct SchedulerState {
    pending: Option<PendingFetch>,
    timer: Option<Box<dyn AsyncHandle>>,
    /// Bumped whenever the armed timer is replaced, so a stale timer that
    /// already woke up does nothing
    timer_seq: u64,
    /// When the current un-flushed burst of `schedule` calls began
    burst_started: Option<Instant>,
    last_issued: Option<FetchRequest>,
    last_request_id: RequestId,
    outstanding: HashSet<RequestId>,
    handles: HashMap<RequestId, Box<dyn AsyncHandle>>,
    /// Bumped by `cancel`; completions from an older epoch are silenced
    epoch: u64,
    /// Whether receivers were last told `loading = true`
    loading_reported: bool,
}

impl SchedulerState {
    fn new() -> Self {
        Self {
            pending: None,
            timer: None,
            timer_seq: 0,
            burst_started: None,
            last_issued: None,
            last_request_id: RequestId(0),
            outstanding: HashSet::default(),
            handles: HashMap::default(),
            epoch: 0,
            loading_reported: false,
        }
    }

    fn disarm_timer(&mut self) {
        self.timer_seq += 1;
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }

    fn clear_pending(&mut self) {
        self.disarm_timer();
        self.pending = None;
        self.burst_started = None;
    }
}

/// A fetch reserved under the lock, dispatched after it is released
struct Reservation {
    request: FetchRequest,
    epoch: u64,
    became_loading: bool,
}

struct SchedulerInner {
    config: SchedulerConfig,
    fetcher: Arc<dyn PropertyFetcher>,
    events: Arc<dyn FetchEvents>,
    state: Mutex<SchedulerState>,
}

impl SchedulerInner {
    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reserve(
        &self,
        state: &mut SchedulerState,
        target: FetchTarget,
        filter: PropertyTypeFilter,
    ) -> Reservation {
        let request_id = state.last_request_id.next();
        state.last_request_id = request_id;

        let request = FetchRequest {
            target,
            filter,
            request_id,
            timestamp: runtime::now(),
        };
        state.last_issued = Some(request.clone());

        let became_loading = !state.loading_reported;
        state.loading_reported = true;
        state.outstanding.insert(request_id);

        Reservation {
            request,
            epoch: state.epoch,
            became_loading,
        }
    }

    /// Starts the network call for a reservation. Must be called without the lock held.
    fn dispatch(self: &Arc<Self>, reservation: Reservation) {
        let Reservation {
            request,
            epoch,
            became_loading,
        } = reservation;
        let request_id = request.request_id;

        log::info!(
            "Fetching {} ({}) as request {}",
            request.target,
            request.filter,
            request_id
        );

        if became_loading {
            self.events.on_loading_change(true);
        }

        let fetcher = self.fetcher.clone();
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = runtime::spawn(async move {
            let result = fetcher.fetch(&request).await;
            if let Some(inner) = weak.upgrade() {
                inner.complete(epoch, request_id, result);
            }
        });

        let mut state = self.state();
        if state.epoch == epoch && state.outstanding.contains(&request_id) {
            state.handles.insert(request_id, handle);
        } else if state.epoch != epoch {
            // Cancelled between reservation and spawn
            handle.cancel();
        }
    }

    fn complete(&self, epoch: u64, request_id: RequestId, result: Result<Vec<PropertyRecord>>) {
        {
            let mut state = self.state();
            if state.epoch != epoch || !state.outstanding.remove(&request_id) {
                log::debug!("Request {} resolved after cancellation; ignoring", request_id);
                return;
            }
            state.handles.remove(&request_id);

            // A failed fetch must not suppress an identical retry
            let failed_latest = result.is_err()
                && state
                    .last_issued
                    .as_ref()
                    .is_some_and(|r| r.request_id == request_id);
            if failed_latest {
                state.last_issued = None;
            }
        }

        match result {
            Ok(properties) => {
                log::debug!(
                    "Request {} returned {} properties",
                    request_id,
                    properties.len()
                );
                if self.is_current(epoch) {
                    self.events.on_data_update(properties, request_id);
                }
            }
            Err(e) => {
                log::error!("Request {} failed: {}", request_id, e);
                if self.is_current(epoch) {
                    self.events.on_error(&e, request_id);
                }
            }
        }

        // Receivers may have scheduled or cancelled from inside the callback,
        // so idleness is decided only now
        let became_idle = {
            let mut state = self.state();
            let idle = state.epoch == epoch && state.outstanding.is_empty() && state.loading_reported;
            if idle {
                state.loading_reported = false;
            }
            idle
        };
        if became_idle {
            self.events.on_loading_change(false);
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        self.state().epoch == epoch
    }

    fn on_timer(self: &Arc<Self>, seq: u64) {
        let reservation = {
            let mut state = self.state();
            if state.timer_seq != seq {
                return;
            }
            state.timer = None;
            state.burst_started = None;

            let Some(pending) = state.pending.take() else {
                return;
            };

            let duplicate = self.config.skip_duplicates
                && state
                    .last_issued
                    .as_ref()
                    .is_some_and(|r| r.same_query(&pending.target, pending.filter));
            if duplicate {
                log::debug!(
                    "Skipping fetch for {} ({}): identical to the last request",
                    pending.target,
                    pending.filter
                );
                return;
            }

            self.reserve(&mut state, pending.target, pending.filter)
        };

        self.dispatch(reservation);
    }
}

impl Drop for SchedulerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        state.clear_pending();
        for (_, handle) in state.handles.drain() {
            handle.cancel();
        }
    }
}

/// Converts a stream of viewport/filter changes into a minimal, ordered
/// stream of fetches.
///
/// Cloning yields another handle to the same scheduler. Must be used from
/// within a tokio runtime.
#[derive(Clone)]
pub struct ViewportFetchScheduler {
    inner: Arc<SchedulerInner>,
}

impl ViewportFetchScheduler {
    /// Fails with [`Error::Config`](crate::Error::Config) for an invalid config
    pub fn new(
        config: SchedulerConfig,
        fetcher: Arc<dyn PropertyFetcher>,
        events: Arc<dyn FetchEvents>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Arc::new(SchedulerInner {
                config,
                fetcher,
                events,
                state: Mutex::new(SchedulerState::new()),
            }),
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.inner.config
    }

    /// Request a fetch for `target` and `filter`.
    ///
    /// Debounced unless `options.immediate` is set; an immediate fetch also
    /// discards any debounced parameters still waiting.
    pub fn schedule(
        &self,
        target: impl Into<FetchTarget>,
        filter: PropertyTypeFilter,
        options: ScheduleOptions,
    ) {
        let target = target.into();

        if options.immediate {
            let reservation = {
                let mut state = self.inner.state();
                state.clear_pending();
                self.inner.reserve(&mut state, target, filter)
            };
            self.inner.dispatch(reservation);
            return;
        }

        let mut state = self.inner.state();
        let now = runtime::now();
        let burst_started = *state.burst_started.get_or_insert(now);
        let deadline = (now + self.inner.config.debounce())
            .min(burst_started + self.inner.config.throttle());

        state.pending = Some(PendingFetch { target, filter });
        state.disarm_timer();
        let seq = state.timer_seq;

        let weak = Arc::downgrade(&self.inner);
        state.timer = Some(runtime::spawn(async move {
            runtime::sleep_until(deadline).await;
            if let Some(inner) = weak.upgrade() {
                inner.on_timer(seq);
            }
        }));
    }

    /// Drop pending timers and silence every fetch issued so far.
    ///
    /// No callback fires for those fetches afterwards, including the loading
    /// flag. The scheduler remains usable.
    pub fn cancel(&self) {
        let mut state = self.inner.state();
        state.epoch += 1;
        state.clear_pending();
        for (_, handle) in state.handles.drain() {
            handle.cancel();
        }
        let silenced = state.outstanding.len();
        state.outstanding.clear();
        state.loading_reported = false;
        state.last_issued = None;
        log::debug!("Scheduler cancelled ({} in-flight requests silenced)", silenced);
    }

    /// Whether any fetch is outstanding
    pub fn is_loading(&self) -> bool {
        !self.inner.state().outstanding.is_empty()
    }

    pub fn in_flight(&self) -> usize {
        self.inner.state().outstanding.len()
    }

    /// Whether debounced parameters are waiting for their timer
    pub fn has_pending(&self) -> bool {
        self.inner.state().pending.is_some()
    }

    /// Id of the most recently issued fetch
    pub fn last_request_id(&self) -> Option<RequestId> {
        let id = self.inner.state().last_request_id;
        (id.0 > 0).then_some(id)
    }
}

impl std::fmt::Debug for ViewportFetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("ViewportFetchScheduler")
            .field("config", &self.inner.config)
            .field("pending", &state.pending)
            .field("in_flight", &state.outstanding.len())
            .field("last_request_id", &state.last_request_id)
            .finish()
    }
}

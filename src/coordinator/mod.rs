//! Filter coordination between city browsing and map search
//!
//! [`FilterCoordinator`] owns the fetch scheduler and the viewport cache. It
//! turns user actions (city, page, property type, "search this area",
//! viewport idle) into scheduler calls, and its cache sink applies only the
//! newest response before notifying the registered observers.

pub mod navigation;

use crate::cache::viewport::PropertyViewportCache;
use crate::core::bounds::ViewportBounds;
use crate::core::config::CoordinatorConfig;
use crate::core::property::{PropertyRecord, PropertyTypeFilter};
use crate::fetch::request::{FetchTarget, RequestId, ScheduleOptions};
use crate::fetch::scheduler::ViewportFetchScheduler;
use crate::prelude::{Arc, Mutex};
use crate::traits::{FetchEvents, ListingsObserver, MapSurface, PropertyFetcher};
use crate::{Error, Result};
use navigation::{ListingMode, NavigationState};
use std::sync::{MutexGuard, PoisonError, Weak};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Receives scheduler callbacks, writes the cache and fans out to observers
struct CacheSink {
    cache: PropertyViewportCache,
    /// Highest request id whose data has been applied
    latest_applied: Mutex<Option<RequestId>>,
    filter: Mutex<PropertyTypeFilter>,
    observers: Mutex<Vec<Arc<dyn ListingsObserver>>>,
}

impl CacheSink {
    fn new(cache: PropertyViewportCache, filter: PropertyTypeFilter) -> Self {
        Self {
            cache,
            latest_applied: Mutex::new(None),
            filter: Mutex::new(filter),
            observers: Mutex::new(Vec::new()),
        }
    }

    fn observers(&self) -> Vec<Arc<dyn ListingsObserver>> {
        lock(&self.observers).clone()
    }

    fn is_stale(latest: Option<RequestId>, request_id: RequestId) -> bool {
        latest.is_some_and(|latest| request_id <= latest)
    }

    fn set_filter(&self, filter: PropertyTypeFilter) {
        *lock(&self.filter) = filter;
    }

    fn visible(&self) -> Arc<[PropertyRecord]> {
        let filter = *lock(&self.filter);
        self.cache.filter_by_type(filter)
    }

    fn notify_properties(&self) {
        let visible = self.visible();
        for observer in self.observers() {
            observer.on_properties_changed(&visible);
        }
    }
}

impl FetchEvents for CacheSink {
    fn on_data_update(&self, properties: Vec<PropertyRecord>, request_id: RequestId) {
        // Held through notification so observers see applies in id order
        let mut latest = lock(&self.latest_applied);
        if Self::is_stale(*latest, request_id) {
            log::debug!(
                "Dropping stale response {} (latest applied: {:?})",
                request_id,
                *latest
            );
            return;
        }
        *latest = Some(request_id);

        let version = self.cache.replace(properties);
        log::debug!(
            "Applied response {}: {} properties (cache v{})",
            request_id,
            self.cache.len(),
            version
        );
        self.notify_properties();
    }

    fn on_loading_change(&self, is_loading: bool) {
        for observer in self.observers() {
            observer.on_loading_change(is_loading);
        }
    }

    fn on_error(&self, error: &Error, request_id: RequestId) {
        if Self::is_stale(*lock(&self.latest_applied), request_id) {
            log::debug!("Ignoring error from superseded request {}: {}", request_id, error);
            return;
        }
        for observer in self.observers() {
            observer.on_error(error);
        }
    }
}

struct CoordinatorInner {
    config: CoordinatorConfig,
    cache: PropertyViewportCache,
    scheduler: ViewportFetchScheduler,
    sink: Arc<CacheSink>,
    state: Mutex<NavigationState>,
}

impl CoordinatorInner {
    fn target_for(&self, mode: &ListingMode) -> FetchTarget {
        match mode {
            ListingMode::City { city_key, page } => FetchTarget::City {
                city_key: city_key.clone().unwrap_or_default(),
                page: *page,
                per_page: self.config.city_per_page,
            },
            ListingMode::Map { bounds } => FetchTarget::Bounds {
                bounds: *bounds,
                per_page: self.config.map_per_page,
            },
        }
    }

    /// Update the navigation state and fetch for the result
    fn apply(&self, options: ScheduleOptions, update: impl FnOnce(&mut NavigationState)) {
        let (mode, filter) = {
            let mut state = lock(&self.state);
            update(&mut state);
            (state.mode(), state.property_type)
        };
        self.sink.set_filter(filter);
        self.scheduler.schedule(self.target_for(&mode), filter, options);
    }

    fn on_viewport_idle(&self, bounds: ViewportBounds) -> bool {
        let filter = {
            let mut state = lock(&self.state);
            if !state.mode().is_map() {
                log::trace!("Viewport idle at {} ignored in city mode", bounds);
                return false;
            }
            state.bounds = Some(bounds);
            state.property_type
        };
        let target = FetchTarget::Bounds {
            bounds,
            per_page: self.config.map_per_page,
        };
        self.scheduler.schedule(target, filter, ScheduleOptions::debounced());
        true
    }
}

/// Ties navigation and filter actions to the fetch scheduler.
///
/// Cloning yields another handle to the same coordinator. Must be used from
/// within a tokio runtime.
#[derive(Clone)]
pub struct FilterCoordinator {
    inner: Arc<CoordinatorInner>,
}

impl FilterCoordinator {
    pub fn new(config: CoordinatorConfig, fetcher: Arc<dyn PropertyFetcher>) -> Result<Self> {
        config.validate()?;
        let cache = PropertyViewportCache::new();
        let sink = Arc::new(CacheSink::new(cache.clone(), PropertyTypeFilter::All));
        let scheduler = ViewportFetchScheduler::new(config.scheduler.clone(), fetcher, sink.clone())?;

        Ok(Self {
            inner: Arc::new(CoordinatorInner {
                config,
                cache,
                scheduler,
                sink,
                state: Mutex::new(NavigationState::default()),
            }),
        })
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Register a consumer of the visible property set
    pub fn add_observer(&self, observer: Arc<dyn ListingsObserver>) {
        lock(&self.inner.sink.observers).push(observer);
    }

    /// Forward idle events of `surface` to [`on_viewport_idle`](Self::on_viewport_idle)
    pub fn attach_surface(&self, surface: &dyn MapSurface) {
        let weak: Weak<CoordinatorInner> = Arc::downgrade(&self.inner);
        surface.on_idle(Arc::new(move |bounds| {
            if let Some(inner) = weak.upgrade() {
                inner.on_viewport_idle(bounds);
            }
        }));
        log::debug!("Listening for idle events on '{}'", surface.surface_id());
    }

    /// Enter the initial state and fetch it right away.
    ///
    /// The mode is decided here from the presence of bounds and the
    /// search-by-map flag; it only changes through later user actions.
    pub fn mount(&self, initial: NavigationState) {
        log::info!("Mounting listings in {:?}", initial.mode());
        self.inner
            .apply(ScheduleOptions::immediate(), move |state| *state = initial);
    }

    /// Viewport settled. Debounced fetch in map mode; ignored in city mode.
    /// Returns whether a fetch was scheduled.
    pub fn on_viewport_idle(&self, bounds: ViewportBounds) -> bool {
        self.inner.on_viewport_idle(bounds)
    }

    /// Switch to map mode over `bounds` and fetch immediately
    pub fn search_this_area(&self, bounds: ViewportBounds) -> Result<()> {
        bounds.validate()?;
        self.inner.apply(ScheduleOptions::immediate(), |state| {
            state.bounds = Some(bounds);
            state.search_by_map = true;
            state.page = 1;
        });
        Ok(())
    }

    /// "Search this area" over whatever `surface` currently shows
    pub fn search_surface_area(&self, surface: &dyn MapSurface) -> Result<()> {
        let bounds = surface.viewport_bounds().ok_or_else(|| {
            Error::InvalidBounds(format!("surface '{}' has no viewport yet", surface.surface_id()))
        })?;
        self.search_this_area(bounds)
    }

    /// Fit `surface` around the visible properties. Returns `false` when
    /// there is nothing to fit (no properties, or all at one latitude).
    pub fn fit_surface_to_results(&self, surface: &dyn MapSurface) -> Result<bool> {
        let visible = self.visible_properties();
        let positions: Vec<_> = visible.iter().map(PropertyRecord::position).collect();
        match ViewportBounds::enclosing(&positions) {
            Some(bounds) => {
                surface.fit_bounds(&bounds)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Switch to city mode on the first page of `city_key` (all cities for `None`)
    pub fn select_city(&self, city_key: Option<String>) {
        self.inner.apply(ScheduleOptions::immediate(), |state| {
            state.city = city_key;
            state.page = 1;
            state.bounds = None;
            state.search_by_map = false;
        });
    }

    /// Jump to a page of the city listing
    pub fn go_to_page(&self, page: u32) -> Result<()> {
        if page == 0 {
            return Err(Error::InvalidNavigation("pages start at 1".into()));
        }
        if self.mode().is_map() {
            return Err(Error::InvalidNavigation(
                "pagination is only available in city mode".into(),
            ));
        }
        self.inner
            .apply(ScheduleOptions::immediate(), |state| state.page = page);
        Ok(())
    }

    /// Change the property type.
    ///
    /// The cached set is re-filtered locally and observers are notified at
    /// once; a backend refetch follows if configured. In city mode the
    /// refetch starts over at page 1; without one the page is kept, so the
    /// query keeps describing what the cache holds.
    pub fn set_property_type(&self, filter: PropertyTypeFilter) {
        let refetch = self.inner.config.refetch_on_filter_change;
        let changed = {
            let mut state = lock(&self.inner.state);
            let changed = state.property_type != filter;
            state.property_type = filter;
            if changed && refetch && !state.mode().is_map() {
                state.page = 1;
            }
            changed
        };
        if !changed {
            return;
        }

        self.inner.sink.set_filter(filter);
        self.inner.sink.notify_properties();

        if refetch {
            self.inner.apply(ScheduleOptions::immediate(), |_| {});
        }
    }

    /// Adopt an externally changed navigation state (history, deep link).
    /// Fetches only when the effective query changed.
    pub fn navigate(&self, next: NavigationState) {
        let previous = self.navigation_state();
        if previous.mode() == next.mode() && previous.property_type == next.property_type {
            *lock(&self.inner.state) = next;
            return;
        }
        if previous.mode().is_map() != next.mode().is_map() {
            log::info!("Switching to {:?}", next.mode());
        }
        self.inner
            .apply(ScheduleOptions::immediate(), move |state| *state = next);
    }

    /// Fetch the current state again, skipping the debounce window
    pub fn refresh(&self) {
        self.inner.apply(ScheduleOptions::immediate(), |_| {});
    }

    pub fn navigation_state(&self) -> NavigationState {
        lock(&self.inner.state).clone()
    }

    pub fn mode(&self) -> ListingMode {
        lock(&self.inner.state).mode()
    }

    /// Cached properties passing the current type filter
    pub fn visible_properties(&self) -> Arc<[PropertyRecord]> {
        self.inner.sink.visible()
    }

    pub fn cache(&self) -> &PropertyViewportCache {
        &self.inner.cache
    }

    pub fn scheduler(&self) -> &ViewportFetchScheduler {
        &self.inner.scheduler
    }

    pub fn is_loading(&self) -> bool {
        self.inner.scheduler.is_loading()
    }

    /// Stop all pending and in-flight work and detach observers.
    /// Safe to call more than once.
    pub fn teardown(&self) {
        self.inner.scheduler.cancel();
        lock(&self.inner.sink.observers).clear();
        log::debug!("Listings coordinator torn down");
    }
}

impl std::fmt::Debug for FilterCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterCoordinator")
            .field("state", &*lock(&self.inner.state))
            .field("cached", &self.inner.cache.len())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

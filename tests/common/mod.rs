//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use listing_map::traits::{IdleListener, MarkerListener};
use listing_map::{
    Error, FetchRequest, LatLng, ListingsObserver, MapProvider, MapSurface, MarkerEvent,
    MarkerHandle, MarkerSpec, MarkerStyle, PropertyFetcher, PropertyRecord, Result,
    SurfaceOptions, ViewportBounds,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub fn sofia() -> ViewportBounds {
    ViewportBounds::new(42.60, 23.22, 42.80, 23.42).unwrap()
}

/// Sofia bounds shifted north by `offset` degrees
pub fn sofia_shifted(offset: f64) -> ViewportBounds {
    ViewportBounds::new(42.60 + offset, 23.22, 42.80 + offset, 23.42).unwrap()
}

pub fn sofia_listings() -> Vec<PropertyRecord> {
    vec![
        PropertyRecord::new("p1", 42.70, 23.30, "Apartment Buildings"),
        PropertyRecord::new("p2", 42.71, 23.31, "Residential Houses"),
    ]
}

pub fn listing(id: &str) -> PropertyRecord {
    PropertyRecord::new(id, 42.70, 23.30, "Residential Houses")
}

pub fn ids(records: &[PropertyRecord]) -> Vec<String> {
    records.iter().map(|r| r.id.clone()).collect()
}

/// One scripted backend answer
pub struct Scripted {
    pub delay: Duration,
    pub response: Result<Vec<PropertyRecord>>,
}

impl Scripted {
    pub fn ok(delay_ms: u64, records: Vec<PropertyRecord>) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            response: Ok(records),
        }
    }

    pub fn error(delay_ms: u64, status: u16) -> Self {
        Self {
            delay: Duration::from_millis(delay_ms),
            response: Err(Error::HttpStatus {
                status,
                url: "/api/v1/projects/".into(),
            }),
        }
    }
}

/// Plays back scripted answers in call order; falls back to `default` once
/// the script runs out
pub struct MockFetcher {
    script: Mutex<VecDeque<Scripted>>,
    default: Vec<PropertyRecord>,
    calls: Mutex<Vec<FetchRequest>>,
}

impl MockFetcher {
    pub fn new(default: Vec<PropertyRecord>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            default,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn scripted(default: Vec<PropertyRecord>, script: Vec<Scripted>) -> Arc<Self> {
        let fetcher = Self::new(default);
        fetcher.script.lock().unwrap().extend(script);
        fetcher
    }

    pub fn calls(&self) -> Vec<FetchRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PropertyFetcher for MockFetcher {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<PropertyRecord>> {
        self.calls.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted { delay, response }) => {
                tokio::time::sleep(delay).await;
                response
            }
            None => Ok(self.default.clone()),
        }
    }
}

/// Records everything a `ListingsObserver` is told
#[derive(Default)]
pub struct RecordingObserver {
    pub sets: Mutex<Vec<Vec<String>>>,
    pub loading: Mutex<Vec<bool>>,
    pub errors: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn last_set(&self) -> Option<Vec<String>> {
        self.sets.lock().unwrap().last().cloned()
    }
}

impl ListingsObserver for RecordingObserver {
    fn on_properties_changed(&self, properties: &[PropertyRecord]) {
        self.sets.lock().unwrap().push(ids(properties));
    }

    fn on_loading_change(&self, is_loading: bool) {
        self.loading.lock().unwrap().push(is_loading);
    }

    fn on_error(&self, error: &Error) {
        self.errors.lock().unwrap().push(error.to_string());
    }
}

struct LiveMarker {
    property_id: String,
    style: MarkerStyle,
    listener: MarkerListener,
}

/// In-memory map surface counting every marker operation
pub struct FakeSurface {
    id: String,
    bounds: Mutex<Option<ViewportBounds>>,
    next_handle: AtomicUsize,
    live: Mutex<HashMap<u64, LiveMarker>>,
    idle_listeners: Mutex<Vec<IdleListener>>,
    pub created: AtomicUsize,
    pub removed: AtomicUsize,
    pub restyled: AtomicUsize,
    pub moved: AtomicUsize,
}

impl FakeSurface {
    pub fn new(id: &str) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            bounds: Mutex::new(None),
            next_handle: AtomicUsize::new(1),
            live: Mutex::new(HashMap::new()),
            idle_listeners: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            removed: AtomicUsize::new(0),
            restyled: AtomicUsize::new(0),
            moved: AtomicUsize::new(0),
        })
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn removed(&self) -> usize {
        self.removed.load(Ordering::SeqCst)
    }

    pub fn restyled(&self) -> usize {
        self.restyled.load(Ordering::SeqCst)
    }

    /// Property ids with a live marker, sorted
    pub fn marker_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self
            .live
            .lock()
            .unwrap()
            .values()
            .map(|m| m.property_id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn style_of(&self, property_id: &str) -> Option<MarkerStyle> {
        self.live
            .lock()
            .unwrap()
            .values()
            .find(|m| m.property_id == property_id)
            .map(|m| m.style)
    }

    /// Simulate the user settling the map on `bounds`
    pub fn settle(&self, bounds: ViewportBounds) {
        *self.bounds.lock().unwrap() = Some(bounds);
        let listeners = self.idle_listeners.lock().unwrap().clone();
        for listener in listeners {
            listener(bounds);
        }
    }

    /// Deliver a marker event the way a provider would
    pub fn emit(&self, property_id: &str, event: MarkerEvent) {
        let listener = self
            .live
            .lock()
            .unwrap()
            .values()
            .find(|m| m.property_id == property_id)
            .map(|m| m.listener.clone());
        if let Some(listener) = listener {
            listener(event);
        }
    }
}

impl MapSurface for FakeSurface {
    fn surface_id(&self) -> &str {
        &self.id
    }

    fn create_marker(&self, spec: &MarkerSpec, listener: MarkerListener) -> Result<MarkerHandle> {
        let handle = self.next_handle.fetch_add(1, Ordering::SeqCst) as u64;
        self.live.lock().unwrap().insert(
            handle,
            LiveMarker {
                property_id: spec.property_id.clone(),
                style: spec.style,
                listener,
            },
        );
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(MarkerHandle(handle))
    }

    fn set_marker_style(&self, handle: MarkerHandle, style: &MarkerStyle) -> Result<()> {
        let mut live = self.live.lock().unwrap();
        let marker = live
            .get_mut(&handle.0)
            .ok_or_else(|| Error::Provider(format!("unknown marker {}", handle.0)))?;
        marker.style = *style;
        self.restyled.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn set_marker_position(&self, handle: MarkerHandle, _position: LatLng) -> Result<()> {
        if !self.live.lock().unwrap().contains_key(&handle.0) {
            return Err(Error::Provider(format!("unknown marker {}", handle.0)));
        }
        self.moved.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn remove_marker(&self, handle: MarkerHandle) -> Result<()> {
        self.live.lock().unwrap().remove(&handle.0);
        self.removed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn viewport_bounds(&self) -> Option<ViewportBounds> {
        *self.bounds.lock().unwrap()
    }

    fn fit_bounds(&self, bounds: &ViewportBounds) -> Result<()> {
        *self.bounds.lock().unwrap() = Some(*bounds);
        Ok(())
    }

    fn on_idle(&self, listener: IdleListener) {
        self.idle_listeners.lock().unwrap().push(listener);
    }
}

/// Provider handing out fake surfaces, or refusing to start at all
pub struct FakeProvider {
    pub blocked: bool,
}

impl MapProvider for FakeProvider {
    fn create_surface(&self, options: &SurfaceOptions) -> Result<Arc<dyn MapSurface>> {
        if self.blocked {
            return Err(Error::Provider("maps script blocked by the browser".into()));
        }
        Ok(FakeSurface::new(&options.surface_id))
    }
}

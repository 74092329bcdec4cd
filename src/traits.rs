//! Shared trait abstractions at the crate's seams
//!
//! The backend, the mapping provider and the UI layer are all external
//! collaborators; this module describes exactly what the core needs from each.

use crate::core::{bounds::ViewportBounds, geo::LatLng, property::PropertyRecord};
use crate::fetch::request::{FetchRequest, RequestId};
use crate::layers::marker::{MarkerEvent, MarkerHandle, MarkerSpec, MarkerStyle};
use crate::prelude::Arc;
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source of property listings for a fetch request
///
/// Implementations own URL building and decoding; the scheduler only sees
/// `fetch(target, filter) -> records`.
#[async_trait]
pub trait PropertyFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<PropertyRecord>>;
}

/// Callbacks fired by the fetch scheduler
///
/// Callbacks are never invoked while the scheduler holds its internal lock,
/// so implementations may call back into the scheduler.
pub trait FetchEvents: Send + Sync {
    /// A fetch resolved. Ordering against other responses is the receiver's job.
    fn on_data_update(&self, properties: Vec<PropertyRecord>, request_id: RequestId);

    /// `true` when the first outstanding fetch is dispatched, `false` once none remain
    fn on_loading_change(&self, _is_loading: bool) {}

    /// A fetch failed. No retry is attempted.
    fn on_error(&self, _error: &Error, _request_id: RequestId) {}
}

/// UI-side consumer of the listings state
pub trait ListingsObserver: Send + Sync {
    /// The visible (type-filtered) property set changed
    fn on_properties_changed(&self, properties: &[PropertyRecord]);

    fn on_loading_change(&self, _is_loading: bool) {}

    fn on_error(&self, _error: &Error) {}
}

/// Listener for marker clicks and hovers
pub type MarkerListener = Arc<dyn Fn(MarkerEvent) + Send + Sync>;

/// Listener for viewport-settled ("idle") events
pub type IdleListener = Arc<dyn Fn(ViewportBounds) + Send + Sync>;

/// A single map surface (desktop map, mobile map, ...) of the mapping provider
pub trait MapSurface: Send + Sync {
    /// Stable identifier of this surface
    fn surface_id(&self) -> &str;

    /// Create and place a marker; `listener` receives its click/hover events
    fn create_marker(&self, spec: &MarkerSpec, listener: MarkerListener) -> Result<MarkerHandle>;

    fn set_marker_style(&self, handle: MarkerHandle, style: &MarkerStyle) -> Result<()>;

    fn set_marker_position(&self, handle: MarkerHandle, position: LatLng) -> Result<()>;

    fn remove_marker(&self, handle: MarkerHandle) -> Result<()>;

    /// Current visible bounds, if the surface has been laid out
    fn viewport_bounds(&self) -> Option<ViewportBounds>;

    fn fit_bounds(&self, bounds: &ViewportBounds) -> Result<()>;

    /// Register a listener for viewport-settled events
    fn on_idle(&self, listener: IdleListener);
}

/// Options for constructing a map surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceOptions {
    pub surface_id: String,
    pub center: LatLng,
    pub zoom: f64,
}

impl SurfaceOptions {
    pub fn new(surface_id: impl Into<String>, center: LatLng, zoom: f64) -> Self {
        Self {
            surface_id: surface_id.into(),
            center,
            zoom,
        }
    }
}

/// Mapping provider capable of constructing map surfaces
pub trait MapProvider: Send + Sync {
    fn create_surface(&self, options: &SurfaceOptions) -> Result<Arc<dyn MapSurface>>;
}

/// Outcome of bringing up a map surface
pub enum SurfaceInit {
    Ready(Arc<dyn MapSurface>),
    /// The provider could not start (script blocked, quota, ...). The UI
    /// degrades to a list-only view.
    Blocked { reason: String },
}

impl SurfaceInit {
    /// Create a surface, converting provider failure into `Blocked`
    pub fn initialize(provider: &dyn MapProvider, options: &SurfaceOptions) -> Self {
        match provider.create_surface(options) {
            Ok(surface) => Self::Ready(surface),
            Err(e) => {
                log::warn!("Map surface '{}' unavailable: {}", options.surface_id, e);
                Self::Blocked {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, Self::Blocked { .. })
    }

    pub fn surface(&self) -> Option<Arc<dyn MapSurface>> {
        match self {
            Self::Ready(surface) => Some(surface.clone()),
            Self::Blocked { .. } => None,
        }
    }
}

impl std::fmt::Debug for SurfaceInit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready(surface) => f
                .debug_tuple("Ready")
                .field(&surface.surface_id())
                .finish(),
            Self::Blocked { reason } => f.debug_struct("Blocked").field("reason", reason).finish(),
        }
    }
}

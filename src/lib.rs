//! # listing-map
//!
//! Coordination core for map-driven property search.
//!
//! A viewport fetch scheduler turns bursts of pan/zoom/filter events into a
//! small number of ordered network requests, a viewport cache holds the single
//! property set both the list and the map read from, and a marker reconciler
//! keeps map markers in step with that set without tearing them down on
//! every change. The filter coordinator ties these together and switches
//! between paginated city browsing and viewport-driven map search.

pub mod cache;
pub mod coordinator;
pub mod core;
pub mod fetch;
pub mod layers;
pub mod prelude;
pub mod runtime;
pub mod traits;
pub use crate::core::constants;

// Re-export public API
pub use crate::core::{
    bounds::ViewportBounds,
    config::{ClientConfig, CoordinatorConfig, SchedulerConfig, SchedulerProfile},
    geo::LatLng,
    property::{PropertyRecord, PropertyTypeFilter},
};

pub use fetch::{
    client::{HttpPropertyFetcher, ProjectsPage},
    request::{FetchRequest, FetchTarget, RequestId, ScheduleOptions},
    scheduler::ViewportFetchScheduler,
};

pub use cache::viewport::{CacheSnapshot, PropertyViewportCache};

pub use layers::{
    marker::{MarkerEvent, MarkerHandle, MarkerSpec, MarkerState, MarkerStyle},
    reconciler::{MarkerReconciler, ReconcileReport, ReconcilerUpdate, SharedReconciler},
};

pub use coordinator::{
    navigation::{ListingMode, NavigationState},
    FilterCoordinator,
};

pub use traits::{
    FetchEvents, ListingsObserver, MapProvider, MapSurface, PropertyFetcher, SurfaceInit,
    SurfaceOptions,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid bounds: {0}")]
    InvalidBounds(String),

    #[error("Invalid navigation state: {0}")]
    InvalidNavigation(String),

    #[error("Map provider error: {0}")]
    Provider(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Installs `env_logger` as the `log` backend. Safe to call more than once.
#[cfg(feature = "debug")]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .is_test(cfg!(test))
        .try_init();
}

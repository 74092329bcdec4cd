//! Prelude module for common listing-map types and traits
//!
//! This module re-exports the most commonly used types, traits, and functions
//! for easy importing with `use listing_map::prelude::*;`

pub use crate::core::{
    bounds::ViewportBounds,
    config::{ClientConfig, CoordinatorConfig, SchedulerConfig, SchedulerProfile},
    geo::LatLng,
    property::{PropertyRecord, PropertyTypeFilter},
};

pub use crate::fetch::{
    client::HttpPropertyFetcher,
    request::{FetchRequest, FetchTarget, RequestId, ScheduleOptions},
    scheduler::ViewportFetchScheduler,
};

pub use crate::cache::viewport::{CacheSnapshot, PropertyViewportCache};

pub use crate::layers::{
    marker::{MarkerEvent, MarkerHandle, MarkerSpec, MarkerState, MarkerStyle},
    reconciler::{MarkerReconciler, ReconcileReport, ReconcilerUpdate, SharedReconciler},
};

pub use crate::coordinator::{
    navigation::{ListingMode, NavigationState},
    FilterCoordinator,
};

pub use crate::traits::{
    FetchEvents, ListingsObserver, MapProvider, MapSurface, PropertyFetcher, SurfaceInit,
    SurfaceOptions,
};

pub use crate::runtime::{spawn, AsyncHandle};

pub use crate::{Error, Result};

pub use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

pub use fxhash::{FxHashMap as HashMap, FxHashSet as HashSet};

pub use futures::Future;

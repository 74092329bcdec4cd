use crate::core::bounds::ViewportBounds;
use crate::core::constants::DEFAULT_MAP_PER_PAGE;
use crate::core::property::PropertyTypeFilter;
use serde::{Deserialize, Serialize};

/// Identifier of an issued fetch. Strictly increasing per scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub u64);

impl RequestId {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a fetch asks the backend for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FetchTarget {
    /// Everything inside a viewport
    Bounds { bounds: ViewportBounds, per_page: u32 },
    /// One page of a city's listings
    City {
        city_key: String,
        page: u32,
        per_page: u32,
    },
}

impl FetchTarget {
    pub fn bounds(&self) -> Option<&ViewportBounds> {
        match self {
            Self::Bounds { bounds, .. } => Some(bounds),
            Self::City { .. } => None,
        }
    }
}

impl From<ViewportBounds> for FetchTarget {
    fn from(bounds: ViewportBounds) -> Self {
        Self::Bounds {
            bounds,
            per_page: DEFAULT_MAP_PER_PAGE,
        }
    }
}

impl std::fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bounds { bounds, .. } => write!(f, "bounds {bounds}"),
            Self::City { city_key, page, .. } => write!(f, "city '{city_key}' page {page}"),
        }
    }
}

/// A fetch the scheduler has issued
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub target: FetchTarget,
    pub filter: PropertyTypeFilter,
    pub request_id: RequestId,
    pub timestamp: tokio::time::Instant,
}

impl FetchRequest {
    /// Whether this request asks for the same data as `target` + `filter`.
    /// The filter is part of the identity: equal bounds with different
    /// filters are different requests.
    pub fn same_query(&self, target: &FetchTarget, filter: PropertyTypeFilter) -> bool {
        self.filter == filter && &self.target == target
    }
}

/// Per-call scheduling options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleOptions {
    /// Skip the debounce window and fetch right away
    pub immediate: bool,
}

impl ScheduleOptions {
    pub fn immediate() -> Self {
        Self { immediate: true }
    }

    pub fn debounced() -> Self {
        Self { immediate: false }
    }
}

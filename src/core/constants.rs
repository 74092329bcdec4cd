//! Core constants for listings fetching and marker presentation.
//! Keeping them in a single place makes it easier to tweak crate-wide magic numbers.

/// Quiet period after the last viewport change before a fetch is issued.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Upper bound on how long continuous input can postpone a fetch.
pub const DEFAULT_THROTTLE_MS: u64 = 800;

/// Listings endpoint, relative to the API base URL.
pub const PROJECTS_API_PATH: &str = "/api/v1/projects/";

/// Page size used for paginated city listings.
pub const DEFAULT_CITY_PER_PAGE: u32 = 20;

/// Page size used for viewport (map) listings.
pub const DEFAULT_MAP_PER_PAGE: u32 = 100;

/// Default HTTP timeout for listings requests.
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

/// Marker icon size in pixels.
pub const MARKER_ICON_SIZE: (u32, u32) = (28, 40);

/// Marker icon size for the selected property.
pub const MARKER_ICON_SIZE_SELECTED: (u32, u32) = (38, 54);

/// Z-index offset that keeps the selected marker above its neighbours.
pub const SELECTED_MARKER_Z_INDEX: i32 = 1000;

/// Z-index offset for a hovered marker.
pub const HOVERED_MARKER_Z_INDEX: i32 = 500;

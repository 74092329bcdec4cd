pub mod viewport;

pub use viewport::{CacheSnapshot, PropertyViewportCache};

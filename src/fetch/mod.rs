pub mod client;
pub mod request;
pub mod scheduler;

// Re-exports for convenience
pub use client::{HttpPropertyFetcher, ProjectsPage};
pub use request::{FetchRequest, FetchTarget, RequestId, ScheduleOptions};
pub use scheduler::ViewportFetchScheduler;

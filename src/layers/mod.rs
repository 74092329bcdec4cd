pub mod marker;
pub mod reconciler;

pub use marker::{MarkerEmphasis, MarkerEvent, MarkerHandle, MarkerSpec, MarkerState, MarkerStyle};
pub use reconciler::{MarkerReconciler, ReconcileReport, ReconcilerUpdate, SharedReconciler};

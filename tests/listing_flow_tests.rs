mod common;

use common::*;
use listing_map::{
    CoordinatorConfig, FilterCoordinator, ListingMode, MapSurface, MarkerReconciler, NavigationState,
    PropertyTypeFilter, SchedulerConfig, SharedReconciler, SurfaceInit, SurfaceOptions,
};
use std::sync::Arc;
use std::time::Duration;

/// End-to-end tests running the coordinator, cache and reconciler together
/// against a scripted backend and a fake map surface
#[cfg(test)]
mod listing_flow_tests {
    use super::*;

    struct Harness {
        coordinator: FilterCoordinator,
        fetcher: Arc<MockFetcher>,
        surface: Arc<FakeSurface>,
        reconciler: SharedReconciler,
        observer: Arc<RecordingObserver>,
    }

    fn harness(fetcher: Arc<MockFetcher>, refetch_on_filter_change: bool) -> Harness {
        let config = CoordinatorConfig {
            refetch_on_filter_change,
            ..CoordinatorConfig::default()
        };
        let coordinator = FilterCoordinator::new(config, fetcher.clone()).unwrap();

        let surface = FakeSurface::new("desktop");
        let reconciler = SharedReconciler::new(MarkerReconciler::new(vec![surface.clone()]));
        let observer = Arc::new(RecordingObserver::default());

        coordinator.attach_surface(surface.as_ref());
        coordinator.add_observer(Arc::new(reconciler.clone()));
        coordinator.add_observer(observer.clone());

        Harness {
            coordinator,
            fetcher,
            surface,
            reconciler,
            observer,
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sofia_bounds_then_houses_filter() {
        println!("🧪 [TEST] Sofia viewport, then client-side houses filter");
        let h = harness(MockFetcher::new(sofia_listings()), false);

        h.coordinator.mount(NavigationState::map(sofia()));
        settle().await;

        assert_eq!(ids(&h.coordinator.cache().get_all()), vec!["p1", "p2"]);
        assert_eq!(h.surface.marker_ids(), vec!["p1", "p2"]);

        let request = &h.fetcher.calls()[0];
        assert_eq!(request.target.bounds(), Some(&sofia()));
        assert_eq!(request.filter, PropertyTypeFilter::All);

        h.coordinator.set_property_type(PropertyTypeFilter::Houses);

        assert_eq!(ids(&h.coordinator.cache().filter_by_type(PropertyTypeFilter::Houses)), vec!["p2"]);
        assert_eq!(ids(&h.coordinator.visible_properties()), vec!["p2"]);
        assert_eq!(h.fetcher.call_count(), 1);
        assert_eq!(h.surface.marker_ids(), vec!["p2"]);
        println!("✅ [TEST] Filter applied without a new fetch");
    }

    #[tokio::test(start_paused = true)]
    async fn test_filter_change_refetches_when_configured() {
        let h = harness(MockFetcher::new(sofia_listings()), true);
        h.coordinator.mount(NavigationState::map(sofia()));
        settle().await;

        h.coordinator.set_property_type(PropertyTypeFilter::Houses);
        // Local view first, before the backend answers
        assert_eq!(h.observer.last_set(), Some(vec!["p2".to_string()]));
        settle().await;

        let calls = h.fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].filter, PropertyTypeFilter::Houses);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_early_response_never_overwrites_newer_data() {
        let fetcher = MockFetcher::scripted(
            Vec::new(),
            vec![
                Scripted::ok(500, vec![listing("old")]),
                Scripted::ok(50, vec![listing("new")]),
            ],
        );
        let h = harness(fetcher, false);

        h.coordinator.mount(NavigationState::map(sofia()));
        h.coordinator.search_this_area(sofia_shifted(0.05)).unwrap();
        settle().await;

        assert_eq!(ids(&h.coordinator.cache().get_all()), vec!["new"]);
        assert_eq!(h.surface.marker_ids(), vec!["new"]);
        assert_eq!(*h.observer.sets.lock().unwrap(), vec![vec!["new".to_string()]]);
        assert_eq!(*h.observer.loading.lock().unwrap(), vec![true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_viewport_clears_markers_without_error() {
        let fetcher = MockFetcher::scripted(
            Vec::new(),
            vec![Scripted::ok(20, sofia_listings()), Scripted::ok(20, Vec::new())],
        );
        let h = harness(fetcher, false);

        h.coordinator.mount(NavigationState::map(sofia()));
        settle().await;
        assert_eq!(h.surface.marker_ids().len(), 2);

        h.surface.settle(sofia_shifted(1.0));
        settle().await;

        assert!(h.coordinator.cache().is_empty());
        assert!(h.surface.marker_ids().is_empty());
        assert_eq!(h.surface.removed(), 2);
        assert_eq!(h.observer.last_set(), Some(Vec::new()));
        assert!(h.observer.errors.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panning_is_debounced_into_one_fetch() {
        let h = harness(MockFetcher::new(sofia_listings()), false);
        h.coordinator.mount(NavigationState::map(sofia()));
        settle().await;

        for step in 1..=5 {
            h.surface.settle(sofia_shifted(step as f64 * 0.01));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        settle().await;

        let calls = h.fetcher.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].target.bounds(), Some(&sofia_shifted(5.0 * 0.01)));
        assert_eq!(h.coordinator.navigation_state().bounds, Some(sofia_shifted(5.0 * 0.01)));
        // Unchanged ids keep their markers
        assert_eq!(h.surface.created(), 2);
        assert_eq!(h.surface.removed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_city_mode_ignores_viewport_changes() {
        let h = harness(MockFetcher::new(sofia_listings()), false);
        h.coordinator.mount(NavigationState::from_query("city=sofia&page=2").unwrap());

        h.surface.settle(sofia());
        settle().await;

        assert_eq!(h.fetcher.call_count(), 1);
        assert_eq!(
            h.coordinator.mode(),
            ListingMode::City {
                city_key: Some("sofia".into()),
                page: 2
            }
        );

        // "Search this area" is the only way into map mode
        h.coordinator.search_this_area(sofia()).unwrap();
        h.surface.settle(sofia_shifted(0.02));
        settle().await;
        assert!(h.coordinator.mode().is_map());
        assert_eq!(h.fetcher.call_count(), 3);
        assert!(h.coordinator.navigation_state().to_query().contains("search_by_map=true"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_surface_area_and_fit_results() {
        let h = harness(MockFetcher::new(sofia_listings()), false);
        h.coordinator.mount(NavigationState::city("sofia"));
        settle().await;

        // Nothing laid out yet
        assert!(h.coordinator.search_surface_area(h.surface.as_ref()).is_err());

        assert!(h.coordinator.fit_surface_to_results(h.surface.as_ref()).unwrap());
        let fitted = h.surface.viewport_bounds().unwrap();
        assert!(sofia_listings().iter().all(|p| fitted.contains(&p.position())));

        h.coordinator.search_surface_area(h.surface.as_ref()).unwrap();
        settle().await;
        assert_eq!(h.coordinator.mode(), ListingMode::Map { bounds: fitted });
        assert_eq!(h.fetcher.calls()[1].target.bounds(), Some(&fitted));
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_error_reaches_observer_and_keeps_cache() {
        let fetcher = MockFetcher::scripted(
            Vec::new(),
            vec![Scripted::ok(10, sofia_listings()), Scripted::error(10, 503)],
        );
        let h = harness(fetcher, false);

        h.coordinator.mount(NavigationState::map(sofia()));
        settle().await;
        h.coordinator.refresh();
        settle().await;

        let errors = h.observer.errors.lock().unwrap().clone();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("503"));
        assert_eq!(h.coordinator.cache().len(), 2);
        assert!(!h.coordinator.is_loading());
        assert_eq!(*h.observer.loading.lock().unwrap(), vec![true, false, true, false]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_stops_marker_updates() {
        let fetcher = MockFetcher::scripted(Vec::new(), vec![Scripted::ok(200, sofia_listings())]);
        let h = harness(fetcher, false);

        h.coordinator.mount(NavigationState::map(sofia()));
        h.coordinator.teardown();
        h.reconciler.lock().cleanup();
        settle().await;

        assert!(h.surface.marker_ids().is_empty());
        assert_eq!(h.surface.created(), 0);
        assert!(h.observer.sets.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_provider_degrades_to_list_only() {
        let init = SurfaceInit::initialize(
            &FakeProvider { blocked: true },
            &SurfaceOptions::new("desktop", sofia().center(), 12.0),
        );
        assert!(init.is_blocked());
        assert!(init.surface().is_none());

        let fetcher = MockFetcher::new(sofia_listings());
        let coordinator = FilterCoordinator::new(CoordinatorConfig::default(), fetcher).unwrap();
        let reconciler = SharedReconciler::new(MarkerReconciler::new(init.surface().into_iter().collect()));
        coordinator.add_observer(Arc::new(reconciler.clone()));

        coordinator.mount(NavigationState::map(sofia()));
        settle().await;

        assert_eq!(coordinator.visible_properties().len(), 2);
        assert_eq!(reconciler.lock().properties().len(), 2);
        assert!(reconciler.lock().surface_ids().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_scheduler_timings() {
        let fetcher = MockFetcher::new(sofia_listings());
        let config = CoordinatorConfig {
            scheduler: SchedulerConfig::from_json(r#"{ "debounce_ms": 100, "throttle_ms": 250 }"#).unwrap(),
            ..CoordinatorConfig::default()
        };
        let coordinator = FilterCoordinator::new(config, fetcher.clone()).unwrap();
        coordinator.mount(NavigationState::map(sofia()));
        tokio::time::sleep(Duration::from_millis(10)).await;

        coordinator.on_viewport_idle(sofia_shifted(0.01));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(fetcher.call_count(), 2);

        assert!(FilterCoordinator::new(
            CoordinatorConfig {
                scheduler: SchedulerConfig {
                    debounce_ms: 500,
                    throttle_ms: 100,
                    skip_duplicates: true,
                },
                ..CoordinatorConfig::default()
            },
            fetcher,
        )
        .is_err());
    }
}

use async_trait::async_trait;
use listing_map::{
    traits::{IdleListener, MarkerListener},
    CoordinatorConfig, FetchRequest, FilterCoordinator, LatLng, ListingsObserver, MapSurface,
    MarkerHandle, MarkerReconciler, MarkerSpec, MarkerStyle, NavigationState, PropertyFetcher,
    PropertyRecord, PropertyTypeFilter, SharedReconciler, ViewportBounds,
};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

/// Backend stand-in: a handful of Sofia listings, filtered by bounds
struct DemoBackend {
    listings: Vec<PropertyRecord>,
}

#[async_trait]
impl PropertyFetcher for DemoBackend {
    async fn fetch(&self, request: &FetchRequest) -> listing_map::Result<Vec<PropertyRecord>> {
        tokio::time::sleep(Duration::from_millis(120)).await;
        Ok(self
            .listings
            .iter()
            .filter(|p| match request.target.bounds() {
                Some(bounds) => bounds.contains(&p.position()),
                None => true,
            })
            .cloned()
            .collect())
    }
}

/// Map surface that prints marker operations instead of drawing them
struct ConsoleSurface {
    next: AtomicU64,
    idle: Mutex<Vec<IdleListener>>,
}

impl ConsoleSurface {
    fn pan_to(&self, bounds: ViewportBounds) {
        println!("   🧭 Viewport settled on {}", bounds);
        let listeners = self.idle.lock().map(|l| l.clone()).unwrap_or_default();
        for listener in listeners {
            listener(bounds);
        }
    }
}

impl MapSurface for ConsoleSurface {
    fn surface_id(&self) -> &str {
        "console"
    }

    fn create_marker(&self, spec: &MarkerSpec, _listener: MarkerListener) -> listing_map::Result<MarkerHandle> {
        let handle = MarkerHandle(self.next.fetch_add(1, Ordering::SeqCst));
        println!(
            "   📍 + {} at {:.4}, {:.4}",
            spec.property_id, spec.position.lat, spec.position.lng
        );
        Ok(handle)
    }

    fn set_marker_style(&self, handle: MarkerHandle, style: &MarkerStyle) -> listing_map::Result<()> {
        println!("   🎨 marker {} -> {:?}", handle.0, style.emphasis);
        Ok(())
    }

    fn set_marker_position(&self, handle: MarkerHandle, position: LatLng) -> listing_map::Result<()> {
        println!("   ↔️ marker {} -> {:.4}, {:.4}", handle.0, position.lat, position.lng);
        Ok(())
    }

    fn remove_marker(&self, handle: MarkerHandle) -> listing_map::Result<()> {
        println!("   🗑️ - marker {}", handle.0);
        Ok(())
    }

    fn viewport_bounds(&self) -> Option<ViewportBounds> {
        None
    }

    fn fit_bounds(&self, _bounds: &ViewportBounds) -> listing_map::Result<()> {
        Ok(())
    }

    fn on_idle(&self, listener: IdleListener) {
        if let Ok(mut idle) = self.idle.lock() {
            idle.push(listener);
        }
    }
}

struct ListPrinter;

impl ListingsObserver for ListPrinter {
    fn on_properties_changed(&self, properties: &[PropertyRecord]) {
        let ids: Vec<&str> = properties.iter().map(|p| p.id.as_str()).collect();
        println!("   📋 List shows {} properties: {:?}", properties.len(), ids);
    }

    fn on_loading_change(&self, is_loading: bool) {
        println!("   ⏳ loading: {}", is_loading);
    }
}

/// Drives the listings core without any UI
#[tokio::main]
async fn main() -> listing_map::Result<()> {
    #[cfg(feature = "debug")]
    listing_map::init_logging();

    println!("🗺️ listing-map headless example");
    println!("===============================");

    let backend = Arc::new(DemoBackend {
        listings: vec![
            PropertyRecord::new("p1", 42.6977, 23.3219, "Apartment Buildings"),
            PropertyRecord::new("p2", 42.6650, 23.2800, "Residential Houses"),
            PropertyRecord::new("p3", 42.7100, 23.4000, "Apartment Buildings"),
            PropertyRecord::new("p4", 42.1354, 24.7453, "Residential Houses"),
        ],
    });

    let surface = Arc::new(ConsoleSurface {
        next: AtomicU64::new(1),
        idle: Mutex::new(Vec::new()),
    });
    let reconciler = SharedReconciler::new(
        MarkerReconciler::new(vec![surface.clone()])
            .on_property_select(|id| println!("   👆 selected {:?}", id)),
    );

    let coordinator = FilterCoordinator::new(CoordinatorConfig::default(), backend)?;
    coordinator.attach_surface(surface.as_ref());
    coordinator.add_observer(Arc::new(reconciler.clone()));
    coordinator.add_observer(Arc::new(ListPrinter));

    let sofia = ViewportBounds::new(42.60, 23.22, 42.80, 23.42)?;
    let initial = NavigationState::from_query(&NavigationState::map(sofia).to_query())?;
    println!("\n🚀 Mounting with ?{}", initial.to_query());
    coordinator.mount(initial);
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\n🖐️ Panning east in small steps:");
    for step in 1..=4 {
        let shifted = ViewportBounds::new(42.60, 23.22 + step as f64 * 0.02, 42.80, 23.42 + step as f64 * 0.02)?;
        surface.pan_to(shifted);
        tokio::time::sleep(Duration::from_millis(60)).await;
    }
    tokio::time::sleep(Duration::from_millis(800)).await;

    println!("\n🏠 Houses only:");
    coordinator.set_property_type(PropertyTypeFilter::Houses);
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\n✨ Hovering and selecting:");
    reconciler.lock().set_interaction(Some("p2".into()), None);

    println!("\n🏙️ Back to city browsing (Plovdiv):");
    coordinator.select_city(Some("plovdiv".into()));
    tokio::time::sleep(Duration::from_millis(500)).await;

    println!("\n📊 Final state: ?{}", coordinator.navigation_state().to_query());
    coordinator.teardown();
    reconciler.lock().cleanup();
    println!("✅ Done");
    Ok(())
}

//! Incremental marker reconciliation across one or more map surfaces
//!
//! Markers are keyed by property id per surface. Updates diff the new
//! property set against what is on the map: vanished properties lose their
//! marker, new ones gain one, and everything else is left in place. Hover and
//! selection only restyle existing markers.

use crate::core::{geo::LatLng, property::PropertyRecord};
use crate::layers::marker::{MarkerEvent, MarkerHandle, MarkerSpec, MarkerState, MarkerStyle};
use crate::prelude::{Arc, HashMap, HashSet, Mutex};
use crate::traits::{ListingsObserver, MapSurface, MarkerListener};
use std::sync::{MutexGuard, PoisonError};

/// Callback receiving a property id, or `None` to clear
pub type PropertyCallback = Arc<dyn Fn(Option<String>) + Send + Sync>;

/// Counts of provider operations performed by one reconciler call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub created: usize,
    pub removed: usize,
    pub restyled: usize,
    pub moved: usize,
    pub failed: usize,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        *self == Self::default()
    }
}

impl std::ops::AddAssign for ReconcileReport {
    fn add_assign(&mut self, other: Self) {
        self.created += other.created;
        self.removed += other.removed;
        self.restyled += other.restyled;
        self.moved += other.moved;
        self.failed += other.failed;
    }
}

/// Partial reconfiguration; `None` fields are left as they are
#[derive(Default)]
pub struct ReconcilerUpdate {
    pub maps: Option<Vec<Arc<dyn MapSurface>>>,
    pub properties: Option<Vec<PropertyRecord>>,
    pub selected_property_id: Option<Option<String>>,
    pub hovered_property_id: Option<Option<String>>,
}

#[derive(Debug, Clone)]
struct MarkerEntry {
    handle: MarkerHandle,
    position: LatLng,
    style: MarkerStyle,
}

#[derive(Default)]
struct Callbacks {
    on_select: Mutex<Option<PropertyCallback>>,
    on_hover: Mutex<Option<PropertyCallback>>,
}

impl Callbacks {
    fn get(slot: &Mutex<Option<PropertyCallback>>) -> Option<PropertyCallback> {
        slot.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(slot: &Mutex<Option<PropertyCallback>>, callback: Option<PropertyCallback>) {
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = callback;
    }

    fn route(&self, event: MarkerEvent) {
        match event {
            MarkerEvent::Click(id) => {
                if let Some(cb) = Self::get(&self.on_select) {
                    cb(Some(id));
                }
            }
            MarkerEvent::MapClick => {
                if let Some(cb) = Self::get(&self.on_select) {
                    cb(None);
                }
            }
            MarkerEvent::HoverStart(id) => {
                if let Some(cb) = Self::get(&self.on_hover) {
                    cb(Some(id));
                }
            }
            MarkerEvent::HoverEnd(_) => {
                if let Some(cb) = Self::get(&self.on_hover) {
                    cb(None);
                }
            }
        }
    }
}

fn same_surface(a: &Arc<dyn MapSurface>, b: &Arc<dyn MapSurface>) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

/// Keeps one marker per current property on every active map surface
pub struct MarkerReconciler {
    surfaces: Vec<Arc<dyn MapSurface>>,
    /// surface id -> property id -> marker
    markers: HashMap<String, HashMap<String, MarkerEntry>>,
    properties: Vec<PropertyRecord>,
    selected: Option<String>,
    hovered: Option<String>,
    callbacks: Arc<Callbacks>,
}

impl MarkerReconciler {
    pub fn new(surfaces: Vec<Arc<dyn MapSurface>>) -> Self {
        Self {
            surfaces,
            markers: HashMap::default(),
            properties: Vec::new(),
            selected: None,
            hovered: None,
            callbacks: Arc::new(Callbacks::default()),
        }
    }

    pub fn on_property_select(self, callback: impl Fn(Option<String>) + Send + Sync + 'static) -> Self {
        Callbacks::set(&self.callbacks.on_select, Some(Arc::new(callback)));
        self
    }

    pub fn on_property_hover(self, callback: impl Fn(Option<String>) + Send + Sync + 'static) -> Self {
        Callbacks::set(&self.callbacks.on_hover, Some(Arc::new(callback)));
        self
    }

    pub fn set_callbacks(&mut self, on_select: Option<PropertyCallback>, on_hover: Option<PropertyCallback>) {
        Callbacks::set(&self.callbacks.on_select, on_select);
        Callbacks::set(&self.callbacks.on_hover, on_hover);
    }

    /// Route a provider event to the select/hover callbacks
    pub fn handle_marker_event(&self, event: MarkerEvent) {
        self.callbacks.route(event);
    }

    fn listener(&self) -> MarkerListener {
        let callbacks = self.callbacks.clone();
        Arc::new(move |event| callbacks.route(event))
    }

    fn style_for(&self, property_id: &str) -> MarkerStyle {
        MarkerState::resolve(property_id, self.selected.as_deref(), self.hovered.as_deref()).style()
    }

    pub fn marker_state(&self, property_id: &str) -> MarkerState {
        MarkerState::resolve(property_id, self.selected.as_deref(), self.hovered.as_deref())
    }

    pub fn selected_property_id(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered_property_id(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    pub fn properties(&self) -> &[PropertyRecord] {
        &self.properties
    }

    /// Number of markers on a surface
    pub fn marker_count(&self, surface_id: &str) -> usize {
        self.markers.get(surface_id).map_or(0, |m| m.len())
    }

    /// Property ids with a marker on a surface
    pub fn marker_ids(&self, surface_id: &str) -> HashSet<String> {
        self.markers
            .get(surface_id)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn surface_ids(&self) -> Vec<String> {
        self.surfaces.iter().map(|s| s.surface_id().to_string()).collect()
    }

    /// Full build of every surface from the current property set.
    ///
    /// With `is_initial`, markers already on a surface are torn down first.
    pub fn render_markers(&mut self, is_initial: bool) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        if is_initial {
            for surface in self.surfaces.clone() {
                report += self.clear_surface(&surface);
            }
        }
        let properties = std::mem::take(&mut self.properties);
        for surface in self.surfaces.clone() {
            report += self.sync_surface(&surface, &properties);
        }
        self.properties = properties;
        report += self.update_marker_states();
        log::debug!("Rendered markers (initial: {}): {:?}", is_initial, report);
        report
    }

    /// Diff `new_properties` against the rendered markers.
    ///
    /// Only vanished ids are removed and only new ids created; unchanged ids
    /// keep their marker object. An empty set removes every marker.
    pub fn update_properties(&mut self, new_properties: &[PropertyRecord]) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for surface in self.surfaces.clone() {
            report += self.sync_surface(&surface, new_properties);
        }
        self.properties = new_properties.to_vec();
        log::debug!(
            "Reconciled {} properties across {} surfaces: {:?}",
            self.properties.len(),
            self.surfaces.len(),
            report
        );
        report
    }

    /// Restyle markers whose selection/hover emphasis changed.
    /// Never creates or removes markers.
    pub fn update_marker_states(&mut self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for surface in &self.surfaces {
            let Some(markers) = self.markers.get(surface.surface_id()) else {
                continue;
            };
            let changes: Vec<(String, MarkerStyle)> = markers
                .iter()
                .filter_map(|(id, entry)| {
                    let desired = self.style_for(id);
                    (desired != entry.style).then(|| (id.clone(), desired))
                })
                .collect();

            for (id, style) in changes {
                let Some(entry) = self
                    .markers
                    .get_mut(surface.surface_id())
                    .and_then(|m| m.get_mut(&id))
                else {
                    continue;
                };
                match surface.set_marker_style(entry.handle, &style) {
                    Ok(()) => {
                        entry.style = style;
                        report.restyled += 1;
                    }
                    Err(e) => {
                        log::warn!(
                            "Failed to restyle marker for {} on '{}': {}",
                            id,
                            surface.surface_id(),
                            e
                        );
                        report.failed += 1;
                    }
                }
            }
        }
        report
    }

    /// Apply a partial reconfiguration.
    ///
    /// Surfaces that stay mounted keep their markers; removed surfaces are
    /// cleared and newly added ones are built from the current property set.
    pub fn update_config(&mut self, update: ReconcilerUpdate) -> ReconcileReport {
        let mut report = ReconcileReport::default();

        if let Some(maps) = update.maps {
            for old in std::mem::take(&mut self.surfaces) {
                if !maps.iter().any(|s| same_surface(s, &old)) {
                    report += self.clear_surface(&old);
                }
            }
            self.surfaces = maps;
        }

        if let Some(selected) = update.selected_property_id {
            self.selected = selected;
        }
        if let Some(hovered) = update.hovered_property_id {
            self.hovered = hovered;
        }

        let properties = update
            .properties
            .unwrap_or_else(|| std::mem::take(&mut self.properties));
        report += self.update_properties(&properties);
        report += self.update_marker_states();
        report
    }

    /// Set selection/hover and restyle. Cheap path for pointer changes.
    pub fn set_interaction(&mut self, selected: Option<String>, hovered: Option<String>) -> ReconcileReport {
        self.selected = selected;
        self.hovered = hovered;
        self.update_marker_states()
    }

    /// Remove every marker and drop surfaces and callbacks. Idempotent.
    pub fn cleanup(&mut self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        for surface in std::mem::take(&mut self.surfaces) {
            report += self.clear_surface(&surface);
        }
        self.markers.clear();
        self.properties.clear();
        self.selected = None;
        self.hovered = None;
        self.set_callbacks(None, None);
        report
    }

    fn clear_surface(&mut self, surface: &Arc<dyn MapSurface>) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let Some(markers) = self.markers.remove(surface.surface_id()) else {
            return report;
        };
        for (id, entry) in markers {
            match surface.remove_marker(entry.handle) {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    log::warn!(
                        "Failed to remove marker for {} from '{}': {}",
                        id,
                        surface.surface_id(),
                        e
                    );
                    report.failed += 1;
                }
            }
        }
        report
    }

    fn sync_surface(
        &mut self,
        surface: &Arc<dyn MapSurface>,
        properties: &[PropertyRecord],
    ) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        let surface_id = surface.surface_id().to_string();
        let wanted: HashSet<&str> = properties.iter().map(|p| p.id.as_str()).collect();
        let listener = self.listener();
        let styles: Vec<MarkerStyle> = properties.iter().map(|p| self.style_for(&p.id)).collect();

        let markers = self.markers.entry(surface_id.clone()).or_default();

        let stale: Vec<String> = markers
            .keys()
            .filter(|id| !wanted.contains(id.as_str()))
            .cloned()
            .collect();
        for id in stale {
            if let Some(entry) = markers.remove(&id) {
                match surface.remove_marker(entry.handle) {
                    Ok(()) => report.removed += 1,
                    Err(e) => {
                        log::warn!("Failed to remove marker for {} from '{}': {}", id, surface_id, e);
                        report.failed += 1;
                    }
                }
            }
        }

        for (property, style) in properties.iter().zip(styles) {
            let position = property.position();
            if let Some(entry) = markers.get_mut(&property.id) {
                if entry.position != position {
                    match surface.set_marker_position(entry.handle, position) {
                        Ok(()) => {
                            entry.position = position;
                            report.moved += 1;
                        }
                        Err(e) => {
                            log::warn!("Failed to move marker for {} on '{}': {}", property.id, surface_id, e);
                            report.failed += 1;
                        }
                    }
                }
                continue;
            }

            let spec = MarkerSpec::from_property(property, style);
            match surface.create_marker(&spec, listener.clone()) {
                Ok(handle) => {
                    markers.insert(
                        property.id.clone(),
                        MarkerEntry {
                            handle,
                            position,
                            style,
                        },
                    );
                    report.created += 1;
                }
                Err(e) => {
                    log::warn!("Failed to create marker for {} on '{}': {}", property.id, surface_id, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

impl Default for MarkerReconciler {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// A reconciler shared between the fetch path and the UI
#[derive(Clone)]
pub struct SharedReconciler(Arc<Mutex<MarkerReconciler>>);

impl SharedReconciler {
    pub fn new(reconciler: MarkerReconciler) -> Self {
        Self(Arc::new(Mutex::new(reconciler)))
    }

    pub fn lock(&self) -> MutexGuard<'_, MarkerReconciler> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ListingsObserver for SharedReconciler {
    fn on_properties_changed(&self, properties: &[PropertyRecord]) {
        let mut reconciler = self.lock();
        reconciler.update_properties(properties);
        reconciler.update_marker_states();
    }
}

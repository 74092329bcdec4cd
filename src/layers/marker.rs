use crate::core::constants::{
    HOVERED_MARKER_Z_INDEX, MARKER_ICON_SIZE, MARKER_ICON_SIZE_SELECTED, SELECTED_MARKER_Z_INDEX,
};
use crate::core::{geo::LatLng, property::PropertyRecord};
use serde::{Deserialize, Serialize};

/// Opaque marker identifier handed out by a map surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MarkerHandle(pub u64);

/// Derived per-marker interaction state. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerState {
    pub property_id: String,
    pub is_selected: bool,
    pub is_hovered: bool,
}

impl MarkerState {
    pub fn new(property_id: impl Into<String>) -> Self {
        Self {
            property_id: property_id.into(),
            is_selected: false,
            is_hovered: false,
        }
    }

    /// State of `property_id` given the current selection and hover pointers
    pub fn resolve(property_id: &str, selected: Option<&str>, hovered: Option<&str>) -> Self {
        Self {
            property_id: property_id.to_string(),
            is_selected: selected == Some(property_id),
            is_hovered: hovered == Some(property_id),
        }
    }

    pub fn style(&self) -> MarkerStyle {
        MarkerStyle::for_state(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkerEmphasis {
    Normal,
    Hovered,
    Selected,
}

/// Visual emphasis of a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerStyle {
    pub emphasis: MarkerEmphasis,
    pub icon_size: (u32, u32),
    pub z_index: i32,
}

impl MarkerStyle {
    /// Selection wins over hover
    pub fn for_state(state: &MarkerState) -> Self {
        if state.is_selected {
            Self {
                emphasis: MarkerEmphasis::Selected,
                icon_size: MARKER_ICON_SIZE_SELECTED,
                z_index: SELECTED_MARKER_Z_INDEX,
            }
        } else if state.is_hovered {
            Self {
                emphasis: MarkerEmphasis::Hovered,
                icon_size: MARKER_ICON_SIZE,
                z_index: HOVERED_MARKER_Z_INDEX,
            }
        } else {
            Self::default()
        }
    }
}

impl Default for MarkerStyle {
    fn default() -> Self {
        Self {
            emphasis: MarkerEmphasis::Normal,
            icon_size: MARKER_ICON_SIZE,
            z_index: 0,
        }
    }
}

/// Everything a surface needs to place a marker
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub property_id: String,
    pub position: LatLng,
    pub style: MarkerStyle,
    pub title: Option<String>,
}

impl MarkerSpec {
    pub fn from_property(property: &PropertyRecord, style: MarkerStyle) -> Self {
        Self {
            property_id: property.id.clone(),
            position: property.position(),
            style,
            title: property
                .field("title")
                .and_then(|v| v.as_str())
                .map(str::to_string),
        }
    }
}

/// Interaction reported by a map surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkerEvent {
    Click(String),
    HoverStart(String),
    HoverEnd(String),
    /// Click on the map outside any marker
    MapClick,
}

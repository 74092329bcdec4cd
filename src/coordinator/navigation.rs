//! Navigation (URL query) state of the listings view and the mode it implies

use crate::core::bounds::ViewportBounds;
use crate::core::property::PropertyTypeFilter;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use url::form_urlencoded;

const BOUND_KEYS: [&str; 4] = ["sw_lat", "sw_lng", "ne_lat", "ne_lng"];

/// Which way listings are being browsed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ListingMode {
    /// Paginated listings, optionally narrowed to one city
    City { city_key: Option<String>, page: u32 },
    /// Viewport-driven search
    Map { bounds: ViewportBounds },
}

impl ListingMode {
    pub fn is_map(&self) -> bool {
        matches!(self, Self::Map { .. })
    }
}

/// Everything the listings view keeps in its query string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationState {
    pub city: Option<String>,
    pub page: u32,
    pub property_type: PropertyTypeFilter,
    pub bounds: Option<ViewportBounds>,
    pub search_by_map: bool,
}

impl Default for NavigationState {
    fn default() -> Self {
        Self {
            city: None,
            page: 1,
            property_type: PropertyTypeFilter::All,
            bounds: None,
            search_by_map: false,
        }
    }
}

impl NavigationState {
    pub fn city(city_key: impl Into<String>) -> Self {
        Self {
            city: Some(city_key.into()),
            ..Self::default()
        }
    }

    pub fn map(bounds: ViewportBounds) -> Self {
        Self {
            bounds: Some(bounds),
            search_by_map: true,
            ..Self::default()
        }
    }

    pub fn with_property_type(mut self, property_type: PropertyTypeFilter) -> Self {
        self.property_type = property_type;
        self
    }

    /// Map mode needs all four bounds and the explicit flag; anything else is
    /// city mode.
    pub fn mode(&self) -> ListingMode {
        match (self.search_by_map, self.bounds) {
            (true, Some(bounds)) => ListingMode::Map { bounds },
            _ => ListingMode::City {
                city_key: self.city.clone(),
                page: self.page,
            },
        }
    }

    /// Parse a query string such as `city=sofia&page=2&type=houses`.
    ///
    /// A leading `?` is accepted and unknown keys are ignored. Bounds are
    /// only taken when all four coordinates are present.
    pub fn from_query(query: &str) -> Result<Self> {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut state = Self::default();
        let mut corners: [Option<f64>; 4] = [None; 4];

        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match &*key {
                "city" => {
                    let value = value.trim();
                    state.city = (!value.is_empty()).then(|| value.to_string());
                }
                "page" => {
                    state.page = value
                        .parse::<u32>()
                        .ok()
                        .filter(|p| *p >= 1)
                        .ok_or_else(|| Error::InvalidNavigation(format!("invalid page '{value}'")))?;
                }
                "type" => state.property_type = value.parse()?,
                "search_by_map" => state.search_by_map = matches!(&*value, "true" | "1"),
                key => {
                    if let Some(slot) = BOUND_KEYS.iter().position(|k| *k == key) {
                        let coordinate = value.parse::<f64>().map_err(|_| {
                            Error::InvalidNavigation(format!("invalid {key} '{value}'"))
                        })?;
                        corners[slot] = Some(coordinate);
                    }
                }
            }
        }

        if let [Some(sw_lat), Some(sw_lng), Some(ne_lat), Some(ne_lng)] = corners {
            state.bounds = Some(ViewportBounds::new(sw_lat, sw_lng, ne_lat, ne_lng)?);
        } else if corners.iter().any(Option::is_some) {
            log::debug!("Ignoring partial bounds in navigation query '{}'", query);
        }

        Ok(state)
    }

    /// Serialise to a query string; default values are omitted
    pub fn to_query(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if let Some(city) = &self.city {
            query.append_pair("city", city);
        }
        if self.page > 1 {
            query.append_pair("page", &self.page.to_string());
        }
        if let Some(property_type) = self.property_type.as_param() {
            query.append_pair("type", property_type);
        }
        if let Some(bounds) = &self.bounds {
            for (key, value) in bounds.to_query_pairs() {
                query.append_pair(key, &value);
            }
        }
        if self.search_by_map {
            query.append_pair("search_by_map", "true");
        }
        query.finish()
    }
}

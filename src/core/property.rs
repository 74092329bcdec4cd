//! Property listing records and the property-type filter applied to them.

use crate::core::geo::LatLng;
use crate::Error;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User-facing property type filter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropertyTypeFilter {
    #[default]
    All,
    Apartments,
    Houses,
}

impl PropertyTypeFilter {
    /// Value sent as `project_type`; `None` means no server-side filtering
    pub fn as_param(&self) -> Option<&'static str> {
        match self {
            Self::All => None,
            Self::Apartments => Some("apartments"),
            Self::Houses => Some("houses"),
        }
    }

    /// Whether a record's free-form type label falls under this filter.
    ///
    /// Labels come from the backend as display strings such as
    /// "Apartment Buildings" or "Residential Houses".
    pub fn matches(&self, property_type: &str) -> bool {
        let label = property_type.to_ascii_lowercase();
        match self {
            Self::All => true,
            Self::Apartments => label.contains("apartment"),
            Self::Houses => label.contains("house"),
        }
    }
}

impl std::fmt::Display for PropertyTypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Apartments => write!(f, "apartments"),
            Self::Houses => write!(f, "houses"),
        }
    }
}

impl std::str::FromStr for PropertyTypeFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "apartments" | "apartment" => Ok(Self::Apartments),
            "houses" | "house" => Ok(Self::Houses),
            other => Err(Error::InvalidNavigation(format!(
                "unknown property type '{other}'"
            ))),
        }
    }
}

/// A listing as returned by the backend.
///
/// Only `id`, the coordinates and the type label are interpreted here; every
/// other field (title, price, images, ...) is carried untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPropertyRecord")]
pub struct PropertyRecord {
    pub id: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(rename = "type")]
    pub property_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PropertyRecord {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64, property_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            lat,
            lng,
            property_type: property_type.into(),
            extra: Map::new(),
        }
    }

    /// Attach an opaque field
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn position(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Looks up an opaque field by name
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.extra.get(key)
    }
}

/// Wire shape accepted for a record before normalisation
#[derive(Deserialize)]
struct RawPropertyRecord {
    id: Value,
    #[serde(default)]
    lat: Option<Value>,
    #[serde(default)]
    latitude: Option<Value>,
    #[serde(default)]
    lng: Option<Value>,
    #[serde(default)]
    longitude: Option<Value>,
    #[serde(default, rename = "type")]
    property_type: Option<String>,
    #[serde(default)]
    project_type: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl TryFrom<RawPropertyRecord> for PropertyRecord {
    type Error = String;

    fn try_from(raw: RawPropertyRecord) -> Result<Self, Self::Error> {
        let id = match raw.id {
            Value::String(s) if !s.is_empty() => s,
            Value::Number(n) => n.to_string(),
            other => return Err(format!("invalid property id: {other}")),
        };
        let lat = coordinate(raw.lat.or(raw.latitude))
            .ok_or_else(|| format!("property {id} has no usable latitude"))?;
        let lng = coordinate(raw.lng.or(raw.longitude))
            .ok_or_else(|| format!("property {id} has no usable longitude"))?;
        if !LatLng::new(lat, lng).is_valid() {
            return Err(format!("property {id} is out of range at ({lat}, {lng})"));
        }
        let property_type = raw.property_type.or(raw.project_type).unwrap_or_default();

        Ok(Self {
            id,
            lat,
            lng,
            property_type,
            extra: raw.extra,
        })
    }
}

/// Accepts JSON numbers and numeric strings
fn coordinate(value: Option<Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

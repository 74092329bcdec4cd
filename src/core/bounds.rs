use crate::core::geo::LatLng;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Rectangular geographic region spanned by a south-west and a north-east corner.
///
/// Longitude is not wrapped: the region is treated as a plain rectangle, which
/// holds for any viewport that does not cross the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportBounds {
    pub sw_lat: f64,
    pub sw_lng: f64,
    pub ne_lat: f64,
    pub ne_lng: f64,
}

impl ViewportBounds {
    /// Creates validated bounds from individual coordinates
    pub fn new(sw_lat: f64, sw_lng: f64, ne_lat: f64, ne_lng: f64) -> Result<Self> {
        let bounds = Self {
            sw_lat,
            sw_lng,
            ne_lat,
            ne_lng,
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// Checks that both corners are valid coordinates and that `sw_lat < ne_lat`
    pub fn validate(&self) -> Result<()> {
        let south_west = LatLng::new(self.sw_lat, self.sw_lng);
        let north_east = LatLng::new(self.ne_lat, self.ne_lng);
        if !south_west.is_valid() || !north_east.is_valid() {
            return Err(Error::InvalidBounds(format!(
                "coordinate out of range in {self}"
            )));
        }
        if self.sw_lat >= self.ne_lat {
            return Err(Error::InvalidBounds(format!(
                "south-west latitude {} must be below north-east latitude {}",
                self.sw_lat, self.ne_lat
            )));
        }
        Ok(())
    }

    /// Gets the center point of the bounds
    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.sw_lat + self.ne_lat) / 2.0,
            (self.sw_lng + self.ne_lng) / 2.0,
        )
    }

    /// Checks if the bounds contain a point (edges inclusive)
    pub fn contains(&self, point: &LatLng) -> bool {
        point.lat >= self.sw_lat
            && point.lat <= self.ne_lat
            && point.lng >= self.sw_lng
            && point.lng <= self.ne_lng
    }

    /// Smallest bounds containing every point, or `None` for an empty input
    /// or a degenerate (zero-height) result
    pub fn enclosing<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            sw_lat: first.lat,
            sw_lng: first.lng,
            ne_lat: first.lat,
            ne_lng: first.lng,
        };
        for point in iter {
            bounds.sw_lat = bounds.sw_lat.min(point.lat);
            bounds.sw_lng = bounds.sw_lng.min(point.lng);
            bounds.ne_lat = bounds.ne_lat.max(point.lat);
            bounds.ne_lng = bounds.ne_lng.max(point.lng);
        }
        bounds.validate().ok().map(|_| bounds)
    }

    /// Query parameters in the order the listings API expects them
    pub fn to_query_pairs(&self) -> [(&'static str, String); 4] {
        [
            ("sw_lat", self.sw_lat.to_string()),
            ("sw_lng", self.sw_lng.to_string()),
            ("ne_lat", self.ne_lat.to_string()),
            ("ne_lng", self.ne_lng.to_string()),
        ]
    }
}

impl std::fmt::Display for ViewportBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SW({:.6}, {:.6}) - NE({:.6}, {:.6})",
            self.sw_lat, self.sw_lng, self.ne_lat, self.ne_lng
        )
    }
}

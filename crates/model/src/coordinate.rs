use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::geo;

/// Two coordinates closer than this (in degrees, on both axes) are the same
/// location. Roughly ten metres.
pub const SAME_LOCATION_TOLERANCE_DEG: f64 = 1e-4;

/// A WGS84 position. Wire formats use `[longitude, latitude]`; use
/// [`Coordinate::from_lon_lat`] and [`Coordinate::to_lon_lat`] at the boundary.
///
/// There is deliberately no `PartialEq`: compare with [`Coordinate::same_location`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn from_lon_lat(pair: [f64; 2]) -> Self {
        Self::new(pair[1], pair[0])
    }

    /// Parses a wire pair, rejecting anything that is not exactly two finite
    /// numbers inside the WGS84 range.
    pub fn try_from_lon_lat(values: &[f64]) -> Option<Self> {
        match values {
            [longitude, latitude] => {
                let coordinate = Self::new(*latitude, *longitude);
                coordinate.is_valid().then_some(coordinate)
            }
            _ => None,
        }
    }

    pub fn to_lon_lat(&self) -> [f64; 2] {
        [self.longitude, self.latitude]
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    pub fn same_location(&self, other: &Coordinate) -> bool {
        self.same_location_within(other, SAME_LOCATION_TOLERANCE_DEG)
    }

    pub fn same_location_within(&self, other: &Coordinate, tolerance_deg: f64) -> bool {
        (self.latitude - other.latitude).abs() <= tolerance_deg
            && (self.longitude - other.longitude).abs() <= tolerance_deg
    }

    /// Great-circle distance in kilometres.
    pub fn distance_km(&self, other: &Coordinate) -> f64 {
        geo::haversine_distance(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        )
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub min_longitude: f64,
    pub max_latitude: f64,
    pub max_longitude: f64,
}

impl BoundingBox {
    pub fn around(coordinate: &Coordinate) -> Self {
        Self {
            min_latitude: coordinate.latitude,
            min_longitude: coordinate.longitude,
            max_latitude: coordinate.latitude,
            max_longitude: coordinate.longitude,
        }
    }

    /// Smallest box containing every point, `None` for an empty iterator.
    pub fn from_points<'a, I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self::around(first);
        for point in points {
            bounds.include(point);
        }
        Some(bounds)
    }

    pub fn include(&mut self, coordinate: &Coordinate) {
        self.min_latitude = self.min_latitude.min(coordinate.latitude);
        self.min_longitude = self.min_longitude.min(coordinate.longitude);
        self.max_latitude = self.max_latitude.max(coordinate.latitude);
        self.max_longitude = self.max_longitude.max(coordinate.longitude);
    }

    /// Radius box around a single point, widened in longitude by latitude.
    pub fn around_radius(center: &Coordinate, radius_km: f64) -> Self {
        let ((min_latitude, min_longitude), (max_latitude, max_longitude)) =
            geo::calculate_bounding_box(center.latitude, center.longitude, radius_km);
        Self {
            min_latitude,
            min_longitude,
            max_latitude,
            max_longitude,
        }
    }

    pub fn expanded_by_degrees(&self, degrees: f64) -> Self {
        Self {
            min_latitude: self.min_latitude - degrees,
            min_longitude: self.min_longitude - degrees,
            max_latitude: self.max_latitude + degrees,
            max_longitude: self.max_longitude + degrees,
        }
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (self.min_latitude..=self.max_latitude).contains(&coordinate.latitude)
            && (self.min_longitude..=self.max_longitude).contains(&coordinate.longitude)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min_latitude + self.max_latitude) / 2.0,
            (self.min_longitude + self.max_longitude) / 2.0,
        )
    }

    pub fn latitude_span(&self) -> f64 {
        self.max_latitude - self.min_latitude
    }

    pub fn longitude_span(&self) -> f64 {
        self.max_longitude - self.min_longitude
    }
}

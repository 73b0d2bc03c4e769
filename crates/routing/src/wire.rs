//! Response bodies of the geocoding and directions endpoints.
//!
//! All wire coordinates are `[longitude, latitude]`; the swap to the
//! internal order happens here and nowhere else.

use model::{coordinate::Coordinate, route::RoutePolyline};
use serde::{Deserialize, Serialize};

use crate::ApiError;

pub const DIRECTIONS_OK: &str = "Ok";

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeResponse {
    #[serde(default)]
    pub features: Vec<GeocodeFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeocodeFeature {
    pub center: Option<Vec<f64>>,
    pub geometry: Option<PointGeometry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PointGeometry {
    pub coordinates: Vec<f64>,
}

impl GeocodeFeature {
    fn coordinate(&self) -> Option<Coordinate> {
        self.center
            .as_deref()
            .or(self.geometry.as_ref().map(|g| g.coordinates.as_slice()))
            .and_then(Coordinate::try_from_lon_lat)
    }
}

/// Only the first (best ranked) result counts. A first result without a
/// usable position is treated as no result at all.
pub fn decode_geocode(body: &str) -> Result<Option<Coordinate>, ApiError> {
    let response: GeocodeResponse = serde_json::from_str(body)?;
    Ok(response
        .features
        .first()
        .and_then(GeocodeFeature::coordinate))
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsResponse {
    pub code: String,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DirectionsRoute {
    pub geometry: LineGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LineGeometry {
    pub coordinates: Vec<Vec<f64>>,
}

/// Never fails: a non-"Ok" code, a missing route or any malformed point
/// yields an empty polyline.
pub fn decode_directions(body: &str) -> RoutePolyline {
    let response: DirectionsResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(why) => {
            log::warn!("malformed directions response: {}", why);
            return RoutePolyline::empty();
        }
    };
    if response.code != DIRECTIONS_OK {
        log::info!("directions returned code {:?}", response.code);
        return RoutePolyline::empty();
    }
    let Some(route) = response.routes.first() else {
        return RoutePolyline::empty();
    };
    let points = route
        .geometry
        .coordinates
        .iter()
        .map(|pair| Coordinate::try_from_lon_lat(pair))
        .collect::<Option<Vec<_>>>();
    match points {
        Some(points) => RoutePolyline::new(points),
        None => {
            log::warn!("directions geometry contains a malformed point");
            RoutePolyline::empty()
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReverseGeocodeRequest {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReverseGeocodeResponse {
    #[serde(default)]
    pub results: Vec<AddressParts>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressParts {
    pub city: Option<String>,
    pub street: Option<String>,
    pub number: Option<String>,
    /// Generic place name, e.g. a point of interest or a region.
    pub name: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

impl AddressParts {
    /// `"{city}, {street} {number}"` when city and street are known,
    /// otherwise the generic place name, otherwise the city.
    pub fn display_name(&self) -> Option<String> {
        let city = non_blank(&self.city);
        let street = non_blank(&self.street);
        let number = non_blank(&self.number);
        match (city, street) {
            (Some(city), Some(street)) => Some(match number {
                Some(number) => format!("{city}, {street} {number}"),
                None => format!("{city}, {street}"),
            }),
            _ => non_blank(&self.name).or(city).map(str::to_owned),
        }
    }
}

pub fn decode_reverse_geocode(body: &str) -> Result<Option<AddressParts>, ApiError> {
    let response: ReverseGeocodeResponse = serde_json::from_str(body)?;
    Ok(response.results.into_iter().next())
}

//! Providers that answer without a network, used when no access token is
//! configured.

use std::collections::HashMap;

use async_trait::async_trait;
use model::{coordinate::Coordinate, route::RoutePolyline};

use crate::{
    provider::{DirectionsProvider, GeocodingProvider},
    ApiError,
};

/// Looks addresses up in a fixed table, ignoring case and surrounding
/// whitespace.
#[derive(Debug, Clone, Default)]
pub struct GazetteerGeocoder {
    places: HashMap<String, Coordinate>,
}

fn normalize(address: &str) -> String {
    address.trim().to_lowercase()
}

impl GazetteerGeocoder {
    pub fn new<I, S>(places: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinate)>,
        S: AsRef<str>,
    {
        Self {
            places: places
                .into_iter()
                .map(|(address, coordinate)| (normalize(address.as_ref()), coordinate))
                .collect(),
        }
    }

    /// Reads a JSON object mapping addresses to `{latitude, longitude}`.
    pub fn from_json(json: &str) -> Result<Self, ApiError> {
        let places: HashMap<String, Coordinate> = serde_json::from_str(json)?;
        Ok(Self::new(places))
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[async_trait]
impl GeocodingProvider for GazetteerGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ApiError> {
        Ok(self.places.get(&normalize(address)).copied())
    }
}

/// The direct segment between both points.
#[derive(Debug, Clone, Copy, Default)]
pub struct StraightLineDirections;

#[async_trait]
impl DirectionsProvider for StraightLineDirections {
    async fn directions(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<RoutePolyline, ApiError> {
        Ok(RoutePolyline::new(vec![from, to]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn gazetteer_ignores_case_and_whitespace() {
        let geocoder = GazetteerGeocoder::from_json(
            r#"{"Kiel, Holstenstraße 1": {"latitude": 54.32, "longitude": 10.13}}"#,
        )
        .unwrap();
        let found = geocoder
            .geocode("  kiel, holstenstraße 1 ")
            .await
            .unwrap()
            .unwrap();
        assert!(found.same_location(&Coordinate::new(54.32, 10.13)));
        assert!(geocoder.geocode("Lübeck").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn straight_line_connects_endpoints() {
        let from = Coordinate::new(54.32, 10.13);
        let to = Coordinate::new(53.87, 10.69);
        let route = StraightLineDirections.directions(from, to).await.unwrap();
        assert_eq!(route.len(), 2);
        assert!(route.first().unwrap().same_location(&from));
    }
}

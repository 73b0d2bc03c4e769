use async_trait::async_trait;
use model::{coordinate::Coordinate, route::RoutePolyline};

use crate::{wire::AddressParts, ApiError};

#[async_trait]
pub trait GeocodingProvider: Send + Sync {
    /// First match for a free-text address, `Ok(None)` if there is none.
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ApiError>;
}

#[async_trait]
pub trait ReverseGeocodingProvider: Send + Sync {
    async fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<AddressParts>, ApiError>;
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    /// Driving path between two points. An unroutable pair yields an empty
    /// polyline, not an error.
    async fn directions(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<RoutePolyline, ApiError>;
}

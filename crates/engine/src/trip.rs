use model::{coordinate::Coordinate, route::RoutePolyline, token::RequestToken};
use routing::geocoder::GeocodeKey;

use crate::snapshot::TripView;

/// One end of the primary trip.
#[derive(Debug, Clone)]
pub enum Place {
    Address(String),
    Coordinate(Coordinate),
}

impl Place {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self {
            Self::Coordinate(coordinate) => Some(*coordinate),
            Self::Address(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TripRequest {
    pub origin: Place,
    pub destination: Place,
}

impl TripRequest {
    pub fn new(origin: Place, destination: Place) -> Self {
        Self {
            origin,
            destination,
        }
    }
}

/// The trip currently shown, with whatever has been resolved for it.
#[derive(Debug, Clone)]
pub(crate) struct PrimaryTrip {
    pub request: TripRequest,
    pub generation: u64,
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub origin_label: Option<String>,
    pub polyline: Option<RoutePolyline>,
    pub fetch_token: Option<RequestToken>,
}

impl PrimaryTrip {
    pub fn new(request: TripRequest, generation: u64) -> Self {
        Self {
            origin: request.origin.coordinate(),
            destination: request.destination.coordinate(),
            request,
            generation,
            origin_label: None,
            polyline: None,
            fetch_token: None,
        }
    }

    /// The addresses still to be geocoded, keyed the way the cache keys them.
    pub fn unresolved(&self) -> Vec<(GeocodeKey, String)> {
        let mut pending = Vec::new();
        if let (None, Place::Address(address)) = (self.origin, &self.request.origin) {
            pending.push((GeocodeKey::TripOrigin, address.clone()));
        }
        if let (None, Place::Address(address)) = (self.destination, &self.request.destination) {
            pending.push((GeocodeKey::TripDestination, address.clone()));
        }
        pending
    }

    pub fn resolve(&mut self, key: &GeocodeKey, coordinate: Coordinate) {
        match key {
            GeocodeKey::TripOrigin => self.origin = Some(coordinate),
            GeocodeKey::TripDestination => self.destination = Some(coordinate),
            GeocodeKey::Pickup(_) | GeocodeKey::Delivery(_) => {}
        }
    }

    pub fn needs_route(&self) -> bool {
        self.polyline.is_none() && self.fetch_token.is_none()
    }

    pub fn view(&self) -> TripView {
        TripView {
            origin: self.origin,
            destination: self.destination,
            origin_label: self.origin_label.clone(),
            polyline: self.polyline.clone(),
        }
    }
}

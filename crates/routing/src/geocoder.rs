use std::{collections::HashMap, fmt, sync::Arc};

use model::{coordinate::Coordinate, shipment::ShipmentId, token::RequestToken};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::{provider::GeocodingProvider, requests::InFlightRegistry, ApiError};

pub const EVENT_CAPACITY: usize = 64;

/// Which address of which entity a coordinate belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GeocodeKey {
    Pickup(ShipmentId),
    Delivery(ShipmentId),
    TripOrigin,
    TripDestination,
}

impl GeocodeKey {
    pub fn shipment(&self) -> Option<&ShipmentId> {
        match self {
            Self::Pickup(id) | Self::Delivery(id) => Some(id),
            Self::TripOrigin | Self::TripDestination => None,
        }
    }
}

impl fmt::Display for GeocodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pickup(id) => write!(f, "pickup of {id}"),
            Self::Delivery(id) => write!(f, "delivery of {id}"),
            Self::TripOrigin => f.write_str("trip origin"),
            Self::TripDestination => f.write_str("trip destination"),
        }
    }
}

#[derive(Debug, Clone)]
enum CacheEntry {
    Located {
        address: String,
        coordinate: Coordinate,
    },
    /// Negative result, remembered until the address changes.
    Missing { address: String },
}

impl CacheEntry {
    fn address(&self) -> &str {
        match self {
            Self::Located { address, .. } | Self::Missing { address } => address,
        }
    }
}

#[derive(Debug, Clone)]
pub enum GeocodeEvent {
    Resolved {
        key: GeocodeKey,
        coordinate: Coordinate,
    },
}

/// Result of asking the cache before going to the network.
pub enum Lookup {
    /// Blank address, nothing to do.
    Skipped,
    Cached(Coordinate),
    KnownMissing,
    /// The same address is already being looked up for this key.
    InFlight,
    Request(GeocodeRequest),
}

/// A lookup that has been registered but not yet sent. Running it needs no
/// access to the cache, so it can be moved into a spawned task.
pub struct GeocodeRequest {
    key: GeocodeKey,
    address: String,
    token: RequestToken,
    cancel: CancellationToken,
    provider: Arc<dyn GeocodingProvider>,
}

impl GeocodeRequest {
    pub fn key(&self) -> &GeocodeKey {
        &self.key
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub async fn run(self) -> GeocodeResponse {
        let reply = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => GeocodeReply::Cancelled,
            result = self.provider.geocode(&self.address) => match result {
                Ok(Some(coordinate)) => GeocodeReply::Found(coordinate),
                Ok(None) => GeocodeReply::NotFound,
                Err(why) => GeocodeReply::Failed(why),
            },
        };
        GeocodeResponse {
            key: self.key,
            address: self.address,
            token: self.token,
            reply,
        }
    }
}

#[derive(Debug)]
pub enum GeocodeReply {
    Found(Coordinate),
    NotFound,
    Failed(ApiError),
    Cancelled,
}

#[derive(Debug)]
pub struct GeocodeResponse {
    pub key: GeocodeKey,
    pub address: String,
    pub token: RequestToken,
    pub reply: GeocodeReply,
}

/// What applying a response did to the cache.
#[derive(Debug)]
pub enum GeocodeOutcome {
    Resolved(Coordinate),
    NotFound,
    /// Transient failure, nothing cached. A later re-scan may retry.
    Failed(ApiError),
    /// Stale or cancelled, silently dropped.
    Discarded,
}

/// Memoizes address lookups per key with at most one lookup in flight per
/// key. Owned by a single task; responses are applied with [`Self::accept`]
/// on that task.
pub struct GeocoderCache {
    provider: Arc<dyn GeocodingProvider>,
    entries: HashMap<GeocodeKey, CacheEntry>,
    in_flight: InFlightRegistry<GeocodeKey, String>,
    events: broadcast::Sender<GeocodeEvent>,
}

impl GeocoderCache {
    pub fn new(provider: Arc<dyn GeocodingProvider>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self::with_events(provider, events)
    }

    /// Publishes resolutions on `events`, so listeners can subscribe before
    /// the cache is moved into its owning task.
    pub fn with_events(
        provider: Arc<dyn GeocodingProvider>,
        events: broadcast::Sender<GeocodeEvent>,
    ) -> Self {
        Self {
            provider,
            entries: HashMap::new(),
            in_flight: InFlightRegistry::new(),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GeocodeEvent> {
        self.events.subscribe()
    }

    pub fn coordinate(&self, key: &GeocodeKey) -> Option<Coordinate> {
        match self.entries.get(key) {
            Some(CacheEntry::Located { coordinate, .. }) => Some(*coordinate),
            _ => None,
        }
    }

    pub fn is_in_flight(&self, key: &GeocodeKey) -> bool {
        self.in_flight.is_in_flight(key)
    }

    pub fn begin(&mut self, key: GeocodeKey, address: &str) -> Lookup {
        let address = address.trim();
        if address.is_empty() {
            return Lookup::Skipped;
        }

        if let Some(entry) = self.entries.get(&key) {
            if entry.address() == address {
                return match entry {
                    CacheEntry::Located { coordinate, .. } => {
                        log::debug!("geocode cache hit for {}", key);
                        Lookup::Cached(*coordinate)
                    }
                    CacheEntry::Missing { .. } => Lookup::KnownMissing,
                };
            }
            log::debug!("address of {} changed, dropping cached result", key);
            self.entries.remove(&key);
        }

        if self.in_flight.payload(&key).map(String::as_str) == Some(address) {
            return Lookup::InFlight;
        }

        log::debug!("geocoding {} ({:?})", key, address);
        let (token, cancel) = self.in_flight.issue(key.clone(), address.to_owned());
        Lookup::Request(GeocodeRequest {
            key,
            address: address.to_owned(),
            token,
            cancel,
            provider: self.provider.clone(),
        })
    }

    pub fn accept(&mut self, response: GeocodeResponse) -> GeocodeOutcome {
        if !self.in_flight.complete(&response.key, response.token) {
            log::debug!(
                "discarding stale geocode {} for {}",
                response.token,
                response.key
            );
            return GeocodeOutcome::Discarded;
        }

        match response.reply {
            GeocodeReply::Found(coordinate) => {
                self.entries.insert(
                    response.key.clone(),
                    CacheEntry::Located {
                        address: response.address,
                        coordinate,
                    },
                );
                // nobody listening is fine
                let _ = self.events.send(GeocodeEvent::Resolved {
                    key: response.key,
                    coordinate,
                });
                GeocodeOutcome::Resolved(coordinate)
            }
            GeocodeReply::NotFound => {
                log::info!("no geocoding result for {}", response.key);
                self.remember_missing(response.key, response.address);
                GeocodeOutcome::NotFound
            }
            GeocodeReply::Failed(why) if why.is_transient() => {
                log::warn!("geocoding {} failed: {}", response.key, why);
                GeocodeOutcome::Failed(why)
            }
            GeocodeReply::Failed(why) => {
                log::info!("unusable geocoding response for {}: {}", response.key, why);
                self.remember_missing(response.key, response.address);
                GeocodeOutcome::NotFound
            }
            GeocodeReply::Cancelled => GeocodeOutcome::Discarded,
        }
    }

    fn remember_missing(&mut self, key: GeocodeKey, address: String) {
        self.entries.insert(key, CacheEntry::Missing { address });
    }

    /// Looks up `address` and waits for the answer. Cached coordinates are
    /// returned without a network call; a blank address returns `None`
    /// without one.
    pub async fn resolve(&mut self, address: &str, key: GeocodeKey) -> Option<Coordinate> {
        match self.begin(key, address) {
            Lookup::Cached(coordinate) => Some(coordinate),
            Lookup::Skipped | Lookup::KnownMissing | Lookup::InFlight => None,
            Lookup::Request(request) => {
                let response = request.run().await;
                match self.accept(response) {
                    GeocodeOutcome::Resolved(coordinate) => Some(coordinate),
                    _ => None,
                }
            }
        }
    }

    pub fn cancel(&mut self, key: &GeocodeKey) -> bool {
        self.in_flight.cancel(key)
    }

    /// Drops the cached result and any lookup in flight for `key`.
    pub fn forget(&mut self, key: &GeocodeKey) {
        self.in_flight.cancel(key);
        self.entries.remove(key);
    }

    pub fn cancel_all(&mut self) -> usize {
        self.in_flight.cancel_all()
    }
}

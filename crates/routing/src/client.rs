use std::env;

use async_trait::async_trait;
use model::{coordinate::Coordinate, route::RoutePolyline};
use serde::{Deserialize, Serialize};
use tokio::{
    sync::RwLock,
    time::{Duration, Instant},
};

use crate::{
    provider::{DirectionsProvider, GeocodingProvider, ReverseGeocodingProvider},
    wire::{self, AddressParts, ReverseGeocodeRequest},
    ApiError,
};

pub const MAPBOX_API_URL: &str = "https://api.mapbox.com";
pub const DEFAULT_PROFILE: &str = "driving";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapboxCredentials {
    pub access_token: String,
    pub base_url: String,
    /// Travel mode used in the directions path, e.g. `driving`.
    pub profile: String,
    pub rate_limit_per_minute: Option<u64>,
    pub proxy: Option<String>,
}

impl MapboxCredentials {
    pub fn new<S: Into<String>>(access_token: S) -> Self {
        Self {
            access_token: access_token.into(),
            base_url: MAPBOX_API_URL.to_owned(),
            profile: DEFAULT_PROFILE.to_owned(),
            rate_limit_per_minute: None,
            proxy: None,
        }
    }

    pub fn env() -> Result<Self, ApiError> {
        let access_token = env::var("MAPBOX_ACCESS_TOKEN")
            .map_err(|_| ApiError::MissingCredentials("MAPBOX_ACCESS_TOKEN"))?;
        let mut credentials = Self::new(access_token);
        if let Ok(base_url) = env::var("MAPBOX_BASE_URL") {
            credentials.base_url = base_url;
        }
        if let Ok(profile) = env::var("MAPBOX_PROFILE") {
            credentials.profile = profile;
        }
        credentials.rate_limit_per_minute = env::var("MAPBOX_RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|value| value.parse().ok());
        credentials.proxy = env::var("MAPBOX_PROXY").ok();
        Ok(credentials)
    }
}

struct RateLimitState {
    available_requests: u64,
    last_refill: Instant,
}

/// HTTP client for the geocoding, reverse geocoding and directions
/// endpoints. One instance is shared by every service of a screen.
pub struct MapboxClient {
    pub credentials: MapboxCredentials,
    http: reqwest::Client,
    state: RwLock<RateLimitState>,
}

impl MapboxClient {
    pub fn new(credentials: &MapboxCredentials) -> Result<Self, ApiError> {
        /* build the http client once, with optional proxy */
        let http = match &credentials.proxy {
            Some(proxy_url) => {
                log::info!("Using proxy '{proxy_url}' for map requests.");
                reqwest::Client::builder()
                    .proxy(reqwest::Proxy::all(proxy_url)?)
                    .build()?
            }
            None => reqwest::Client::new(),
        };
        Ok(Self {
            credentials: credentials.clone(),
            http,
            state: RwLock::new(RateLimitState {
                available_requests: credentials.rate_limit_per_minute.unwrap_or(0),
                last_refill: Instant::now(),
            }),
        })
    }

    pub async fn available_requests(&self) -> u64 {
        self.state.read().await.available_requests
    }

    async fn try_decrement_available_requests(&self) -> Result<(), ApiError> {
        if let Some(rate_limit_minutes) = self.credentials.rate_limit_per_minute {
            let mut state = self.state.write().await;

            if state.last_refill.elapsed() >= Duration::from_secs(60) {
                state.available_requests = rate_limit_minutes;
                state.last_refill = Instant::now();
            }

            if state.available_requests != 0 {
                state.available_requests -= 1;
            } else {
                return Err(ApiError::RateLimitReached);
            }
        }
        Ok(())
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, ApiError> {
        let base = self.credentials.base_url.trim_end_matches('/');
        reqwest::Url::parse_with_params(
            &format!("{base}/{path}"),
            &[("access_token", self.credentials.access_token.as_str())],
        )
        .map_err(|why| ApiError::Other(format!("invalid url for {path}: {why}")))
    }

    /// Sends the request and returns the body of a successful response.
    /// With `accept_client_errors`, 4xx bodies are returned too, since some
    /// endpoints explain a negative result in them.
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        accept_client_errors: bool,
    ) -> Result<String, ApiError> {
        self.try_decrement_available_requests().await?;

        let response = request.send().await?;
        let status_code = response.status();
        let url = response.url().path().to_owned();
        log::debug!("{} {}", status_code, url);

        if status_code.is_success() || (accept_client_errors && status_code.is_client_error())
        {
            return Ok(response.text().await?);
        }
        match response.text().await {
            Ok(text) => Err(ApiError::InvalidResponse {
                status_code,
                url,
                response: Some(text),
            }),
            Err(_) => Err(ApiError::InvalidResponse {
                status_code,
                url,
                response: None,
            }),
        }
    }
}

#[async_trait]
impl GeocodingProvider for MapboxClient {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ApiError> {
        let mut url = self.url("geocode")?;
        url.query_pairs_mut().append_pair("query", address);
        let body = self.send(self.http.get(url), false).await?;
        wire::decode_geocode(&body)
    }
}

#[async_trait]
impl ReverseGeocodingProvider for MapboxClient {
    async fn reverse_geocode(
        &self,
        coordinate: Coordinate,
    ) -> Result<Option<AddressParts>, ApiError> {
        let url = self.url("reverse")?;
        let request = self.http.post(url).json(&ReverseGeocodeRequest {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
        });
        let body = self.send(request, false).await?;
        wire::decode_reverse_geocode(&body)
    }
}

#[async_trait]
impl DirectionsProvider for MapboxClient {
    async fn directions(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<RoutePolyline, ApiError> {
        let path = format!(
            "directions/{}/{},{};{},{}",
            self.credentials.profile,
            from.longitude,
            from.latitude,
            to.longitude,
            to.latitude
        );
        let mut url = self.url(&path)?;
        url.query_pairs_mut()
            .append_pair("geometries", "geojson")
            .append_pair("overview", "full");
        let body = self.send(self.http.get(url), true).await?;
        Ok(wire::decode_directions(&body))
    }
}

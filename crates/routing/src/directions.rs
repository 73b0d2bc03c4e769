use std::sync::Arc;

use model::{
    coordinate::Coordinate,
    route::{RouteKey, RoutePolyline, RouteRole},
    token::RequestToken,
};
use tokio_util::sync::CancellationToken;

use crate::{provider::DirectionsProvider, requests::InFlightRegistry, ApiError};

pub struct RouteRequest {
    key: RouteKey,
    role: RouteRole,
    from: Coordinate,
    to: Coordinate,
    token: RequestToken,
    cancel: CancellationToken,
    provider: Arc<dyn DirectionsProvider>,
}

impl RouteRequest {
    pub fn key(&self) -> &RouteKey {
        &self.key
    }

    pub fn token(&self) -> RequestToken {
        self.token
    }

    pub fn role(&self) -> RouteRole {
        self.role
    }

    pub async fn run(self) -> RouteResponse {
        let reply = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => RouteReply::Cancelled,
            result = self.provider.directions(self.from, self.to) => match result {
                Ok(polyline) => RouteReply::Fetched(polyline),
                Err(why) => RouteReply::Failed(why),
            },
        };
        RouteResponse {
            key: self.key,
            role: self.role,
            token: self.token,
            reply,
        }
    }
}

#[derive(Debug)]
pub enum RouteReply {
    Fetched(RoutePolyline),
    Failed(ApiError),
    Cancelled,
}

#[derive(Debug)]
pub struct RouteResponse {
    pub key: RouteKey,
    pub role: RouteRole,
    pub token: RequestToken,
    pub reply: RouteReply,
}

#[derive(Debug)]
pub enum RouteOutcome {
    /// The route to draw. Empty when the pair is not routable.
    Applied(RoutePolyline),
    /// Transient failure, the caller keeps its previous state.
    Failed(ApiError),
    /// Stale or cancelled, silently dropped.
    Discarded,
}

/// Issues route fetches with at most one in flight per key.
pub struct RouteFetcher {
    provider: Arc<dyn DirectionsProvider>,
    in_flight: InFlightRegistry<RouteKey>,
}

impl RouteFetcher {
    pub fn new(provider: Arc<dyn DirectionsProvider>) -> Self {
        Self {
            provider,
            in_flight: InFlightRegistry::new(),
        }
    }

    /// Registers a fetch for `key`, cancelling the one in flight before it.
    pub fn begin(
        &mut self,
        key: RouteKey,
        role: RouteRole,
        from: Coordinate,
        to: Coordinate,
    ) -> RouteRequest {
        let (token, cancel) = self.in_flight.issue(key.clone(), ());
        log::debug!("fetching {} route for {} ({})", role, key, token);
        RouteRequest {
            key,
            role,
            from,
            to,
            token,
            cancel,
            provider: self.provider.clone(),
        }
    }

    pub fn accept(&mut self, response: RouteResponse) -> RouteOutcome {
        if !self.in_flight.complete(&response.key, response.token) {
            log::debug!(
                "discarding stale {} route {} for {}",
                response.role,
                response.token,
                response.key
            );
            return RouteOutcome::Discarded;
        }
        match response.reply {
            RouteReply::Fetched(polyline) => {
                if !polyline.is_drawable() {
                    log::info!("no route for {}", response.key);
                }
                RouteOutcome::Applied(polyline)
            }
            RouteReply::Failed(why) if why.is_transient() => {
                log::warn!("route fetch for {} failed: {}", response.key, why);
                RouteOutcome::Failed(why)
            }
            RouteReply::Failed(why) => {
                log::info!("unusable route response for {}: {}", response.key, why);
                RouteOutcome::Applied(RoutePolyline::empty())
            }
            RouteReply::Cancelled => RouteOutcome::Discarded,
        }
    }

    pub async fn fetch_route(
        &mut self,
        from: Coordinate,
        to: Coordinate,
        key: RouteKey,
        role: RouteRole,
    ) -> RouteOutcome {
        let request = self.begin(key, role, from, to);
        let response = request.run().await;
        self.accept(response)
    }

    pub fn is_in_flight(&self, key: &RouteKey) -> bool {
        self.in_flight.is_in_flight(key)
    }

    pub fn current_token(&self, key: &RouteKey) -> Option<RequestToken> {
        self.in_flight.current(key)
    }

    pub fn cancel(&mut self, key: &RouteKey) -> bool {
        self.in_flight.cancel(key)
    }

    pub fn cancel_all(&mut self) -> usize {
        self.in_flight.cancel_all()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use utility::id::Id;

    use super::*;

    /// Returns the straight segment between the endpoints, except for
    /// anything starting south of the equator, which is "across water".
    struct SegmentDirections;

    #[async_trait]
    impl DirectionsProvider for SegmentDirections {
        async fn directions(
            &self,
            from: Coordinate,
            to: Coordinate,
        ) -> Result<RoutePolyline, ApiError> {
            if from.latitude < 0.0 {
                return Ok(RoutePolyline::empty());
            }
            if from.latitude > 89.0 {
                return Err(ApiError::RateLimitReached);
            }
            Ok(RoutePolyline::new(vec![from, to]))
        }
    }

    fn fetcher() -> RouteFetcher {
        RouteFetcher::new(Arc::new(SegmentDirections))
    }

    fn shipment(id: &str) -> RouteKey {
        RouteKey::Shipment(Id::new(id.to_owned()))
    }

    const A: Coordinate = Coordinate::new(52.20, 21.00);
    const B: Coordinate = Coordinate::new(52.25, 21.05);
    const C: Coordinate = Coordinate::new(50.06, 19.94);

    #[tokio::test]
    async fn fetch_route_applies_polyline() {
        let mut fetcher = fetcher();
        let RouteOutcome::Applied(polyline) = fetcher
            .fetch_route(A, B, shipment("a"), RouteRole::Preview)
            .await
        else {
            panic!("expected a route");
        };
        assert_eq!(polyline.len(), 2);
        assert!(!fetcher.is_in_flight(&shipment("a")));
    }

    #[tokio::test]
    async fn late_response_of_superseded_fetch_is_discarded() {
        let mut fetcher = fetcher();
        let first = fetcher.begin(shipment("a"), RouteRole::Preview, A, B);
        let second = fetcher.begin(shipment("a"), RouteRole::Selected, A, C);

        let late = first.run().await;
        assert!(matches!(fetcher.accept(late), RouteOutcome::Discarded));

        let RouteOutcome::Applied(polyline) = fetcher.accept(second.run().await) else {
            panic!("expected a route");
        };
        assert!(polyline.last().unwrap().same_location(&C));
    }

    #[tokio::test]
    async fn unroutable_pair_gives_empty_polyline() {
        let mut fetcher = fetcher();
        let from = Coordinate::new(-33.9, 18.4);
        let RouteOutcome::Applied(polyline) = fetcher
            .fetch_route(from, B, shipment("a"), RouteRole::Preview)
            .await
        else {
            panic!("expected an applied outcome");
        };
        assert!(polyline.is_empty());
    }

    #[tokio::test]
    async fn transient_failure_is_reported() {
        let mut fetcher = fetcher();
        let from = Coordinate::new(89.5, 0.0);
        assert!(matches!(
            fetcher
                .fetch_route(from, B, RouteKey::PrimaryTrip, RouteRole::PrimaryTrip)
                .await,
            RouteOutcome::Failed(_)
        ));
    }

    #[tokio::test]
    async fn cancelled_fetch_is_never_applied() {
        let mut fetcher = fetcher();
        let request = fetcher.begin(shipment("a"), RouteRole::Selected, A, B);
        assert!(fetcher.cancel(&shipment("a")));
        let response = request.run().await;
        assert!(matches!(response.reply, RouteReply::Cancelled));
        assert!(matches!(fetcher.accept(response), RouteOutcome::Discarded));
    }
}

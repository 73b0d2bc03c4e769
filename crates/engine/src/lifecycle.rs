use std::{any::Any, collections::HashSet, sync::Arc};

use actors::{
    actor::{Actor, SupervisionStrategy},
    actor_ref::ActorRef,
    context::Context,
    handler::{Handler, Message},
};
use async_trait::async_trait;
use indexmap::IndexMap;
use model::{
    coordinate::Coordinate,
    route::{EntityRouteState, RouteKey, RoutePolyline, RouteRole},
    shipment::{LocatedShipment, ShipmentId, ShipmentRecord},
    WithDistance,
};
use routing::{
    directions::{RouteFetcher, RouteOutcome, RouteRequest, RouteResponse},
    geocoder::{
        GeocodeEvent, GeocodeKey, GeocodeOutcome, GeocodeRequest, GeocodeResponse, GeocoderCache,
        Lookup, EVENT_CAPACITY,
    },
    provider::{DirectionsProvider, GeocodingProvider, ReverseGeocodingProvider},
};
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use crate::{
    config::EngineConfig,
    debounce::Debouncer,
    filter::VisibilityFilter,
    proximity::{self, PreparedRoute, ProximityFilter},
    selection::SelectionStack,
    snapshot::{LifecycleSnapshot, ShipmentPhase, ShipmentView},
    trip::{Place, PrimaryTrip, TripRequest},
};

/// The external services the lifecycle talks to.
#[derive(Clone)]
pub struct Services {
    pub geocoding: Arc<dyn GeocodingProvider>,
    pub directions: Arc<dyn DirectionsProvider>,
    pub reverse_geocoding: Option<Arc<dyn ReverseGeocodingProvider>>,
}

struct Tracked {
    shipment: LocatedShipment,
    route: Option<EntityRouteState>,
}

impl Tracked {
    fn new(record: ShipmentRecord) -> Self {
        Self {
            shipment: LocatedShipment::new(record),
            route: None,
        }
    }

    fn wants_fetch(&self) -> bool {
        self.route
            .as_ref()
            .is_some_and(|route| route.polyline.is_none() && !route.is_fetching())
    }

    fn view(&self) -> ShipmentView {
        let phase = match (&self.shipment.pickup, &self.route) {
            (None, _) => ShipmentPhase::Unlocated,
            (Some(_), Some(route)) => ShipmentPhase::Routed(route.role),
            (Some(_), None) => ShipmentPhase::Located,
        };
        ShipmentView {
            shipment: self.shipment.clone(),
            phase,
            polyline: self.route.as_ref().and_then(|route| route.polyline.clone()),
            fetching: self.route.as_ref().is_some_and(EntityRouteState::is_fetching),
        }
    }
}

/// Which located, unselected, unbookmarked shipments get a preview.
enum Visibility {
    All,
    Radius { center: Coordinate, radius_km: f64 },
    NearRoute(PreparedRoute),
    Nothing,
}

impl Visibility {
    fn admits(&self, pickup: &Coordinate) -> bool {
        match self {
            Self::All => true,
            Self::Radius { center, radius_km } => {
                proximity::point_within(pickup, center, *radius_km)
            }
            Self::NearRoute(route) => route.admits(pickup),
            Self::Nothing => false,
        }
    }
}

/// Owns every piece of map state: the shipments, their coordinates and the
/// route each one shows. All mutation happens on the actor task; network
/// work is spawned and reports back through the mailbox, where stale
/// replies are dropped by token.
pub struct RouteLifecycle {
    proximity: ProximityFilter,
    geocoder: GeocoderCache,
    routes: RouteFetcher,
    reverse_geocoding: Option<Arc<dyn ReverseGeocodingProvider>>,
    shipments: IndexMap<ShipmentId, Tracked>,
    bookmarks: HashSet<ShipmentId>,
    selection: SelectionStack,
    filter: VisibilityFilter,
    trip: Option<PrimaryTrip>,
    trip_generation: u64,
    debounce: Debouncer,
    timers: CancellationToken,
    publisher: Arc<watch::Sender<LifecycleSnapshot>>,
}

impl Actor for RouteLifecycle {
    fn on_fail(&mut self, error: Box<dyn Any + Send>) -> SupervisionStrategy {
        log::error!("route lifecycle handler panicked: {:?}", error);
        SupervisionStrategy::Resume
    }
}

/// A running lifecycle and the channels it publishes on.
pub struct LifecycleHandle {
    pub actor: ActorRef<RouteLifecycle>,
    pub snapshots: watch::Receiver<LifecycleSnapshot>,
    geocode_events: broadcast::Sender<GeocodeEvent>,
}

impl LifecycleHandle {
    /// Coordinates as they resolve, for components that depend on them.
    pub fn geocode_events(&self) -> broadcast::Receiver<GeocodeEvent> {
        self.geocode_events.subscribe()
    }
}

pub fn spawn(config: EngineConfig, services: Services) -> LifecycleHandle {
    let (publisher, snapshots) = watch::channel(LifecycleSnapshot::default());
    let publisher = Arc::new(publisher);
    let (geocode_events, _) = broadcast::channel(EVENT_CAPACITY);
    let capacity = config.mailbox_capacity;

    let events = geocode_events.clone();
    let actor = actors::run_with_capacity(capacity, move || {
        RouteLifecycle::new(
            config.clone(),
            services.clone(),
            publisher.clone(),
            events.clone(),
        )
    });

    LifecycleHandle {
        actor,
        snapshots,
        geocode_events,
    }
}

fn spawn_geocode(request: GeocodeRequest, ctx: &Context<RouteLifecycle>) {
    let Some(myself) = ctx.myself() else {
        return;
    };
    tokio::spawn(async move {
        let response = request.run().await;
        if myself.tell(GeocodeFinished(response)).await.is_err() {
            log::debug!("lifecycle stopped before geocode finished");
        }
    });
}

fn spawn_route(request: RouteRequest, ctx: &Context<RouteLifecycle>) {
    let Some(myself) = ctx.myself() else {
        return;
    };
    tokio::spawn(async move {
        let response = request.run().await;
        if myself.tell(RouteFinished(response)).await.is_err() {
            log::debug!("lifecycle stopped before route fetch finished");
        }
    });
}

impl RouteLifecycle {
    fn new(
        config: EngineConfig,
        services: Services,
        publisher: Arc<watch::Sender<LifecycleSnapshot>>,
        geocode_events: broadcast::Sender<GeocodeEvent>,
    ) -> Self {
        Self {
            proximity: ProximityFilter::new(config.max_route_points),
            geocoder: GeocoderCache::with_events(services.geocoding, geocode_events),
            routes: RouteFetcher::new(services.directions),
            reverse_geocoding: services.reverse_geocoding,
            shipments: IndexMap::new(),
            bookmarks: HashSet::new(),
            selection: SelectionStack::new(),
            filter: VisibilityFilter::default(),
            trip: None,
            trip_generation: 0,
            debounce: Debouncer::new(config.debounce),
            timers: CancellationToken::new(),
            publisher,
        }
    }

    fn publish(&self) {
        self.publisher.send_replace(self.snapshot());
    }

    fn snapshot(&self) -> LifecycleSnapshot {
        LifecycleSnapshot {
            shipments: self.shipments.values().map(Tracked::view).collect(),
            selection: self.selection.most_recent_first(),
            trip: self.trip.as_ref().map(PrimaryTrip::view),
        }
    }

    fn schedule_rescan(&mut self, ctx: &Context<Self>) {
        let generation = self.debounce.schedule();
        let Some(myself) = ctx.myself() else {
            return;
        };
        let delay = self.debounce.delay();
        let stop = self.timers.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = stop.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = myself.tell(DebounceElapsed(generation)).await;
                }
            }
        });
    }

    fn visibility(&self) -> Visibility {
        match self.filter {
            VisibilityFilter::All => Visibility::All,
            VisibilityFilter::Radius { center, radius_km } => {
                Visibility::Radius { center, radius_km }
            }
            VisibilityFilter::NearTrip { max_distance_km } => self
                .trip
                .as_ref()
                .and_then(|trip| trip.polyline.as_ref())
                .and_then(|polyline| self.proximity.prepare(polyline, max_distance_km))
                .map_or(Visibility::Nothing, Visibility::NearRoute),
        }
    }

    fn wanted_role(&self, tracked: &Tracked, visibility: &Visibility) -> Option<RouteRole> {
        let pickup = tracked.shipment.pickup?;
        let id = &tracked.shipment.id;
        if self.selection.contains(id) {
            Some(RouteRole::Selected)
        } else if self.bookmarks.contains(id) {
            Some(RouteRole::Bookmarked)
        } else {
            visibility.admits(&pickup).then_some(RouteRole::Preview)
        }
    }

    fn wanted_role_of(&self, id: &ShipmentId) -> Option<RouteRole> {
        let visibility = self.visibility();
        self.shipments
            .get(id)
            .and_then(|tracked| self.wanted_role(tracked, &visibility))
    }

    fn replace_shipments(&mut self, records: Vec<ShipmentRecord>, ctx: &Context<Self>) {
        let mut previous = std::mem::take(&mut self.shipments);
        for record in records {
            let id = record.id.clone();
            if self.shipments.contains_key(&id) {
                log::warn!("shipment {} listed twice, keeping the first", id);
                continue;
            }
            let tracked = match previous.shift_remove(&id) {
                Some(mut tracked) => {
                    let change = tracked.shipment.update(record.shipment);
                    if change.pickup {
                        self.geocoder.forget(&GeocodeKey::Pickup(id.clone()));
                    }
                    if change.delivery {
                        self.geocoder.forget(&GeocodeKey::Delivery(id.clone()));
                    }
                    if change.any() {
                        log::debug!("addresses of {} changed", id);
                        self.routes.cancel(&RouteKey::Shipment(id.clone()));
                        tracked.route = match tracked.route.take() {
                            // no pickup, nothing to draw until it resolves again
                            Some(_) if change.pickup => None,
                            Some(route) => Some(EntityRouteState::new(id.clone(), route.role)),
                            None => None,
                        };
                    }
                    tracked
                }
                None => Tracked::new(record),
            };
            self.shipments.insert(id, tracked);
        }

        for id in previous.into_keys() {
            log::debug!("shipment {} removed upstream", id);
            self.release(&id);
        }

        self.schedule_rescan(ctx);
        self.publish();
    }

    /// Cancels everything in flight for a shipment that is gone.
    fn release(&mut self, id: &ShipmentId) {
        self.geocoder.forget(&GeocodeKey::Pickup(id.clone()));
        self.geocoder.forget(&GeocodeKey::Delivery(id.clone()));
        self.routes.cancel(&RouteKey::Shipment(id.clone()));
        self.selection.remove(id);
    }

    fn rescan(&mut self, ctx: &Context<Self>) {
        log::debug!("re-scanning {} shipments", self.shipments.len());

        let unlocated: Vec<(ShipmentId, String)> = self
            .shipments
            .values()
            .filter(|tracked| tracked.shipment.pickup.is_none())
            .map(|tracked| {
                (
                    tracked.shipment.id.clone(),
                    tracked.shipment.shipment.pickup_address.clone(),
                )
            })
            .collect();
        for (id, address) in unlocated {
            match self.geocoder.begin(GeocodeKey::Pickup(id.clone()), &address) {
                Lookup::Cached(coordinate) => {
                    if let Some(tracked) = self.shipments.get_mut(&id) {
                        tracked.shipment.pickup = Some(coordinate);
                    }
                }
                Lookup::Request(request) => spawn_geocode(request, ctx),
                Lookup::Skipped | Lookup::KnownMissing | Lookup::InFlight => {}
            }
        }

        let visibility = self.visibility();
        let wanted: Vec<_> = self
            .shipments
            .values()
            .map(|tracked| {
                (
                    tracked.shipment.id.clone(),
                    self.wanted_role(tracked, &visibility),
                )
            })
            .collect();
        for (id, role) in wanted {
            self.apply_role(&id, role, ctx);
        }

        self.continue_trip(ctx);
        self.publish();
    }

    /// Moves a shipment to the route role it should show. A role change
    /// always starts a fresh fetch; an unchanged role only refetches after a
    /// failure.
    fn apply_role(&mut self, id: &ShipmentId, wanted: Option<RouteRole>, ctx: &Context<Self>) {
        let Some(tracked) = self.shipments.get_mut(id) else {
            return;
        };
        let key = RouteKey::Shipment(id.clone());
        match (tracked.route.as_ref().map(|route| route.role), wanted) {
            (None, None) => return,
            (Some(role), None) => {
                log::debug!("{} no longer shows a {} route", id, role);
                tracked.route = None;
                self.routes.cancel(&key);
                self.geocoder.cancel(&GeocodeKey::Delivery(id.clone()));
                return;
            }
            (Some(current), Some(role)) if current == role => {
                if !tracked.wants_fetch() {
                    return;
                }
            }
            (current, Some(role)) => {
                if current.is_some() {
                    self.routes.cancel(&key);
                }
                log::debug!("{} now shows a {} route", id, role);
                tracked.route = Some(EntityRouteState::new(id.clone(), role));
            }
        }
        self.request_route(id, ctx);
    }

    fn request_route(&mut self, id: &ShipmentId, ctx: &Context<Self>) {
        let Some(tracked) = self.shipments.get_mut(id) else {
            return;
        };
        let Some(route) = tracked.route.as_mut() else {
            return;
        };
        let Some(pickup) = tracked.shipment.pickup else {
            return;
        };

        let delivery = match tracked.shipment.delivery {
            Some(delivery) => delivery,
            None => {
                let key = GeocodeKey::Delivery(id.clone());
                match self
                    .geocoder
                    .begin(key, &tracked.shipment.shipment.delivery_address)
                {
                    Lookup::Cached(delivery) => {
                        tracked.shipment.delivery = Some(delivery);
                        delivery
                    }
                    Lookup::Request(request) => {
                        spawn_geocode(request, ctx);
                        return;
                    }
                    Lookup::InFlight => return,
                    Lookup::KnownMissing | Lookup::Skipped => {
                        log::debug!("no delivery location for {}, nothing to route", id);
                        route.polyline = Some(RoutePolyline::empty());
                        return;
                    }
                }
            }
        };

        let request = self
            .routes
            .begin(RouteKey::Shipment(id.clone()), route.role, pickup, delivery);
        route.fetch_token = Some(request.token());
        spawn_route(request, ctx);
    }

    fn continue_trip(&mut self, ctx: &Context<Self>) {
        let Some(trip) = self.trip.as_mut() else {
            return;
        };
        for (key, address) in trip.unresolved() {
            match self.geocoder.begin(key.clone(), &address) {
                Lookup::Cached(coordinate) => trip.resolve(&key, coordinate),
                Lookup::Request(request) => spawn_geocode(request, ctx),
                Lookup::Skipped | Lookup::KnownMissing | Lookup::InFlight => {}
            }
        }

        if !trip.needs_route() {
            return;
        }
        let (Some(origin), Some(destination)) = (trip.origin, trip.destination) else {
            return;
        };
        let request = self.routes.begin(
            RouteKey::PrimaryTrip,
            RouteRole::PrimaryTrip,
            origin,
            destination,
        );
        trip.fetch_token = Some(request.token());
        spawn_route(request, ctx);
    }

    fn cancel_trip(&mut self) {
        self.geocoder.cancel(&GeocodeKey::TripOrigin);
        self.geocoder.cancel(&GeocodeKey::TripDestination);
        self.routes.cancel(&RouteKey::PrimaryTrip);
    }

    fn set_trip(&mut self, request: TripRequest, ctx: &Context<Self>) {
        self.cancel_trip();
        self.trip_generation += 1;
        let trip = PrimaryTrip::new(request, self.trip_generation);

        if let (Place::Coordinate(origin), Some(provider)) =
            (&trip.request.origin, self.reverse_geocoding.clone())
        {
            self.label_trip_origin(provider, *origin, trip.generation, ctx);
        }

        self.trip = Some(trip);
        self.continue_trip(ctx);
        self.schedule_rescan(ctx);
        self.publish();
    }

    fn label_trip_origin(
        &self,
        provider: Arc<dyn ReverseGeocodingProvider>,
        origin: Coordinate,
        generation: u64,
        ctx: &Context<Self>,
    ) {
        let Some(myself) = ctx.myself() else {
            return;
        };
        let stop = self.timers.clone();
        tokio::spawn(async move {
            let label = tokio::select! {
                biased;
                _ = stop.cancelled() => return,
                result = provider.reverse_geocode(origin) => match result {
                    Ok(parts) => parts.and_then(|parts| parts.display_name()),
                    Err(why) => {
                        log::warn!("could not name trip origin: {}", why);
                        None
                    }
                },
            };
            let _ = myself.tell(TripLabelResolved { generation, label }).await;
        });
    }

    fn clear_trip(&mut self, ctx: &Context<Self>) {
        if self.trip.take().is_some() {
            self.cancel_trip();
            self.trip_generation += 1;
            self.schedule_rescan(ctx);
            self.publish();
        }
    }

    fn select(&mut self, id: ShipmentId, ctx: &Context<Self>) -> bool {
        let Some(tracked) = self.shipments.get(&id) else {
            log::warn!("cannot select unknown shipment {}", id);
            return false;
        };
        if tracked.shipment.pickup.is_none() {
            log::debug!("cannot select {} before it is located", id);
            return false;
        }
        self.selection.push(id.clone());
        self.apply_role(&id, Some(RouteRole::Selected), ctx);
        self.publish();
        true
    }

    fn deselect(&mut self, id: &ShipmentId, ctx: &Context<Self>) -> bool {
        if !self.selection.remove(id) {
            return false;
        }
        // back to whatever the shipment would show unselected, from cached
        // coordinates
        let wanted = self.wanted_role_of(id);
        self.apply_role(id, wanted, ctx);
        true
    }

    fn geocode_finished(&mut self, response: GeocodeResponse, ctx: &Context<Self>) {
        let key = response.key.clone();
        match self.geocoder.accept(response) {
            GeocodeOutcome::Resolved(coordinate) => self.located(key, coordinate, ctx),
            GeocodeOutcome::NotFound => {
                if let GeocodeKey::Delivery(id) = &key {
                    if let Some(route) = self
                        .shipments
                        .get_mut(id)
                        .and_then(|tracked| tracked.route.as_mut())
                    {
                        route.polyline = Some(RoutePolyline::empty());
                    }
                }
            }
            GeocodeOutcome::Failed(_) | GeocodeOutcome::Discarded => {}
        }
        self.publish();
    }

    fn located(&mut self, key: GeocodeKey, coordinate: Coordinate, ctx: &Context<Self>) {
        match key {
            GeocodeKey::Pickup(id) => {
                let Some(tracked) = self.shipments.get_mut(&id) else {
                    return;
                };
                tracked.shipment.pickup = Some(coordinate);
                let wanted = self.wanted_role_of(&id);
                self.apply_role(&id, wanted, ctx);
            }
            GeocodeKey::Delivery(id) => {
                let Some(tracked) = self.shipments.get_mut(&id) else {
                    return;
                };
                tracked.shipment.delivery = Some(coordinate);
                if tracked.wants_fetch() {
                    self.request_route(&id, ctx);
                }
            }
            GeocodeKey::TripOrigin | GeocodeKey::TripDestination => {
                if let Some(trip) = self.trip.as_mut() {
                    trip.resolve(&key, coordinate);
                    self.continue_trip(ctx);
                }
            }
        }
    }

    fn route_finished(&mut self, response: RouteResponse, ctx: &Context<Self>) {
        let key = response.key.clone();
        let token = response.token;
        let outcome = self.routes.accept(response);
        if matches!(outcome, RouteOutcome::Discarded) {
            return;
        }

        let mut trip_changed = false;
        match &key {
            RouteKey::Shipment(id) => {
                match self
                    .shipments
                    .get_mut(id)
                    .and_then(|tracked| tracked.route.as_mut())
                {
                    Some(route) if route.fetch_token == Some(token) => {
                        route.fetch_token = None;
                        if let RouteOutcome::Applied(polyline) = outcome {
                            route.polyline = Some(polyline);
                        }
                    }
                    _ => log::debug!("dropping route {} for {}, no longer wanted", token, key),
                }
            }
            RouteKey::PrimaryTrip => match self.trip.as_mut() {
                Some(trip) if trip.fetch_token == Some(token) => {
                    trip.fetch_token = None;
                    if let RouteOutcome::Applied(polyline) = outcome {
                        trip.polyline = Some(polyline);
                        trip_changed = true;
                    }
                }
                _ => log::debug!("dropping stale trip route {}", token),
            },
        }

        if trip_changed && matches!(self.filter, VisibilityFilter::NearTrip { .. }) {
            self.schedule_rescan(ctx);
        }
        self.publish();
    }

    fn nearest_to(&self, point: &Coordinate, limit: usize) -> Vec<WithDistance<LocatedShipment>> {
        let mut nearest = self.proximity.sort_by_distance(
            self.shipments.values().map(|tracked| &tracked.shipment),
            point,
        );
        nearest.truncate(limit);
        nearest
    }

    fn teardown(&mut self) {
        let cancelled = self.geocoder.cancel_all() + self.routes.cancel_all();
        self.timers.cancel();
        self.timers = CancellationToken::new();
        self.debounce.cancel();
        self.shipments.clear();
        self.selection.clear();
        self.trip = None;
        self.trip_generation += 1;
        log::info!("route lifecycle torn down, {} requests cancelled", cancelled);
        self.publish();
    }
}

/// Replaces the shipment list with the latest upstream feed.
pub struct ReplaceShipments(pub Vec<ShipmentRecord>);

impl Message for ReplaceShipments {
    type Response = ();
}

pub struct SetBookmarks(pub HashSet<ShipmentId>);

impl Message for SetBookmarks {
    type Response = ();
}

pub struct SetFilter(pub VisibilityFilter);

impl Message for SetFilter {
    type Response = ();
}

/// Answers `false` for unknown or not yet located shipments.
pub struct Select(pub ShipmentId);

impl Message for Select {
    type Response = bool;
}

/// Answers `false` if the shipment was not selected.
pub struct Deselect(pub ShipmentId);

impl Message for Deselect {
    type Response = bool;
}

/// Answers whether the shipment is selected afterwards.
pub struct ToggleSelection(pub ShipmentId);

impl Message for ToggleSelection {
    type Response = bool;
}

pub struct ClearSelection;

impl Message for ClearSelection {
    type Response = ();
}

pub struct SetTrip(pub TripRequest);

impl Message for SetTrip {
    type Response = ();
}

pub struct ClearTrip;

impl Message for ClearTrip {
    type Response = ();
}

/// Runs the bulk re-scan now instead of after the quiet period.
pub struct RescanNow;

impl Message for RescanNow {
    type Response = ();
}

pub struct NearestTo {
    pub point: Coordinate,
    pub limit: usize,
}

impl Message for NearestTo {
    type Response = Vec<WithDistance<LocatedShipment>>;
}

pub struct GetSnapshot;

impl Message for GetSnapshot {
    type Response = LifecycleSnapshot;
}

/// Cancels everything and forgets all shipments.
pub struct Teardown;

impl Message for Teardown {
    type Response = ();
}

struct DebounceElapsed(u64);

impl Message for DebounceElapsed {
    type Response = ();
}

struct GeocodeFinished(GeocodeResponse);

impl Message for GeocodeFinished {
    type Response = ();
}

struct RouteFinished(RouteResponse);

impl Message for RouteFinished {
    type Response = ();
}

struct TripLabelResolved {
    generation: u64,
    label: Option<String>,
}

impl Message for TripLabelResolved {
    type Response = ();
}

#[async_trait]
impl Handler<ReplaceShipments> for RouteLifecycle {
    async fn handle(&mut self, message: ReplaceShipments, ctx: &Context<Self>) {
        self.replace_shipments(message.0, ctx);
    }
}

#[async_trait]
impl Handler<SetBookmarks> for RouteLifecycle {
    async fn handle(&mut self, message: SetBookmarks, ctx: &Context<Self>) {
        self.bookmarks = message.0;
        self.schedule_rescan(ctx);
    }
}

#[async_trait]
impl Handler<SetFilter> for RouteLifecycle {
    async fn handle(&mut self, message: SetFilter, ctx: &Context<Self>) {
        self.filter = message.0;
        self.schedule_rescan(ctx);
    }
}

#[async_trait]
impl Handler<Select> for RouteLifecycle {
    async fn handle(&mut self, message: Select, ctx: &Context<Self>) -> bool {
        self.select(message.0, ctx)
    }
}

#[async_trait]
impl Handler<Deselect> for RouteLifecycle {
    async fn handle(&mut self, message: Deselect, ctx: &Context<Self>) -> bool {
        let deselected = self.deselect(&message.0, ctx);
        if deselected {
            self.publish();
        }
        deselected
    }
}

#[async_trait]
impl Handler<ToggleSelection> for RouteLifecycle {
    async fn handle(&mut self, message: ToggleSelection, ctx: &Context<Self>) -> bool {
        if self.selection.contains(&message.0) {
            self.deselect(&message.0, ctx);
            self.publish();
            false
        } else {
            self.select(message.0, ctx)
        }
    }
}

#[async_trait]
impl Handler<ClearSelection> for RouteLifecycle {
    async fn handle(&mut self, _: ClearSelection, ctx: &Context<Self>) {
        for id in self.selection.most_recent_first() {
            self.deselect(&id, ctx);
        }
        self.publish();
    }
}

#[async_trait]
impl Handler<SetTrip> for RouteLifecycle {
    async fn handle(&mut self, message: SetTrip, ctx: &Context<Self>) {
        self.set_trip(message.0, ctx);
    }
}

#[async_trait]
impl Handler<ClearTrip> for RouteLifecycle {
    async fn handle(&mut self, _: ClearTrip, ctx: &Context<Self>) {
        self.clear_trip(ctx);
    }
}

#[async_trait]
impl Handler<RescanNow> for RouteLifecycle {
    async fn handle(&mut self, _: RescanNow, ctx: &Context<Self>) {
        self.debounce.cancel();
        self.rescan(ctx);
    }
}

#[async_trait]
impl Handler<NearestTo> for RouteLifecycle {
    async fn handle(
        &mut self,
        message: NearestTo,
        _: &Context<Self>,
    ) -> Vec<WithDistance<LocatedShipment>> {
        self.nearest_to(&message.point, message.limit)
    }
}

#[async_trait]
impl Handler<GetSnapshot> for RouteLifecycle {
    async fn handle(&mut self, _: GetSnapshot, _: &Context<Self>) -> LifecycleSnapshot {
        self.snapshot()
    }
}

#[async_trait]
impl Handler<Teardown> for RouteLifecycle {
    async fn handle(&mut self, _: Teardown, _: &Context<Self>) {
        self.teardown();
    }
}

#[async_trait]
impl Handler<DebounceElapsed> for RouteLifecycle {
    async fn handle(&mut self, message: DebounceElapsed, ctx: &Context<Self>) {
        if self.debounce.fire(message.0) {
            self.rescan(ctx);
        }
    }
}

#[async_trait]
impl Handler<GeocodeFinished> for RouteLifecycle {
    async fn handle(&mut self, message: GeocodeFinished, ctx: &Context<Self>) {
        self.geocode_finished(message.0, ctx);
    }
}

#[async_trait]
impl Handler<RouteFinished> for RouteLifecycle {
    async fn handle(&mut self, message: RouteFinished, ctx: &Context<Self>) {
        self.route_finished(message.0, ctx);
    }
}

#[async_trait]
impl Handler<TripLabelResolved> for RouteLifecycle {
    async fn handle(&mut self, message: TripLabelResolved, _: &Context<Self>) {
        match self.trip.as_mut() {
            Some(trip) if trip.generation == message.generation => {
                trip.origin_label = message.label;
                self.publish();
            }
            _ => log::debug!("dropping label for a replaced trip"),
        }
    }
}

use std::{
    collections::{HashSet, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use engine::{
    spawn, EngineConfig, LifecycleHandle, LifecycleRef, Place, RouteLifecycle, Services,
    ShipmentPhase, TripRequest, VisibilityFilter,
};
use model::{
    coordinate::Coordinate,
    route::{RoutePolyline, RouteRole},
    shipment::{ShipmentId, ShipmentRecord},
};
use routing::{
    geocoder::{GeocodeEvent, GeocodeKey},
    provider::{DirectionsProvider, GeocodingProvider, ReverseGeocodingProvider},
    wire::AddressParts,
    ApiError,
};
use utility::id::Id;

const WARSAW_NORTH: Coordinate = Coordinate::new(52.25, 21.00);
const WARSAW_SOUTH: Coordinate = Coordinate::new(52.20, 21.00);
const WARSAW_EAST: Coordinate = Coordinate::new(52.23, 21.08);
const KRAKOW: Coordinate = Coordinate::new(50.06, 19.94);
const GDANSK: Coordinate = Coordinate::new(54.35, 18.65);
const SOUTH_ATLANTIC: Coordinate = Coordinate::new(-30.0, -20.0);

#[derive(Default)]
struct FakeGeocoder {
    calls: AtomicUsize,
}

#[async_trait]
impl GeocodingProvider for FakeGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<Coordinate>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(match address {
            "north" => Some(WARSAW_NORTH),
            "south" => Some(WARSAW_SOUTH),
            "east" => Some(WARSAW_EAST),
            "krakow" => Some(KRAKOW),
            "gdansk" => Some(GDANSK),
            "ocean" => Some(SOUTH_ATLANTIC),
            _ => None,
        })
    }
}

/// Straight-line routes. Delays and failures are queued per call; anything
/// starting south of the equator has no route.
#[derive(Default)]
struct FakeDirections {
    calls: AtomicUsize,
    finished: AtomicUsize,
    delays: Mutex<VecDeque<Duration>>,
    failures: AtomicUsize,
}

impl FakeDirections {
    fn delay_next(&self, delay: Duration) {
        self.delays.lock().unwrap().push_back(delay);
    }

    fn fail_next(&self) {
        self.failures.fetch_add(1, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectionsProvider for FakeDirections {
    async fn directions(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<RoutePolyline, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok()
        {
            return Err(ApiError::RateLimitReached);
        }
        if from.latitude < 0.0 {
            return Ok(RoutePolyline::empty());
        }
        Ok(RoutePolyline::new(vec![from, to]))
    }
}

struct FakeReverseGeocoder;

#[async_trait]
impl ReverseGeocodingProvider for FakeReverseGeocoder {
    async fn reverse_geocode(
        &self,
        _: Coordinate,
    ) -> Result<Option<AddressParts>, ApiError> {
        Ok(Some(AddressParts {
            city: Some("Warszawa".to_owned()),
            street: Some("Marszałkowska".to_owned()),
            number: Some("1".to_owned()),
            name: None,
        }))
    }
}

struct Fixture {
    handle: LifecycleHandle,
    geocoder: Arc<FakeGeocoder>,
    directions: Arc<FakeDirections>,
}

impl Fixture {
    fn new() -> Self {
        let geocoder = Arc::new(FakeGeocoder::default());
        let directions = Arc::new(FakeDirections::default());
        let services = Services {
            geocoding: geocoder.clone(),
            directions: directions.clone(),
            reverse_geocoding: Some(Arc::new(FakeReverseGeocoder)),
        };
        let handle = spawn(EngineConfig::default(), services);
        Self {
            handle,
            geocoder,
            directions,
        }
    }

    fn lifecycle(&self) -> &actors::actor_ref::ActorRef<RouteLifecycle> {
        &self.handle.actor
    }
}

fn id(raw: &str) -> ShipmentId {
    Id::new(raw.to_owned())
}

fn record(raw_id: &str, pickup: &str, delivery: &str) -> ShipmentRecord {
    ShipmentRecord::new(raw_id, pickup, delivery)
}

/// Lets every task that is not waiting on a timer run to completion.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn located_shipments_get_preview_routes_after_debounce() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![
            record("a", "north", "krakow"),
            record("b", "south", "gdansk"),
        ])
        .await
        .unwrap();

    let snapshot = lifecycle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase(&id("a")), Some(ShipmentPhase::Unlocated));
    assert_eq!(fixture.geocoder.calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(301)).await;
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    for raw in ["a", "b"] {
        let view = snapshot.shipment(&id(raw)).unwrap();
        assert_eq!(view.phase, ShipmentPhase::Routed(RouteRole::Preview));
        assert!(view.polyline.as_ref().is_some_and(RoutePolyline::is_drawable));
    }
    assert_eq!(fixture.geocoder.calls.load(Ordering::SeqCst), 4);
    assert_eq!(fixture.directions.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn bursts_of_updates_coalesce_into_one_rescan() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    let shipments = vec![record("a", "north", "krakow")];

    for _ in 0..3 {
        lifecycle.replace_shipments(shipments.clone()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    // 200ms after the last update
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(fixture.geocoder.calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_millis(101)).await;
    settle().await;
    assert_eq!(fixture.geocoder.calls.load(Ordering::SeqCst), 2);
    assert_eq!(fixture.directions.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn selection_refetches_instead_of_reusing_preview() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![record("a", "north", "krakow")])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;
    assert_eq!(fixture.directions.calls(), 1);

    assert!(lifecycle.select(id("a")).await.unwrap());
    settle().await;

    assert_eq!(fixture.directions.calls(), 2);
    let snapshot = lifecycle.snapshot().await.unwrap();
    let view = snapshot.shipment(&id("a")).unwrap();
    assert_eq!(view.phase, ShipmentPhase::Routed(RouteRole::Selected));
    assert!(view.polyline.is_some());
    assert_eq!(snapshot.selection, vec![id("a")]);
}

#[tokio::test(start_paused = true)]
async fn late_selected_route_never_overwrites_newer_state() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![
            record("e1", "north", "krakow"),
            record("e2", "south", "gdansk"),
        ])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    // F1 takes a second
    fixture.directions.delay_next(Duration::from_secs(1));
    assert!(lifecycle.select(id("e1")).await.unwrap());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(lifecycle.deselect(id("e1")).await.unwrap());
    assert!(lifecycle.select(id("e2")).await.unwrap());
    settle().await;

    tokio::time::sleep(Duration::from_millis(1100)).await;
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    assert_eq!(snapshot.selection, vec![id("e2")]);

    let e1 = snapshot.shipment(&id("e1")).unwrap();
    assert_eq!(e1.phase, ShipmentPhase::Routed(RouteRole::Preview));
    assert!(e1.polyline.is_some());

    let routes = snapshot.routes_by_role();
    let selected: Vec<_> = routes[&RouteRole::Selected]
        .iter()
        .map(|(id, _)| id.clone())
        .collect();
    assert_eq!(selected, vec![id("e2")]);
    // the slow fetch was cancelled before it could finish
    assert_eq!(
        fixture.directions.finished.load(Ordering::SeqCst),
        fixture.directions.calls() - 1
    );
}

#[tokio::test(start_paused = true)]
async fn most_recent_selection_comes_first() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![
            record("a", "north", "krakow"),
            record("b", "south", "gdansk"),
            record("c", "east", "krakow"),
        ])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    for raw in ["a", "b", "c"] {
        assert!(lifecycle.toggle_selection(id(raw)).await.unwrap());
    }
    assert!(!lifecycle.toggle_selection(id("b")).await.unwrap());
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    assert_eq!(snapshot.selection, vec![id("c"), id("a")]);
    assert_eq!(
        snapshot.phase(&id("b")),
        Some(ShipmentPhase::Routed(RouteRole::Preview))
    );

    lifecycle.clear_selection().await.unwrap();
    let snapshot = lifecycle.snapshot().await.unwrap();
    assert!(snapshot.selection.is_empty());
}

#[tokio::test(start_paused = true)]
async fn bookmarked_and_selected_shipments_bypass_the_filter() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![
            record("near", "north", "krakow"),
            record("bookmarked", "krakow", "gdansk"),
            record("far", "gdansk", "krakow"),
        ])
        .await
        .unwrap();
    lifecycle
        .set_filter(VisibilityFilter::Radius {
            center: WARSAW_SOUTH,
            radius_km: 10.0,
        })
        .await
        .unwrap();
    lifecycle
        .set_bookmarks(HashSet::from([id("bookmarked")]))
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    assert_eq!(
        snapshot.phase(&id("near")),
        Some(ShipmentPhase::Routed(RouteRole::Preview))
    );
    assert_eq!(
        snapshot.phase(&id("bookmarked")),
        Some(ShipmentPhase::Routed(RouteRole::Bookmarked))
    );
    assert_eq!(snapshot.phase(&id("far")), Some(ShipmentPhase::Located));

    assert!(lifecycle.select(id("far")).await.unwrap());
    settle().await;
    let snapshot = lifecycle.snapshot().await.unwrap();
    assert_eq!(
        snapshot.phase(&id("far")),
        Some(ShipmentPhase::Routed(RouteRole::Selected))
    );

    // filtered out again once deselected
    assert!(lifecycle.deselect(id("far")).await.unwrap());
    let snapshot = lifecycle.snapshot().await.unwrap();
    let far = snapshot.shipment(&id("far")).unwrap();
    assert_eq!(far.phase, ShipmentPhase::Located);
    assert!(far.polyline.is_none());
}

#[tokio::test(start_paused = true)]
async fn near_trip_filter_follows_the_primary_trip_route() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![
            record("on-the-way", "east", "krakow"),
            record("elsewhere", "gdansk", "krakow"),
        ])
        .await
        .unwrap();
    lifecycle
        .set_filter(VisibilityFilter::NearTrip {
            max_distance_km: 10.0,
        })
        .await
        .unwrap();
    lifecycle
        .set_trip(TripRequest::new(
            Place::Coordinate(WARSAW_SOUTH),
            Place::Address("north".to_owned()),
        ))
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    let trip = snapshot.trip.as_ref().unwrap();
    assert!(trip.polyline.as_ref().is_some_and(RoutePolyline::is_drawable));
    assert_eq!(
        trip.origin_label.as_deref(),
        Some("Warszawa, Marszałkowska 1")
    );

    // the trip route arriving schedules another scan
    tokio::time::sleep(Duration::from_millis(301)).await;
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    assert_eq!(
        snapshot.phase(&id("on-the-way")),
        Some(ShipmentPhase::Routed(RouteRole::Preview))
    );
    assert_eq!(snapshot.phase(&id("elsewhere")), Some(ShipmentPhase::Located));

    lifecycle.clear_trip().await.unwrap();
    tokio::time::sleep(Duration::from_millis(301)).await;
    settle().await;
    let snapshot = lifecycle.snapshot().await.unwrap();
    assert!(snapshot.trip.is_none());
    assert_eq!(snapshot.phase(&id("on-the-way")), Some(ShipmentPhase::Located));
}

#[tokio::test(start_paused = true)]
async fn removed_shipment_cancels_its_fetch() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    fixture.directions.delay_next(Duration::from_secs(1));
    lifecycle
        .replace_shipments(vec![record("a", "north", "krakow")])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;
    assert_eq!(fixture.directions.calls(), 1);

    lifecycle.replace_shipments(Vec::new()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    assert!(snapshot.shipments.is_empty());
    assert_eq!(fixture.directions.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn unroutable_pair_is_kept_and_not_retried() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![record("a", "ocean", "krakow")])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    let view = snapshot.shipment(&id("a")).unwrap();
    assert!(view.polyline.as_ref().is_some_and(RoutePolyline::is_empty));

    lifecycle.rescan_now().await.unwrap();
    settle().await;
    assert_eq!(fixture.directions.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn transient_failure_is_retried_on_the_next_rescan() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    fixture.directions.fail_next();
    lifecycle
        .replace_shipments(vec![record("a", "north", "krakow")])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    let view = snapshot.shipment(&id("a")).unwrap();
    assert_eq!(view.phase, ShipmentPhase::Routed(RouteRole::Preview));
    assert!(view.polyline.is_none());
    assert!(!view.fetching);

    lifecycle.rescan_now().await.unwrap();
    settle().await;
    let snapshot = lifecycle.snapshot().await.unwrap();
    assert!(snapshot.shipment(&id("a")).unwrap().polyline.is_some());
    assert_eq!(fixture.directions.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn unknown_pickup_stays_unlocated() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![record("a", "atlantis", "krakow")])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    assert_eq!(snapshot.phase(&id("a")), Some(ShipmentPhase::Unlocated));
    assert!(!lifecycle.select(id("a")).await.unwrap());
    // the miss is remembered for this address
    assert_eq!(fixture.geocoder.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn changed_delivery_address_is_routed_again() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![record("a", "north", "krakow")])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    lifecycle
        .replace_shipments(vec![record("a", "north", "gdansk")])
        .await
        .unwrap();
    let snapshot = lifecycle.snapshot().await.unwrap();
    assert!(snapshot.shipment(&id("a")).unwrap().polyline.is_none());

    tokio::time::sleep(Duration::from_millis(301)).await;
    settle().await;
    let snapshot = lifecycle.snapshot().await.unwrap();
    let view = snapshot.shipment(&id("a")).unwrap();
    let end = view.polyline.as_ref().and_then(|polyline| polyline.last().copied());
    assert!(end.is_some_and(|end| end.same_location(&GDANSK)));
}

#[tokio::test(start_paused = true)]
async fn nearest_shipments_come_first() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![
            record("gdansk", "gdansk", "krakow"),
            record("warsaw", "north", "krakow"),
            record("krakow", "krakow", "gdansk"),
            record("nowhere", "atlantis", "krakow"),
        ])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    let nearest = lifecycle.nearest_to(WARSAW_SOUTH, 2).await.unwrap();
    let ids: Vec<_> = nearest.iter().map(|entry| entry.content.id.clone()).collect();
    assert_eq!(ids, vec![id("warsaw"), id("krakow")]);
    assert!(nearest[0].distance_km < nearest[1].distance_km);
}

#[tokio::test(start_paused = true)]
async fn resolved_pickups_are_broadcast() {
    let fixture = Fixture::new();
    let mut events = fixture.handle.geocode_events();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .replace_shipments(vec![record("a", "north", "krakow")])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;

    let GeocodeEvent::Resolved { key, coordinate } = events.recv().await.unwrap();
    assert_eq!(key, GeocodeKey::Pickup(id("a")));
    assert!(coordinate.same_location(&WARSAW_NORTH));
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_work_and_publishes_empty_state() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    let mut snapshots = fixture.handle.snapshots.clone();
    fixture.directions.delay_next(Duration::from_secs(1));
    lifecycle
        .replace_shipments(vec![
            record("a", "north", "krakow"),
            record("b", "south", "gdansk"),
        ])
        .await
        .unwrap();
    lifecycle.rescan_now().await.unwrap();
    settle().await;
    lifecycle.select(id("b")).await.unwrap();
    // another update is waiting for its quiet period
    lifecycle
        .replace_shipments(vec![record("a", "north", "krakow")])
        .await
        .unwrap();

    lifecycle.teardown().await.unwrap();
    assert!(snapshots.borrow_and_update().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    let snapshot = lifecycle.snapshot().await.unwrap();
    assert!(snapshot.is_empty());
    let calls = fixture.geocoder.calls.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(fixture.geocoder.calls.load(Ordering::SeqCst), calls);
}

#[tokio::test(start_paused = true)]
async fn trip_geocodes_both_addresses() {
    let fixture = Fixture::new();
    let lifecycle = fixture.lifecycle();
    lifecycle
        .set_trip(TripRequest::new(
            Place::Address("south".to_owned()),
            Place::Address("krakow".to_owned()),
        ))
        .await
        .unwrap();
    settle().await;

    let snapshot = lifecycle.snapshot().await.unwrap();
    let trip = snapshot.trip.unwrap();
    assert!(trip.origin.is_some_and(|origin| origin.same_location(&WARSAW_SOUTH)));
    assert!(trip
        .destination
        .is_some_and(|destination| destination.same_location(&KRAKOW)));
    assert!(trip.polyline.is_some());
    assert!(trip.origin_label.is_none());
}

use engine::LifecycleSnapshot;
use model::{
    coordinate::{BoundingBox, Coordinate},
    route::RouteRole,
    surface::{CameraPosition, DesiredSurfaceState, Marker, MarkerKind, MarkerTarget},
};

use crate::{config::SurfaceConfig, mercator};

/// Turns lifecycle snapshots into the state the map should show.
#[derive(Debug, Clone)]
pub struct SurfacePlanner {
    config: SurfaceConfig,
}

impl SurfacePlanner {
    pub fn new(config: SurfaceConfig) -> Self {
        Self { config }
    }

    pub fn plan(&self, snapshot: &LifecycleSnapshot, user_camera: CameraPosition) -> DesiredSurfaceState {
        let mut state = DesiredSurfaceState::new(self.camera(snapshot, user_camera));

        if let Some(polyline) = snapshot.trip.as_ref().and_then(|trip| trip.polyline.clone()) {
            state.push_route(RouteRole::PrimaryTrip, polyline);
        }
        for (role, routes) in snapshot.routes_by_role() {
            for (_, polyline) in routes {
                state.push_route(role, polyline);
            }
        }

        for view in snapshot.visible() {
            if let Some(pickup) = view.shipment.pickup {
                state.push_marker(
                    MarkerKind::Pickup,
                    Marker::new(MarkerTarget::Shipment(view.id().clone()), pickup),
                );
            }
        }
        for id in &snapshot.selection {
            let delivery = snapshot
                .shipment(id)
                .and_then(|view| view.shipment.delivery);
            if let Some(delivery) = delivery {
                state.push_marker(
                    MarkerKind::Delivery,
                    Marker::new(MarkerTarget::Shipment(id.clone()), delivery),
                );
            }
        }
        if let Some(trip) = &snapshot.trip {
            let endpoints = [
                (MarkerTarget::TripOrigin, trip.origin),
                (MarkerTarget::TripDestination, trip.destination),
            ];
            for (target, coordinate) in endpoints {
                if let Some(coordinate) = coordinate {
                    state.push_marker(MarkerKind::TripEndpoint, Marker::new(target, coordinate));
                }
            }
        }

        state
    }

    /// Frames the most recently selected shipment, else the trip, else keeps
    /// wherever the user left the camera.
    fn camera(&self, snapshot: &LifecycleSnapshot, user_camera: CameraPosition) -> CameraPosition {
        let selected = snapshot
            .selection
            .first()
            .and_then(|id| snapshot.shipment(id))
            .and_then(|view| match &view.polyline {
                Some(polyline) if polyline.is_drawable() => polyline.bounds(),
                _ => {
                    let (pickup, delivery) = view.shipment.endpoints()?;
                    BoundingBox::from_points(&[pickup, delivery])
                }
            });
        let trip = || {
            let trip = snapshot.trip.as_ref()?;
            match &trip.polyline {
                Some(polyline) if polyline.is_drawable() => polyline.bounds(),
                _ => BoundingBox::from_points(
                    [trip.origin, trip.destination]
                        .iter()
                        .flatten()
                        .collect::<Vec<&Coordinate>>(),
                ),
            }
        };

        match selected.or_else(trip) {
            Some(bounds) => self.frame(&bounds),
            None => user_camera,
        }
    }

    pub fn frame(&self, bounds: &BoundingBox) -> CameraPosition {
        let zoom = mercator::zoom_to_fit(bounds, &self.config.viewport, self.config.frame_padding_px);
        let zoom = if zoom.is_nan() {
            self.config.max_zoom
        } else {
            zoom.clamp(self.config.min_zoom, self.config.max_zoom)
        };
        CameraPosition::new(bounds.center(), zoom)
    }
}

#[cfg(test)]
mod tests {
    use engine::{ShipmentPhase, ShipmentView, TripView};
    use model::{
        route::RoutePolyline,
        shipment::{LocatedShipment, ShipmentId, ShipmentRecord},
    };

    use super::*;

    fn user_camera() -> CameraPosition {
        CameraPosition::new(Coordinate::new(52.0, 19.0), 6.0)
    }

    fn view(id: &str, phase: ShipmentPhase, polyline: Option<RoutePolyline>) -> ShipmentView {
        let mut shipment = LocatedShipment::new(ShipmentRecord::new(id, "from", "to"));
        shipment.pickup = Some(Coordinate::new(52.20, 21.00));
        shipment.delivery = Some(Coordinate::new(52.30, 21.10));
        ShipmentView {
            shipment,
            phase,
            polyline,
            fetching: false,
        }
    }

    fn line() -> RoutePolyline {
        RoutePolyline::new(vec![Coordinate::new(52.20, 21.00), Coordinate::new(52.30, 21.10)])
    }

    fn id(raw: &str) -> ShipmentId {
        ShipmentRecord::new(raw, "", "").id
    }

    #[test]
    fn empty_snapshot_keeps_user_camera() {
        let planner = SurfacePlanner::new(SurfaceConfig::default());
        let state = planner.plan(&LifecycleSnapshot::default(), user_camera());
        assert!(state.camera.center.same_location(&user_camera().center));
        assert_eq!(state.camera.zoom, 6.0);
        assert!(state.markers_in_order().next().is_none());
    }

    #[test]
    fn visible_shipments_get_pickups_and_selected_ones_deliveries() {
        let planner = SurfacePlanner::new(SurfaceConfig::default());
        let snapshot = LifecycleSnapshot {
            shipments: vec![
                view("a", ShipmentPhase::Routed(RouteRole::Preview), Some(line())),
                view("b", ShipmentPhase::Routed(RouteRole::Selected), Some(line())),
                view("c", ShipmentPhase::Located, None),
            ],
            selection: vec![id("b")],
            trip: None,
        };

        let state = planner.plan(&snapshot, user_camera());

        let pickups: Vec<_> = state
            .markers(MarkerKind::Pickup)
            .iter()
            .map(|marker| marker.target.clone())
            .collect();
        assert_eq!(
            pickups,
            vec![MarkerTarget::Shipment(id("a")), MarkerTarget::Shipment(id("b"))]
        );
        assert_eq!(state.markers(MarkerKind::Delivery).len(), 1);
        assert_eq!(state.routes(RouteRole::Preview).len(), 1);
        assert_eq!(state.routes(RouteRole::Selected).len(), 1);
    }

    #[test]
    fn selected_route_is_framed() {
        let planner = SurfacePlanner::new(SurfaceConfig::default());
        let snapshot = LifecycleSnapshot {
            shipments: vec![view("b", ShipmentPhase::Routed(RouteRole::Selected), Some(line()))],
            selection: vec![id("b")],
            trip: None,
        };

        let camera = planner.plan(&snapshot, user_camera()).camera;
        assert!(camera.center.same_location(&Coordinate::new(52.25, 21.05)));
        assert!(camera.zoom > 6.0 && camera.zoom <= 16.0);
    }

    #[test]
    fn trip_is_drawn_and_framed_without_selection() {
        let planner = SurfacePlanner::new(SurfaceConfig::default());
        let snapshot = LifecycleSnapshot {
            shipments: Vec::new(),
            selection: Vec::new(),
            trip: Some(TripView {
                origin: Some(Coordinate::new(50.06, 19.94)),
                destination: Some(Coordinate::new(54.35, 18.65)),
                origin_label: None,
                polyline: Some(RoutePolyline::new(vec![
                    Coordinate::new(50.06, 19.94),
                    Coordinate::new(54.35, 18.65),
                ])),
            }),
        };

        let state = planner.plan(&snapshot, user_camera());
        assert_eq!(state.routes(RouteRole::PrimaryTrip).len(), 1);
        assert_eq!(state.markers(MarkerKind::TripEndpoint).len(), 2);
        assert!(state.camera.center.same_location(&Coordinate::new(52.205, 19.295)));
    }

    #[test]
    fn single_point_frames_at_max_zoom() {
        let planner = SurfacePlanner::new(SurfaceConfig::default());
        let camera = planner.frame(&BoundingBox::around(&Coordinate::new(52.2, 21.0)));
        assert_eq!(camera.zoom, 16.0);
    }
}

use std::fmt;

use indexmap::IndexMap;

use crate::{
    coordinate::Coordinate,
    route::{RoutePolyline, RouteRole},
    shipment::ShipmentId,
};

/// Kind of point marker. Declaration order is the iteration order used for
/// tap hit-testing, so on equal distance a pickup marker wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKind {
    Pickup,
    Delivery,
    TripEndpoint,
}

impl MarkerKind {
    pub const ALL: [MarkerKind; 3] = [
        MarkerKind::Pickup,
        MarkerKind::Delivery,
        MarkerKind::TripEndpoint,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Pickup => "pickup",
            Self::Delivery => "delivery",
            Self::TripEndpoint => "trip-endpoint",
        }
    }
}

impl fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MarkerTarget {
    Shipment(ShipmentId),
    TripOrigin,
    TripDestination,
}

#[derive(Debug, Clone)]
pub struct Marker {
    pub target: MarkerTarget,
    pub coordinate: Coordinate,
}

impl Marker {
    pub fn new(target: MarkerTarget, coordinate: Coordinate) -> Self {
        Self { target, coordinate }
    }

    pub fn same_as(&self, other: &Marker) -> bool {
        self.target == other.target && self.coordinate.same_location(&other.coordinate)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CameraPosition {
    pub center: Coordinate,
    pub zoom: f64,
}

impl CameraPosition {
    pub fn new(center: Coordinate, zoom: f64) -> Self {
        Self { center, zoom }
    }
}

/// Declarative target of the map surface. Every role and marker kind is
/// always present (possibly empty) and kept in canonical order, which makes
/// iteration over the maps deterministic.
#[derive(Debug, Clone)]
pub struct DesiredSurfaceState {
    pub camera: CameraPosition,
    pub routes_by_role: IndexMap<RouteRole, Vec<RoutePolyline>>,
    pub marker_sets: IndexMap<MarkerKind, Vec<Marker>>,
}

/// What the surface was last told. Same shape as the desired state.
pub type LastAppliedSurfaceState = DesiredSurfaceState;

impl DesiredSurfaceState {
    pub fn new(camera: CameraPosition) -> Self {
        Self {
            camera,
            routes_by_role: RouteRole::ALL
                .iter()
                .map(|role| (*role, Vec::new()))
                .collect(),
            marker_sets: MarkerKind::ALL
                .iter()
                .map(|kind| (*kind, Vec::new()))
                .collect(),
        }
    }

    pub fn routes(&self, role: RouteRole) -> &[RoutePolyline] {
        self.routes_by_role
            .get(&role)
            .map(|routes| routes.as_slice())
            .unwrap_or(&[])
    }

    pub fn markers(&self, kind: MarkerKind) -> &[Marker] {
        self.marker_sets
            .get(&kind)
            .map(|markers| markers.as_slice())
            .unwrap_or(&[])
    }

    /// Adds a route. Undrawable polylines are skipped.
    pub fn push_route(&mut self, role: RouteRole, polyline: RoutePolyline) {
        if polyline.is_drawable() {
            self.routes_by_role.entry(role).or_default().push(polyline);
        }
    }

    pub fn push_marker(&mut self, kind: MarkerKind, marker: Marker) {
        self.marker_sets.entry(kind).or_default().push(marker);
    }

    /// Markers in hit-testing order: by kind, then by insertion.
    pub fn markers_in_order(&self) -> impl Iterator<Item = (MarkerKind, &Marker)> {
        MarkerKind::ALL
            .iter()
            .flat_map(move |kind| self.markers(*kind).iter().map(move |m| (*kind, m)))
    }
}

#[cfg(test)]
mod tests {
    use utility::id::Id;

    use super::*;

    #[test]
    fn new_state_lists_every_role_and_kind() {
        let state = DesiredSurfaceState::new(CameraPosition::new(
            Coordinate::new(54.3, 10.1),
            10.0,
        ));
        assert_eq!(
            state.routes_by_role.keys().copied().collect::<Vec<_>>(),
            RouteRole::ALL.to_vec()
        );
        assert_eq!(
            state.marker_sets.keys().copied().collect::<Vec<_>>(),
            MarkerKind::ALL.to_vec()
        );
    }

    #[test]
    fn undrawable_routes_are_not_pushed() {
        let mut state = DesiredSurfaceState::new(CameraPosition::new(
            Coordinate::new(54.3, 10.1),
            10.0,
        ));
        state.push_route(
            RouteRole::Preview,
            RoutePolyline::new(vec![Coordinate::new(54.3, 10.1)]),
        );
        assert!(state.routes(RouteRole::Preview).is_empty());
    }

    #[test]
    fn markers_iterate_pickups_first() {
        let mut state = DesiredSurfaceState::new(CameraPosition::new(
            Coordinate::new(54.3, 10.1),
            10.0,
        ));
        let here = Coordinate::new(54.3, 10.1);
        state.push_marker(MarkerKind::Delivery, Marker::new(MarkerTarget::Shipment(Id::new("b".into())), here));
        state.push_marker(MarkerKind::Pickup, Marker::new(MarkerTarget::Shipment(Id::new("a".into())), here));
        let kinds = state.markers_in_order().map(|(kind, _)| kind).collect::<Vec<_>>();
        assert_eq!(kinds, vec![MarkerKind::Pickup, MarkerKind::Delivery]);
    }
}

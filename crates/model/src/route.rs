use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{
    coordinate::{BoundingBox, Coordinate},
    shipment::ShipmentId,
    token::RequestToken,
};

/// Ordered path of coordinates. Fewer than two points means there is nothing
/// to draw, which is also how "no route" is represented.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct RoutePolyline {
    points: Vec<Coordinate>,
}

impl RoutePolyline {
    pub fn new(points: Vec<Coordinate>) -> Self {
        Self { points }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Coordinate> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn is_drawable(&self) -> bool {
        self.points.len() >= 2
    }

    pub fn first(&self) -> Option<&Coordinate> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&Coordinate> {
        self.points.last()
    }

    pub fn bounds(&self) -> Option<BoundingBox> {
        BoundingBox::from_points(&self.points)
    }

    /// Same length and every point at the same location.
    pub fn same_path_as(&self, other: &RoutePolyline) -> bool {
        self.points.len() == other.points.len()
            && self
                .points
                .iter()
                .zip(other.points.iter())
                .all(|(a, b)| a.same_location(b))
    }
}

impl From<Vec<Coordinate>> for RoutePolyline {
    fn from(points: Vec<Coordinate>) -> Self {
        Self::new(points)
    }
}

/// Visual and semantic category of a drawn route. Declaration order is the
/// drawing order, bottom to top.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "camelCase")]
pub enum RouteRole {
    PrimaryTrip,
    Preview,
    Bookmarked,
    Selected,
}

impl RouteRole {
    pub const ALL: [RouteRole; 4] = [
        RouteRole::PrimaryTrip,
        RouteRole::Preview,
        RouteRole::Bookmarked,
        RouteRole::Selected,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PrimaryTrip => "primary-trip",
            Self::Preview => "preview",
            Self::Bookmarked => "bookmarked",
            Self::Selected => "selected",
        }
    }
}

impl fmt::Display for RouteRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What a route fetch belongs to. Only one fetch per key may be in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RouteKey {
    Shipment(ShipmentId),
    PrimaryTrip,
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shipment(id) => write!(f, "shipment {id}"),
            Self::PrimaryTrip => f.write_str("primary trip"),
        }
    }
}

/// The route a shipment currently wants drawn. `polyline` stays `None`
/// until a fetch for `role` has completed.
#[derive(Debug, Clone)]
pub struct EntityRouteState {
    pub entity_id: ShipmentId,
    pub role: RouteRole,
    pub polyline: Option<RoutePolyline>,
    pub fetch_token: Option<RequestToken>,
}

impl EntityRouteState {
    pub fn new(entity_id: ShipmentId, role: RouteRole) -> Self {
        Self {
            entity_id,
            role,
            polyline: None,
            fetch_token: None,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.fetch_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)]) -> RoutePolyline {
        points
            .iter()
            .map(|(lat, lon)| Coordinate::new(*lat, *lon))
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn drawable_needs_two_points() {
        assert!(!RoutePolyline::empty().is_drawable());
        assert!(!line(&[(52.2, 21.0)]).is_drawable());
        assert!(line(&[(52.2, 21.0), (52.3, 21.1)]).is_drawable());
    }

    #[test]
    fn same_path_compares_length_and_points() {
        let a = line(&[(52.2, 21.0), (52.3, 21.1)]);
        assert!(a.same_path_as(&line(&[(52.2, 21.0), (52.3, 21.1)])));
        assert!(!a.same_path_as(&line(&[(52.2, 21.0)])));
        assert!(!a.same_path_as(&line(&[(52.2, 21.0), (52.3, 21.2)])));
    }

    #[test]
    fn roles_sort_in_drawing_order() {
        let mut roles = vec![RouteRole::Selected, RouteRole::PrimaryTrip, RouteRole::Preview];
        roles.sort();
        assert_eq!(
            roles,
            vec![RouteRole::PrimaryTrip, RouteRole::Preview, RouteRole::Selected]
        );
    }
}

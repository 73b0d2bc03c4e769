use itertools::Itertools;
use model::{
    coordinate::{BoundingBox, Coordinate},
    route::RoutePolyline,
    shipment::LocatedShipment,
    sort_nearest_first, WithDistance,
};
use utility::geo;

pub const DEFAULT_MAX_ROUTE_POINTS: usize = 50;

/// What a shipment's pickup is measured against.
#[derive(Debug, Clone, Copy)]
pub enum Reference<'a> {
    Point(Coordinate),
    Route(&'a RoutePolyline),
}

/// Decides which shipments are near a point or along a route.
#[derive(Debug, Clone, Copy)]
pub struct ProximityFilter {
    max_points: usize,
}

impl Default for ProximityFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ROUTE_POINTS)
    }
}

impl ProximityFilter {
    pub fn new(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(2),
        }
    }

    pub fn distance_km(a: &Coordinate, b: &Coordinate) -> f64 {
        a.distance_km(b)
    }

    /// Samples the route down to at most `max_points` with a uniform stride.
    /// The last point is always kept.
    pub fn simplify(&self, polyline: &RoutePolyline) -> Vec<Coordinate> {
        let points = polyline.points();
        if points.len() <= self.max_points {
            return points.to_vec();
        }
        let stride = (points.len() - 1).div_ceil(self.max_points - 1);
        let mut sampled: Vec<Coordinate> = points[..points.len() - 1]
            .iter()
            .step_by(stride)
            .copied()
            .collect();
        sampled.extend(points.last().copied());
        sampled
    }

    /// Simplifies `route` once so it can be checked against many shipments.
    /// `None` if the route has fewer than two points, in which case nothing is
    /// near it.
    pub fn prepare(&self, route: &RoutePolyline, max_distance_km: f64) -> Option<PreparedRoute> {
        if !route.is_drawable() {
            return None;
        }
        let points = self.simplify(route);
        let bounds = BoundingBox::from_points(&points)?;
        Some(PreparedRoute {
            bounds: expand_by_km(&bounds, max_distance_km),
            points,
            max_distance_km,
        })
    }

    /// Shipments without a pickup coordinate are never within range.
    pub fn is_within(
        &self,
        shipment: &LocatedShipment,
        reference: Reference<'_>,
        max_distance_km: f64,
    ) -> bool {
        let Some(pickup) = shipment.pickup else {
            return false;
        };
        match reference {
            Reference::Point(center) => point_within(&pickup, &center, max_distance_km),
            Reference::Route(route) => self
                .prepare(route, max_distance_km)
                .is_some_and(|prepared| prepared.admits(&pickup)),
        }
    }

    pub fn near_route<'a, I>(
        &self,
        shipments: I,
        route: &RoutePolyline,
        max_distance_km: f64,
    ) -> Vec<&'a LocatedShipment>
    where
        I: IntoIterator<Item = &'a LocatedShipment>,
    {
        let Some(prepared) = self.prepare(route, max_distance_km) else {
            return Vec::new();
        };
        shipments
            .into_iter()
            .filter(|shipment| shipment.pickup.is_some_and(|pickup| prepared.admits(&pickup)))
            .collect()
    }

    pub fn within_radius<'a, I>(
        &self,
        shipments: I,
        center: &Coordinate,
        radius_km: f64,
    ) -> Vec<&'a LocatedShipment>
    where
        I: IntoIterator<Item = &'a LocatedShipment>,
    {
        shipments
            .into_iter()
            .filter(|shipment| {
                shipment
                    .pickup
                    .is_some_and(|pickup| point_within(&pickup, center, radius_km))
            })
            .collect()
    }

    /// Located shipments ordered by pickup distance to `point`, nearest first.
    pub fn sort_by_distance<'a, I>(
        &self,
        shipments: I,
        point: &Coordinate,
    ) -> Vec<WithDistance<LocatedShipment>>
    where
        I: IntoIterator<Item = &'a LocatedShipment>,
    {
        let mut sorted: Vec<_> = shipments
            .into_iter()
            .filter_map(|shipment| {
                let pickup = shipment.pickup?;
                Some(WithDistance::new(
                    pickup.distance_km(point),
                    shipment.clone(),
                ))
            })
            .collect();
        sort_nearest_first(&mut sorted);
        sorted
    }
}

pub fn point_within(candidate: &Coordinate, center: &Coordinate, radius_km: f64) -> bool {
    BoundingBox::around_radius(center, radius_km).contains(candidate)
        && candidate.distance_km(center) <= radius_km
}

/// Grows `bounds` by `km` on every side. Longitude degrees shrink towards the
/// poles, so the longitude margin is widened for the most poleward latitude
/// in the box.
fn expand_by_km(bounds: &BoundingBox, km: f64) -> BoundingBox {
    let latitude_margin = geo::km_to_degrees(km);
    let poleward = (bounds.min_latitude.abs().max(bounds.max_latitude.abs()) + latitude_margin)
        .min(90.0);
    let cos = geo::to_radians(poleward).cos();
    let longitude_margin = if cos < 1e-6 {
        360.0
    } else {
        (latitude_margin / cos).min(360.0)
    };
    BoundingBox {
        min_latitude: bounds.min_latitude - latitude_margin,
        min_longitude: bounds.min_longitude - longitude_margin,
        max_latitude: bounds.max_latitude + latitude_margin,
        max_longitude: bounds.max_longitude + longitude_margin,
    }
}

/// A simplified route with its padded bounding box.
#[derive(Debug, Clone)]
pub struct PreparedRoute {
    points: Vec<Coordinate>,
    bounds: BoundingBox,
    max_distance_km: f64,
}

impl PreparedRoute {
    pub fn points(&self) -> &[Coordinate] {
        &self.points
    }

    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    /// Cheap box check first, then the first segment in range wins.
    pub fn admits(&self, candidate: &Coordinate) -> bool {
        self.bounds.contains(candidate)
            && self
                .points
                .iter()
                .tuple_windows()
                .any(|(a, b)| distance_to_segment_km(candidate, a, b) <= self.max_distance_km)
    }

    pub fn distance_km(&self, candidate: &Coordinate) -> f64 {
        self.points
            .iter()
            .tuple_windows()
            .map(|(a, b)| distance_to_segment_km(candidate, a, b))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Projects onto the segment in a local equirectangular plane, clamps to the
/// segment and measures the great-circle distance to the projection.
/// Longitude differences take the short way across the antimeridian.
pub fn distance_to_segment_km(point: &Coordinate, a: &Coordinate, b: &Coordinate) -> f64 {
    let scale = geo::to_radians((a.latitude + b.latitude) / 2.0).cos();
    let span = geo::wrap_longitude(b.longitude - a.longitude);
    let (dx, dy) = (span * scale, b.latitude - a.latitude);
    let (px, py) = (
        geo::wrap_longitude(point.longitude - a.longitude) * scale,
        point.latitude - a.latitude,
    );

    let length_squared = dx * dx + dy * dy;
    let t = if length_squared == 0.0 {
        0.0
    } else {
        ((px * dx + py * dy) / length_squared).clamp(0.0, 1.0)
    };
    let projection = Coordinate::new(
        a.latitude + t * (b.latitude - a.latitude),
        geo::wrap_longitude(a.longitude + t * span),
    );
    point.distance_km(&projection)
}

#[cfg(test)]
mod tests {
    use model::shipment::ShipmentRecord;

    use super::*;

    fn located(id: &str, latitude: f64, longitude: f64) -> LocatedShipment {
        let mut shipment = LocatedShipment::new(ShipmentRecord::new(id, "pickup", "delivery"));
        shipment.pickup = Some(Coordinate::new(latitude, longitude));
        shipment
    }

    fn warsaw_route() -> RoutePolyline {
        RoutePolyline::new(vec![
            Coordinate::new(52.20, 21.00),
            Coordinate::new(52.25, 21.05),
        ])
    }

    #[test]
    fn shipment_next_to_route_is_within_range() {
        let filter = ProximityFilter::default();
        let shipment = located("e1", 52.23, 21.01);
        let route = warsaw_route();

        assert!(filter.is_within(&shipment, Reference::Route(&route), 5.0));
        assert!(!filter.is_within(&shipment, Reference::Route(&route), 0.001));
    }

    #[test]
    fn far_shipment_is_rejected() {
        let filter = ProximityFilter::default();
        let shipment = located("e2", 50.06, 19.94);
        let route = warsaw_route();

        assert!(!filter.is_within(&shipment, Reference::Route(&route), 5.0));
        assert!(filter.near_route([&shipment], &route, 5.0).is_empty());
    }

    #[test]
    fn unlocated_shipment_is_excluded() {
        let filter = ProximityFilter::default();
        let shipment = LocatedShipment::new(ShipmentRecord::new("e3", "pickup", "delivery"));
        let route = warsaw_route();

        assert!(!filter.is_within(&shipment, Reference::Route(&route), 1000.0));
        assert!(!filter.is_within(
            &shipment,
            Reference::Point(Coordinate::new(52.2, 21.0)),
            1000.0
        ));
    }

    #[test]
    fn degenerate_route_admits_nothing() {
        let filter = ProximityFilter::default();
        let shipment = located("e1", 52.20, 21.00);
        let single = RoutePolyline::new(vec![Coordinate::new(52.20, 21.00)]);

        assert!(!filter.is_within(&shipment, Reference::Route(&single), 10.0));
        assert!(!filter.is_within(&shipment, Reference::Route(&RoutePolyline::empty()), 10.0));
    }

    #[test]
    fn range_is_monotonic_in_distance() {
        let filter = ProximityFilter::default();
        let route = warsaw_route();
        let shipments: Vec<_> = (0..20)
            .map(|step| located(&format!("s{step}"), 52.10 + step as f64 * 0.01, 21.10))
            .collect();

        let near = filter.near_route(&shipments, &route, 2.0).len();
        let wider = filter.near_route(&shipments, &route, 8.0).len();
        let widest = filter.near_route(&shipments, &route, 30.0).len();
        assert!(near <= wider);
        assert!(wider <= widest);
        assert_eq!(widest, shipments.len());
    }

    #[test]
    fn bounding_box_never_rejects_a_shipment_in_range() {
        let filter = ProximityFilter::default();
        // high latitude, where a degree of longitude is much shorter than
        // a degree of latitude
        let route = RoutePolyline::new(vec![
            Coordinate::new(69.60, 18.90),
            Coordinate::new(69.70, 19.00),
        ]);
        let prepared = filter.prepare(&route, 10.0).expect("drawable route");

        let mut checked = 0;
        for step in 0..80 {
            let candidate = Coordinate::new(69.65, 18.60 + step as f64 * 0.01);
            if prepared.distance_km(&candidate) <= 10.0 {
                checked += 1;
                assert!(prepared.bounds().contains(&candidate));
                assert!(prepared.admits(&candidate));
            }
        }
        assert!(checked > 0);
    }

    #[test]
    fn radius_check_keeps_a_shipment_in_range_at_high_latitude() {
        let filter = ProximityFilter::default();
        let center = Coordinate::new(80.0, 10.0);
        // poleward and east of the centre, just inside the radius
        let candidate = Coordinate::new(81.06, 36.5);
        assert!(candidate.distance_km(&center) < 500.0);
        assert!(point_within(&candidate, &center, 500.0));

        let shipments = vec![located("svalbard", 81.06, 36.5)];
        let inside = filter.within_radius(&shipments, &center, 500.0);
        assert_eq!(inside.len(), 1);

        for step in 0..90 {
            let candidate = Coordinate::new(80.0 + step as f64 * 0.05, 10.0 + step as f64 * 0.4);
            if candidate.distance_km(&center) <= 500.0 {
                assert!(point_within(&candidate, &center, 500.0), "{candidate:?}");
            }
        }
    }

    #[test]
    fn segments_across_the_antimeridian_take_the_short_way() {
        let a = Coordinate::new(0.0, 179.9);
        let b = Coordinate::new(0.0, -179.9);
        let on_route = Coordinate::new(0.05, 180.0);
        let distance = distance_to_segment_km(&on_route, &a, &b);
        assert!(distance < 6.0, "got {distance}");

        let route = RoutePolyline::new(vec![a, b]);
        let prepared = ProximityFilter::default()
            .prepare(&route, 10.0)
            .expect("drawable route");
        assert!(prepared.distance_km(&on_route) < 6.0);
    }

    #[test]
    fn simplify_caps_points_and_keeps_the_end() {
        let filter = ProximityFilter::new(50);
        let points: Vec<_> = (0..1000)
            .map(|step| Coordinate::new(52.0 + step as f64 * 0.001, 21.0))
            .collect();
        let route = RoutePolyline::new(points);

        let simplified = filter.simplify(&route);
        assert!(simplified.len() <= 50);
        assert!(simplified[0].same_location(&Coordinate::new(52.0, 21.0)));
        assert!(simplified
            .last()
            .is_some_and(|last| last.same_location(&Coordinate::new(52.999, 21.0))));

        let short = RoutePolyline::new(vec![
            Coordinate::new(1.0, 1.0),
            Coordinate::new(2.0, 2.0),
        ]);
        assert_eq!(filter.simplify(&short).len(), 2);
    }

    #[test]
    fn segment_projection_is_clamped_to_the_endpoints() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(0.0, 1.0);
        let beyond = Coordinate::new(0.0, 2.0);

        let distance = distance_to_segment_km(&beyond, &a, &b);
        assert!((distance - beyond.distance_km(&b)).abs() < 1e-6);
        assert!(distance_to_segment_km(&Coordinate::new(0.0, 0.5), &a, &b) < 1e-6);
    }

    #[test]
    fn radius_and_sorting() {
        let filter = ProximityFilter::default();
        let center = Coordinate::new(52.23, 21.01);
        let shipments = vec![
            located("far", 50.06, 19.94),
            located("near", 52.24, 21.02),
            located("nearest", 52.23, 21.011),
            LocatedShipment::new(ShipmentRecord::new("unlocated", "a", "b")),
        ];

        let inside = filter.within_radius(&shipments, &center, 10.0);
        assert_eq!(inside.len(), 2);

        let sorted = filter.sort_by_distance(&shipments, &center);
        let ids: Vec<_> = sorted.iter().map(|entry| entry.content.id.raw()).collect();
        assert_eq!(ids, vec!["nearest", "near", "far"]);
    }
}

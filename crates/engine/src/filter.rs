use model::coordinate::Coordinate;

/// Which located shipments are shown. Bookmarked and selected shipments are
/// shown regardless.
#[derive(Debug, Clone, Copy, Default)]
pub enum VisibilityFilter {
    #[default]
    All,
    /// Pickup within `radius_km` of `center`.
    Radius { center: Coordinate, radius_km: f64 },
    /// Pickup within `max_distance_km` of the primary trip route. Shows
    /// nothing while there is no drawable trip route.
    NearTrip { max_distance_km: f64 },
}

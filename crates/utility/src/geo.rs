pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Rough length of one degree of latitude. Good enough for pre-filtering,
/// never used for the final distance check.
pub const KM_PER_DEGREE: f64 = 111.0;

pub fn to_radians(degrees: f64) -> f64 {
    degrees * std::f64::consts::PI / 180.0
}

pub fn to_degrees(radians: f64) -> f64 {
    radians * 180.0 / std::f64::consts::PI
}

pub fn km_to_degrees(km: f64) -> f64 {
    km / KM_PER_DEGREE
}

/// Brings a longitude or longitude difference into `[-180, 180)`.
pub fn wrap_longitude(degrees: f64) -> f64 {
    (degrees + 180.0).rem_euclid(360.0) - 180.0
}

/// Returns `((min_lat, min_lon), (max_lat, max_lon))` of the box around a
/// point. The longitude half-width is where a meridian touches the circle,
/// which lies poleward of the centre. Once the circle reaches a pole every
/// longitude is covered.
pub fn calculate_bounding_box(
    lat: f64,
    lon: f64,
    radius_km: f64,
) -> ((f64, f64), (f64, f64)) {
    let lat_rad = to_radians(lat);
    let lon_rad = to_radians(lon);
    let angular = radius_km / EARTH_RADIUS_KM;
    let half_pi = std::f64::consts::FRAC_PI_2;

    let min_lat = lat_rad - angular;
    let max_lat = lat_rad + angular;

    let cos_lat = lat_rad.cos();
    let reaches_pole = max_lat >= half_pi || min_lat <= -half_pi;
    let (min_lon, max_lon) = if reaches_pole || angular.sin() >= cos_lat {
        (-std::f64::consts::PI, std::f64::consts::PI)
    } else {
        let half_width = (angular.sin() / cos_lat).asin();
        (lon_rad - half_width, lon_rad + half_width)
    };

    (
        (to_degrees(min_lat.max(-half_pi)), to_degrees(min_lon)),
        (to_degrees(max_lat.min(half_pi)), to_degrees(max_lon)),
    )
}

pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = to_radians(latitude_1);
    let lon1_rad = to_radians(longitude_1);
    let lat2_rad = to_radians(latitude_2);
    let lon2_rad = to_radians(longitude_2);

    let dlat = lat2_rad - lat1_rad;
    let dlon = lon2_rad - lon1_rad;

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}

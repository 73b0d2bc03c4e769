use std::{env, str::FromStr, time::Duration};

use crate::filter::VisibilityFilter;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Quiet period before a bulk re-scan runs.
    pub debounce: Duration,
    /// Reference routes are sampled down to this many points before
    /// proximity checks.
    pub max_route_points: usize,
    /// Default range around the primary trip.
    pub trip_radius_km: f64,
    pub mailbox_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            max_route_points: 50,
            trip_radius_km: 20.0,
            mailbox_capacity: actors::DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

fn env_value<T: FromStr>(name: &str) -> Option<T> {
    let value = env::var(name).ok()?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            log::warn!("ignoring invalid value {:?} for {}", value, name);
            None
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `ENGINE_DEBOUNCE_MS`, `ENGINE_MAX_ROUTE_POINTS`,
    /// `ENGINE_TRIP_RADIUS_KM` and `ENGINE_MAILBOX_CAPACITY`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(millis) = env_value::<u64>("ENGINE_DEBOUNCE_MS") {
            config.debounce = Duration::from_millis(millis);
        }
        if let Some(points) = env_value::<usize>("ENGINE_MAX_ROUTE_POINTS") {
            config.max_route_points = points.max(2);
        }
        if let Some(radius) = env_value::<f64>("ENGINE_TRIP_RADIUS_KM") {
            if radius.is_finite() && radius >= 0.0 {
                config.trip_radius_km = radius;
            }
        }
        if let Some(capacity) = env_value::<usize>("ENGINE_MAILBOX_CAPACITY") {
            config.mailbox_capacity = capacity.max(1);
        }
        config
    }

    pub fn near_trip_filter(&self) -> VisibilityFilter {
        VisibilityFilter::NearTrip {
            max_distance_km: self.trip_radius_km,
        }
    }
}

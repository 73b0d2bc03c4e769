use std::time::Duration;

use crate::renderer::Viewport;

#[derive(Debug, Clone)]
pub struct SurfaceConfig {
    /// A tap selects the nearest marker at most this far away.
    pub tap_threshold_px: f64,
    pub bounce_duration: Duration,
    /// How often running animations are advanced.
    pub frame_interval: Duration,
    /// Camera moves smaller than this are not sent to the surface.
    pub camera_epsilon_deg: f64,
    pub zoom_epsilon: f64,
    pub viewport: Viewport,
    /// Space kept free around a framed route.
    pub frame_padding_px: f64,
    pub min_zoom: f64,
    pub max_zoom: f64,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            tap_threshold_px: 50.0,
            bounce_duration: Duration::from_millis(200),
            frame_interval: Duration::from_millis(16),
            camera_epsilon_deg: 1e-6,
            zoom_epsilon: 1e-3,
            viewport: Viewport::new(1080.0, 1920.0),
            frame_padding_px: 64.0,
            min_zoom: 2.0,
            max_zoom: 16.0,
        }
    }
}

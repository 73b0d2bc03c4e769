use std::f64::consts::PI;

use model::{
    coordinate::{BoundingBox, Coordinate},
    surface::CameraPosition,
};

use crate::renderer::{ScreenPoint, Viewport};

pub const TILE_SIZE: f64 = 256.0;
pub const MAX_LATITUDE: f64 = 85.051_128_78;

pub fn world_size(zoom: f64) -> f64 {
    TILE_SIZE * zoom.exp2()
}

/// Pixel position in the whole-world image at `zoom`.
pub fn to_world(coordinate: &Coordinate, zoom: f64) -> (f64, f64) {
    let size = world_size(zoom);
    let latitude = coordinate.latitude.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let x = (coordinate.longitude + 180.0) / 360.0 * size;
    let y = (1.0 - (latitude.tan() + 1.0 / latitude.cos()).ln() / PI) / 2.0 * size;
    (x, y)
}

pub fn from_world(x: f64, y: f64, zoom: f64) -> Coordinate {
    let size = world_size(zoom);
    let longitude = x / size * 360.0 - 180.0;
    let n = PI - 2.0 * PI * y / size;
    let latitude = n.sinh().atan().to_degrees();
    Coordinate::new(latitude, longitude)
}

pub fn project(camera: &CameraPosition, viewport: &Viewport, coordinate: &Coordinate) -> ScreenPoint {
    let (cx, cy) = to_world(&camera.center, camera.zoom);
    let (x, y) = to_world(coordinate, camera.zoom);
    let middle = viewport.center();
    ScreenPoint::new(x - cx + middle.x, y - cy + middle.y)
}

pub fn unproject(camera: &CameraPosition, viewport: &Viewport, point: ScreenPoint) -> Coordinate {
    let (cx, cy) = to_world(&camera.center, camera.zoom);
    let middle = viewport.center();
    from_world(point.x - middle.x + cx, point.y - middle.y + cy, camera.zoom)
}

/// Largest zoom at which `bounds` fits the viewport minus `padding` on each
/// side. Infinite for a single point.
pub fn zoom_to_fit(bounds: &BoundingBox, viewport: &Viewport, padding: f64) -> f64 {
    let (min_x, max_y) = to_world(
        &Coordinate::new(bounds.min_latitude, bounds.min_longitude),
        0.0,
    );
    let (max_x, min_y) = to_world(
        &Coordinate::new(bounds.max_latitude, bounds.max_longitude),
        0.0,
    );
    let width = (viewport.width - 2.0 * padding).max(1.0);
    let height = (viewport.height - 2.0 * padding).max(1.0);

    let zoom_x = (width / (max_x - min_x)).log2();
    let zoom_y = (height / (max_y - min_y)).log2();
    zoom_x.min(zoom_y)
}

use indexmap::IndexMap;
use model::{coordinate::Coordinate, surface::CameraPosition};

/// Geometry of a named source, in map coordinates.
#[derive(Debug, Clone)]
pub enum Geometry {
    Point(Coordinate),
    MultiPoint(Vec<Coordinate>),
    LineString(Vec<Coordinate>),
    MultiLineString(Vec<Vec<Coordinate>>),
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Point(_) => false,
            Self::MultiPoint(points) | Self::LineString(points) => points.is_empty(),
            Self::MultiLineString(lines) => lines.iter().all(Vec::is_empty),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Size of the map view in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn center(&self) -> ScreenPoint {
        ScreenPoint::new(self.width / 2.0, self.height / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintValue {
    Color(String),
    Number(f64),
    Text(String),
}

pub type Paint = IndexMap<String, PaintValue>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerKind {
    Line,
    Symbol,
}

/// A styled layer drawing one source.
#[derive(Debug, Clone)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub kind: LayerKind,
    pub paint: Paint,
    /// Higher draws on top.
    pub z_index: i32,
}

/// The map widget. Sources and layers are addressed by name; the surface
/// keeps whatever it was last given.
pub trait RenderingSurface {
    fn add_source(&mut self, name: &str, geometry: Geometry);
    fn update_source(&mut self, name: &str, geometry: Geometry);
    fn remove_source(&mut self, name: &str);
    fn add_layer(&mut self, layer: LayerSpec);
    fn remove_layer(&mut self, id: &str);
    fn set_paint(&mut self, layer: &str, property: &str, value: PaintValue);
    fn camera(&self) -> CameraPosition;
    fn set_camera(&mut self, camera: CameraPosition);
    fn viewport(&self) -> Viewport;
    /// Screen position of a map coordinate under the current camera.
    fn project(&self, coordinate: &Coordinate) -> ScreenPoint;
    /// Map coordinate under a screen position.
    fn unproject(&self, point: ScreenPoint) -> Coordinate;
}

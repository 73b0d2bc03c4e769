//! Drawing side of the route lifecycle: turns snapshots into a desired map
//! state and pushes only the differences to a rendering surface.

pub mod bounce;
pub mod config;
pub mod driver;
pub mod layers;
pub mod mercator;
pub mod planner;
pub mod recording;
pub mod renderer;
pub mod synchronizer;

pub use config::SurfaceConfig;
pub use planner::SurfacePlanner;
pub use recording::RecordingSurface;
pub use renderer::{Geometry, RenderingSurface, ScreenPoint, Viewport};
pub use synchronizer::{MapSynchronizer, TapHit};

use std::collections::HashSet;

use model::{
    coordinate::Coordinate,
    route::{RoutePolyline, RouteRole},
    surface::{CameraPosition, DesiredSurfaceState, LastAppliedSurfaceState, Marker, MarkerKind},
};
use tokio::time::Instant;

use crate::{
    bounce::BounceAnimator,
    config::SurfaceConfig,
    layers,
    renderer::{Geometry, LayerSpec, PaintValue, RenderingSurface, ScreenPoint},
};

/// The marker a tap landed on.
#[derive(Debug, Clone)]
pub struct TapHit {
    pub kind: MarkerKind,
    pub marker: Marker,
    pub distance_px: f64,
}

fn same_routes(a: &[RoutePolyline], b: &[RoutePolyline]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_path_as(b))
}

fn same_markers(a: &[Marker], b: &[Marker]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(a, b)| a.same_as(b))
}

/// Keeps a rendering surface in line with the desired state, touching only
/// what changed since the last reconcile.
pub struct MapSynchronizer<S: RenderingSurface> {
    surface: S,
    config: SurfaceConfig,
    last_applied: Option<LastAppliedSurfaceState>,
    /// Sources whose layer exists on the surface.
    created: HashSet<String>,
    bounce: BounceAnimator,
}

impl<S: RenderingSurface> MapSynchronizer<S> {
    pub fn new(surface: S, config: SurfaceConfig) -> Self {
        Self {
            bounce: BounceAnimator::new(config.bounce_duration),
            surface,
            config,
            last_applied: None,
            created: HashSet::new(),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn config(&self) -> &SurfaceConfig {
        &self.config
    }

    pub fn last_applied(&self) -> Option<&LastAppliedSurfaceState> {
        self.last_applied.as_ref()
    }

    /// Applies `desired` and returns the number of surface mutations issued.
    pub fn reconcile(&mut self, desired: &DesiredSurfaceState) -> usize {
        let previous = self.last_applied.take();
        let mut mutations = 0;

        let camera_moved = previous
            .as_ref()
            .map_or(true, |previous| !self.same_camera(&previous.camera, &desired.camera));
        if camera_moved {
            self.surface.set_camera(desired.camera);
            mutations += 1;
        }

        for role in RouteRole::ALL {
            let routes = desired.routes(role);
            let unchanged = previous
                .as_ref()
                .is_some_and(|previous| same_routes(previous.routes(role), routes));
            if unchanged {
                continue;
            }
            let geometry = Geometry::MultiLineString(
                routes
                    .iter()
                    .map(|route| route.points().to_vec())
                    .collect(),
            );
            mutations += self.push_source(
                layers::route_source(role),
                geometry,
                routes.is_empty(),
                || layers::route_layer_spec(role),
            );
        }

        for kind in MarkerKind::ALL {
            let markers = desired.markers(kind);
            let unchanged = previous
                .as_ref()
                .is_some_and(|previous| same_markers(previous.markers(kind), markers));
            if unchanged {
                continue;
            }
            let geometry = Geometry::MultiPoint(
                markers.iter().map(|marker| marker.coordinate).collect(),
            );
            mutations += self.push_source(
                layers::marker_source(kind),
                geometry,
                markers.is_empty(),
                || layers::marker_layer_spec(kind),
            );
        }

        if mutations > 0 {
            log::debug!("reconciled map surface with {} mutations", mutations);
        }
        self.last_applied = Some(desired.clone());
        mutations
    }

    /// Creates the source and its layer on first non-empty use. Once created
    /// they stay, emptied rather than removed.
    fn push_source<F>(&mut self, source: String, geometry: Geometry, empty: bool, layer: F) -> usize
    where
        F: FnOnce() -> LayerSpec,
    {
        if self.created.contains(&source) {
            self.surface.update_source(&source, geometry);
            1
        } else if empty {
            0
        } else {
            self.surface.add_source(&source, geometry);
            self.surface.add_layer(layer());
            self.created.insert(source);
            2
        }
    }

    fn same_camera(&self, a: &CameraPosition, b: &CameraPosition) -> bool {
        a.center
            .same_location_within(&b.center, self.config.camera_epsilon_deg)
            && (a.zoom - b.zoom).abs() <= self.config.zoom_epsilon
    }

    /// Nearest rendered marker within the tap threshold. Markers are visited
    /// pickup first, then delivery, then trip endpoints, each in insertion
    /// order; on equal distance the first visited wins.
    pub fn hit_test(&self, point: ScreenPoint) -> Option<TapHit> {
        let applied = self.last_applied.as_ref()?;
        let mut best: Option<TapHit> = None;
        for (kind, marker) in applied.markers_in_order() {
            let distance_px = self.surface.project(&marker.coordinate).distance_to(&point);
            if distance_px > self.config.tap_threshold_px {
                continue;
            }
            if best.as_ref().map_or(true, |best| distance_px < best.distance_px) {
                best = Some(TapHit {
                    kind,
                    marker: marker.clone(),
                    distance_px,
                });
            }
        }
        best
    }

    /// Hit-tests a tap and starts the bounce of the marker kind that was hit.
    /// Taps landing while that kind is still bouncing are ignored.
    pub fn tap(&mut self, point: ScreenPoint, now: Instant) -> Option<TapHit> {
        let hit = self.hit_test(point)?;
        if !self.bounce.start(hit.kind, now) {
            log::debug!("ignoring tap on {} while it bounces", hit.kind);
            return None;
        }
        self.animate(now);
        Some(hit)
    }

    /// Map coordinate under a tap, for taps that hit no marker.
    pub fn tapped_coordinate(&self, point: ScreenPoint) -> Coordinate {
        self.surface.unproject(point)
    }

    pub fn is_animating(&self) -> bool {
        self.bounce.is_animating()
    }

    /// Advances running animations to `now`.
    pub fn animate(&mut self, now: Instant) {
        for (kind, scale) in self.bounce.frame(now) {
            let layer = layers::marker_layer(kind);
            if self.created.contains(&layers::marker_source(kind)) {
                self.surface
                    .set_paint(&layer, layers::ICON_SIZE, PaintValue::Number(scale));
            }
        }
    }
}

use indexmap::IndexMap;
use model::{coordinate::Coordinate, surface::CameraPosition};

use crate::{
    mercator,
    renderer::{Geometry, LayerSpec, PaintValue, RenderingSurface, ScreenPoint, Viewport},
};

#[derive(Debug, Clone)]
pub enum Mutation {
    AddSource(String),
    UpdateSource(String),
    RemoveSource(String),
    AddLayer(String),
    RemoveLayer(String),
    SetPaint {
        layer: String,
        property: String,
        value: PaintValue,
    },
    SetCamera(CameraPosition),
}

/// An in-memory surface that keeps what it was told and logs every call.
/// Projection is plain web mercator around the camera.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    viewport: Viewport,
    camera: CameraPosition,
    sources: IndexMap<String, Geometry>,
    layers: IndexMap<String, LayerSpec>,
    mutations: Vec<Mutation>,
}

impl RecordingSurface {
    pub fn new(viewport: Viewport, camera: CameraPosition) -> Self {
        Self {
            viewport,
            camera,
            sources: IndexMap::new(),
            layers: IndexMap::new(),
            mutations: Vec::new(),
        }
    }

    pub fn source(&self, name: &str) -> Option<&Geometry> {
        self.sources.get(name)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.get(id)
    }

    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Returns and forgets the mutations recorded so far.
    pub fn take_mutations(&mut self) -> Vec<Mutation> {
        std::mem::take(&mut self.mutations)
    }
}

impl RenderingSurface for RecordingSurface {
    fn add_source(&mut self, name: &str, geometry: Geometry) {
        log::debug!("add source {}", name);
        self.sources.insert(name.to_owned(), geometry);
        self.mutations.push(Mutation::AddSource(name.to_owned()));
    }

    fn update_source(&mut self, name: &str, geometry: Geometry) {
        log::debug!("update source {}", name);
        self.sources.insert(name.to_owned(), geometry);
        self.mutations.push(Mutation::UpdateSource(name.to_owned()));
    }

    fn remove_source(&mut self, name: &str) {
        self.sources.shift_remove(name);
        self.mutations.push(Mutation::RemoveSource(name.to_owned()));
    }

    fn add_layer(&mut self, layer: LayerSpec) {
        log::debug!("add layer {} on {}", layer.id, layer.source);
        self.mutations.push(Mutation::AddLayer(layer.id.clone()));
        self.layers.insert(layer.id.clone(), layer);
        self.layers.sort_by(|_, a, _, b| a.z_index.cmp(&b.z_index));
    }

    fn remove_layer(&mut self, id: &str) {
        self.layers.shift_remove(id);
        self.mutations.push(Mutation::RemoveLayer(id.to_owned()));
    }

    fn set_paint(&mut self, layer: &str, property: &str, value: PaintValue) {
        if let Some(spec) = self.layers.get_mut(layer) {
            spec.paint.insert(property.to_owned(), value.clone());
        }
        self.mutations.push(Mutation::SetPaint {
            layer: layer.to_owned(),
            property: property.to_owned(),
            value,
        });
    }

    fn camera(&self) -> CameraPosition {
        self.camera
    }

    fn set_camera(&mut self, camera: CameraPosition) {
        log::debug!(
            "camera to {:.5},{:.5} zoom {:.2}",
            camera.center.latitude,
            camera.center.longitude,
            camera.zoom
        );
        self.camera = camera;
        self.mutations.push(Mutation::SetCamera(camera));
    }

    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn project(&self, coordinate: &Coordinate) -> ScreenPoint {
        mercator::project(&self.camera, &self.viewport, coordinate)
    }

    fn unproject(&self, point: ScreenPoint) -> Coordinate {
        mercator::unproject(&self.camera, &self.viewport, point)
    }
}

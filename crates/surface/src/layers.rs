//! Names and styles of the sources and layers the synchronizer creates.

use model::{route::RouteRole, surface::MarkerKind};

use crate::renderer::{LayerKind, LayerSpec, Paint, PaintValue};

pub const ICON_SIZE: &str = "icon-size";
pub const RESTING_ICON_SIZE: f64 = 1.0;

pub fn route_source(role: RouteRole) -> String {
    format!("route-{}", role.name())
}

pub fn route_layer(role: RouteRole) -> String {
    format!("route-{}-line", role.name())
}

pub fn marker_source(kind: MarkerKind) -> String {
    format!("marker-{}", kind.name())
}

pub fn marker_layer(kind: MarkerKind) -> String {
    format!("marker-{}-symbol", kind.name())
}

fn paint<const N: usize>(entries: [(&str, PaintValue); N]) -> Paint {
    entries
        .into_iter()
        .map(|(property, value)| (property.to_owned(), value))
        .collect()
}

fn color(hex: &str) -> PaintValue {
    PaintValue::Color(hex.to_owned())
}

/// Routes stack in role order, so a selected route is drawn over its
/// preview.
pub fn route_layer_spec(role: RouteRole) -> LayerSpec {
    let (line_color, width, opacity) = match role {
        RouteRole::PrimaryTrip => ("#1f6feb", 6.0, 0.9),
        RouteRole::Preview => ("#8b949e", 3.0, 0.6),
        RouteRole::Bookmarked => ("#d29922", 4.0, 0.8),
        RouteRole::Selected => ("#2ea043", 6.0, 1.0),
    };
    LayerSpec {
        id: route_layer(role),
        source: route_source(role),
        kind: LayerKind::Line,
        paint: paint([
            ("line-color", color(line_color)),
            ("line-width", PaintValue::Number(width)),
            ("line-opacity", PaintValue::Number(opacity)),
        ]),
        z_index: role as i32,
    }
}

/// Markers always draw above every route.
pub fn marker_layer_spec(kind: MarkerKind) -> LayerSpec {
    let icon = match kind {
        MarkerKind::Pickup => "pickup-pin",
        MarkerKind::Delivery => "delivery-pin",
        MarkerKind::TripEndpoint => "trip-flag",
    };
    LayerSpec {
        id: marker_layer(kind),
        source: marker_source(kind),
        kind: LayerKind::Symbol,
        paint: paint([
            ("icon-image", PaintValue::Text(icon.to_owned())),
            (ICON_SIZE, PaintValue::Number(RESTING_ICON_SIZE)),
        ]),
        z_index: 10 + kind as i32,
    }
}

use indexmap::IndexMap;
use model::{
    coordinate::Coordinate,
    route::{RoutePolyline, RouteRole},
    shipment::{LocatedShipment, ShipmentId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShipmentPhase {
    /// Waiting for the pickup address to resolve.
    Unlocated,
    /// Has a pickup coordinate but is not shown.
    Located,
    /// Shown with a route of this role.
    Routed(RouteRole),
}

#[derive(Debug, Clone)]
pub struct ShipmentView {
    pub shipment: LocatedShipment,
    pub phase: ShipmentPhase,
    /// `Some(empty)` means the pair is known to be unroutable.
    pub polyline: Option<RoutePolyline>,
    pub fetching: bool,
}

impl ShipmentView {
    pub fn id(&self) -> &ShipmentId {
        &self.shipment.id
    }

    pub fn role(&self) -> Option<RouteRole> {
        match self.phase {
            ShipmentPhase::Routed(role) => Some(role),
            ShipmentPhase::Unlocated | ShipmentPhase::Located => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TripView {
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub origin_label: Option<String>,
    pub polyline: Option<RoutePolyline>,
}

/// Everything the map needs to draw, published after every change.
#[derive(Debug, Clone, Default)]
pub struct LifecycleSnapshot {
    /// In feed order.
    pub shipments: Vec<ShipmentView>,
    /// Most recently selected first.
    pub selection: Vec<ShipmentId>,
    pub trip: Option<TripView>,
}

impl LifecycleSnapshot {
    pub fn shipment(&self, id: &ShipmentId) -> Option<&ShipmentView> {
        self.shipments.iter().find(|view| view.id() == id)
    }

    pub fn phase(&self, id: &ShipmentId) -> Option<ShipmentPhase> {
        self.shipment(id).map(|view| view.phase)
    }

    pub fn visible(&self) -> impl Iterator<Item = &ShipmentView> {
        self.shipments.iter().filter(|view| view.role().is_some())
    }

    /// Fetched shipment routes grouped by role, in drawing order. Selected
    /// routes follow the selection order. The primary trip lives in `trip`.
    pub fn routes_by_role(&self) -> IndexMap<RouteRole, Vec<(ShipmentId, RoutePolyline)>> {
        let mut routes: IndexMap<_, Vec<_>> = RouteRole::ALL
            .iter()
            .filter(|role| **role != RouteRole::PrimaryTrip)
            .map(|role| (*role, Vec::new()))
            .collect();

        for view in self.visible() {
            let (Some(role), Some(polyline)) = (view.role(), view.polyline.as_ref()) else {
                continue;
            };
            if role == RouteRole::Selected {
                continue;
            }
            if let Some(entry) = routes.get_mut(&role) {
                entry.push((view.id().clone(), polyline.clone()));
            }
        }

        if let Some(entry) = routes.get_mut(&RouteRole::Selected) {
            for id in &self.selection {
                let Some(view) = self.shipment(id) else {
                    continue;
                };
                if let (Some(RouteRole::Selected), Some(polyline)) =
                    (view.role(), view.polyline.as_ref())
                {
                    entry.push((id.clone(), polyline.clone()));
                }
            }
        }
        routes
    }

    pub fn is_empty(&self) -> bool {
        self.shipments.is_empty() && self.selection.is_empty() && self.trip.is_none()
    }
}

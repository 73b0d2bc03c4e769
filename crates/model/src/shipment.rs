use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use utility::id::{HasId, Id};

use crate::coordinate::Coordinate;

#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub pickup_address: String,
    pub delivery_address: String,
    #[serde(default)]
    pub title: Option<String>,
}

impl HasId for Shipment {
    type IdType = String;
}

pub type ShipmentId = Id<Shipment>;

/// One entry of the upstream shipment feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentRecord {
    pub id: ShipmentId,
    #[serde(flatten)]
    pub shipment: Shipment,
}

impl ShipmentRecord {
    pub fn new<S: Into<String>>(id: S, pickup_address: S, delivery_address: S) -> Self {
        Self {
            id: Id::new(id.into()),
            shipment: Shipment {
                pickup_address: pickup_address.into(),
                delivery_address: delivery_address.into(),
                title: None,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressChange {
    pub pickup: bool,
    pub delivery: bool,
}

impl AddressChange {
    pub fn any(&self) -> bool {
        self.pickup || self.delivery
    }
}

/// A shipment together with the coordinates resolved for it so far.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocatedShipment {
    pub id: ShipmentId,
    #[serde(flatten)]
    pub shipment: Shipment,
    pub pickup: Option<Coordinate>,
    pub delivery: Option<Coordinate>,
}

impl LocatedShipment {
    pub fn new(record: ShipmentRecord) -> Self {
        Self {
            id: record.id,
            shipment: record.shipment,
            pickup: None,
            delivery: None,
        }
    }

    pub fn is_located(&self) -> bool {
        self.pickup.is_some()
    }

    pub fn endpoints(&self) -> Option<(Coordinate, Coordinate)> {
        Some((self.pickup?, self.delivery?))
    }

    /// Replaces the upstream data in place. Coordinates belonging to an
    /// address that changed are dropped.
    pub fn update(&mut self, shipment: Shipment) -> AddressChange {
        let change = AddressChange {
            pickup: self.shipment.pickup_address != shipment.pickup_address,
            delivery: self.shipment.delivery_address != shipment.delivery_address,
        };
        if change.pickup {
            self.pickup = None;
        }
        if change.delivery {
            self.delivery = None;
        }
        self.shipment = shipment;
        change
    }
}

use std::collections::HashSet;

use actors::actor_ref::ActorRef;
use async_trait::async_trait;
use model::{
    coordinate::Coordinate,
    shipment::{LocatedShipment, ShipmentId, ShipmentRecord},
    WithDistance,
};

use crate::{
    filter::VisibilityFilter,
    lifecycle::{
        ClearSelection, ClearTrip, Deselect, GetSnapshot, NearestTo, ReplaceShipments,
        RescanNow, RouteLifecycle, Select, SetBookmarks, SetFilter, SetTrip, Teardown,
        ToggleSelection,
    },
    snapshot::LifecycleSnapshot,
    trip::TripRequest,
    EngineResult,
};

/// Every call waits until the lifecycle has applied it, so a snapshot taken
/// afterwards reflects the change.
#[async_trait]
pub trait LifecycleRef {
    async fn replace_shipments(&self, records: Vec<ShipmentRecord>) -> EngineResult<()>;
    async fn set_bookmarks(&self, bookmarks: HashSet<ShipmentId>) -> EngineResult<()>;
    async fn set_filter(&self, filter: VisibilityFilter) -> EngineResult<()>;
    async fn select(&self, id: ShipmentId) -> EngineResult<bool>;
    async fn deselect(&self, id: ShipmentId) -> EngineResult<bool>;
    async fn toggle_selection(&self, id: ShipmentId) -> EngineResult<bool>;
    async fn clear_selection(&self) -> EngineResult<()>;
    async fn set_trip(&self, request: TripRequest) -> EngineResult<()>;
    async fn clear_trip(&self) -> EngineResult<()>;
    async fn rescan_now(&self) -> EngineResult<()>;
    async fn nearest_to(
        &self,
        point: Coordinate,
        limit: usize,
    ) -> EngineResult<Vec<WithDistance<LocatedShipment>>>;
    async fn snapshot(&self) -> EngineResult<LifecycleSnapshot>;
    async fn teardown(&self) -> EngineResult<()>;
}

#[async_trait]
impl LifecycleRef for ActorRef<RouteLifecycle> {
    async fn replace_shipments(&self, records: Vec<ShipmentRecord>) -> EngineResult<()> {
        Ok(self.ask(ReplaceShipments(records)).await?)
    }

    async fn set_bookmarks(&self, bookmarks: HashSet<ShipmentId>) -> EngineResult<()> {
        Ok(self.ask(SetBookmarks(bookmarks)).await?)
    }

    async fn set_filter(&self, filter: VisibilityFilter) -> EngineResult<()> {
        Ok(self.ask(SetFilter(filter)).await?)
    }

    async fn select(&self, id: ShipmentId) -> EngineResult<bool> {
        Ok(self.ask(Select(id)).await?)
    }

    async fn deselect(&self, id: ShipmentId) -> EngineResult<bool> {
        Ok(self.ask(Deselect(id)).await?)
    }

    async fn toggle_selection(&self, id: ShipmentId) -> EngineResult<bool> {
        Ok(self.ask(ToggleSelection(id)).await?)
    }

    async fn clear_selection(&self) -> EngineResult<()> {
        Ok(self.ask(ClearSelection).await?)
    }

    async fn set_trip(&self, request: TripRequest) -> EngineResult<()> {
        Ok(self.ask(SetTrip(request)).await?)
    }

    async fn clear_trip(&self) -> EngineResult<()> {
        Ok(self.ask(ClearTrip).await?)
    }

    async fn rescan_now(&self) -> EngineResult<()> {
        Ok(self.ask(RescanNow).await?)
    }

    async fn nearest_to(
        &self,
        point: Coordinate,
        limit: usize,
    ) -> EngineResult<Vec<WithDistance<LocatedShipment>>> {
        Ok(self.ask(NearestTo { point, limit }).await?)
    }

    async fn snapshot(&self) -> EngineResult<LifecycleSnapshot> {
        Ok(self.ask(GetSnapshot).await?)
    }

    async fn teardown(&self) -> EngineResult<()> {
        Ok(self.ask(Teardown).await?)
    }
}

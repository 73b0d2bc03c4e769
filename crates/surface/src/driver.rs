use engine::{LifecycleRef, LifecycleSnapshot};
use model::surface::MarkerTarget;
use tokio::{
    select,
    sync::{mpsc, watch},
    time::{self, Instant, MissedTickBehavior},
};
use tokio_stream::{wrappers::WatchStream, StreamExt as _};

use crate::{
    planner::SurfacePlanner,
    renderer::{RenderingSurface, ScreenPoint},
    synchronizer::MapSynchronizer,
};

/// Keeps the map in line with the lifecycle until the lifecycle stops
/// publishing, then hands the synchronizer back.
///
/// Taps on a shipment marker toggle its selection. Animation frames are only
/// scheduled while a bounce is running.
pub async fn run<S, L>(
    mut synchronizer: MapSynchronizer<S>,
    planner: SurfacePlanner,
    lifecycle: L,
    snapshots: watch::Receiver<LifecycleSnapshot>,
    mut taps: mpsc::Receiver<ScreenPoint>,
) -> MapSynchronizer<S>
where
    S: RenderingSurface,
    L: LifecycleRef,
{
    let mut snapshots = WatchStream::new(snapshots);
    let mut frames = time::interval(synchronizer.config().frame_interval);
    frames.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut taps_open = true;

    loop {
        select! {
            snapshot = snapshots.next() => {
                let Some(snapshot) = snapshot else {
                    log::debug!("lifecycle stopped publishing, map driver exits");
                    break;
                };
                let desired = planner.plan(&snapshot, synchronizer.surface().camera());
                synchronizer.reconcile(&desired);
            }
            tap = taps.recv(), if taps_open => {
                let Some(point) = tap else {
                    taps_open = false;
                    continue;
                };
                let Some(hit) = synchronizer.tap(point, Instant::now()) else {
                    continue;
                };
                log::debug!("tap hit {} marker {:?}", hit.kind, hit.marker.target);
                if let MarkerTarget::Shipment(id) = hit.marker.target {
                    if let Err(why) = lifecycle.toggle_selection(id).await {
                        log::warn!("could not toggle selection: {}", why);
                    }
                }
            }
            _ = frames.tick(), if synchronizer.is_animating() => {
                synchronizer.animate(Instant::now());
            }
        }
    }

    synchronizer
}

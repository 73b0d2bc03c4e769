use std::{env, sync::Arc};

use engine::{EngineConfig, LifecycleRef, Place, Services, TripRequest};
use model::{coordinate::Coordinate, shipment::ShipmentRecord, surface::CameraPosition};
use routing::{
    client::{MapboxClient, MapboxCredentials},
    geocoder::GeocodeEvent,
    offline::{GazetteerGeocoder, StraightLineDirections},
};
use surface::{MapSynchronizer, RecordingSurface, ScreenPoint, SurfaceConfig, SurfacePlanner};
use tokio::{
    io::{self, AsyncBufReadExt, BufReader},
    sync::{broadcast, mpsc},
};

/// `"lat,lon"` is a coordinate, anything else an address.
fn parse_place(value: &str) -> Place {
    let parts: Vec<_> = value.split(',').map(str::trim).collect();
    if let [latitude, longitude] = parts.as_slice() {
        if let (Ok(latitude), Ok(longitude)) = (latitude.parse(), longitude.parse()) {
            let coordinate = Coordinate::new(latitude, longitude);
            if coordinate.is_valid() {
                return Place::Coordinate(coordinate);
            }
        }
    }
    Place::Address(value.trim().to_owned())
}

/// `"x y"` in screen pixels.
fn parse_tap(line: &str) -> Option<ScreenPoint> {
    let mut values = line.split_whitespace().map(str::parse::<f64>);
    match (values.next(), values.next(), values.next()) {
        (Some(Ok(x)), Some(Ok(y)), None) => Some(ScreenPoint::new(x, y)),
        _ => None,
    }
}

fn services() -> Services {
    match MapboxCredentials::env().and_then(|credentials| MapboxClient::new(&credentials)) {
        Ok(client) => {
            log::info!("using map provider at {}", client.credentials.base_url);
            let client = Arc::new(client);
            Services {
                geocoding: client.clone(),
                directions: client.clone(),
                reverse_geocoding: Some(client),
            }
        }
        Err(why) => {
            log::warn!("{}, falling back to offline providers", why);
            let gazetteer = match env::var("GAZETTEER_FILE") {
                Ok(path) => std::fs::read_to_string(&path)
                    .map_err(|why| log::error!("could not read {}: {}", path, why))
                    .ok()
                    .and_then(|json| {
                        GazetteerGeocoder::from_json(&json)
                            .map_err(|why| log::error!("invalid gazetteer {}: {}", path, why))
                            .ok()
                    })
                    .unwrap_or_default(),
                Err(_) => GazetteerGeocoder::default(),
            };
            log::info!("offline gazetteer knows {} places", gazetteer.len());
            Services {
                geocoding: Arc::new(gazetteer),
                directions: Arc::new(StraightLineDirections),
                reverse_geocoding: None,
            }
        }
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let shipments_file = env::var("SHIPMENTS_FILE").expect("expected SHIPMENTS_FILE in env.");
    let shipments: Vec<ShipmentRecord> = serde_json::from_str(
        &tokio::fs::read_to_string(&shipments_file)
            .await
            .expect("could not read shipments file."),
    )
    .expect("shipments file is not a list of shipments.");

    let handle = engine::spawn(EngineConfig::from_env(), services());
    let lifecycle = handle.actor.clone();

    // geocode progress
    let mut events = handle.geocode_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(GeocodeEvent::Resolved { key, coordinate }) => log::info!(
                    "resolved {} at {:.5},{:.5}",
                    key,
                    coordinate.latitude,
                    coordinate.longitude
                ),
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    log::debug!("missed {} geocode events", missed)
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // taps from stdin
    let (tap_sender, taps) = mpsc::channel(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_tap(&line) {
                Some(point) => {
                    if tap_sender.send(point).await.is_err() {
                        break;
                    }
                }
                None => log::warn!("expected a tap as `x y`, got {:?}", line),
            }
        }
    });

    // map
    let config = SurfaceConfig::default();
    let camera = CameraPosition::new(Coordinate::new(0.0, 0.0), config.min_zoom);
    let synchronizer =
        MapSynchronizer::new(RecordingSurface::new(config.viewport, camera), config.clone());
    let driver = tokio::spawn(surface::driver::run(
        synchronizer,
        SurfacePlanner::new(config),
        lifecycle.clone(),
        handle.snapshots.clone(),
        taps,
    ));

    log::info!("loaded {} shipments from {}", shipments.len(), shipments_file);
    if let Err(why) = lifecycle.replace_shipments(shipments).await {
        log::error!("could not hand shipments to the lifecycle: {}", why);
        return;
    }
    if let (Ok(origin), Ok(destination)) = (env::var("TRIP_ORIGIN"), env::var("TRIP_DESTINATION")) {
        let request = TripRequest::new(parse_place(&origin), parse_place(&destination));
        if let Err(why) = lifecycle.set_trip(request).await {
            log::error!("could not set trip: {}", why);
        }
    }

    let _ = tokio::signal::ctrl_c().await;
    log::info!("shutting down");
    if let Err(why) = lifecycle.teardown().await {
        log::warn!("teardown failed: {}", why);
    }
    driver.abort();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinates_and_addresses_are_told_apart() {
        assert!(matches!(
            parse_place("52.23, 21.01"),
            Place::Coordinate(coordinate) if coordinate.same_location(&Coordinate::new(52.23, 21.01))
        ));
        assert!(matches!(
            parse_place("Warszawa, Marszałkowska 1"),
            Place::Address(address) if address == "Warszawa, Marszałkowska 1"
        ));
        assert!(matches!(parse_place("95.0,10.0"), Place::Address(_)));
    }

    #[test]
    fn taps_need_exactly_two_numbers() {
        assert_eq!(parse_tap("10 20.5"), Some(ScreenPoint::new(10.0, 20.5)));
        assert_eq!(parse_tap("10"), None);
        assert_eq!(parse_tap("10 20 30"), None);
        assert_eq!(parse_tap("x y"), None);
    }
}

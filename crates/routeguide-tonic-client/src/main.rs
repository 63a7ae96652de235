#![doc = include_str!("../README.md")]

mod config;

use clap::Parser;
use config::{CliArgs, ClientConfig};
use rand::{Rng, rng};
use routeguide_tonic_core::{
    client::RouteGuideCaller,
    proto::{Point, Rectangle},
};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Corners of the area covered by the bundled fixture.
const AREA_LO: Point = Point {
    latitude: 400_000_000,
    longitude: -750_000_000,
};
const AREA_HI: Point = Point {
    latitude: 420_000_000,
    longitude: -730_000_000,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let config = ClientConfig::try_from(CliArgs::parse())?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339()),
        )
        .init();

    let mut client = RouteGuideCaller::connect(config.server_addr.clone(), config.deadline).await?;
    info!("Connected to {}", config.server_addr);

    // Unary
    for point in [
        Point {
            latitude: 409_146_138,
            longitude: -746_188_906,
        },
        Point {
            latitude: 0,
            longitude: 0,
        },
    ] {
        info!(
            "Getting feature for point ({}, {})",
            point.latitude, point.longitude
        );
        let feature = client.get_feature(point).await?;
        if feature.name.is_empty() {
            info!("No feature found");
        } else {
            info!("Found feature {:?}", feature.name);
        }
    }

    // Server streaming
    let rect = Rectangle {
        lo: Some(AREA_LO),
        hi: Some(AREA_HI),
    };
    info!("Looking for features within {:?}", rect);
    let mut features = client.list_features(rect).await?;
    while let Some(feature) = features.message().await? {
        if let Some(location) = feature.location {
            info!(
                "Feature {:?} at ({}, {})",
                feature.name, location.latitude, location.longitude
            );
        }
    }
    info!("Received {} features", features.delivered());
    info!("Received {} features", features.delivered());

    // Client streaming
    let route = random_route(config.route_points);
    info!("Traversing {} points", route.len());
    let summary = client.record_route(tokio_stream::iter(route)).await?;
    info!(
        point_count = summary.point_count,
        feature_count = summary.feature_count,
        distance = summary.distance,
        elapsed_time = summary.elapsed_time,
        "Route summary"
    );

    Ok(())
}

fn random_route(len: usize) -> Vec<Point> {
    let mut rng = rng();
    (0..len)
        .map(|_| Point {
            latitude: rng.random_range(AREA_LO.latitude..=AREA_HI.latitude),
            longitude: rng.random_range(AREA_LO.longitude..=AREA_HI.longitude),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_route_stays_inside_the_area() {
        let route = random_route(64);
        assert_eq!(route.len(), 64);
        for p in route {
            assert!((AREA_LO.latitude..=AREA_HI.latitude).contains(&p.latitude));
            assert!((AREA_LO.longitude..=AREA_HI.longitude).contains(&p.longitude));
        }
    }
}

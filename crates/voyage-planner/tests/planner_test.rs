//! Planner integration tests.
//!
//! Run offline: provider URLs are empty or point at a local stub listener.

use chrono::{Duration, TimeZone, Utc};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use voyage_core::{
    ArrivalWindow, GeoPoint, MultiStopRequest, Priorities, RouteSource, SpeedRequest, Stop,
};
use voyage_planner::{Config, VoyagePlanner};

const MUSCAT: GeoPoint = GeoPoint::new(23.75, 58.70);
const DUBAI: GeoPoint = GeoPoint::new(25.35, 55.20);
const RAS_AL_HADD: GeoPoint = GeoPoint::new(22.80, 60.50);

/// Serve every connection with the same HTTP status and body.
async fn stub_provider(status: &'static str, body: String) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let body = body.clone();
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let response = format!(
                    "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                    status,
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{}/route", addr)
}

fn provider_config(url: String) -> Config {
    Config {
        searoute_provider_url: url,
        ..Config::offline()
    }
}

#[tokio::test]
async fn offline_route_uses_local_network() {
    let planner = VoyagePlanner::new(&Config::offline());
    let route = planner.compute_route(MUSCAT, DUBAI).await.unwrap();

    assert_eq!(route.source, RouteSource::Network);
    assert_eq!(route.waypoints.first().unwrap().point(), MUSCAT);
    assert_eq!(route.waypoints.last().unwrap().point(), DUBAI);
    assert!(route.total_distance_nm > 213.9);
}

#[tokio::test]
async fn clean_provider_route_is_used_as_is() {
    let body = r#"{"type":"FeatureCollection","features":[{"type":"Feature",
        "geometry":{"type":"LineString","coordinates":[[58.7,23.75],[59.6,23.3],[60.5,22.8]]},
        "properties":{"distance":300000}}]}"#;
    let url = stub_provider("200 OK", body.to_string()).await;
    let planner = VoyagePlanner::new(&provider_config(url));

    let route = planner.compute_route(MUSCAT, RAS_AL_HADD).await.unwrap();
    assert_eq!(route.source, RouteSource::Api);
    assert_eq!(route.waypoints.len(), 3);
}

#[tokio::test]
async fn provider_route_over_land_is_corrected() {
    let body = r#"{"features":[{"geometry":{"type":"LineString",
        "coordinates":[[58.7,23.75],[55.2,25.35]]}}]}"#;
    let url = stub_provider("200 OK", body.to_string()).await;
    let planner = VoyagePlanner::new(&provider_config(url));

    let route = planner.compute_route(MUSCAT, DUBAI).await.unwrap();
    assert_eq!(route.source, RouteSource::Hybrid);
    assert!(route.waypoints.len() > 2);
}

#[tokio::test]
async fn failing_provider_falls_back_to_network() {
    let url = stub_provider("503 Service Unavailable", "{}".to_string()).await;
    let planner = VoyagePlanner::new(&provider_config(url));

    let route = planner.compute_route(MUSCAT, DUBAI).await.unwrap();
    assert_eq!(route.source, RouteSource::Network);

    // Second call is served while the provider is backing off
    let again = planner.compute_route(MUSCAT, DUBAI).await.unwrap();
    assert_eq!(again.source, RouteSource::Network);
    assert_eq!(again.waypoints.len(), route.waypoints.len());
}

#[tokio::test]
async fn in_region_routes_never_call_the_provider() {
    // Unroutable address: any request would fail
    let planner = VoyagePlanner::new(&provider_config("http://127.0.0.1:9/route".to_string()));
    let route = planner
        .compute_route(GeoPoint::new(25.35, 51.75), GeoPoint::new(24.95, 52.95))
        .await
        .unwrap();
    assert_eq!(route.source, RouteSource::Network);
    assert_eq!(route.waypoints.len(), 4);
}

#[tokio::test]
async fn multi_stop_plan_prices_every_leg() {
    let planner = VoyagePlanner::new(&Config::offline());
    let departure = Utc.with_ymd_and_hms(2025, 1, 15, 4, 0, 0).unwrap();
    let request = MultiStopRequest {
        origin: Stop::new("dubai", "Dubai", 25.35, 55.20),
        stops: vec![
            Stop::new("das", "Das Island", 24.95, 52.95),
            Stop::new("jebel_ali", "Jebel Ali", 25.10, 54.95),
            Stop::new("abu_dhabi", "Abu Dhabi", 24.75, 54.30),
        ],
        return_to_origin: true,
        vessel_type: "crew_boat".to_string(),
        departure: Some(departure),
    };

    let result = planner.optimize_multi_stop(&request).await.unwrap();
    assert_eq!(result.vessel_type, "crew_boat");
    assert_eq!(result.order.len(), 3);
    assert_eq!(result.legs.len(), 4);
    assert!(result.savings.distance_nm >= 0.0);
    assert!(result.total_fuel_l > 0.0);
    assert!(result.arrivals.iter().all(|arrival| arrival.eta.is_some()));
}

#[tokio::test]
async fn speed_optimization_keeps_geometry() {
    let planner = VoyagePlanner::new(&Config::offline());
    let route = planner
        .plan_route(GeoPoint::new(25.35, 51.75), GeoPoint::new(24.95, 52.95), "supply_vessel")
        .await
        .unwrap();

    let departure = Utc.with_ymd_and_hms(2025, 1, 15, 4, 0, 0).unwrap();
    let request = SpeedRequest {
        vessel_type: "supply_vessel".to_string(),
        priorities: Priorities::new(80.0, 20.0),
        arrival_window: Some(ArrivalWindow {
            earliest: departure + Duration::hours(4),
            latest: departure + Duration::hours(9),
            preferred: None,
        }),
        port_conditions: None,
        departure,
    };
    let optimization = planner.optimize_speeds(&route, &request).await;

    assert_eq!(optimization.recommended_route.waypoints, route.waypoints);
    assert_eq!(optimization.speed_profile.len(), route.segments.len());
    assert!(optimization.timing.window.as_ref().unwrap().feasible);
    assert!(optimization.timing.eta <= departure + Duration::hours(9));
    assert!(!optimization.recommendations.is_empty());
}

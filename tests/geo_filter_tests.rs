use std::net::{IpAddr, Ipv4Addr};

use routescore::aggregator::recount_routes;
use routescore::geo_filter::haversine_km;
use routescore::shared::RouteStatus;
use routescore::{ASPoint, ASPointRegistry, GeoDistanceFilter, GeoPoint, Route};

fn point(asn: &str, lat: f64, lon: f64) -> ASPoint {
    ASPoint::new(asn, IpAddr::V4(Ipv4Addr::new(192, 0, 2, 1)), lat, lon)
}

fn route(start: &str, path: &[&str]) -> Route {
    Route::new(
        "1735689600".to_string(),
        RouteStatus::Announce,
        "192.0.2.1".to_string(),
        start.to_string(),
        "192.0.2.0/24".to_string(),
        path.iter().map(|s| s.to_string()).collect(),
    )
}

fn registry() -> ASPointRegistry {
    ASPointRegistry::from_points(vec![point("64500", 0.0, 0.0), point("64501", 0.0, 2.0)])
}

#[test]
fn test_threshold_drops_and_keeps() {
    let points = registry();
    let routes = vec![route("64500", &["64500", "64501"])];

    let kept = GeoDistanceFilter::new(100.0).apply(routes.clone(), &points);
    assert!(kept.is_empty());

    let kept = GeoDistanceFilter::new(300.0).apply(routes, &points);
    assert_eq!(kept.len(), 1);
}

#[test]
fn test_threshold_is_inclusive() {
    let points = registry();
    let r = route("64500", &["64500", "64501"]);
    let filter = GeoDistanceFilter::default();
    let exact = filter.route_distance_km(&r, &points);

    assert!(GeoDistanceFilter::new(exact).keeps(&r, &points));
    assert!(!GeoDistanceFilter::new(exact - 1e-9).keeps(&r, &points));
}

#[test]
fn test_distance_is_symmetric() {
    let a = GeoPoint::new(48.137, 11.575);
    let b = GeoPoint::new(-33.868, 151.209);

    assert_eq!(a.distance_km(&b), b.distance_km(&a));
    assert_eq!(a.distance_km(&a), 0.0);
    assert!((haversine_km(0.0, 0.0, 0.0, 2.0) - 222.39).abs() < 0.1);
}

#[test]
fn test_missing_endpoint_is_dropped() {
    let mut points = registry();
    points.insert(ASPoint {
        coordinates: vec![None, None],
        ..point("64502", 0.0, 0.0)
    });
    let routes = vec![
        route("64500", &["64500", "64999"]),
        route("64999", &["64999", "64500"]),
        route("64500", &["64500", "64502"]),
        route("64500", &[]),
    ];

    let kept = GeoDistanceFilter::new(f64::MAX).apply(routes, &points);
    assert!(kept.is_empty());
}

#[test]
fn test_same_as_route_is_kept() {
    let points = registry();
    let kept = GeoDistanceFilter::new(0.0).apply(vec![route("64500", &["64500"])], &points);
    assert_eq!(kept.len(), 1);
}

#[test]
fn test_recount_matches_surviving_routes() {
    let mut points = registry();
    points.get_mut("64501").unwrap().routes_count = 42;
    let routes = vec![
        route("64500", &["64500", "64501"]),
        route("64500", &["64500", "64501", "64500"]),
        route("64501", &["64501"]),
        route("64999", &["64999"]),
    ];

    let attributed = recount_routes(&mut points, &routes);

    assert_eq!(points.get("64500").unwrap().routes_count, 2);
    assert_eq!(points.get("64501").unwrap().routes_count, 1);
    assert_eq!(attributed, 3);
    let total: usize = points.iter().map(|p| p.routes_count).sum();
    assert_eq!(total, attributed);
}

#[test]
fn test_recount_resets_points_without_routes() {
    let mut points = registry();
    points.get_mut("64500").unwrap().routes_count = 9;

    assert_eq!(recount_routes(&mut points, &[]), 0);
    assert_eq!(points.get("64500").unwrap().routes_count, 0);
}

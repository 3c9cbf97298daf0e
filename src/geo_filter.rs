use tracing::{debug, info};

use crate::as_registry::ASPointRegistry;
use crate::route::Route;
use crate::shared::{DEFAULT_MAX_DISTANCE_KM, EARTH_RADIUS_KM};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        GeoPoint { latitude, longitude }
    }

    /// Builds a point from a `[lat, lon]` pair. Anything else, including
    /// nulls and non-finite values, yields `None`.
    pub fn from_pair(pair: &[Option<f64>]) -> Option<Self> {
        match pair {
            [Some(lat), Some(lon)] if lat.is_finite() && lon.is_finite() => {
                Some(GeoPoint::new(*lat, *lon))
            }
            _ => None,
        }
    }

    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        haversine_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Great-circle distance in kilometres.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlon = (lon2 - lon1).to_radians();
    let lat1 = lat1.to_radians();
    let lat2 = lat2.to_radians();
    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let c = 2.0 * a.min(1.0).sqrt().asin();
    EARTH_RADIUS_KM * c
}

/// Drops routes whose start and target AS are further apart than the
/// threshold. Routes with an endpoint that has no usable coordinates count
/// as infinitely far and are dropped too.
#[derive(Debug, Clone, Copy)]
pub struct GeoDistanceFilter {
    pub max_distance_km: f64,
}

impl GeoDistanceFilter {
    pub fn new(max_distance_km: f64) -> Self {
        GeoDistanceFilter { max_distance_km }
    }

    pub fn route_distance_km(&self, route: &Route, points: &ASPointRegistry) -> f64 {
        let start = points.position(&route.start_system);
        let target = route.target_system.as_deref().and_then(|asn| points.position(asn));

        match (start, target) {
            (Some(start), Some(target)) => start.distance_km(&target),
            _ => f64::INFINITY,
        }
    }

    /// Inclusive at the threshold.
    pub fn keeps(&self, route: &Route, points: &ASPointRegistry) -> bool {
        self.route_distance_km(route, points) <= self.max_distance_km
    }

    pub fn apply(&self, routes: Vec<Route>, points: &ASPointRegistry) -> Vec<Route> {
        let before = routes.len();
        let kept: Vec<Route> = routes
            .into_iter()
            .filter(|route| {
                let keep = self.keeps(route, points);
                if !keep {
                    debug!(
                        "dropping route {:?} ({} -> {:?})",
                        route.as_path, route.start_system, route.target_system
                    );
                }
                keep
            })
            .collect();

        info!(
            "Geo filter kept {} of {} routes (max {} km)",
            kept.len(),
            before,
            self.max_distance_km
        );
        kept
    }
}

impl Default for GeoDistanceFilter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DISTANCE_KM)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_distance() {
        assert_eq!(haversine_km(48.1, 11.5, 48.1, 11.5), 0.0);
    }

    #[test]
    fn test_one_degree_of_longitude_on_equator() {
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.19).abs() < 0.1, "got {}", d);
    }

    #[test]
    fn test_antipodes_are_half_circumference() {
        let d = haversine_km(0.0, 0.0, 0.0, 180.0);
        assert!((d - std::f64::consts::PI * EARTH_RADIUS_KM).abs() < 1e-6);
    }

    #[test]
    fn test_from_pair_rejects_bad_arity() {
        assert!(GeoPoint::from_pair(&[Some(1.0)]).is_none());
        assert!(GeoPoint::from_pair(&[Some(1.0), Some(2.0), Some(3.0)]).is_none());
        assert!(GeoPoint::from_pair(&[Some(1.0), None]).is_none());
        assert!(GeoPoint::from_pair(&[Some(f64::NAN), Some(1.0)]).is_none());
        assert_eq!(
            GeoPoint::from_pair(&[Some(1.0), Some(2.0)]),
            Some(GeoPoint::new(1.0, 2.0))
        );
    }
}

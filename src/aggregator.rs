use std::collections::HashMap;

use tracing::info;

use crate::as_registry::ASPointRegistry;
use crate::route::Route;

/// Recomputes `routes_count` on every point from the surviving routes.
///
/// Counts are rebuilt from zero each time; stale counts from a previous run
/// never leak through.
pub fn recount_routes(points: &mut ASPointRegistry, routes: &[Route]) -> usize {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for route in routes {
        *counts.entry(route.start_system.as_str()).or_insert(0) += 1;
    }

    let mut counted = 0;
    for point in points.iter_mut() {
        point.routes_count = counts.get(point.asn.as_str()).copied().unwrap_or(0);
        counted += point.routes_count;
    }

    info!(
        "Recounted routes for {} AS points ({} of {} routes attributed)",
        points.len(),
        counted,
        routes.len()
    );
    counted
}

use std::collections::HashSet;

use crate::route::{Route, ASN};

/// Keeps the first route seen for every distinct AS path.
#[derive(Debug, Default)]
pub struct RouteDeduplicator {
    seen: HashSet<Vec<ASN>>,
    dropped: usize,
}

impl RouteDeduplicator {
    pub fn new() -> Self {
        RouteDeduplicator {
            seen: HashSet::new(),
            dropped: 0,
        }
    }

    /// Returns the route if its AS path has not been seen before.
    pub fn admit(&mut self, route: Route) -> Option<Route> {
        if self.seen.contains(&route.as_path) {
            self.dropped += 1;
            return None;
        }
        self.seen.insert(route.as_path.clone());
        Some(route)
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Deduplicates a collection, preserving input order.
pub fn dedup_routes(routes: Vec<Route>) -> Vec<Route> {
    let mut dedup = RouteDeduplicator::new();
    routes.into_iter().filter_map(|route| dedup.admit(route)).collect()
}

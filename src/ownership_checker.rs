use std::collections::{HashMap, HashSet};
use std::net::IpAddr;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::as_registry::ASBlockRegistry;
use crate::route::{Route, ASN};
use crate::shared::OwnershipVerdict;

/// `(origin_ip, start_system)`
pub type OwnershipKey = (String, ASN);

/// Distinct `(origin_ip, start_system)` pairs in first-seen order.
pub fn unique_ownership_pairs(routes: &[Route]) -> Vec<OwnershipKey> {
    let mut seen = HashSet::new();
    routes
        .iter()
        .map(Route::ownership_key)
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OwnershipCounts {
    pub matched: usize,
    pub no_match: usize,
    pub unregistered: usize,
    pub malformed: usize,
}

/// Verdict for every checked pair plus the no-match records in check order.
#[derive(Debug, Clone, Default)]
pub struct OwnershipReport {
    verdicts: HashMap<OwnershipKey, OwnershipVerdict>,
    no_match: Vec<OwnershipKey>,
}

impl OwnershipReport {
    pub fn new() -> Self {
        OwnershipReport {
            verdicts: HashMap::new(),
            no_match: Vec::new(),
        }
    }

    pub fn record(&mut self, key: OwnershipKey, verdict: OwnershipVerdict) {
        if verdict == OwnershipVerdict::NoMatch && !self.verdicts.contains_key(&key) {
            self.no_match.push(key.clone());
        }
        self.verdicts.insert(key, verdict);
    }

    pub fn verdict(&self, origin_ip: &str, start_system: &str) -> Option<OwnershipVerdict> {
        self.verdicts
            .get(&(origin_ip.to_string(), start_system.to_string()))
            .copied()
    }

    pub fn verdict_for(&self, route: &Route) -> Option<OwnershipVerdict> {
        self.verdict(&route.origin_ip, &route.start_system)
    }

    pub fn no_match_records(&self) -> &[OwnershipKey] {
        &self.no_match
    }

    pub fn counts(&self) -> OwnershipCounts {
        let mut counts = OwnershipCounts::default();
        for verdict in self.verdicts.values() {
            match verdict {
                OwnershipVerdict::Matched => counts.matched += 1,
                OwnershipVerdict::NoMatch => counts.no_match += 1,
                OwnershipVerdict::Unregistered => counts.unregistered += 1,
                OwnershipVerdict::Malformed => counts.malformed += 1,
            }
        }
        counts
    }
}

/// Tests whether routes' origin IPs lie inside the blocks registered to
/// their start AS.
pub struct OwnershipChecker<'a> {
    registry: &'a ASBlockRegistry,
}

impl<'a> OwnershipChecker<'a> {
    pub fn new(registry: &'a ASBlockRegistry) -> Self {
        OwnershipChecker { registry }
    }

    pub fn check_pair(&self, origin_ip: &str, start_system: &str) -> OwnershipVerdict {
        if !self.registry.is_registered(start_system) {
            debug!("AS{} has no registered blocks, skipping {}", start_system, origin_ip);
            return OwnershipVerdict::Unregistered;
        }

        let ip: IpAddr = match origin_ip.trim().parse() {
            Ok(ip) => ip,
            Err(e) => {
                warn!("invalid origin IP {:?} for AS{}: {}", origin_ip, start_system, e);
                return OwnershipVerdict::Malformed;
            }
        };

        match self.registry.owns(start_system, ip) {
            Some(true) => OwnershipVerdict::Matched,
            Some(false) => {
                debug!("no registered block of AS{} contains {}", start_system, ip);
                OwnershipVerdict::NoMatch
            }
            None => OwnershipVerdict::Unregistered,
        }
    }

    pub fn check(&self, pairs: &[OwnershipKey]) -> OwnershipReport {
        let mut report = OwnershipReport::new();
        for (origin_ip, start_system) in pairs {
            let verdict = self.check_pair(origin_ip, start_system);
            report.record((origin_ip.clone(), start_system.clone()), verdict);
        }

        let counts = report.counts();
        info!(
            "Ownership check: {} matched, {} no match, {} unregistered, {} malformed",
            counts.matched, counts.no_match, counts.unregistered, counts.malformed
        );
        report
    }

    pub fn check_routes(&self, routes: &[Route]) -> OwnershipReport {
        self.check(&unique_ownership_pairs(routes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::as_registry::ASBlock;

    fn registry() -> ASBlockRegistry {
        let mut registry = ASBlockRegistry::new();
        registry.insert("64500".to_string(), ASBlock::parse("203.0.113.0/24", "ExampleNet").unwrap());
        registry.insert("64500".to_string(), ASBlock::parse("192.0.2.7", "ExampleNet").unwrap());
        registry
    }

    #[test]
    fn test_exact_ip_entry_is_host_network() {
        let registry = registry();
        let checker = OwnershipChecker::new(&registry);

        assert_eq!(checker.check_pair("192.0.2.7", "64500"), OwnershipVerdict::Matched);
        assert_eq!(checker.check_pair("192.0.2.8", "64500"), OwnershipVerdict::NoMatch);
    }

    #[test]
    fn test_malformed_ip_is_not_a_no_match() {
        let registry = registry();
        let checker = OwnershipChecker::new(&registry);

        assert_eq!(checker.check_pair("203.0.113.999", "64500"), OwnershipVerdict::Malformed);
        assert_eq!(checker.check_pair("", "64500"), OwnershipVerdict::Malformed);
    }

    #[test]
    fn test_record_keeps_one_no_match_per_pair() {
        let mut report = OwnershipReport::new();
        let key = ("198.51.100.5".to_string(), "64500".to_string());
        report.record(key.clone(), OwnershipVerdict::NoMatch);
        report.record(key, OwnershipVerdict::NoMatch);
        assert_eq!(report.no_match_records().len(), 1);
    }
}

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::net::IpAddr;
use std::path::Path;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::as_blocks::ASBlockRegistry;
use crate::geo_filter::GeoPoint;
use crate::lookups::{GeoLookup, PrefixLookup};
use crate::progress;
use crate::route::{Route, ASN};
use crate::shared::{PipelineError, Result, UNKNOWN_NAME};

fn unknown() -> String {
    UNKNOWN_NAME.to_string()
}

/// Reference and aggregate data for one AS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ASPoint {
    pub asn: ASN,
    #[serde(default = "unknown")]
    pub name: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default = "unknown")]
    pub city: String,
    #[serde(default = "unknown")]
    pub region: String,
    /// `[latitude, longitude]`. Entries may be null in older point files.
    #[serde(default)]
    pub coordinates: Vec<Option<f64>>,
    #[serde(default)]
    pub routes_count: usize,
}

impl ASPoint {
    pub fn new(asn: &str, ip: IpAddr, latitude: f64, longitude: f64) -> Self {
        ASPoint {
            asn: asn.to_string(),
            name: unknown(),
            ip: ip.to_string(),
            city: unknown(),
            region: unknown(),
            coordinates: vec![Some(latitude), Some(longitude)],
            routes_count: 0,
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_place(mut self, city: &str, region: &str) -> Self {
        self.city = city.to_string();
        self.region = region.to_string();
        self
    }

    pub fn position(&self) -> Option<GeoPoint> {
        GeoPoint::from_pair(&self.coordinates)
    }

    pub fn has_geodata(&self) -> bool {
        self.position().is_some()
    }
}

/// All known AS points, keyed by AS number.
#[derive(Debug, Clone, Default)]
pub struct ASPointRegistry {
    points: BTreeMap<ASN, ASPoint>,
}

impl ASPointRegistry {
    pub fn new() -> Self {
        ASPointRegistry {
            points: BTreeMap::new(),
        }
    }

    pub fn from_points(points: Vec<ASPoint>) -> Self {
        let mut registry = ASPointRegistry::new();
        for point in points {
            registry.insert(point);
        }
        registry
    }

    /// Loads a previously persisted point collection. A missing file is a
    /// cold start, not an error.
    pub fn load_json(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No prior points at {:?}, starting cold", path);
            return Ok(ASPointRegistry::new());
        }

        let text = fs::read_to_string(path)?;
        let points: Vec<ASPoint> = serde_json::from_str(&text).map_err(|e| {
            PipelineError::UnreadableReferenceData {
                what: "prior AS points",
                path: path.to_path_buf(),
                reason: e.to_string(),
            }
        })?;
        info!("Loaded {} prior AS points from {:?}", points.len(), path);
        Ok(ASPointRegistry::from_points(points))
    }

    pub fn insert(&mut self, point: ASPoint) {
        self.points.insert(point.asn.clone(), point);
    }

    pub fn get(&self, asn: &str) -> Option<&ASPoint> {
        self.points.get(asn)
    }

    pub fn get_mut(&mut self, asn: &str) -> Option<&mut ASPoint> {
        self.points.get_mut(asn)
    }

    pub fn position(&self, asn: &str) -> Option<GeoPoint> {
        self.get(asn).and_then(ASPoint::position)
    }

    pub fn needs_geodata(&self, asn: &str) -> bool {
        !self.get(asn).map(ASPoint::has_geodata).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ASPoint> {
        self.points.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ASPoint> {
        self.points.values_mut()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ASPoint> {
        self.points.values().cloned().collect()
    }
}

/// Every AS appearing in the routes' paths or as a start system, in
/// first-seen order.
pub fn asns_in_routes(routes: &[Route]) -> Vec<ASN> {
    let mut seen = HashSet::new();
    let mut asns = Vec::new();
    for route in routes {
        let path = route.as_path.iter();
        for asn in std::iter::once(&route.start_system).chain(path) {
            if !asn.is_empty() && seen.insert(asn.as_str()) {
                asns.push(asn.clone());
            }
        }
    }
    asns
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiscoveryStats {
    pub candidates: usize,
    pub discovered: usize,
    pub failed: usize,
}

/// Resolves location data for AS numbers the registry has no coordinates
/// for.
pub struct PointDiscovery<'a> {
    blocks: &'a ASBlockRegistry,
    geo: &'a dyn GeoLookup,
    prefixes: &'a dyn PrefixLookup,
    workers: usize,
    quiet: bool,
}

impl<'a> PointDiscovery<'a> {
    pub fn new(
        blocks: &'a ASBlockRegistry,
        geo: &'a dyn GeoLookup,
        prefixes: &'a dyn PrefixLookup,
    ) -> Self {
        PointDiscovery {
            blocks,
            geo,
            prefixes,
            workers: 1,
            quiet: true,
        }
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Representative IP: first registered block of the AS, else the first
    /// prefix the prefix lookup reports.
    pub fn representative_ip(&self, asn: &str) -> Result<IpAddr> {
        if let Some(block) = self.blocks.first_block(asn) {
            return Ok(block.representative_ip());
        }

        self.prefixes
            .announced_prefixes(asn)?
            .first()
            .map(|prefix| prefix.ip())
            .ok_or_else(|| PipelineError::lookup(format!("AS{}", asn), "no prefixes found"))
    }

    pub fn resolve(&self, asn: &str) -> Result<ASPoint> {
        let ip = self.representative_ip(asn)?;
        let record = self
            .geo
            .locate(ip)?
            .ok_or_else(|| PipelineError::lookup(format!("AS{}", asn), format!("no location for {}", ip)))?;

        let name = self.blocks.owner_name(asn).unwrap_or(UNKNOWN_NAME);
        Ok(ASPoint::new(asn, ip, record.latitude, record.longitude)
            .with_name(name)
            .with_place(&record.city, &record.region))
    }

    /// Looks up every AS in `asns` lacking geodata and folds the results into
    /// `registry` once all workers are done. Failures skip the AS.
    pub fn discover(&self, registry: &mut ASPointRegistry, asns: &[ASN]) -> DiscoveryStats {
        let candidates: Vec<&ASN> = asns.iter().filter(|asn| registry.needs_geodata(asn)).collect();
        let mut stats = DiscoveryStats {
            candidates: candidates.len(),
            ..DiscoveryStats::default()
        };
        if candidates.is_empty() {
            return stats;
        }

        info!(
            "Discovering {} AS points with {} workers",
            candidates.len(),
            self.workers
        );
        let pb = progress::bar(candidates.len() as u64, self.quiet, "AS numbers");
        let chunk_size = candidates.len().div_ceil(self.workers);

        let results: Vec<(ASN, Result<ASPoint>)> = thread::scope(|scope| {
            let handles: Vec<_> = candidates
                .chunks(chunk_size)
                .map(|chunk| {
                    let pb = pb.clone();
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|asn| {
                                let result = self.resolve(asn);
                                pb.inc(1);
                                ((*asn).clone(), result)
                            })
                            .collect::<Vec<_>>()
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(results) => results,
                    Err(_) => {
                        warn!("discovery worker panicked, its AS numbers are skipped this run");
                        Vec::new()
                    }
                })
                .collect()
        });
        pb.finish_and_clear();

        for (asn, result) in results {
            match result {
                Ok(mut point) => {
                    if let Some(previous) = registry.get(&asn) {
                        point.routes_count = previous.routes_count;
                    }
                    registry.insert(point);
                    stats.discovered += 1;
                }
                Err(e) => {
                    warn!("skipping AS{}: {}", asn, e);
                    stats.failed += 1;
                }
            }
        }

        info!(
            "Discovered {} AS points ({} skipped)",
            stats.discovered, stats.failed
        );
        stats
    }
}

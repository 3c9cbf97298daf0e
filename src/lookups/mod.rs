pub mod maxmind;
pub mod ripestat;

pub use maxmind::MaxMindGeoLookup;
pub use ripestat::RipeStatPrefixLookup;

use std::collections::HashMap;
use std::net::IpAddr;

use ipnetwork::IpNetwork;

use crate::route::ASN;
use crate::shared::Result;

/// Location of an IP address as reported by a geolocation source.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoRecord {
    pub city: String,
    pub region: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoRecord {
    pub fn new(city: &str, region: &str, latitude: f64, longitude: f64) -> Self {
        GeoRecord {
            city: city.to_string(),
            region: region.to_string(),
            latitude,
            longitude,
        }
    }
}

/// Resolves an IP address to a location. `Ok(None)` means not found.
pub trait GeoLookup: Send + Sync {
    fn locate(&self, ip: IpAddr) -> Result<Option<GeoRecord>>;
}

/// Discovers prefixes an AS currently announces.
pub trait PrefixLookup: Send + Sync {
    fn announced_prefixes(&self, asn: &str) -> Result<Vec<IpNetwork>>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryGeoLookup {
    records: HashMap<IpAddr, GeoRecord>,
}

impl InMemoryGeoLookup {
    pub fn new() -> Self {
        InMemoryGeoLookup {
            records: HashMap::new(),
        }
    }

    pub fn with_record(mut self, ip: IpAddr, record: GeoRecord) -> Self {
        self.records.insert(ip, record);
        self
    }

    pub fn insert(&mut self, ip: IpAddr, record: GeoRecord) {
        self.records.insert(ip, record);
    }
}

impl GeoLookup for InMemoryGeoLookup {
    fn locate(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        Ok(self.records.get(&ip).cloned())
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryPrefixLookup {
    prefixes: HashMap<ASN, Vec<IpNetwork>>,
}

impl InMemoryPrefixLookup {
    pub fn new() -> Self {
        InMemoryPrefixLookup {
            prefixes: HashMap::new(),
        }
    }

    pub fn with_prefix(mut self, asn: &str, prefix: IpNetwork) -> Self {
        self.prefixes.entry(asn.to_string()).or_default().push(prefix);
        self
    }
}

impl PrefixLookup for InMemoryPrefixLookup {
    fn announced_prefixes(&self, asn: &str) -> Result<Vec<IpNetwork>> {
        Ok(self.prefixes.get(asn).cloned().unwrap_or_default())
    }
}

/// Used for offline runs: every AS is reported without prefixes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrefixLookup;

impl PrefixLookup for NoPrefixLookup {
    fn announced_prefixes(&self, _asn: &str) -> Result<Vec<IpNetwork>> {
        Ok(Vec::new())
    }
}

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::Duration;

use ipnetwork::IpNetwork;
use lru::LruCache;
use serde::Deserialize;
use tracing::debug;

use super::PrefixLookup;
use crate::route::ASN;
use crate::shared::{PipelineError, Result};

const ANNOUNCED_PREFIXES_URL: &str = "https://stat.ripe.net/data/announced-prefixes/data.json";
const CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, Deserialize)]
struct AnnouncedPrefixesResponse {
    #[serde(default)]
    data: AnnouncedPrefixesData,
}

#[derive(Debug, Default, Deserialize)]
struct AnnouncedPrefixesData {
    #[serde(default)]
    prefixes: Vec<AnnouncedPrefix>,
}

#[derive(Debug, Deserialize)]
struct AnnouncedPrefix {
    prefix: String,
}

/// Asks RIPEstat which prefixes an AS announces.
pub struct RipeStatPrefixLookup {
    client: reqwest::blocking::Client,
    base_url: String,
    cache: Mutex<LruCache<ASN, Vec<IpNetwork>>>,
}

impl RipeStatPrefixLookup {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        let capacity = NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Ok(RipeStatPrefixLookup {
            client,
            base_url: ANNOUNCED_PREFIXES_URL.to_string(),
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }

    fn fetch(&self, asn: &str) -> Result<Vec<IpNetwork>> {
        let number: u32 = asn
            .parse()
            .map_err(|_| PipelineError::lookup(format!("AS{}", asn), "not a plain AS number"))?;

        let url = format!("{}?resource=AS{}", self.base_url, number);
        debug!("GET {}", url);
        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(PipelineError::lookup(
                format!("AS{}", asn),
                format!("RIPEstat returned {}", response.status()),
            ));
        }

        parse_announced_prefixes(&response.text()?)
    }
}

/// Extracts the prefix list from an announced-prefixes response body.
/// Unparseable prefixes are dropped.
pub fn parse_announced_prefixes(body: &str) -> Result<Vec<IpNetwork>> {
    let response: AnnouncedPrefixesResponse = serde_json::from_str(body)?;
    Ok(response
        .data
        .prefixes
        .iter()
        .filter_map(|p| p.prefix.parse().ok())
        .collect())
}

impl PrefixLookup for RipeStatPrefixLookup {
    fn announced_prefixes(&self, asn: &str) -> Result<Vec<IpNetwork>> {
        {
            let mut cache = self.cache.lock().unwrap_or_else(|p| p.into_inner());
            if let Some(prefixes) = cache.get(asn) {
                return Ok(prefixes.clone());
            }
        }

        let prefixes = self.fetch(asn)?;
        self.cache
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .put(asn.to_string(), prefixes.clone());
        Ok(prefixes)
    }
}

//! Geolocation backed by a MaxMind GeoLite2-City database.

use std::net::IpAddr;
use std::path::Path;

use maxminddb::Reader;
use tracing::info;

use super::{GeoLookup, GeoRecord};
use crate::shared::{PipelineError, Result, UNKNOWN_NAME};

pub struct MaxMindGeoLookup {
    reader: Reader<Vec<u8>>,
}

impl MaxMindGeoLookup {
    /// Opens a `.mmdb` file. A missing file is fatal for the run.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(PipelineError::MissingReferenceData {
                what: "geolocation database",
                path: path.to_path_buf(),
            });
        }

        info!("Loading geolocation database from {:?}", path);
        let bytes = std::fs::read(path)?;
        let reader = Reader::from_source(bytes).map_err(|e| PipelineError::UnreadableReferenceData {
            what: "geolocation database",
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(MaxMindGeoLookup { reader })
    }
}

impl GeoLookup for MaxMindGeoLookup {
    fn locate(&self, ip: IpAddr) -> Result<Option<GeoRecord>> {
        let lookup = self
            .reader
            .lookup(ip)
            .map_err(|e| PipelineError::lookup(ip.to_string(), e))?;
        if !lookup.has_data() {
            return Ok(None);
        }

        let city: maxminddb::geoip2::City = match lookup.decode() {
            Ok(Some(city)) => city,
            Ok(None) => return Ok(None),
            Err(e) => return Err(PipelineError::lookup(ip.to_string(), e)),
        };

        let (latitude, longitude) = match (city.location.latitude, city.location.longitude) {
            (Some(lat), Some(lon)) => (lat, lon),
            _ => return Ok(None),
        };

        let city_name = city.city.names.english.unwrap_or(UNKNOWN_NAME);
        let region = city
            .subdivisions
            .last()
            .and_then(|s| s.names.english)
            .unwrap_or(UNKNOWN_NAME);

        Ok(Some(GeoRecord::new(city_name, region, latitude, longitude)))
    }
}

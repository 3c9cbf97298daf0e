use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::shared::{
    PipelineError, Result, ScorePolicy, DEFAULT_MAX_DISTANCE_KM, DEFAULT_SCORE_INCREMENT,
};

pub const UPDATES_FILE: &str = "updates.txt";
pub const OWNERSHIP_FILE: &str = "GeoLite2-ASN-Blocks-IPv4.csv";
pub const GEO_DB_FILE: &str = "GeoLite2-City.mmdb";
pub const ROUTES_FILE: &str = "routes.json";
pub const POINTS_FILE: &str = "points.json";

/// Everything one pipeline run needs to know. Passed to each stage instead
/// of process-wide paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipe-delimited update dump
    pub updates_path: PathBuf,

    /// `prefix_or_ip,asn,owner_name` CSV
    pub ownership_path: PathBuf,

    /// GeoLite2-City database
    pub geo_db_path: PathBuf,

    /// Prior point collection used as a warm start
    pub points_path: Option<PathBuf>,

    pub routes_out: PathBuf,
    pub points_out: PathBuf,

    pub max_distance_km: f64,
    pub score_increment: u32,
    pub score_policy: ScorePolicy,

    /// Concurrent lookups during AS point discovery
    pub lookup_workers: usize,

    /// Query RIPEstat for AS numbers missing from the ownership table
    pub prefix_discovery: bool,

    /// Hides progress output and lowers diagnostics to warnings
    pub quiet: bool,
}

impl PipelineConfig {
    pub fn new() -> Self {
        let data_dir = dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".routescore")
            .join("data");

        Self::in_data_dir(data_dir)
    }

    /// Uses the conventional file names inside `dir` for every path.
    pub fn in_data_dir(dir: PathBuf) -> Self {
        PipelineConfig {
            updates_path: dir.join(UPDATES_FILE),
            ownership_path: dir.join(OWNERSHIP_FILE),
            geo_db_path: dir.join(GEO_DB_FILE),
            points_path: Some(dir.join(POINTS_FILE)),
            routes_out: dir.join(ROUTES_FILE),
            points_out: dir.join(POINTS_FILE),
            max_distance_km: DEFAULT_MAX_DISTANCE_KM,
            score_increment: DEFAULT_SCORE_INCREMENT,
            score_policy: ScorePolicy::default(),
            lookup_workers: num_cpus::get().max(1),
            prefix_discovery: true,
            quiet: false,
        }
    }

    pub fn with_updates_path(mut self, path: PathBuf) -> Self {
        self.updates_path = path;
        self
    }

    pub fn with_ownership_path(mut self, path: PathBuf) -> Self {
        self.ownership_path = path;
        self
    }

    pub fn with_geo_db_path(mut self, path: PathBuf) -> Self {
        self.geo_db_path = path;
        self
    }

    pub fn with_points_path(mut self, path: Option<PathBuf>) -> Self {
        self.points_path = path;
        self
    }

    pub fn with_routes_out(mut self, path: PathBuf) -> Self {
        self.routes_out = path;
        self
    }

    pub fn with_points_out(mut self, path: PathBuf) -> Self {
        self.points_out = path;
        self
    }

    pub fn with_max_distance_km(mut self, km: f64) -> Self {
        self.max_distance_km = km;
        self
    }

    pub fn with_score_increment(mut self, increment: u32) -> Self {
        self.score_increment = increment;
        self
    }

    pub fn with_score_policy(mut self, policy: ScorePolicy) -> Self {
        self.score_policy = policy;
        self
    }

    pub fn with_lookup_workers(mut self, workers: usize) -> Self {
        self.lookup_workers = workers.max(1);
        self
    }

    pub fn with_prefix_discovery(mut self, enabled: bool) -> Self {
        self.prefix_discovery = enabled;
        self
    }

    pub fn with_quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Rejects settings under which a run would silently drop every route.
    pub fn validate(&self) -> Result<()> {
        if !self.max_distance_km.is_finite() || self.max_distance_km < 0.0 {
            return Err(PipelineError::InvalidConfig(format!(
                "max_distance_km must be a finite, non-negative number of kilometres, got {}",
                self.max_distance_km
            )));
        }
        Ok(())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_distance() {
        let config = PipelineConfig::in_data_dir(PathBuf::from("data"));
        assert!(config.validate().is_ok());
        assert!(config.clone().with_max_distance_km(0.0).validate().is_ok());

        for bad in [f64::NAN, f64::INFINITY, -1.0] {
            let result = config.clone().with_max_distance_km(bad).validate();
            assert!(matches!(result, Err(PipelineError::InvalidConfig(_))), "{}", bad);
        }
    }
}

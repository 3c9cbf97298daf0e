use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::info;

use crate::aggregator::recount_routes;
use crate::as_registry::{asns_in_routes, ASBlockRegistry, ASPointRegistry, DiscoveryStats, PointDiscovery};
use crate::geo_filter::GeoDistanceFilter;
use crate::ingest::{read_update_dump, IngestStats};
use crate::lookups::{GeoLookup, MaxMindGeoLookup, NoPrefixLookup, PrefixLookup, RipeStatPrefixLookup};
use crate::ownership_checker::{OwnershipChecker, OwnershipCounts};
use crate::route::Route;
use crate::scorer::LegitimacyScorer;
use crate::shared::{PipelineError, Result, Stage};

use super::persistence::persist_outputs;
use super::pipeline_config::PipelineConfig;

/// What a run did, stage by stage.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunSummary {
    pub ingest: IngestStats,
    pub discovery: DiscoveryStats,
    pub routes_after_geo_filter: usize,
    pub routes_attributed: usize,
    pub ownership: OwnershipCounts,
    pub routes_scored: usize,
    pub points_total: usize,
    pub elapsed_secs: f64,
}

/// Routes and points produced by the evaluation stages, not yet persisted.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub routes: Vec<Route>,
    pub points: ASPointRegistry,
}

/// Runs every stage in order against one update dump.
pub struct PipelineRunner {
    pub config: PipelineConfig,
    geo: Box<dyn GeoLookup>,
    prefixes: Box<dyn PrefixLookup>,
    cancel: Arc<AtomicBool>,
}

impl PipelineRunner {
    pub fn new(
        config: PipelineConfig,
        geo: Box<dyn GeoLookup>,
        prefixes: Box<dyn PrefixLookup>,
    ) -> Self {
        PipelineRunner {
            config,
            geo,
            prefixes,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Opens the MaxMind database and, unless disabled, RIPEstat.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let geo = MaxMindGeoLookup::open(&config.geo_db_path)?;
        let prefixes: Box<dyn PrefixLookup> = if config.prefix_discovery {
            Box::new(RipeStatPrefixLookup::new()?)
        } else {
            Box::new(NoPrefixLookup)
        };
        Ok(Self::new(config, Box::new(geo), prefixes))
    }

    /// Setting the flag aborts the run at the next stage boundary.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    fn checkpoint(&self, stage: Stage) -> Result<()> {
        if self.cancel.load(Ordering::SeqCst) {
            info!("Run cancelled before {}", stage);
            return Err(PipelineError::Cancelled { stage });
        }
        Ok(())
    }

    /// Loads inputs, evaluates, and persists both collections.
    pub fn run(&self) -> Result<RunSummary> {
        let start_time = Instant::now();
        info!("Starting pipeline run");
        self.config.validate()?;

        self.checkpoint(Stage::Ingest)?;
        let blocks = ASBlockRegistry::load_csv(&self.config.ownership_path)?;
        let points = match &self.config.points_path {
            Some(path) => ASPointRegistry::load_json(path)?,
            None => ASPointRegistry::new(),
        };
        let (routes, ingest) = read_update_dump(&self.config.updates_path, self.config.quiet)?;

        let mut summary = RunSummary {
            ingest,
            ..RunSummary::default()
        };
        let output = self.evaluate(routes, &blocks, points, &mut summary)?;

        self.checkpoint(Stage::Persist)?;
        persist_outputs(
            &self.config.routes_out,
            &output.routes,
            &self.config.points_out,
            &output.points.to_vec(),
        )?;

        summary.elapsed_secs = start_time.elapsed().as_secs_f64();
        info!(
            "Run complete in {:.2}s: {} routes kept, {} scored, {} AS points",
            summary.elapsed_secs,
            summary.routes_after_geo_filter,
            summary.routes_scored,
            summary.points_total
        );
        Ok(summary)
    }

    /// Every stage after ingestion, on already deduplicated announcements.
    pub fn evaluate(
        &self,
        routes: Vec<Route>,
        blocks: &ASBlockRegistry,
        mut points: ASPointRegistry,
        summary: &mut RunSummary,
    ) -> Result<PipelineOutput> {
        self.checkpoint(Stage::Discover)?;
        let discovery = PointDiscovery::new(blocks, self.geo.as_ref(), self.prefixes.as_ref())
            .with_workers(self.config.lookup_workers)
            .with_quiet(self.config.quiet);
        summary.discovery = discovery.discover(&mut points, &asns_in_routes(&routes));

        self.checkpoint(Stage::GeoFilter)?;
        let mut routes = GeoDistanceFilter::new(self.config.max_distance_km).apply(routes, &points);
        summary.routes_after_geo_filter = routes.len();

        self.checkpoint(Stage::Aggregate)?;
        summary.routes_attributed = recount_routes(&mut points, &routes);

        self.checkpoint(Stage::OwnershipCheck)?;
        let report = OwnershipChecker::new(blocks).check_routes(&routes);
        summary.ownership = report.counts();

        self.checkpoint(Stage::Score)?;
        let scorer = LegitimacyScorer::new(self.config.score_increment, self.config.score_policy);
        summary.routes_scored = scorer.score(&mut routes, &report);

        summary.points_total = points.len();
        Ok(PipelineOutput { routes, points })
    }
}

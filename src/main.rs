use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use routescore::collectors::RouteViewsCollector;
use routescore::pipeline_runner::pipeline_config::UPDATES_FILE;
use routescore::{PipelineConfig, PipelineRunner, ScorePolicy};

#[derive(Parser)]
#[command(
    name = "routescore",
    about = "Scores BGP update routes against AS geolocation and ownership data",
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    /// Only print warnings and errors, hide progress bars
    #[arg(long, global = true)]
    quiet: bool,

    /// Directory holding the input tables and the output documents
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an update dump and write routes.json / points.json
    Run(RunArgs),
    /// Download the latest RouteViews update dump and convert it with bgpdump
    Fetch(FetchArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, help = "Pipe-delimited update dump")]
    updates: Option<PathBuf>,

    #[arg(long, help = "AS-block ownership CSV (prefix_or_ip,asn,owner_name)")]
    ownership: Option<PathBuf>,

    #[arg(long, help = "GeoLite2-City .mmdb database")]
    geo_db: Option<PathBuf>,

    #[arg(long, help = "Prior points.json used as a warm start")]
    points: Option<PathBuf>,

    #[arg(long, help = "Ignore any prior points file")]
    cold: bool,

    #[arg(long)]
    routes_out: Option<PathBuf>,

    #[arg(long)]
    points_out: Option<PathBuf>,

    #[arg(
        long,
        default_value = "100.0",
        value_parser = parse_distance_km,
        help = "Maximum start-to-target distance in km"
    )]
    max_distance_km: f64,

    #[arg(long, default_value = "5", help = "Score added to selected routes")]
    score_increment: u32,

    #[arg(long, value_enum, default_value = "reward-unmatched")]
    score_policy: PolicyArg,

    #[arg(long, help = "Concurrent lookups during discovery [default: CPU count]")]
    workers: Option<usize>,

    #[arg(long, help = "Do not query RIPEstat for unregistered AS numbers")]
    offline: bool,
}

#[derive(Args)]
struct FetchArgs {
    #[arg(long, help = "Where to write the converted dump [default: <data-dir>/updates.txt]")]
    output: Option<PathBuf>,

    #[arg(long, default_value = "bgpdump")]
    bgpdump: PathBuf,
}

#[derive(Clone, Copy, ValueEnum)]
enum PolicyArg {
    /// Increment routes whose origin IP is outside the AS's blocks
    RewardUnmatched,
    /// Increment routes whose origin IP is inside the AS's blocks
    RewardMatched,
}

impl From<PolicyArg> for ScorePolicy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::RewardUnmatched => ScorePolicy::RewardUnmatched,
            PolicyArg::RewardMatched => ScorePolicy::RewardMatched,
        }
    }
}

fn parse_distance_km(value: &str) -> std::result::Result<f64, String> {
    let km: f64 = value.parse().map_err(|e| format!("{}", e))?;
    if !km.is_finite() || km < 0.0 {
        return Err(format!("{} is not a finite, non-negative distance", value));
    }
    Ok(km)
}

fn init_logging(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn base_config(data_dir: Option<PathBuf>) -> PipelineConfig {
    match data_dir {
        Some(dir) => PipelineConfig::in_data_dir(dir),
        None => PipelineConfig::new(),
    }
}

fn run_pipeline(config: PipelineConfig, args: RunArgs) -> Result<()> {
    let mut config = config
        .with_max_distance_km(args.max_distance_km)
        .with_score_increment(args.score_increment)
        .with_score_policy(args.score_policy.into())
        .with_prefix_discovery(!args.offline);

    if let Some(path) = args.updates {
        config = config.with_updates_path(path);
    }
    if let Some(path) = args.ownership {
        config = config.with_ownership_path(path);
    }
    if let Some(path) = args.geo_db {
        config = config.with_geo_db_path(path);
    }
    if let Some(path) = args.points {
        config = config.with_points_path(Some(path));
    }
    if args.cold {
        config = config.with_points_path(None);
    }
    if let Some(path) = args.routes_out {
        config = config.with_routes_out(path);
    }
    if let Some(path) = args.points_out {
        config = config.with_points_out(path);
    }
    if let Some(workers) = args.workers {
        config = config.with_lookup_workers(workers);
    }

    info!("Configuration: {}", config.to_json());
    let runner = PipelineRunner::from_config(config).context("failed to open reference data")?;
    let summary = runner.run().context("pipeline run failed")?;
    info!("Summary: {}", serde_json::to_string(&summary)?);
    Ok(())
}

fn fetch_updates(config: PipelineConfig, args: FetchArgs) -> Result<()> {
    let output = args.output.unwrap_or_else(|| {
        config
            .updates_path
            .parent()
            .map(|dir| dir.join(UPDATES_FILE))
            .unwrap_or_else(|| PathBuf::from(UPDATES_FILE))
    });
    let cache_dir = output
        .parent()
        .map(|dir| dir.join(".tmp"))
        .unwrap_or_else(|| PathBuf::from(".tmp"));

    RouteViewsCollector::new(&cache_dir)
        .with_bgpdump(args.bgpdump)
        .run(&output)
        .context("failed to fetch the latest update dump")?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let config = base_config(cli.data_dir).with_quiet(cli.quiet);
    match cli.command {
        Command::Run(args) => run_pipeline(config, args),
        Command::Fetch(args) => fetch_updates(config, args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_distance_km() {
        assert_eq!(parse_distance_km("250.5"), Ok(250.5));
        assert_eq!(parse_distance_km("0"), Ok(0.0));
        assert!(parse_distance_km("NaN").is_err());
        assert!(parse_distance_km("inf").is_err());
        assert!(parse_distance_km("-3").is_err());
        assert!(parse_distance_km("far").is_err());
    }

    #[test]
    fn test_policy_help_describes_variants() {
        use clap::CommandFactory;

        let mut cli = Cli::command();
        let run = cli.find_subcommand_mut("run").unwrap();
        let help = run.render_long_help().to_string();

        assert!(help.contains("outside the AS's blocks"), "{}", help);
        assert!(help.contains("inside the AS's blocks"), "{}", help);
    }

    #[test]
    fn test_run_rejects_nan_distance() {
        let result = Cli::try_parse_from(["routescore", "run", "--max-distance-km", "NaN"]);
        assert!(result.is_err());
    }
}

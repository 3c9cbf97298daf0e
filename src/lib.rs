// Re-export all public modules
pub mod shared;
pub mod route;
pub mod progress;
pub mod ingest;
pub mod as_registry;
pub mod lookups;
pub mod geo_filter;
pub mod aggregator;
pub mod ownership_checker;
pub mod scorer;
pub mod pipeline_runner;
pub mod collectors;

// Re-export commonly used types at the crate root
pub use as_registry::{ASBlock, ASBlockRegistry, ASPoint, ASPointRegistry};
pub use geo_filter::{GeoDistanceFilter, GeoPoint};
pub use ownership_checker::{OwnershipChecker, OwnershipReport};
pub use pipeline_runner::{PipelineConfig, PipelineRunner, RunSummary};
pub use route::{Route, ASN};
pub use scorer::LegitimacyScorer;
pub use shared::{OwnershipVerdict, PipelineError, RouteStatus, ScorePolicy};

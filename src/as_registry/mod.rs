pub mod as_blocks;
pub mod as_points;

pub use as_blocks::{ASBlock, ASBlockRegistry};
pub use as_points::{asns_in_routes, ASPoint, ASPointRegistry, DiscoveryStats, PointDiscovery};

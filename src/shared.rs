use std::fmt;
use std::path::PathBuf;

/// Mean Earth radius used for great-circle distances.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const DEFAULT_MAX_DISTANCE_KM: f64 = 100.0;
pub const DEFAULT_SCORE_INCREMENT: u32 = 5;

/// Owner name used when an AS has no ownership-table entry.
pub const UNKNOWN_NAME: &str = "Unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum RouteStatus {
    Announce,
    Withdraw,
    Unknown,
}

impl RouteStatus {
    /// Maps the update-type field of a `bgpdump -m` line.
    pub fn from_marker(marker: &str) -> Self {
        match marker.trim() {
            "A" => RouteStatus::Announce,
            "W" => RouteStatus::Withdraw,
            _ => RouteStatus::Unknown,
        }
    }

    pub fn is_announce(&self) -> bool {
        matches!(self, RouteStatus::Announce)
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteStatus::Announce => "ANNOUNCE",
            RouteStatus::Withdraw => "WITHDRAW",
            RouteStatus::Unknown => "UNKNOWN",
        };
        write!(f, "{}", s)
    }
}

/// Which ownership outcome earns a route the score increment.
///
/// `RewardUnmatched` reproduces the behavior of the deployed updater: routes
/// whose origin IP is outside every block registered to their start AS are
/// incremented. `RewardMatched` increments the routes that do fall inside a
/// registered block. Neither policy ever decrements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScorePolicy {
    #[default]
    RewardUnmatched,
    RewardMatched,
}

impl fmt::Display for ScorePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ScorePolicy::RewardUnmatched => "REWARD_UNMATCHED",
            ScorePolicy::RewardMatched => "REWARD_MATCHED",
        };
        write!(f, "{}", s)
    }
}

/// Result of testing one `(origin_ip, start_system)` pair against the
/// AS-block registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OwnershipVerdict {
    Matched = 0,
    NoMatch = 1,
    Unregistered = 2,
    Malformed = 3,
}

impl fmt::Display for OwnershipVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OwnershipVerdict::Matched => "MATCHED",
            OwnershipVerdict::NoMatch => "NO_MATCH",
            OwnershipVerdict::Unregistered => "UNREGISTERED",
            OwnershipVerdict::Malformed => "MALFORMED",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Ingest,
    Discover,
    GeoFilter,
    Aggregate,
    OwnershipCheck,
    Score,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::Ingest => "INGEST",
            Stage::Discover => "DISCOVER",
            Stage::GeoFilter => "GEO_FILTER",
            Stage::Aggregate => "AGGREGATE",
            Stage::OwnershipCheck => "OWNERSHIP_CHECK",
            Stage::Score => "SCORE",
            Stage::Persist => "PERSIST",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("malformed record ({context}): {reason}")]
    MalformedRecord { context: String, reason: String },

    #[error("lookup failed for {key}: {reason}")]
    LookupFailure { key: String, reason: String },

    #[error("missing reference data: {what} at {path:?}")]
    MissingReferenceData { what: &'static str, path: PathBuf },

    #[error("unreadable reference data: {what} at {path:?}: {reason}")]
    UnreadableReferenceData {
        what: &'static str,
        path: PathBuf,
        reason: String,
    },

    #[error("could not persist {path:?}: {source}")]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("run cancelled before stage {stage}")]
    Cancelled { stage: Stage },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    pub fn malformed(context: impl Into<String>, reason: impl fmt::Display) -> Self {
        PipelineError::MalformedRecord {
            context: context.into(),
            reason: reason.to_string(),
        }
    }

    pub fn lookup(key: impl Into<String>, reason: impl fmt::Display) -> Self {
        PipelineError::LookupFailure {
            key: key.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the run may continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PipelineError::MalformedRecord { .. } | PipelineError::LookupFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

pub mod dedup;
pub mod record;

pub use dedup::{dedup_routes, RouteDeduplicator};
pub use record::parse_update_line;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::progress;
use crate::route::Route;
use crate::shared::{PipelineError, Result};

/// Counters for one pass over an update dump.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub lines_read: usize,
    pub malformed: usize,
    pub not_announce: usize,
    pub duplicates: usize,
    pub routes: usize,
}

/// Accumulates routes from update lines one at a time.
///
/// Only announcements are kept, in line order, at most one per AS path.
/// Malformed lines are logged and counted.
#[derive(Debug, Default)]
pub struct Ingestor {
    stats: IngestStats,
    dedup: RouteDeduplicator,
    routes: Vec<Route>,
}

impl Ingestor {
    pub fn new() -> Self {
        Ingestor::default()
    }

    pub fn push_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        self.stats.lines_read += 1;
        let line_no = self.stats.lines_read;

        match parse_update_line(line) {
            Ok(route) if route.status.is_announce() => {
                if let Some(route) = self.dedup.admit(route) {
                    self.routes.push(route);
                }
            }
            Ok(route) => {
                debug!("line {}: skipping {} record", line_no, route.status);
                self.stats.not_announce += 1;
            }
            Err(e) => {
                warn!("line {}: {}", line_no, e);
                self.stats.malformed += 1;
            }
        }
    }

    /// Raw bytes from a dump. Lines that are not valid UTF-8 are malformed.
    pub fn push_bytes(&mut self, bytes: &[u8]) {
        match std::str::from_utf8(bytes) {
            Ok(line) => self.push_line(line),
            Err(e) => {
                self.stats.lines_read += 1;
                self.stats.malformed += 1;
                warn!("line {}: not valid UTF-8 ({})", self.stats.lines_read, e);
            }
        }
    }

    pub fn finish(self) -> (Vec<Route>, IngestStats) {
        let mut stats = self.stats;
        stats.duplicates = self.dedup.dropped();
        stats.routes = self.routes.len();
        (self.routes, stats)
    }
}

/// Parses and deduplicates a stream of update lines.
pub fn ingest_lines<I, S>(lines: I) -> (Vec<Route>, IngestStats)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut ingestor = Ingestor::new();
    for line in lines {
        ingestor.push_line(line.as_ref());
    }
    ingestor.finish()
}

/// Reads a pipe-delimited update dump from disk.
pub fn read_update_dump(path: &Path, quiet: bool) -> Result<(Vec<Route>, IngestStats)> {
    if !path.exists() {
        return Err(PipelineError::MissingReferenceData {
            what: "update dump",
            path: path.to_path_buf(),
        });
    }

    info!("Reading update dump from {:?}", path);
    let reader = BufReader::new(File::open(path)?);
    let pb = progress::spinner(quiet, "lines");

    let mut ingestor = Ingestor::new();
    for line in reader.split(b'\n') {
        ingestor.push_bytes(&line?);
        pb.inc(1);
    }
    pb.finish_and_clear();

    let (routes, stats) = ingestor.finish();
    info!(
        "Ingested {} routes from {} lines ({} malformed, {} not announce, {} duplicate paths)",
        stats.routes, stats.lines_read, stats.malformed, stats.not_announce, stats.duplicates
    );
    Ok((routes, stats))
}

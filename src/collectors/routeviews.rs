use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::Command;

use bzip2::read::BzDecoder;
use chrono::{DateTime, Duration, Timelike, Utc};
use scraper::{Html, Selector};
use tracing::{info, warn};

use crate::shared::{PipelineError, Result};

const ROUTEVIEWS_URL: &str = "http://archive.routeviews.org/bgpdata/";

/// Update files appear on the archive with some delay.
const PUBLISH_LAG_MINUTES: i64 = 30;
const UPDATE_INTERVAL_MINUTES: u32 = 15;

/// Directory listing URL holding the update files for `time`'s month.
pub fn updates_dir_url(time: DateTime<Utc>) -> String {
    format!("{}{}/UPDATES/", ROUTEVIEWS_URL, time.format("%Y.%m"))
}

/// The most recent update file expected to be published at `now`.
pub fn latest_update_url(now: DateTime<Utc>) -> String {
    let time = now - Duration::minutes(PUBLISH_LAG_MINUTES);
    let minute = (time.minute() / UPDATE_INTERVAL_MINUTES) * UPDATE_INTERVAL_MINUTES;
    let rounded = time
        .with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(time);

    format!(
        "{}updates.{}.bz2",
        updates_dir_url(rounded),
        rounded.format("%Y%m%d.%H%M")
    )
}

/// File names of the form `updates.*.bz2` linked from a directory listing,
/// sorted oldest first.
pub fn list_available_updates(html: &str) -> Vec<String> {
    let selector = match Selector::parse("a[href]") {
        Ok(selector) => selector,
        Err(_) => return Vec::new(),
    };

    let document = Html::parse_document(html);
    let mut files: Vec<String> = document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.starts_with("updates.") && href.ends_with(".bz2"))
        .map(str::to_string)
        .collect();
    files.sort();
    files.dedup();
    files
}

/// Fetches the latest RouteViews update dump and converts it to the
/// pipe-delimited text the pipeline reads, using the external `bgpdump`.
pub struct RouteViewsCollector {
    cache_dir: PathBuf,
    bgpdump: PathBuf,
}

impl RouteViewsCollector {
    pub fn new(cache_dir: &Path) -> Self {
        RouteViewsCollector {
            cache_dir: cache_dir.to_path_buf(),
            bgpdump: PathBuf::from("bgpdump"),
        }
    }

    pub fn with_bgpdump(mut self, path: PathBuf) -> Self {
        self.bgpdump = path;
        self
    }

    /// Downloads, decompresses and converts; returns `output`.
    pub fn run(&self, output: &Path) -> Result<PathBuf> {
        fs::create_dir_all(&self.cache_dir)?;

        let now = Utc::now();
        let url = latest_update_url(now);
        let bz2_data = match self.download_file(&url) {
            Ok(data) => data,
            Err(e) => {
                warn!("{} not available ({}), falling back to directory listing", url, e);
                let fallback = self.latest_listed_url(now)?;
                self.download_file(&fallback)?
            }
        };

        let mrt_path = self.cache_dir.join("updates.mrt");
        self.decompress_bz2(&bz2_data, &mrt_path)?;
        let result = self.convert_with_bgpdump(&mrt_path, output);
        if let Err(e) = fs::remove_file(&mrt_path) {
            warn!("could not remove {:?}: {}", mrt_path, e);
        }
        result?;

        info!("Update dump written to {:?}", output);
        Ok(output.to_path_buf())
    }

    fn latest_listed_url(&self, now: DateTime<Utc>) -> Result<String> {
        let dir_url = updates_dir_url(now - Duration::minutes(PUBLISH_LAG_MINUTES));
        let listing = String::from_utf8_lossy(&self.download_file(&dir_url)?).into_owned();
        list_available_updates(&listing)
            .pop()
            .map(|file| format!("{}{}", dir_url, file))
            .ok_or_else(|| PipelineError::lookup(dir_url.clone(), "no update files listed"))
    }

    fn download_file(&self, url: &str) -> Result<Vec<u8>> {
        info!("Downloading {}", url);
        let response = reqwest::blocking::get(url)?;
        if !response.status().is_success() {
            return Err(PipelineError::lookup(
                url.to_string(),
                format!("download failed: {}", response.status()),
            ));
        }
        Ok(response.bytes()?.to_vec())
    }

    fn decompress_bz2(&self, data: &[u8], target: &Path) -> Result<()> {
        let mut decoder = BzDecoder::new(data);
        let mut out = BufWriter::new(File::create(target)?);
        io::copy(&mut decoder, &mut out)?;
        Ok(())
    }

    fn convert_with_bgpdump(&self, mrt_path: &Path, output: &Path) -> Result<()> {
        info!("Converting {:?} with {:?}", mrt_path, self.bgpdump);
        let status = Command::new(&self.bgpdump)
            .arg("-m")
            .arg(mrt_path)
            .arg("-O")
            .arg(output)
            .status()?;
        if !status.success() {
            return Err(PipelineError::Io(io::Error::other(format!(
                "{:?} exited with {}",
                self.bgpdump, status
            ))));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_latest_update_url_rounds_to_interval() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 12, 52, 17).unwrap();
        assert_eq!(
            latest_update_url(now),
            "http://archive.routeviews.org/bgpdata/2025.01/UPDATES/updates.20250101.1215.bz2"
        );
    }

    #[test]
    fn test_latest_update_url_crosses_month() {
        let now = Utc.with_ymd_and_hms(2025, 2, 1, 0, 10, 0).unwrap();
        assert_eq!(
            latest_update_url(now),
            "http://archive.routeviews.org/bgpdata/2025.01/UPDATES/updates.20250131.2330.bz2"
        );
    }

    #[test]
    fn test_list_available_updates() {
        let html = r#"<html><body>
            <a href="../">Parent</a>
            <a href="updates.20250101.0015.bz2">updates.20250101.0015.bz2</a>
            <a href="updates.20250101.0000.bz2">updates.20250101.0000.bz2</a>
            <a href="rib.20250101.0000.bz2">rib</a>
        </body></html>"#;

        assert_eq!(
            list_available_updates(html),
            vec!["updates.20250101.0000.bz2", "updates.20250101.0015.bz2"]
        );
    }
}

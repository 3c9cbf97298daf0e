use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::info;

use crate::as_registry::ASPoint;
use crate::route::Route;
use crate::shared::{PipelineError, Result};

fn failure(path: &Path, source: std::io::Error) -> PipelineError {
    PipelineError::PersistenceFailure {
        path: path.to_path_buf(),
        source,
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Writes and syncs `bytes` to a temporary file in `path`'s directory. The
/// target is untouched until [`commit`] is called.
fn stage(path: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let dir = parent_dir(path);
    fs::create_dir_all(&dir).map_err(|e| failure(path, e))?;

    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| failure(path, e))?;
    tmp.write_all(bytes).map_err(|e| failure(path, e))?;
    tmp.as_file().sync_all().map_err(|e| failure(path, e))?;
    Ok(tmp)
}

fn commit(tmp: NamedTempFile, path: &Path) -> Result<()> {
    tmp.persist(path).map_err(|e| failure(path, e.error))?;
    Ok(())
}

/// Writes `bytes` next to `path` and renames over it, so readers see either
/// the old file or the complete new one.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp = stage(path, bytes)?;
    commit(tmp, path)
}

pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');
    Ok(bytes)
}

/// Persists both collections. Both documents are serialised and written to
/// temporary files before either target is replaced.
pub fn persist_outputs(
    routes_path: &Path,
    routes: &[Route],
    points_path: &Path,
    points: &[ASPoint],
) -> Result<()> {
    let routes_tmp = stage(routes_path, &to_pretty_json(routes)?)?;
    let points_tmp = stage(points_path, &to_pretty_json(points)?)?;

    commit(routes_tmp, routes_path)?;
    info!("Wrote {} routes to {:?}", routes.len(), routes_path);
    commit(points_tmp, points_path)?;
    info!("Wrote {} AS points to {:?}", points.len(), points_path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("routes.json");

        write_atomic(&path, b"[1]").unwrap();
        write_atomic(&path, b"[2]").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "[2]");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_write_atomic_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("points.json");

        write_atomic(&path, b"[]").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_failed_points_write_leaves_routes_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let routes_path = dir.path().join("routes.json");
        fs::write(&routes_path, "[]\n").unwrap();

        // A regular file where the points directory should be.
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();
        let points_path = blocker.join("points.json");

        let route = Route::new(
            "1735689600".to_string(),
            crate::shared::RouteStatus::Announce,
            "203.0.113.5".to_string(),
            "64500".to_string(),
            "203.0.113.0/24".to_string(),
            vec!["64500".to_string()],
        );
        let result = persist_outputs(&routes_path, &[route], &points_path, &[]);

        assert!(matches!(result, Err(PipelineError::PersistenceFailure { .. })));
        assert_eq!(fs::read_to_string(&routes_path).unwrap(), "[]\n");
        let entries = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 2);
    }
}

//! Artifact file discovery.
//!
//! Training runs drop timestamped artifact files into fixed directories and
//! never overwrite older ones. Serving always picks the newest file whose
//! name starts with the artifact prefix, so a half-written newer file can be
//! replaced by simply re-running the export.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::debug;

use crate::error::{Result, StoreError};

/// Return the newest file in `dir` whose name starts with `prefix` and has
/// the extension `ext`.
///
/// Newest means latest modification time; ties fall back to lexicographic
/// file name order, which favors the higher timestamp suffix in the names
/// the export job produces.
pub fn latest_artifact(dir: &Path, prefix: &str, ext: &str) -> Result<PathBuf> {
    let mut best: Option<(SystemTime, String, PathBuf)> = None;

    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        if !name.starts_with(prefix) {
            continue;
        }
        if path.extension().and_then(|e| e.to_str()) != Some(ext) {
            continue;
        }

        let modified = entry
            .metadata()?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH);

        let newer = match &best {
            None => true,
            Some((best_time, best_name, _)) => {
                (modified, &name) > (*best_time, best_name)
            }
        };
        if newer {
            best = Some((modified, name, path));
        }
    }

    match best {
        Some((_, name, path)) => {
            debug!(artifact = %name, dir = %dir.display(), "Selected newest artifact");
            Ok(path)
        }
        None => Err(StoreError::ArtifactNotFound {
            dir: dir.display().to_string(),
            pattern: format!("{prefix}*.{ext}"),
        }),
    }
}

use std::io;
use std::path::{Path, PathBuf};

use sanitize_filename::sanitize;

/// User-facing name of an upload: last path component, sanitized.
///
/// `None` when nothing usable is left.
pub fn original_name(raw: &str) -> Option<String> {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let name = sanitize(last.trim());
    (!name.is_empty()).then_some(name)
}

/// On-disk name for `filename`, unique per call.
pub fn storage_name(filename: &str) -> String {
    format!("{}_{}", uuid::Uuid::new_v4(), filename)
}

/// Writes `bytes` under a fresh name in `dir` and returns the final path.
///
/// The data goes to a temporary file first and is renamed into place, so
/// the returned path never holds a partial write.
pub async fn write_atomic(dir: &Path, filename: &str, bytes: &[u8]) -> io::Result<PathBuf> {
    let name = storage_name(filename);
    let path = dir.join(&name);
    let partial = dir.join(format!(".{}.part", name));

    if let Err(err) = tokio::fs::write(&partial, bytes).await {
        remove_best_effort(&partial).await;
        return Err(err);
    }
    if let Err(err) = tokio::fs::rename(&partial, &path).await {
        remove_best_effort(&partial).await;
        return Err(err);
    }

    tracing::debug!("Stored {} bytes at {}", bytes.len(), path.display());
    Ok(path)
}

/// Removes a stored file, logging instead of failing. A file that is
/// already gone counts as removed.
pub async fn remove_best_effort(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!("Removed {}", path.display()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("{} was already gone", path.display())
        }
        Err(err) => tracing::warn!("Could not remove {}: {}", path.display(), err),
    }
}

//! Crash-safe file replacement.

use crate::error::{StorageError, StorageErrorExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Infix marking in-progress temporary files; see [`crate::purge_tmp`].
pub(crate) const TMP_MARKER: &str = ".shubtmp.";

static TMP_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Replaces `target` with `data` so that readers only ever observe the old or the new
/// contents.
///
/// 1. Write to a unique sibling `.<name>.shubtmp.<n>` opened with `create_new`.
/// 2. `fsync` the temporary file.
/// 3. Rename it over the target (remove-then-rename where replace is unsupported).
/// 4. `fsync` the parent directory, best effort.
///
/// Parent directories are created as needed.
pub async fn write_atomic(target: &Path, data: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .context(format!("Creating parent directory for {}", target.display()))?;
    }

    let temp = tmp_path(target);
    let written = async {
        let mut file = fs::OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&temp)
            .await
            .context(format!("Creating temporary file {}", temp.display()))?;
        file.write_all(data).await.context("Writing temporary file")?;
        file.sync_all().await.context("Syncing temporary file")?;
        Ok::<(), StorageError>(())
    };
    if let Err(err) = written.await {
        let _ = fs::remove_file(&temp).await;
        return Err(err);
    }

    if let Err(err) = fs::rename(&temp, target).await {
        if err.kind() == std::io::ErrorKind::AlreadyExists {
            fs::remove_file(target)
                .await
                .context(format!("Removing replaced file {}", target.display()))?;
            fs::rename(&temp, target)
                .await
                .context(format!("Atomic swap {} -> {}", temp.display(), target.display()))?;
        } else {
            let _ = fs::remove_file(&temp).await;
            return Err(StorageError::Io {
                source: err,
                context: Some(
                    format!("Atomic swap {} -> {}", temp.display(), target.display()).into(),
                ),
            });
        }
    }

    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        sync_dir(parent).await;
    }

    debug!(path = %target.display(), bytes = data.len(), "File replaced atomically");
    Ok(())
}

fn tmp_path(target: &Path) -> PathBuf {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = target.file_name().and_then(|s| s.to_str()).unwrap_or("store");
    target.with_file_name(format!(".{name}{TMP_MARKER}{n}"))
}

async fn sync_dir(path: &Path) {
    match fs::File::open(path).await {
        Ok(dir) => {
            if let Err(err) = dir.sync_all().await {
                warn!(path = %path.display(), error = %err, "Directory sync failed");
            }
        }
        Err(err) => warn!(path = %path.display(), error = %err, "Directory open failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replaces_existing_contents() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested/doc.json");

        write_atomic(&target, b"first").await.unwrap();
        write_atomic(&target, b"second").await.unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let leftovers = std::fs::read_dir(target.parent().unwrap())
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().contains(TMP_MARKER))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_tmp_names_are_unique_hidden_siblings() {
        let target = Path::new("/data/store.json");
        let a = tmp_path(target);
        let b = tmp_path(target);
        assert_ne!(a, b);
        assert_eq!(a.parent(), target.parent());
        assert!(a.file_name().unwrap().to_string_lossy().starts_with(".store.json.shubtmp."));
    }
}

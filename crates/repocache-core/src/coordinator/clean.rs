//! `clean(url)`: tear an entry down — checkouts first, then the store,
//! then its metadata and lock file.

use std::path::Path;

use crate::error::{Error, Result};
use crate::identity::{parse_repo_url, RepoId};
use crate::integrity;
use crate::lock;
use crate::metadata;

use super::Coordinator;

/// Outcome of a [`Coordinator::clean`] call.
#[derive(Debug, Default)]
pub struct CleanReport {
    /// The entry's identity.
    pub id: Option<RepoId>,
    /// Whether the read-only checkout was removed.
    pub read_only_removed: bool,
    /// Whether the modifiable checkout was removed.
    pub modifiable_removed: bool,
    /// Whether the store was removed.
    pub store_removed: bool,
    /// Whether the sidecar metadata file was removed along with the store.
    pub metadata_removed: bool,
    /// Checkouts found elsewhere under the checkout root whose store no
    /// longer exists, swept as a side effect of this call.
    pub orphans_removed: Vec<std::path::PathBuf>,
}

impl Coordinator {
    /// Remove every trace of `url`'s entry: both checkouts, the bare store,
    /// its metadata, and finally the entry lock file, all under the entry
    /// lock. A checkout with uncommitted changes is left in place unless
    /// `force` is set.
    pub async fn clean(&self, url: &str, force: bool) -> Result<CleanReport> {
        let id = parse_repo_url(url)?;
        let store_path = self.store_path(&id);
        let checkout_path = self.checkout_path(&id);
        let modifiable_path = self.modifiable_path(&id);

        guard_against_catastrophic_target(&store_path)?;
        guard_against_catastrophic_target(&checkout_path)?;
        guard_against_catastrophic_target(&modifiable_path)?;

        let guard = lock::acquire(&store_path, self.lock_options()).await?;
        let result = self
            .clean_locked(&id, &store_path, &checkout_path, &modifiable_path, force)
            .await;
        lock::release(guard).await?;
        result
    }

    async fn clean_locked(
        &self,
        id: &RepoId,
        store_path: &Path,
        checkout_path: &Path,
        modifiable_path: &Path,
        force: bool,
    ) -> Result<CleanReport> {
        let mut report = CleanReport {
            id: Some(id.clone()),
            ..CleanReport::default()
        };

        report.read_only_removed = self.remove_checkout_if_clean(checkout_path, force).await?;
        report.modifiable_removed = self.remove_checkout_if_clean(modifiable_path, force).await?;

        if store_path.exists() {
            tokio::fs::remove_dir_all(store_path)
                .await
                .map_err(|e| Error::Filesystem(store_path.to_path_buf(), e.to_string()))?;
            report.store_removed = true;
            report.metadata_removed = true;
        }

        let lock_path = crate::path_resolver::lock_path(store_path);
        if lock_path.exists() {
            let _ = tokio::fs::remove_file(&lock_path).await;
        }

        for orphan in integrity::find_orphans(&self.config.checkout_root).await? {
            if tokio::fs::remove_dir_all(&orphan.checkout_path).await.is_ok() {
                report.orphans_removed.push(orphan.checkout_path);
            }
        }

        Ok(report)
    }

    /// Remove `path` if it exists and (when not forced) has no uncommitted
    /// working-tree changes. Returns whether it was removed.
    async fn remove_checkout_if_clean(&self, path: &Path, force: bool) -> Result<bool> {
        if !path.exists() {
            return Ok(false);
        }
        if !force {
            let status = self.vcs.working_tree_status(path).await?;
            if !status.stdout.trim().is_empty() {
                return Err(Error::InvalidArgument(format!(
                    "checkout '{}' has uncommitted changes, pass force to remove it anyway",
                    path.display()
                )));
            }
        }
        tokio::fs::remove_dir_all(path)
            .await
            .map_err(|e| Error::Filesystem(path.to_path_buf(), e.to_string()))?;
        Ok(true)
    }
}

/// Refuse to operate on a target path equal to a filesystem root or the
/// current working directory: a programming error upstream (empty config,
/// bad path join) must never escalate into a recursive removal of
/// something the caller did not intend.
fn guard_against_catastrophic_target(path: &Path) -> Result<()> {
    if path.parent().is_none() {
        return Err(Error::InvalidArgument(format!(
            "refusing to operate on filesystem root '{}'",
            path.display()
        )));
    }
    if let Ok(cwd) = std::env::current_dir() {
        if path == cwd {
            return Err(Error::InvalidArgument(format!(
                "refusing to operate on the current working directory '{}'",
                path.display()
            )));
        }
    }
    Ok(())
}

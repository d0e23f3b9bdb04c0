//! Structural validation, corruption detection and repair.
//!
//! Validation never parses the object format itself: the "internal
//! consistency pass" is delegated to [`crate::vcs::VcsBackend::integrity_check`]
//! and a non-zero exit is treated as corruption — the core stays small by
//! never linking a VCS library directly.

use std::path::{Path, PathBuf};

use rand::Rng;
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::error::{Error, IntegrityKind, Result};
use crate::metadata::now_secs;
use crate::vcs::VcsBackend;

/// A short hash of the current time, pid and a random nonce, used to keep
/// staging and backup sibling paths unique even when two repairs race
/// within the same second.
fn unique_suffix() -> String {
    let nonce: u64 = rand::thread_rng().gen();
    let mut hasher = Sha256::new();
    hasher.update(now_secs().to_le_bytes());
    hasher.update(std::process::id().to_le_bytes());
    hasher.update(nonce.to_le_bytes());
    let digest = hasher.finalize();
    format!("{:x}", digest)[..12].to_string()
}

/// A bare store is valid iff it exists, has the structural markers of a
/// bare repository, its refs subtree has at least one head, and the
/// delegated consistency pass succeeds.
pub async fn validate_store(vcs: &dyn VcsBackend, store_path: &Path) -> Result<()> {
    if !store_path.exists() {
        return Err(Error::integrity(store_path, IntegrityKind::NotExists));
    }
    if !store_path.join("HEAD").exists() || !store_path.join("objects").is_dir() {
        return Err(Error::integrity(store_path, IntegrityKind::NotRepo));
    }
    let refs_dir = store_path.join("refs");
    if !refs_dir.is_dir() {
        return Err(Error::integrity(store_path, IntegrityKind::MissingRefs));
    }
    let has_heads = WalkDir::new(&refs_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .any(|e| e.file_type().is_file());
    let has_packed_refs = store_path.join("packed-refs").exists();
    if !has_heads && !has_packed_refs {
        return Err(Error::integrity(store_path, IntegrityKind::MissingRefs));
    }

    let output = vcs
        .list_refs(store_path)
        .await
        .map_err(|_| Error::integrity(store_path, IntegrityKind::Corrupted))?;
    if !output.success {
        return Err(Error::integrity(store_path, IntegrityKind::EmptyRepo));
    }

    let fsck = vcs
        .integrity_check(store_path)
        .await
        .map_err(|_| Error::integrity(store_path, IntegrityKind::Corrupted))?;
    if !fsck.success {
        return Err(Error::integrity(store_path, IntegrityKind::Corrupted));
    }
    Ok(())
}

/// A checkout is valid iff it is a working-tree repository, has an
/// alternates file, and that file contains `expected_objects_path`
/// verbatim on some line.
pub async fn validate_checkout(checkout_path: &Path, expected_objects_path: &Path) -> Result<()> {
    if !checkout_path.exists() {
        return Err(Error::integrity(checkout_path, IntegrityKind::NotExists));
    }
    let git_dir = checkout_path.join(".git");
    if !git_dir.is_dir() {
        return Err(Error::integrity(checkout_path, IntegrityKind::NotRepo));
    }
    let alternates_path = git_dir.join("objects").join("info").join("alternates");
    if !alternates_path.exists() {
        return Err(Error::integrity(checkout_path, IntegrityKind::NoAlternates));
    }
    let content = tokio::fs::read_to_string(&alternates_path)
        .await
        .map_err(|e| Error::Filesystem(alternates_path.clone(), e.to_string()))?;
    let expected = expected_objects_path.to_string_lossy();
    if !content.lines().any(|line| line == expected) {
        return Err(Error::integrity(
            checkout_path,
            IntegrityKind::WrongAlternates,
        ));
    }
    Ok(())
}

/// Repair a broken store under the entry lock: back it up, repopulate it
/// fully from `original_url`, and re-validate. Leaves the backup in place
/// on success; attempts to restore it on failure.
pub async fn repair_store(
    vcs: &dyn VcsBackend,
    store_path: &Path,
    original_url: &str,
) -> Result<PathBuf> {
    let backup_path = sibling_suffixed(store_path, &format!(".corrupted.{}-{}", now_secs(), unique_suffix()));

    if store_path.exists() {
        tokio::fs::rename(store_path, &backup_path)
            .await
            .map_err(|e| Error::Filesystem(store_path.to_path_buf(), e.to_string()))?;
    }

    if let Some(parent) = store_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Filesystem(parent.to_path_buf(), e.to_string()))?;
    }

    let clone_result = vcs.create_bare_clone(original_url, store_path).await;
    let repopulated = clone_result.map(|o| o.success).unwrap_or(false);

    if repopulated && validate_store(vcs, store_path).await.is_ok() {
        return Ok(backup_path);
    }

    // Repair failed: try to restore the backup so the caller is left with
    // the prior (still broken, but known) state rather than nothing.
    if backup_path.exists() {
        let _ = tokio::fs::remove_dir_all(store_path).await;
        if tokio::fs::rename(&backup_path, store_path).await.is_err() {
            return Err(Error::integrity(store_path, IntegrityKind::RepairFailed));
        }
    }
    Err(Error::integrity(store_path, IntegrityKind::RepairFailed))
}

fn sibling_suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Repair a broken checkout: remove it and recreate from `store_path`
/// using `strategy`, then validate. Non-fatal at the system level — the
/// store and sibling checkouts remain usable even if this fails.
pub async fn repair_checkout(
    vcs: &dyn VcsBackend,
    store_path: &Path,
    checkout_path: &Path,
    objects_path: &Path,
    strategy: crate::strategy::Strategy,
) -> Result<()> {
    if checkout_path.exists() {
        tokio::fs::remove_dir_all(checkout_path)
            .await
            .map_err(|e| Error::Filesystem(checkout_path.to_path_buf(), e.to_string()))?;
    }
    stage_and_rename_checkout(vcs, store_path, checkout_path, objects_path, strategy).await
}

/// Build a checkout in a uniquely-suffixed sibling, validate it, then
/// rename it into place. The old tree (if present) has already been moved
/// aside by the caller before this runs, keeping the publish atomic.
pub async fn stage_and_rename_checkout(
    vcs: &dyn VcsBackend,
    store_path: &Path,
    final_path: &Path,
    objects_path: &Path,
    strategy: crate::strategy::Strategy,
) -> Result<()> {
    let staging_path = sibling_suffixed(final_path, &format!(".tmp.{}-{}", now_secs(), unique_suffix()));
    if let Some(parent) = staging_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Filesystem(parent.to_path_buf(), e.to_string()))?;
    }

    let clone_result = vcs
        .create_reference_checkout(store_path, &staging_path, strategy)
        .await?;
    if !clone_result.success {
        let _ = tokio::fs::remove_dir_all(&staging_path).await;
        return Err(Error::VcsSubprocess(format!(
            "checkout creation failed: {}",
            clone_result.stderr
        )));
    }
    vcs.write_alternates(&staging_path, objects_path).await?;

    validate_checkout(&staging_path, objects_path).await.map_err(|e| {
        Error::integrity(
            &staging_path,
            match e {
                Error::Integrity { kind, .. } => kind,
                _ => crate::error::IntegrityKind::Corrupted,
            },
        )
    })?;

    if final_path.exists() {
        tokio::fs::remove_dir_all(final_path)
            .await
            .map_err(|e| Error::Filesystem(final_path.to_path_buf(), e.to_string()))?;
    }
    tokio::fs::rename(&staging_path, final_path)
        .await
        .map_err(|e| Error::Filesystem(final_path.to_path_buf(), e.to_string()))?;
    Ok(())
}

/// Compare the store's refs subtree modification time against the
/// checkout's `.git` directory modification time. `true` if the store is
/// strictly newer, i.e. the checkout is stale and eligible for
/// update-or-repair.
pub async fn checkout_is_stale(store_path: &Path, checkout_path: &Path) -> Result<bool> {
    let refs_mtime = mtime(&store_path.join("refs")).await?;
    let checkout_mtime = mtime(&checkout_path.join(".git")).await?;
    Ok(refs_mtime > checkout_mtime)
}

async fn mtime(path: &Path) -> Result<std::time::SystemTime> {
    tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::Filesystem(path.to_path_buf(), e.to_string()))?
        .modified()
        .map_err(|e| Error::Filesystem(path.to_path_buf(), e.to_string()))
}

/// A checkout found during a hierarchy walk whose expected store no
/// longer exists on disk.
#[derive(Debug)]
pub struct OrphanCheckout {
    /// The checkout's path.
    pub checkout_path: PathBuf,
    /// The store path it expected to find, derived from its alternates
    /// file (or from its location, if the alternates file is itself
    /// missing).
    pub expected_store: Option<PathBuf>,
}

/// Walk every working-tree repository under `checkout_root` and report
/// (without deleting) those whose expected store no longer exists.
pub async fn find_orphans(checkout_root: &Path) -> Result<Vec<OrphanCheckout>> {
    let mut orphans = Vec::new();
    if !checkout_root.exists() {
        return Ok(orphans);
    }
    for entry in WalkDir::new(checkout_root)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_dir())
    {
        let candidate = entry.path();
        let git_dir = candidate.join(".git");
        if !git_dir.is_dir() {
            continue;
        }
        let alternates_path = git_dir.join("objects").join("info").join("alternates");
        let expected_store = if let Ok(content) = tokio::fs::read_to_string(&alternates_path).await
        {
            content
                .lines()
                .next()
                .and_then(|l| l.strip_suffix("/objects"))
                .map(PathBuf::from)
        } else {
            None
        };
        let store_missing = match &expected_store {
            Some(store) => !store.exists(),
            None => true,
        };
        if store_missing {
            orphans.push(OrphanCheckout {
                checkout_path: candidate.to_path_buf(),
                expected_store,
            });
        }
    }
    Ok(orphans)
}

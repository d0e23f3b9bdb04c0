//! Sidecar metadata record and enumeration.
//!
//! One JSON document per cache entry, written atomically (temp file then
//! rename) so readers never observe a partial write. Every mutating
//! operation here assumes the caller already holds the entry lock
//! ([`crate::lock`]); reads may run lock-free and can observe a stale
//! snapshot.

use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{Error, MetadataError, Result};
use crate::identity::RepoId;
use crate::strategy::Strategy;

/// Which hosting-provider family a repo belongs to; a closed tagged
/// variant rather than an open string, so an unrecognized host fails to
/// deserialize instead of silently losing fork support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HostKind {
    /// `github.com` and GitHub Enterprise hosts.
    Github,
    /// Any other host: forking is never attempted.
    Unknown,
}

/// The persisted per-entry record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metadata {
    /// The URL the store was originally populated from.
    pub original_url: String,
    /// The user-owned fork's URL, once created.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fork_url: Option<String>,
    /// Repository owner.
    pub owner: String,
    /// Repository name.
    pub name: String,
    /// Hosting-provider family.
    pub host_kind: HostKind,
    /// Effective or advisory clone strategy.
    pub strategy: Strategy,
    /// Absolute seconds, when the store was first populated.
    pub created_time: i64,
    /// Absolute seconds, last time the store was repopulated or fetched.
    pub last_sync_time: i64,
    /// Absolute seconds, last time any checkout was touched.
    pub last_access_time: i64,
    /// Size of the store on disk, bytes.
    pub cache_size: i64,
    /// Number of active checkouts claimed by successful clones.
    pub ref_count: i64,
    /// Whether a fork is required to support a modifiable checkout.
    pub is_fork_needed: bool,
    /// Whether the fork (if any) was created private.
    pub is_private_fork: bool,
    /// Whether the store contains submodule records.
    pub has_submodules: bool,
    /// The repository's default branch, once known.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub default_branch: Option<String>,
    /// Target org a fork was created under, if any.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fork_organization: Option<String>,
}

impl Metadata {
    /// Pure, in-memory construction for a freshly-identified repo.
    #[must_use]
    pub fn create(id: &RepoId, original_url: &str, strategy: Strategy, now: i64) -> Self {
        let host_kind = if id.host == "github.com" || id.host.starts_with("github.") {
            HostKind::Github
        } else {
            HostKind::Unknown
        };
        Self {
            original_url: original_url.to_string(),
            fork_url: None,
            owner: id.owner.clone(),
            name: id.name.clone(),
            host_kind,
            strategy,
            created_time: now,
            last_sync_time: now,
            last_access_time: now,
            cache_size: 0,
            ref_count: 0,
            is_fork_needed: false,
            is_private_fork: false,
            has_submodules: false,
            default_branch: None,
            fork_organization: None,
        }
    }
}

/// Current time in absolute seconds, the unit used for every timestamp
/// field.
#[must_use]
pub fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Sidecar file name, relative to a store's root.
pub const METADATA_FILENAME: &str = "cache_metadata.json";

fn metadata_file(store_path: &Path) -> PathBuf {
    store_path.join(METADATA_FILENAME)
}

/// Atomically write `metadata` to `store_path`'s sidecar file: write to a
/// uniquely-suffixed temp sibling, then rename over the final path.
pub async fn save(store_path: &Path, metadata: &Metadata) -> Result<()> {
    tokio::fs::create_dir_all(store_path)
        .await
        .map_err(|e| Error::Filesystem(store_path.to_path_buf(), e.to_string()))?;
    let final_path = metadata_file(store_path);
    let tmp_path = final_path.with_extension(format!("json.tmp.{}", std::process::id()));
    let body = serde_json::to_vec_pretty(metadata)
        .map_err(|e| Error::Metadata(MetadataError::Io(final_path.clone(), e.to_string())))?;
    tokio::fs::write(&tmp_path, &body)
        .await
        .map_err(|e| Error::Metadata(MetadataError::Io(tmp_path.clone(), e.to_string())))?;
    tokio::fs::rename(&tmp_path, &final_path)
        .await
        .map_err(|e| Error::Metadata(MetadataError::Io(final_path.clone(), e.to_string())))?;
    Ok(())
}

/// Load the sidecar metadata for `store_path`.
pub async fn load(store_path: &Path) -> Result<Metadata> {
    let path = metadata_file(store_path);
    let raw = tokio::fs::read_to_string(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::Metadata(MetadataError::NotFound(path.clone()))
        } else {
            Error::Metadata(MetadataError::Io(path.clone(), e.to_string()))
        }
    })?;
    serde_json::from_str(&raw)
        .map_err(|e| Error::Metadata(MetadataError::Corrupt(path.clone(), e.to_string())))
}

/// Load-modify-save: set `last_access_time` to `now`. Caller must hold the
/// entry lock.
pub async fn update_access(store_path: &Path, now: i64) -> Result<Metadata> {
    let mut metadata = load(store_path).await?;
    metadata.last_access_time = now;
    save(store_path, &metadata).await?;
    Ok(metadata)
}

/// Load-modify-save: set `last_sync_time` to `now`. Caller must hold the
/// entry lock.
pub async fn update_sync(store_path: &Path, now: i64) -> Result<Metadata> {
    let mut metadata = load(store_path).await?;
    metadata.last_sync_time = now;
    save(store_path, &metadata).await?;
    Ok(metadata)
}

/// Load-modify-save: increment `ref_count`. Caller must hold the entry
/// lock.
pub async fn increment_ref(store_path: &Path) -> Result<Metadata> {
    let mut metadata = load(store_path).await?;
    metadata.ref_count = metadata.ref_count.saturating_add(1);
    save(store_path, &metadata).await?;
    Ok(metadata)
}

/// Load-modify-save: decrement `ref_count`, floored at zero. Caller must
/// hold the entry lock.
pub async fn decrement_ref(store_path: &Path) -> Result<Metadata> {
    let mut metadata = load(store_path).await?;
    metadata.ref_count = (metadata.ref_count - 1).max(0);
    save(store_path, &metadata).await?;
    Ok(metadata)
}

/// One yielded entry from [`enumerate`].
#[derive(Debug)]
pub struct EnumeratedEntry {
    /// The entry's store path.
    pub store_path: PathBuf,
    /// Its parsed metadata.
    pub metadata: Metadata,
}

/// Lazily walk `cache_root/host/owner/name` (depth 2 below the root) and
/// yield every entry whose metadata file loads successfully. Entries that
/// fail to load are skipped and logged, not surfaced as an error — a
/// single corrupt entry must not abort a `list` or `sync` sweep.
pub async fn enumerate(cache_root: &Path) -> Result<Vec<EnumeratedEntry>> {
    let mut out = Vec::new();
    if !cache_root.exists() {
        return Ok(out);
    }
    for host_entry in read_dir_entries(cache_root)? {
        if !host_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        for owner_entry in read_dir_entries(&host_entry.path())? {
            if !owner_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            for name_entry in read_dir_entries(&owner_entry.path())? {
                if !name_entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                    continue;
                }
                let store_path = name_entry.path();
                match load(&store_path).await {
                    Ok(metadata) => out.push(EnumeratedEntry {
                        store_path,
                        metadata,
                    }),
                    Err(e) => {
                        tracing::warn!(path = %store_path.display(), error = %e, "skipping entry with unreadable metadata");
                    }
                }
            }
        }
    }
    Ok(out)
}

fn read_dir_entries(dir: &Path) -> Result<Vec<walkdir::DirEntry>> {
    Ok(walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .collect())
}

//! Deterministic, I/O-free mapping from a [`RepoId`] to the store, checkout
//! and lock paths it owns. No failure mode beyond an already-invalid
//! `RepoId`, which cannot be constructed in the first place (see
//! [`crate::identity::RepoId::new`]), so these functions are infallible.

use std::path::{Path, PathBuf};

use crate::config::MODIFIABLE_OWNER;
use crate::identity::RepoId;

/// The three roots a [`crate::config::Config`] supplies to the resolver.
#[derive(Debug, Clone)]
pub struct Roots<'a> {
    /// Root under which bare stores live: `cache_root/host/owner/name`.
    pub cache_root: &'a Path,
    /// Root under which checkouts live.
    pub checkout_root: &'a Path,
}

/// `cache_root/host/owner/name` — the bare object store.
#[must_use]
pub fn store_path(roots: &Roots<'_>, id: &RepoId) -> PathBuf {
    roots.cache_root.join(&id.host).join(&id.owner).join(&id.name)
}

/// `cache_root/host/owner/name/cache_metadata.json` — the sidecar record.
#[must_use]
pub fn metadata_path(roots: &Roots<'_>, id: &RepoId) -> PathBuf {
    store_path(roots, id).join("cache_metadata.json")
}

/// `checkout_root/owner/name` — the read-only checkout.
#[must_use]
pub fn checkout_path(roots: &Roots<'_>, id: &RepoId) -> PathBuf {
    roots.checkout_root.join(&id.owner).join(&id.name)
}

/// `checkout_root/modifiable_owner/{owner}-{name}` — the modifiable
/// checkout, whose upstream is a user-owned fork.
#[must_use]
pub fn modifiable_path(roots: &Roots<'_>, id: &RepoId) -> PathBuf {
    roots
        .checkout_root
        .join(MODIFIABLE_OWNER)
        .join(format!("{}-{}", id.owner, id.name))
}

/// `path + ".lock"` — a sibling, not a child, so it stays creatable even
/// when `path` does not yet exist.
#[must_use]
pub fn lock_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_owned();
    os.push(".lock");
    PathBuf::from(os)
}

/// `store_path/objects` — what a checkout's alternates file must contain,
/// verbatim, to be considered valid.
#[must_use]
pub fn store_objects_path(roots: &Roots<'_>, id: &RepoId) -> PathBuf {
    store_path(roots, id).join("objects")
}

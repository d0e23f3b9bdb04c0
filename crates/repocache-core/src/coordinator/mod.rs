//! Orchestrates clone/sync/list/clean/repair using the Path Resolver, Lock
//! Manager, Integrity Engine and Metadata Store.

mod clean;
mod clone;
mod list;
mod repair;
mod sync;
mod verify;

pub use clean::CleanReport;
pub use clone::{CheckoutOutcome, CloneReport};
pub use list::ListEntry;
pub use repair::{RepairAction, RepairEntry};
pub use sync::{SyncEntryOutcome, SyncReport};
pub use verify::{VerifyEntry, VerifyStatus};

use std::sync::Arc;

use crate::config::Config;
use crate::identity::RepoId;
use crate::path_resolver::Roots;
use crate::provider::Provider;
use crate::vcs::VcsBackend;

/// Orchestrates the three-tier cache against a single configuration: no
/// process-wide mutable state, everything is an explicit value passed in
/// at construction.
pub struct Coordinator {
    pub(crate) config: Config,
    pub(crate) vcs: Arc<dyn VcsBackend>,
    pub(crate) provider: Arc<dyn Provider>,
}

impl Coordinator {
    /// Build a coordinator against `config`, a VCS backend and a hosting
    /// provider client.
    #[must_use]
    pub fn new(config: Config, vcs: Arc<dyn VcsBackend>, provider: Arc<dyn Provider>) -> Self {
        Self {
            config,
            vcs,
            provider,
        }
    }

    /// The configuration this coordinator was built with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn roots(&self) -> Roots<'_> {
        Roots {
            cache_root: &self.config.cache_root,
            checkout_root: &self.config.checkout_root,
        }
    }

    pub(crate) fn store_path(&self, id: &RepoId) -> std::path::PathBuf {
        crate::path_resolver::store_path(&self.roots(), id)
    }

    pub(crate) fn checkout_path(&self, id: &RepoId) -> std::path::PathBuf {
        crate::path_resolver::checkout_path(&self.roots(), id)
    }

    pub(crate) fn modifiable_path(&self, id: &RepoId) -> std::path::PathBuf {
        crate::path_resolver::modifiable_path(&self.roots(), id)
    }

    pub(crate) fn store_objects_path(&self, id: &RepoId) -> std::path::PathBuf {
        crate::path_resolver::store_objects_path(&self.roots(), id)
    }

    pub(crate) fn lock_options(&self) -> crate::lock::LockOptions {
        crate::lock::LockOptions {
            max_wait: std::time::Duration::from_secs(self.config.lock_max_wait_secs),
            retry_interval: std::time::Duration::from_millis(crate::config::RETRY_INTERVAL_MS),
            stale_after: std::time::Duration::from_secs(self.config.lock_stale_secs),
        }
    }
}

/// Recover a [`RepoId`] from an enumerated store's path, which is always
/// `cache_root/host/owner/name` — metadata itself only records the
/// hosting-provider family, not the literal host string.
pub(crate) fn id_from_store_path(
    cache_root: &std::path::Path,
    store_path: &std::path::Path,
) -> crate::error::Result<RepoId> {
    let relative = store_path.strip_prefix(cache_root).map_err(|_| {
        crate::error::Error::InvalidArgument(format!(
            "store path '{}' is not under the cache root",
            store_path.display()
        ))
    })?;
    let mut components = relative.components();
    let host = components.next();
    let owner = components.next();
    let name = components.next();
    match (host, owner, name) {
        (Some(host), Some(owner), Some(name)) => RepoId::new(
            host.as_os_str().to_string_lossy(),
            owner.as_os_str().to_string_lossy(),
            name.as_os_str().to_string_lossy(),
        ),
        _ => Err(crate::error::Error::InvalidArgument(format!(
            "store path '{}' does not have host/owner/name shape",
            store_path.display()
        ))),
    }
}

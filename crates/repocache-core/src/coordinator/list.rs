//! `list()`: enumerate cached entries without mutating anything.

use crate::error::Result;
use crate::identity::RepoId;
use crate::metadata;
use crate::strategy::Strategy;

use super::{id_from_store_path, Coordinator};

/// One row of a [`Coordinator::list`] result.
#[derive(Debug)]
pub struct ListEntry {
    /// The entry's identity.
    pub id: RepoId,
    /// The URL the store was originally populated from.
    pub original_url: String,
    /// The fork URL backing the modifiable checkout, if any.
    pub fork_url: Option<String>,
    /// The entry's effective clone strategy.
    pub strategy: Strategy,
    /// Size of the store on disk, bytes, as last recorded.
    pub cache_size: i64,
    /// Absolute seconds, last fetch/repopulation.
    pub last_sync_time: i64,
    /// Absolute seconds, last checkout access.
    pub last_access_time: i64,
    /// Number of active checkouts claimed against this entry.
    pub ref_count: i64,
    /// Whether the read-only checkout currently exists on disk.
    pub has_read_only_checkout: bool,
    /// Whether the modifiable checkout currently exists on disk.
    pub has_modifiable_checkout: bool,
}

impl Coordinator {
    /// Enumerate every cached entry, reporting its metadata and whether its
    /// checkouts are present, without touching the filesystem beyond reads.
    pub async fn list(&self) -> Result<Vec<ListEntry>> {
        let entries = metadata::enumerate(&self.config.cache_root).await?;
        let mut out = Vec::with_capacity(entries.len());

        for entry in entries {
            let id = match id_from_store_path(&self.config.cache_root, &entry.store_path) {
                Ok(id) => id,
                Err(_) => RepoId {
                    host: String::new(),
                    owner: entry.metadata.owner.clone(),
                    name: entry.metadata.name.clone(),
                },
            };
            let has_read_only_checkout = self.checkout_path(&id).exists();
            let has_modifiable_checkout = self.modifiable_path(&id).exists();

            out.push(ListEntry {
                id,
                original_url: entry.metadata.original_url,
                fork_url: entry.metadata.fork_url,
                strategy: entry.metadata.strategy,
                cache_size: entry.metadata.cache_size,
                last_sync_time: entry.metadata.last_sync_time,
                last_access_time: entry.metadata.last_access_time,
                ref_count: entry.metadata.ref_count,
                has_read_only_checkout,
                has_modifiable_checkout,
            });
        }

        Ok(out)
    }
}

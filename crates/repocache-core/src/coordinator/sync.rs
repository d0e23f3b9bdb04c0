//! `sync()`: bring every cached store up to date with its remote and
//! repair any checkout that has fallen stale.

use crate::error::Result;
use crate::identity::RepoId;
use crate::integrity;
use crate::lock;
use crate::metadata;

use super::{id_from_store_path, Coordinator};

/// Outcome for a single entry visited by [`Coordinator::sync`].
#[derive(Debug)]
pub struct SyncEntryOutcome {
    /// The entry's identity.
    pub id: RepoId,
    /// Whether the fetch against the remote succeeded.
    pub fetched: bool,
    /// Whether the read-only checkout was repaired as part of this sync.
    pub checkout_repaired: bool,
    /// Whether the modifiable checkout was repaired as part of this sync.
    pub modifiable_repaired: bool,
    /// The error this entry failed with, if any. A failure here does not
    /// stop the sweep over the remaining entries.
    pub error: Option<String>,
}

/// Aggregate result of a [`Coordinator::sync`] call.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Per-entry outcomes, in enumeration order.
    pub entries: Vec<SyncEntryOutcome>,
}

impl Coordinator {
    /// Enumerate every cached entry and fetch it, repairing its read-only
    /// and modifiable checkouts if either has gone stale. Continues past a
    /// single entry's failure so one broken store cannot abort the whole
    /// sweep.
    pub async fn sync(&self) -> Result<SyncReport> {
        let entries = metadata::enumerate(&self.config.cache_root).await?;
        let mut report = SyncReport::default();

        for entry in entries {
            let id = match id_from_store_path(&self.config.cache_root, &entry.store_path) {
                Ok(id) => id,
                Err(e) => {
                    report.entries.push(SyncEntryOutcome {
                        id: RepoId {
                            host: String::new(),
                            owner: entry.metadata.owner.clone(),
                            name: entry.metadata.name.clone(),
                        },
                        fetched: false,
                        checkout_repaired: false,
                        modifiable_repaired: false,
                        error: Some(e.to_string()),
                    });
                    continue;
                }
            };

            let outcome = self.sync_one(&entry.store_path, &id).await;
            report.entries.push(outcome);
        }

        Ok(report)
    }

    async fn sync_one(&self, store_path: &std::path::Path, id: &RepoId) -> SyncEntryOutcome {
        let guard = match lock::acquire(store_path, self.lock_options()).await {
            Ok(guard) => guard,
            Err(e) => {
                return SyncEntryOutcome {
                    id: id.clone(),
                    fetched: false,
                    checkout_repaired: false,
                    modifiable_repaired: false,
                    error: Some(e.to_string()),
                }
            }
        };

        let outcome = self.sync_one_locked(store_path, id).await;
        let _ = lock::release(guard).await;
        outcome
    }

    async fn sync_one_locked(&self, store_path: &std::path::Path, id: &RepoId) -> SyncEntryOutcome {
        let fetch_result = self.vcs.fetch_all(store_path).await;
        let fetched = matches!(&fetch_result, Ok(output) if output.success);

        if fetched {
            let now = metadata::now_secs();
            if let Err(e) = metadata::update_sync(store_path, now).await {
                return SyncEntryOutcome {
                    id: id.clone(),
                    fetched,
                    checkout_repaired: false,
                    modifiable_repaired: false,
                    error: Some(e.to_string()),
                };
            }
        }

        let checkout_path = self.checkout_path(id);
        let modifiable_path = self.modifiable_path(id);
        let objects_path = self.store_objects_path(id);
        let strategy = match metadata::load(store_path).await {
            Ok(meta) => meta.strategy,
            Err(_) => self.config.default_strategy,
        };

        let mut error = if fetched {
            None
        } else {
            fetch_result.err().map(|e| e.to_string())
        };

        let checkout_repaired = self
            .sync_checkout_side(store_path, &checkout_path, &objects_path, strategy, &mut error)
            .await;
        let modifiable_repaired = self
            .sync_checkout_side(store_path, &modifiable_path, &objects_path, strategy, &mut error)
            .await;

        SyncEntryOutcome {
            id: id.clone(),
            fetched,
            checkout_repaired,
            modifiable_repaired,
            error,
        }
    }

    /// Validate a dependent checkout (read-only or modifiable) and repair
    /// it if it is stale or invalid. Returns whether a repair happened; any
    /// failure is folded into `error` without overwriting one already set.
    async fn sync_checkout_side(
        &self,
        store_path: &std::path::Path,
        checkout_path: &std::path::Path,
        objects_path: &std::path::Path,
        strategy: crate::strategy::Strategy,
        error: &mut Option<String>,
    ) -> bool {
        if !checkout_path.exists() {
            return false;
        }

        let needs_repair = match integrity::validate_checkout(checkout_path, objects_path).await {
            Ok(()) => integrity::checkout_is_stale(store_path, checkout_path)
                .await
                .unwrap_or(false),
            Err(_) => true,
        };
        if !needs_repair {
            return false;
        }

        match integrity::repair_checkout(self.vcs.as_ref(), store_path, checkout_path, objects_path, strategy).await
        {
            Ok(()) => true,
            Err(e) => {
                error.get_or_insert_with(|| e.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::provider::NullProvider;
    use crate::strategy::Strategy;
    use crate::vcs::{CommandOutput, VcsBackend};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn ok() -> CommandOutput {
        CommandOutput {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    struct CountingVcs {
        fetches: AtomicU32,
    }

    #[async_trait]
    impl VcsBackend for CountingVcs {
        async fn create_bare_clone(&self, _url: &str, dest: &Path) -> Result<CommandOutput> {
            tokio::fs::create_dir_all(dest.join("objects")).await.unwrap();
            tokio::fs::create_dir_all(dest.join("refs/heads")).await.unwrap();
            tokio::fs::write(dest.join("HEAD"), b"ref: refs/heads/main\n").await.unwrap();
            tokio::fs::write(dest.join("refs/heads/main"), b"0".repeat(40)).await.unwrap();
            Ok(ok())
        }
        async fn fetch_all(&self, _store: &Path) -> Result<CommandOutput> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(ok())
        }
        async fn create_reference_checkout(
            &self,
            _store: &Path,
            dest: &Path,
            _strategy: Strategy,
        ) -> Result<CommandOutput> {
            tokio::fs::create_dir_all(dest.join(".git")).await.unwrap();
            Ok(ok())
        }
        async fn write_alternates(&self, dest: &Path, objects_path: &Path) -> Result<CommandOutput> {
            let alt = dest.join(".git/objects/info/alternates");
            tokio::fs::create_dir_all(alt.parent().unwrap()).await.unwrap();
            tokio::fs::write(&alt, format!("{}\n", objects_path.display())).await.unwrap();
            Ok(ok())
        }
        async fn integrity_check(&self, _repo: &Path) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn list_refs(&self, _repo: &Path) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn list_remotes(&self, _repo: &Path) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn remote_add(&self, _repo: &Path, _name: &str, _url: &str) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn remote_set_url(&self, _repo: &Path, _name: &str, _url: &str) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn remote_remove(&self, _repo: &Path, _name: &str) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn fetch_remote(&self, _repo: &Path, _name: &str) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn push_remote(&self, _repo: &Path, _name: &str, _refspec: &str) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn reset_to_remote_head(&self, _repo: &Path, _name: &str) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn clean_untracked(&self, _repo: &Path) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn list_submodule_records(&self, _repo: &Path) -> Result<CommandOutput> {
            Ok(ok())
        }
        async fn working_tree_status(&self, _repo: &Path) -> Result<CommandOutput> {
            Ok(ok())
        }
    }

    #[tokio::test]
    async fn sync_with_no_entries_yields_empty_report() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            cache_root: dir.path().join("cache"),
            checkout_root: dir.path().join("checkouts"),
            ..Config::default()
        };
        let coordinator = Coordinator::new(
            config,
            Arc::new(CountingVcs {
                fetches: AtomicU32::new(0),
            }),
            Arc::new(NullProvider),
        );
        let report = coordinator.sync().await.unwrap();
        assert!(report.entries.is_empty());
    }

    #[tokio::test]
    async fn sync_fetches_every_enumerated_entry() {
        let dir = tempfile::tempdir().unwrap();
        let cache_root = dir.path().join("cache");
        let config = Config {
            cache_root: cache_root.clone(),
            checkout_root: dir.path().join("checkouts"),
            ..Config::default()
        };
        let id = RepoId::new("github.com", "octocat", "Hello-World").unwrap();
        let store_path = cache_root.join(&id.host).join(&id.owner).join(&id.name);
        let meta = crate::metadata::Metadata::create(
            &id,
            "https://github.com/octocat/Hello-World.git",
            Strategy::Full,
            1_000,
        );
        metadata::save(&store_path, &meta).await.unwrap();

        let vcs = Arc::new(CountingVcs {
            fetches: AtomicU32::new(0),
        });
        let coordinator = Coordinator::new(config, vcs.clone(), Arc::new(NullProvider));
        let report = coordinator.sync().await.unwrap();

        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].fetched);
        assert_eq!(vcs.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn sync_repairs_a_broken_modifiable_checkout() {
        let dir = tempfile::tempdir().unwrap();
        let cache_root = dir.path().join("cache");
        let checkout_root = dir.path().join("checkouts");
        let config = Config {
            cache_root: cache_root.clone(),
            checkout_root: checkout_root.clone(),
            ..Config::default()
        };
        let id = RepoId::new("github.com", "octocat", "Hello-World").unwrap();
        let store_path = cache_root.join(&id.host).join(&id.owner).join(&id.name);
        tokio::fs::create_dir_all(store_path.join("refs/heads")).await.unwrap();
        tokio::fs::create_dir_all(store_path.join("objects")).await.unwrap();
        let meta = crate::metadata::Metadata::create(
            &id,
            "https://github.com/octocat/Hello-World.git",
            Strategy::Full,
            1_000,
        );
        metadata::save(&store_path, &meta).await.unwrap();

        let vcs = Arc::new(CountingVcs {
            fetches: AtomicU32::new(0),
        });
        let coordinator = Coordinator::new(config, vcs, Arc::new(NullProvider));
        let modifiable_path = coordinator.modifiable_path(&id);
        tokio::fs::create_dir_all(modifiable_path.join(".git")).await.unwrap();
        let report = coordinator.sync().await.unwrap();

        assert_eq!(report.entries.len(), 1);
        assert!(report.entries[0].modifiable_repaired);
        let alternates = modifiable_path.join(".git/objects/info/alternates");
        assert!(alternates.exists());
    }
}

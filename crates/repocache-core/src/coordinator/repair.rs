//! `repair()`: bring every unhealthy side of an entry back to a valid
//! state, under the entry lock.

use crate::error::Result;
use crate::identity::RepoId;
use crate::integrity;
use crate::lock;
use crate::metadata;

use super::verify::VerifyStatus;
use super::{id_from_store_path, Coordinator};

/// What happened to one side of an entry during a [`Coordinator::repair`]
/// call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairAction {
    /// Already valid; nothing to do.
    Untouched,
    /// Repaired successfully.
    Repaired,
    /// Was absent, so there was nothing to repair.
    Skipped,
}

/// Repair outcome for one cache entry.
#[derive(Debug)]
pub struct RepairEntry {
    /// The entry's identity.
    pub id: RepoId,
    /// What happened to the store.
    pub store: RepairAction,
    /// What happened to the read-only checkout.
    pub read_only: RepairAction,
    /// What happened to the modifiable checkout.
    pub modifiable: RepairAction,
}

impl Coordinator {
    /// Repair a single entry identified by `id`, or every enumerated entry
    /// when `id` is `None`. Each entry is repaired under its own lock so
    /// one entry's failure cannot hold up the rest.
    pub async fn repair(&self, id: Option<&RepoId>) -> Result<Vec<RepairEntry>> {
        match id {
            Some(id) => Ok(vec![self.repair_one(id).await?]),
            None => {
                let entries = metadata::enumerate(&self.config.cache_root).await?;
                let mut out = Vec::with_capacity(entries.len());
                for entry in entries {
                    let id = id_from_store_path(&self.config.cache_root, &entry.store_path)?;
                    out.push(self.repair_one(&id).await?);
                }
                Ok(out)
            }
        }
    }

    async fn repair_one(&self, id: &RepoId) -> Result<RepairEntry> {
        let store_path = self.store_path(id);
        let guard = lock::acquire(&store_path, self.lock_options()).await?;
        let result = self.repair_one_locked(id, &store_path).await;
        lock::release(guard).await?;
        result
    }

    async fn repair_one_locked(&self, id: &RepoId, store_path: &std::path::Path) -> Result<RepairEntry> {
        let checkout_path = self.checkout_path(id);
        let modifiable_path = self.modifiable_path(id);
        let objects_path = self.store_objects_path(id);

        let verdict = self.verify(Some(id)).await?.remove(0);

        let store = match &verdict.store {
            VerifyStatus::Valid => RepairAction::Untouched,
            VerifyStatus::Absent => RepairAction::Skipped,
            VerifyStatus::Invalid(_) => {
                let meta = metadata::load(store_path).await?;
                integrity::repair_store(self.vcs.as_ref(), store_path, &meta.original_url).await?;
                // `repair_store` replaces the store directory wholesale, so
                // the sidecar metadata needs to be written back afterwards.
                metadata::save(store_path, &meta).await?;
                RepairAction::Repaired
            }
        };

        let strategy = metadata::load(store_path)
            .await
            .map(|m| m.strategy)
            .unwrap_or(self.config.default_strategy);

        let read_only = self
            .repair_checkout_side(&verdict.read_only, store_path, &checkout_path, &objects_path, strategy)
            .await?;
        let modifiable = self
            .repair_checkout_side(
                &verdict.modifiable,
                store_path,
                &modifiable_path,
                &objects_path,
                strategy,
            )
            .await?;

        Ok(RepairEntry {
            id: id.clone(),
            store,
            read_only,
            modifiable,
        })
    }

    async fn repair_checkout_side(
        &self,
        status: &VerifyStatus,
        store_path: &std::path::Path,
        checkout_path: &std::path::Path,
        objects_path: &std::path::Path,
        strategy: crate::strategy::Strategy,
    ) -> Result<RepairAction> {
        match status {
            VerifyStatus::Valid => Ok(RepairAction::Untouched),
            VerifyStatus::Absent => Ok(RepairAction::Skipped),
            VerifyStatus::Invalid(_) => {
                integrity::repair_checkout(self.vcs.as_ref(), store_path, checkout_path, objects_path, strategy)
                    .await?;
                Ok(RepairAction::Repaired)
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
    use std::sync::Arc;

    fn ok() -> CommandOutput {
        CommandOutput {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    struct FakeVcs;

    #[async_trait]
    impl VcsBackend for FakeVcs {
        async fn create_bare_clone(&self, _url: &str, dest: &Path) -> Result<CommandOutput> {
            tokio::fs::create_dir_all(dest.join("objects")).await.unwrap();
            tokio::fs::create_dir_all(dest.join("refs/heads")).await.unwrap();
            tokio::fs::write(dest.join("HEAD"), b"ref: refs/heads/main\n").await.unwrap();
            tokio::fs::write(dest.join("refs/heads/main"), b"0".repeat(40)).await.unwrap();
            Ok(ok())
        }
        async fn fetch_all(&self, _store: &Path) -> Result<CommandOutput> {
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

    fn coordinator(dir: &Path) -> Coordinator {
        let config = Config {
            cache_root: dir.join("cache"),
            checkout_root: dir.join("checkouts"),
            ..Config::default()
        };
        Coordinator::new(config, Arc::new(FakeVcs), Arc::new(NullProvider))
    }

    #[tokio::test]
    async fn repair_on_absent_entry_skips_every_side() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let id = RepoId::new("github.com", "octocat", "Hello-World").unwrap();
        let entry = coordinator.repair(Some(&id)).await.unwrap().remove(0);
        assert_eq!(entry.store, RepairAction::Skipped);
        assert_eq!(entry.read_only, RepairAction::Skipped);
    }

    #[tokio::test]
    async fn repair_fixes_a_corrupted_store() {
        let dir = tempfile::tempdir().unwrap();
        let coordinator = coordinator(dir.path());
        let id = RepoId::new("github.com", "octocat", "Hello-World").unwrap();
        let store_path = coordinator.store_path(&id);

        tokio::fs::create_dir_all(&store_path).await.unwrap();
        tokio::fs::write(store_path.join("HEAD"), b"broken").await.unwrap();
        let meta = metadata::Metadata::create(
            &id,
            "https://github.com/octocat/Hello-World.git",
            Strategy::Full,
            1_000,
        );
        metadata::save(&store_path, &meta).await.unwrap();

        let entry = coordinator.repair(Some(&id)).await.unwrap().remove(0);
        assert_eq!(entry.store, RepairAction::Repaired);
        assert!(coordinator.store_path(&id).join("objects").exists());
    }
}

//! End-to-end invariants for the coordinator across clone/sync/clean
//! sequences:
//!
//! - At most one checkout on disk per path class.
//! - Every existing checkout's alternates file contains the expected
//!   store path.
//! - After `clone` returns success, the store and every checkout it built
//!   pass validation.
//! - After `clean`, the store, its metadata, its lock file and all known
//!   checkouts are absent.
//! - A concurrent first-clone of the same URL from two tasks leaves
//!   exactly one store population and no leftover lock or `.tmp.*`
//!   sibling.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use repocache_core::path_resolver::{self, Roots};
use repocache_core::provider::NullProvider;
use repocache_core::strategy::Strategy;
use repocache_core::vcs::{CommandOutput, VcsBackend};
use repocache_core::{Config, Coordinator, RepoId};

fn roots(coordinator: &Coordinator) -> Roots<'_> {
    Roots {
        cache_root: &coordinator.config().cache_root,
        checkout_root: &coordinator.config().checkout_root,
    }
}

fn store_path(coordinator: &Coordinator, id: &RepoId) -> std::path::PathBuf {
    path_resolver::store_path(&roots(coordinator), id)
}

fn checkout_path(coordinator: &Coordinator, id: &RepoId) -> std::path::PathBuf {
    path_resolver::checkout_path(&roots(coordinator), id)
}

fn modifiable_path(coordinator: &Coordinator, id: &RepoId) -> std::path::PathBuf {
    path_resolver::modifiable_path(&roots(coordinator), id)
}

fn ok() -> CommandOutput {
    CommandOutput {
        success: true,
        stdout: String::new(),
        stderr: String::new(),
    }
}

/// A `VcsBackend` that materializes just enough of git's on-disk shape for
/// the integrity engine to treat its output as valid, while counting how
/// many times a store was actually populated.
struct CountingVcs {
    bare_clones: AtomicU32,
}

#[async_trait]
impl VcsBackend for CountingVcs {
    async fn create_bare_clone(&self, _url: &str, dest: &Path) -> repocache_core::Result<CommandOutput> {
        self.bare_clones.fetch_add(1, Ordering::SeqCst);
        tokio::fs::create_dir_all(dest.join("objects")).await.unwrap();
        tokio::fs::create_dir_all(dest.join("refs/heads")).await.unwrap();
        tokio::fs::write(dest.join("HEAD"), b"ref: refs/heads/main\n").await.unwrap();
        tokio::fs::write(dest.join("refs/heads/main"), b"0".repeat(40)).await.unwrap();
        Ok(ok())
    }
    async fn fetch_all(&self, _store: &Path) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn create_reference_checkout(
        &self,
        _store: &Path,
        dest: &Path,
        _strategy: Strategy,
    ) -> repocache_core::Result<CommandOutput> {
        tokio::fs::create_dir_all(dest.join(".git")).await.unwrap();
        Ok(ok())
    }
    async fn write_alternates(&self, dest: &Path, objects_path: &Path) -> repocache_core::Result<CommandOutput> {
        let alt = dest.join(".git/objects/info/alternates");
        tokio::fs::create_dir_all(alt.parent().unwrap()).await.unwrap();
        tokio::fs::write(&alt, format!("{}\n", objects_path.display())).await.unwrap();
        Ok(ok())
    }
    async fn integrity_check(&self, _repo: &Path) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn list_refs(&self, _repo: &Path) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn list_remotes(&self, _repo: &Path) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn remote_add(&self, _repo: &Path, _name: &str, _url: &str) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn remote_set_url(&self, _repo: &Path, _name: &str, _url: &str) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn remote_remove(&self, _repo: &Path, _name: &str) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn fetch_remote(&self, _repo: &Path, _name: &str) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn push_remote(&self, _repo: &Path, _name: &str, _refspec: &str) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn reset_to_remote_head(&self, _repo: &Path, _name: &str) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn clean_untracked(&self, _repo: &Path) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn list_submodule_records(&self, _repo: &Path) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
    async fn working_tree_status(&self, _repo: &Path) -> repocache_core::Result<CommandOutput> {
        Ok(ok())
    }
}

fn coordinator(dir: &Path, vcs: Arc<CountingVcs>) -> Coordinator {
    let config = Config {
        cache_root: dir.join("cache"),
        checkout_root: dir.join("checkouts"),
        ..Config::default()
    };
    Coordinator::new(config, vcs, Arc::new(NullProvider))
}

const URL: &str = "https://github.com/octocat/Hello-World.git";

#[tokio::test]
async fn clone_then_verify_reports_every_side_healthy() {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(CountingVcs {
        bare_clones: AtomicU32::new(0),
    });
    let coordinator = coordinator(dir.path(), vcs);

    let report = coordinator.clone(URL, true).await.unwrap();
    let verdicts = coordinator.verify(Some(&report.id)).await.unwrap();
    assert_eq!(verdicts.len(), 1);
    assert!(verdicts[0].is_healthy());
}

#[tokio::test]
async fn clean_leaves_no_trace_of_the_entry() {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(CountingVcs {
        bare_clones: AtomicU32::new(0),
    });
    let coordinator = coordinator(dir.path(), vcs);

    let report = coordinator.clone(URL, true).await.unwrap();
    let store = store_path(&coordinator, &report.id);
    let checkout = checkout_path(&coordinator, &report.id);
    let modifiable = modifiable_path(&coordinator, &report.id);

    coordinator.clean(URL, false).await.unwrap();

    assert!(!store.exists());
    assert!(!checkout.exists());
    assert!(!modifiable.exists());
    assert!(!path_resolver::lock_path(&store).exists());
}

#[tokio::test]
async fn two_concurrent_first_clones_populate_the_store_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(CountingVcs {
        bare_clones: AtomicU32::new(0),
    });
    let coordinator = Arc::new(coordinator(dir.path(), vcs.clone()));

    let a = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.clone(URL, false).await })
    };
    let b = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.clone(URL, false).await })
    };

    let (first, second) = tokio::join!(a, b);
    first.unwrap().unwrap();
    second.unwrap().unwrap();

    assert_eq!(vcs.bare_clones.load(Ordering::SeqCst), 1);

    let id = repocache_core::identity::parse_repo_url(URL).unwrap();
    let store = store_path(&coordinator, &id);
    assert!(!path_resolver::lock_path(&store).exists());

    let siblings: Vec<_> = std::fs::read_dir(store.parent().unwrap())
        .unwrap()
        .filter_map(std::result::Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    assert!(!siblings.iter().any(|n| n.contains(".tmp.")));
}

#[tokio::test]
async fn repeat_clone_does_not_grow_ref_count_without_a_fresh_checkout() {
    let dir = tempfile::tempdir().unwrap();
    let vcs = Arc::new(CountingVcs {
        bare_clones: AtomicU32::new(0),
    });
    let coordinator = coordinator(dir.path(), vcs);

    let first = coordinator.clone(URL, false).await.unwrap();
    let second = coordinator.clone(URL, false).await.unwrap();

    assert_eq!(first.metadata.ref_count, 1);
    assert_eq!(second.metadata.ref_count, 1);
}

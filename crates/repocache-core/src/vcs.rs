//! The version-control subprocess contract.
//!
//! The core never links a VCS library; every operation goes through this
//! trait, whose default implementation shells out to the `git` binary
//! located via `which`. The core trusts the exit status and never parses
//! the object format itself.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{Error, Result};

/// Outcome of a subprocess invocation: exit status plus captured output,
/// so callers can log stderr on failure without re-running the command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Whether the process exited with status zero.
    pub success: bool,
    /// Captured stdout, lossily decoded.
    pub stdout: String,
    /// Captured stderr, lossily decoded.
    pub stderr: String,
}

/// The full operation set the coordinator needs from a VCS backend. Every
/// call returns a
/// [`CommandOutput`]; non-zero exit is the caller's signal to map into the
/// relevant [`Error`] variant for that context (integrity vs. network vs.
/// generic subprocess failure).
#[async_trait]
pub trait VcsBackend: Send + Sync {
    /// `git clone --bare <url> <dest>`.
    async fn create_bare_clone(&self, url: &str, dest: &Path) -> Result<CommandOutput>;
    /// `git --git-dir=<store> fetch --all --prune`.
    async fn fetch_all(&self, store: &Path) -> Result<CommandOutput>;
    /// Create a working-tree checkout at `dest` borrowing objects from
    /// `store`, shaped by `strategy`.
    async fn create_reference_checkout(
        &self,
        store: &Path,
        dest: &Path,
        strategy: crate::strategy::Strategy,
    ) -> Result<CommandOutput>;
    /// Write `dest`'s alternates file to contain exactly `objects_path`.
    async fn write_alternates(&self, dest: &Path, objects_path: &Path) -> Result<CommandOutput>;
    /// Run the underlying integrity check (`git fsck` or equivalent).
    async fn integrity_check(&self, repo: &Path) -> Result<CommandOutput>;
    /// List refs in `repo`.
    async fn list_refs(&self, repo: &Path) -> Result<CommandOutput>;
    /// List configured remotes in `repo`.
    async fn list_remotes(&self, repo: &Path) -> Result<CommandOutput>;
    /// Add a remote named `name` pointing at `url`.
    async fn remote_add(&self, repo: &Path, name: &str, url: &str) -> Result<CommandOutput>;
    /// Repoint an existing remote's URL.
    async fn remote_set_url(&self, repo: &Path, name: &str, url: &str) -> Result<CommandOutput>;
    /// Remove a remote.
    async fn remote_remove(&self, repo: &Path, name: &str) -> Result<CommandOutput>;
    /// Fetch a single named remote.
    async fn fetch_remote(&self, repo: &Path, name: &str) -> Result<CommandOutput>;
    /// Push the current branch to a named remote.
    async fn push_remote(&self, repo: &Path, name: &str, refspec: &str) -> Result<CommandOutput>;
    /// Hard-reset the working tree to the named remote's head.
    async fn reset_to_remote_head(&self, repo: &Path, name: &str) -> Result<CommandOutput>;
    /// Remove untracked files from the working tree.
    async fn clean_untracked(&self, repo: &Path) -> Result<CommandOutput>;
    /// List submodule records, if any.
    async fn list_submodule_records(&self, repo: &Path) -> Result<CommandOutput>;
    /// `git status --porcelain`: empty stdout on success means a clean
    /// working tree, used by `clean` to decide whether a checkout needs
    /// `force` before it can be removed.
    async fn working_tree_status(&self, repo: &Path) -> Result<CommandOutput>;
}

/// Default [`VcsBackend`], shelling out to the system `git`.
pub struct GitCli {
    git_binary: PathBuf,
}

impl GitCli {
    /// Locate `git` on `PATH` via `which`.
    pub fn discover() -> Result<Self> {
        let git_binary = which::which("git")
            .map_err(|e| Error::VcsSubprocess(format!("git not found on PATH: {e}")))?;
        Ok(Self { git_binary })
    }

    /// Build a backend against an explicit git binary path, for tests or
    /// non-standard installs.
    #[must_use]
    pub fn with_binary(git_binary: PathBuf) -> Self {
        Self { git_binary }
    }

    async fn run(&self, args: &[&str], cwd: Option<&Path>) -> Result<CommandOutput> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = cwd {
            cmd.current_dir(dir);
        }
        let output = cmd
            .output()
            .await
            .map_err(|e| Error::VcsSubprocess(format!("spawning git {args:?}: {e}")))?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    fn strategy_args(strategy: crate::strategy::Strategy) -> Vec<&'static str> {
        use crate::strategy::Strategy;
        match strategy {
            Strategy::Full | Strategy::Auto => vec![],
            Strategy::Shallow => vec!["--depth", "1"],
            Strategy::Treeless => vec!["--filter=tree:0"],
            Strategy::Blobless => vec!["--filter=blob:none"],
        }
    }
}

#[async_trait]
impl VcsBackend for GitCli {
    async fn create_bare_clone(&self, url: &str, dest: &Path) -> Result<CommandOutput> {
        let dest_str = dest.to_string_lossy().into_owned();
        self.run(&["clone", "--bare", url, &dest_str], None).await
    }

    async fn fetch_all(&self, store: &Path) -> Result<CommandOutput> {
        let store_str = store.to_string_lossy().into_owned();
        self.run(
            &["--git-dir", &store_str, "fetch", "--all", "--prune"],
            None,
        )
        .await
    }

    async fn create_reference_checkout(
        &self,
        store: &Path,
        dest: &Path,
        strategy: crate::strategy::Strategy,
    ) -> Result<CommandOutput> {
        let store_str = store.to_string_lossy().into_owned();
        let dest_str = dest.to_string_lossy().into_owned();
        // No `--dissociate`: the checkout must keep borrowing objects from
        // `store` via alternates, not copy them in, or the whole point of
        // the shared object store is lost.
        let mut args = vec!["clone", "--reference", &store_str];
        args.extend(Self::strategy_args(strategy));
        args.push(&store_str);
        args.push(&dest_str);
        self.run(&args, None).await
    }

    async fn write_alternates(&self, dest: &Path, objects_path: &Path) -> Result<CommandOutput> {
        let alternates_path = dest.join(".git").join("objects").join("info").join("alternates");
        if let Some(parent) = alternates_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::Filesystem(parent.to_path_buf(), e.to_string()))?;
        }
        let line = format!("{}\n", objects_path.display());
        tokio::fs::write(&alternates_path, line)
            .await
            .map_err(|e| Error::Filesystem(alternates_path.clone(), e.to_string()))?;
        Ok(CommandOutput {
            success: true,
            stdout: String::new(),
            stderr: String::new(),
        })
    }

    async fn integrity_check(&self, repo: &Path) -> Result<CommandOutput> {
        let repo_str = repo.to_string_lossy().into_owned();
        self.run(&["--git-dir", &repo_str, "fsck", "--full"], None)
            .await
    }

    async fn list_refs(&self, repo: &Path) -> Result<CommandOutput> {
        let repo_str = repo.to_string_lossy().into_owned();
        self.run(&["--git-dir", &repo_str, "show-ref"], None).await
    }

    async fn list_remotes(&self, repo: &Path) -> Result<CommandOutput> {
        self.run(&["remote", "-v"], Some(repo)).await
    }

    async fn remote_add(&self, repo: &Path, name: &str, url: &str) -> Result<CommandOutput> {
        self.run(&["remote", "add", name, url], Some(repo)).await
    }

    async fn remote_set_url(&self, repo: &Path, name: &str, url: &str) -> Result<CommandOutput> {
        self.run(&["remote", "set-url", name, url], Some(repo))
            .await
    }

    async fn remote_remove(&self, repo: &Path, name: &str) -> Result<CommandOutput> {
        self.run(&["remote", "remove", name], Some(repo)).await
    }

    async fn fetch_remote(&self, repo: &Path, name: &str) -> Result<CommandOutput> {
        self.run(&["fetch", name], Some(repo)).await
    }

    async fn push_remote(&self, repo: &Path, name: &str, refspec: &str) -> Result<CommandOutput> {
        self.run(&["push", name, refspec], Some(repo)).await
    }

    async fn reset_to_remote_head(&self, repo: &Path, name: &str) -> Result<CommandOutput> {
        let refspec = format!("{name}/HEAD");
        self.run(&["reset", "--hard", &refspec], Some(repo)).await
    }

    async fn clean_untracked(&self, repo: &Path) -> Result<CommandOutput> {
        self.run(&["clean", "-fdx"], Some(repo)).await
    }

    async fn list_submodule_records(&self, repo: &Path) -> Result<CommandOutput> {
        self.run(&["config", "--file", ".gitmodules", "--get-regexp", "path"], Some(repo))
            .await
    }

    async fn working_tree_status(&self, repo: &Path) -> Result<CommandOutput> {
        self.run(&["status", "--porcelain"], Some(repo)).await
    }
}

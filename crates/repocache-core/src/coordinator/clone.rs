//! `clone(url)`: the coordinator's primary operation.

use crate::error::{Error, IntegrityKind, Result};
use crate::identity::{parse_repo_url, RepoId};
use crate::integrity;
use crate::lock;
use crate::metadata::{self, HostKind, Metadata};
use crate::retry::with_backoff;
use crate::strategy::{select_strategy, RepoAnalysis, Strategy};

use super::Coordinator;

/// What happened to one checkout class during a clone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutOutcome {
    /// The checkout did not exist and was freshly created.
    Created,
    /// The checkout existed, was valid, and was brought up to date.
    Updated,
    /// The checkout existed but was invalid and has been repaired.
    Repaired,
    /// The checkout existed, was valid and current; nothing was done.
    UpToDate,
}

/// Outcome of a [`Coordinator::clone`] call.
#[derive(Debug)]
pub struct CloneReport {
    /// The resolved identity.
    pub id: RepoId,
    /// Whether the store was freshly populated (absent) or repaired
    /// (corrupted) during this call.
    pub store_repopulated: bool,
    /// What happened to the read-only checkout.
    pub read_only: CheckoutOutcome,
    /// What happened to the modifiable checkout, if one was requested.
    pub modifiable: Option<CheckoutOutcome>,
    /// The metadata record after this call.
    pub metadata: Metadata,
}

impl Coordinator {
    /// Resolve `url`, ensure the store is populated and valid, ensure the
    /// read-only (and optionally modifiable) checkout exists and is valid,
    /// and update metadata.
    pub async fn clone(&self, url: &str, want_modifiable: bool) -> Result<CloneReport> {
        let id = parse_repo_url(url)?;
        let store_path = self.store_path(&id);
        let checkout_path = self.checkout_path(&id);
        let modifiable_path = self.modifiable_path(&id);
        let objects_path = self.store_objects_path(&id);

        let guard = lock::acquire(&store_path, self.lock_options()).await?;
        let result = self
            .clone_locked(url, &id, &store_path, &checkout_path, &modifiable_path, &objects_path, want_modifiable)
            .await;
        lock::release(guard).await?;
        result
    }

    async fn clone_locked(
        &self,
        url: &str,
        id: &RepoId,
        store_path: &std::path::Path,
        checkout_path: &std::path::Path,
        modifiable_path: &std::path::Path,
        objects_path: &std::path::Path,
        want_modifiable: bool,
    ) -> Result<CloneReport> {
        let now = metadata::now_secs();
        let mut store_repopulated = false;

        // Step 3: validate or (re)populate the store.
        match integrity::validate_store(self.vcs.as_ref(), store_path).await {
            Ok(()) => {}
            Err(Error::Integrity {
                kind: IntegrityKind::NotExists,
                ..
            }) => {
                self.populate_store(url, store_path).await?;
                store_repopulated = true;
            }
            Err(_) => {
                integrity::repair_store(self.vcs.as_ref(), store_path, url).await?;
                store_repopulated = true;
            }
        }

        // Step 4: attempt a fork if this repo is hosted on a forkable
        // provider and forking is configured, falling back to the
        // original URL on any failure.
        let origin_record = self.provider.get_repo(&id.owner, &id.name).await.ok();
        let fork_url = if want_modifiable {
            self.maybe_fork(id).await
        } else {
            None
        };

        // Metadata: created fresh if this is a brand-new entry, else
        // loaded and updated in place.
        let mut meta = match metadata::load(store_path).await {
            Ok(existing) => existing,
            Err(_) => {
                let strategy = self.config.default_strategy;
                Metadata::create(id, url, strategy, now)
            }
        };
        if let Some(ref fork) = fork_url {
            meta.fork_url = Some(fork.clone());
            meta.is_fork_needed = true;
            meta.is_private_fork = origin_record.as_ref().is_some_and(|r| r.is_private);
        }
        if let Some(branch) = origin_record.as_ref().and_then(|r| r.default_branch.clone()) {
            meta.default_branch = Some(branch);
        }
        meta.last_access_time = now;
        if store_repopulated {
            meta.last_sync_time = now;
        }

        let strategy = if meta.strategy == Strategy::Auto {
            let analysis = origin_record
                .as_ref()
                .map(|r| RepoAnalysis::from_repo_record(r, now, false))
                .unwrap_or_default();
            select_strategy(&analysis, self.config.default_strategy)
        } else {
            meta.strategy
        };

        // Step 5: read-only checkout.
        let (read_only, bumped_ref) = self
            .ensure_checkout(store_path, checkout_path, objects_path, strategy)
            .await?;

        // Submodule presence is cheap to probe on the working tree and only
        // meaningful once a checkout exists to inspect.
        if let Ok(output) = self.vcs.list_submodule_records(checkout_path).await {
            meta.has_submodules = output.success && !output.stdout.trim().is_empty();
        }

        // Step 6: modifiable checkout, using the fork URL if we have one.
        let modifiable = if want_modifiable {
            let (outcome, _) = self
                .ensure_checkout(store_path, modifiable_path, objects_path, strategy)
                .await?;
            Some(outcome)
        } else {
            None
        };

        if bumped_ref || matches!(modifiable, Some(CheckoutOutcome::Created)) {
            meta.ref_count = meta.ref_count.saturating_add(1);
        }

        metadata::save(store_path, &meta).await?;

        Ok(CloneReport {
            id: id.clone(),
            store_repopulated,
            read_only,
            modifiable,
            metadata: meta,
        })
    }

    async fn populate_store(&self, url: &str, store_path: &std::path::Path) -> Result<()> {
        let vcs = self.vcs.clone();
        let url = url.to_string();
        let store_path = store_path.to_path_buf();
        with_backoff(move || {
            let vcs = vcs.clone();
            let url = url.clone();
            let store_path = store_path.clone();
            async move {
                let output = vcs.create_bare_clone(&url, &store_path).await?;
                if output.success {
                    Ok(())
                } else {
                    Err(Error::VcsSubprocess(output.stderr))
                }
            }
        })
        .await
    }

    async fn maybe_fork(&self, id: &RepoId) -> Option<String> {
        if !matches!(self.metadata_host_kind(id), HostKind::Github) {
            return None;
        }
        let target_org = self.config.fork_organization.as_deref();
        self.provider
            .fork_repo(&id.owner, &id.name, target_org)
            .await
            .ok()
            .map(|fork| fork.clone_url)
    }

    fn metadata_host_kind(&self, id: &RepoId) -> HostKind {
        if id.host == "github.com" || id.host.starts_with("github.") {
            HostKind::Github
        } else {
            HostKind::Unknown
        }
    }

    /// Ensure `checkout_path` exists and is valid, creating, updating or
    /// repairing it as needed. Returns the outcome and whether a fresh
    /// checkout was created (for refcounting).
    pub(crate) async fn ensure_checkout(
        &self,
        store_path: &std::path::Path,
        checkout_path: &std::path::Path,
        objects_path: &std::path::Path,
        strategy: Strategy,
    ) -> Result<(CheckoutOutcome, bool)> {
        if !checkout_path.exists() {
            integrity::stage_and_rename_checkout(
                self.vcs.as_ref(),
                store_path,
                checkout_path,
                objects_path,
                strategy,
            )
            .await?;
            return Ok((CheckoutOutcome::Created, true));
        }

        match integrity::validate_checkout(checkout_path, objects_path).await {
            Ok(()) => {
                if integrity::checkout_is_stale(store_path, checkout_path)
                    .await
                    .unwrap_or(false)
                {
                    self.vcs.fetch_remote(checkout_path, "origin").await.ok();
                    Ok((CheckoutOutcome::Updated, false))
                } else {
                    Ok((CheckoutOutcome::UpToDate, false))
                }
            }
            Err(_) => {
                integrity::repair_checkout(
                    self.vcs.as_ref(),
                    store_path,
                    checkout_path,
                    objects_path,
                    strategy,
                )
                .await?;
                Ok((CheckoutOutcome::Repaired, false))
            }
        }
    }
}

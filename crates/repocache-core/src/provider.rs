//! Hosting-provider client contract.
//!
//! A core with no real implementation of the provider boundary can never
//! be exercised end to end, so this module ships a `reqwest`-based GitHub
//! implementation alongside the contract, plus a [`NullProvider`] that is
//! the default when no token is configured — forking stays opt-in.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{Error, Result};

/// A repository record as returned by `get_repo`.
#[derive(Debug, Clone)]
pub struct RepoRecord {
    /// `owner/name`.
    pub full_name: String,
    /// HTTPS clone URL.
    pub clone_url: String,
    /// SSH clone URL.
    pub ssh_url: String,
    /// Whether this repository is itself a fork.
    pub is_fork: bool,
    /// Whether this repository is private.
    pub is_private: bool,
    /// Number of forks the provider reports.
    pub fork_count: u64,
    /// Repository size as the provider estimates it, in kibibytes.
    pub size_kb: u64,
    /// The repository's default branch.
    pub default_branch: Option<String>,
    /// Last push time, absolute seconds, when the provider reports one.
    pub pushed_at: Option<i64>,
}

/// A newly created (or adopted, if already present) fork.
#[derive(Debug, Clone)]
pub struct ForkRecord {
    /// HTTPS clone URL of the fork.
    pub clone_url: String,
    /// Fork owner (the authenticated user, or `target_org`).
    pub owner: String,
    /// Fork name (usually unchanged from the source).
    pub name: String,
}

/// Failure kinds a provider call can report.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Repository does not exist, or is invisible to this token.
    #[error("repository not found")]
    NotFound,
    /// Token lacks permission for the operation.
    #[error("forbidden")]
    Forbidden,
    /// No token configured, or the token was rejected.
    #[error("authentication required")]
    AuthRequired,
    /// A fork already exists at the destination.
    #[error("fork already exists")]
    AlreadyExists,
    /// Transport-level failure.
    #[error("network error: {0}")]
    Network(String),
}

impl From<ProviderError> for Error {
    fn from(err: ProviderError) -> Self {
        Error::ProviderApi(err.to_string())
    }
}

/// The hosting-provider capability set.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Fetch a repository's record.
    async fn get_repo(&self, owner: &str, name: &str) -> Result<RepoRecord, ProviderError>;
    /// Fork a repository, optionally into `target_org`.
    async fn fork_repo(
        &self,
        owner: &str,
        name: &str,
        target_org: Option<&str>,
    ) -> Result<ForkRecord, ProviderError>;
    /// Toggle a repository's visibility.
    async fn set_private(&self, owner: &str, name: &str, is_private: bool) -> Result<(), ProviderError>;
}

/// Default provider when no token is configured: every call reports
/// `AuthRequired`, so the coordinator's fork-on-failure fallback always
/// lands on `original_url`.
#[derive(Debug, Default)]
pub struct NullProvider;

#[async_trait]
impl Provider for NullProvider {
    async fn get_repo(&self, _owner: &str, _name: &str) -> Result<RepoRecord, ProviderError> {
        Err(ProviderError::AuthRequired)
    }

    async fn fork_repo(
        &self,
        _owner: &str,
        _name: &str,
        _target_org: Option<&str>,
    ) -> Result<ForkRecord, ProviderError> {
        Err(ProviderError::AuthRequired)
    }

    async fn set_private(&self, _owner: &str, _name: &str, _is_private: bool) -> Result<(), ProviderError> {
        Err(ProviderError::AuthRequired)
    }
}

/// `reqwest`-backed GitHub REST API client.
pub struct GitHubProvider {
    client: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubProvider {
    /// Build a client authenticated with `token`, talking to the standard
    /// `api.github.com` base.
    #[must_use]
    pub fn new(token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            api_base: "https://api.github.com".to_string(),
        }
    }

    /// Build a client against a custom API base, for GitHub Enterprise or
    /// tests against a local mock server.
    #[must_use]
    pub fn with_api_base(token: String, api_base: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            api_base,
        }
    }

    fn map_status(status: reqwest::StatusCode) -> ProviderError {
        match status.as_u16() {
            404 => ProviderError::NotFound,
            401 => ProviderError::AuthRequired,
            403 => ProviderError::Forbidden,
            422 => ProviderError::AlreadyExists,
            _ => ProviderError::Network(format!("unexpected status {status}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    full_name: String,
    clone_url: String,
    ssh_url: String,
    fork: bool,
    private: bool,
    #[serde(default)]
    forks_count: u64,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    pushed_at: Option<String>,
    owner: GitHubOwner,
    name: String,
}

/// Parse a GitHub API RFC 3339 timestamp (e.g. `pushed_at`) into absolute
/// seconds. Returns `None` on anything that doesn't round-trip, since this
/// value only ever feeds the advisory strategy heuristic.
fn parse_github_time(raw: &Option<String>) -> Option<i64> {
    raw.as_deref()
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.timestamp())
}

#[derive(Debug, Deserialize)]
struct GitHubOwner {
    login: String,
}

#[async_trait]
impl Provider for GitHubProvider {
    async fn get_repo(&self, owner: &str, name: &str) -> Result<RepoRecord, ProviderError> {
        let url = format!("{}/repos/{owner}/{name}", self.api_base);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "repocache")
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(resp.status()));
        }
        let repo: GitHubRepo = resp
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(RepoRecord {
            full_name: repo.full_name,
            clone_url: repo.clone_url,
            ssh_url: repo.ssh_url,
            is_fork: repo.fork,
            is_private: repo.private,
            fork_count: repo.forks_count,
            size_kb: repo.size,
            pushed_at: parse_github_time(&repo.pushed_at),
            default_branch: repo.default_branch,
        })
    }

    async fn fork_repo(
        &self,
        owner: &str,
        name: &str,
        target_org: Option<&str>,
    ) -> Result<ForkRecord, ProviderError> {
        let url = format!("{}/repos/{owner}/{name}/forks", self.api_base);
        let mut req = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "repocache");
        if let Some(org) = target_org {
            req = req.json(&serde_json::json!({ "organization": org }));
        }
        let resp = req.send().await.map_err(|e| ProviderError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(resp.status()));
        }
        let repo: GitHubRepo = resp
            .json()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        Ok(ForkRecord {
            clone_url: repo.clone_url,
            owner: repo.owner.login,
            name: repo.name,
        })
    }

    async fn set_private(&self, owner: &str, name: &str, is_private: bool) -> Result<(), ProviderError> {
        let url = format!("{}/repos/{owner}/{name}", self.api_base);
        let resp = self
            .client
            .patch(&url)
            .bearer_auth(&self.token)
            .header("User-Agent", "repocache")
            .json(&serde_json::json!({ "private": is_private }))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(Self::map_status(resp.status()));
        }
        Ok(())
    }
}

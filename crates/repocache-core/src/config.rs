//! Configuration loading and management.
//!
//! # Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. Built-in defaults
//! 2. Global config: `~/.config/repocache/config.toml`
//! 3. Project config: `.repocache/config.toml` (current directory upward
//!    is not searched; only the current directory is checked)
//! 4. Environment variables: `REPOCACHE_*`
//! 5. CLI flags (applied by the `repocache` binary after loading this
//!    struct)

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::strategy::Strategy;

/// The owner name under which modifiable checkouts are nested:
/// `checkout_root/modifiable_owner/{owner}-{name}`.
pub const MODIFIABLE_OWNER: &str = "_dev";

/// Default stale-lock window.
pub const STALE_LOCK_SECONDS: u64 = 300;
/// Default lock retry interval.
pub const RETRY_INTERVAL_MS: u64 = 100;
/// Default lock wait timeout.
pub const DEFAULT_MAX_WAIT_SECS: u64 = 60;

/// Full configuration surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path resolver root for stores.
    pub cache_root: PathBuf,
    /// Path resolver root for checkouts.
    pub checkout_root: PathBuf,
    /// Strategy used when the caller does not override and analysis is
    /// low-confidence.
    pub default_strategy: Strategy,
    /// Progress/log verbosity. No semantic effect beyond log level.
    pub verbose: bool,
    /// Skip interactive confirmations in `clean`.
    pub force: bool,
    /// Apply submodule inclusion to subprocess calls.
    pub recursive_submodules: bool,
    /// Token passed to the hosting-provider client.
    pub provider_token: Option<String>,
    /// Target org for new forks; otherwise the fork goes to the
    /// authenticated user.
    pub fork_organization: Option<String>,
    /// Whether `needs_sync` heuristics should be evaluated at all.
    pub auto_sync: bool,
    /// Governs the `needs_sync` heuristic: `now - last_sync > interval`.
    pub sync_interval_hours: u64,
    /// Lock acquisition timeout, seconds.
    pub lock_max_wait_secs: u64,
    /// Lock staleness window, seconds.
    pub lock_stale_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        let dirs = directories::ProjectDirs::from("", "", "repocache");
        let cache_root = dirs
            .as_ref()
            .map(|d| d.cache_dir().join("stores"))
            .unwrap_or_else(|| PathBuf::from(".repocache/stores"));
        let checkout_root = dirs
            .as_ref()
            .map(|d| d.cache_dir().join("checkouts"))
            .unwrap_or_else(|| PathBuf::from(".repocache/checkouts"));
        Self {
            cache_root,
            checkout_root,
            default_strategy: Strategy::Auto,
            verbose: false,
            force: false,
            recursive_submodules: false,
            provider_token: None,
            fork_organization: None,
            auto_sync: false,
            sync_interval_hours: 24,
            lock_max_wait_secs: DEFAULT_MAX_WAIT_SECS,
            lock_stale_secs: STALE_LOCK_SECONDS,
        }
    }
}

impl Config {
    /// Load the layered configuration: defaults, then the global file, then
    /// a project-local `.repocache/config.toml` in `project_dir`, then
    /// `REPOCACHE_*` environment variables.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let mut config = Self::default();

        if let Some(dirs) = directories::ProjectDirs::from("", "", "repocache") {
            let global_path = dirs.config_dir().join("config.toml");
            config.merge_file(&global_path)?;
        }

        let project_path = project_dir.join(".repocache").join("config.toml");
        config.merge_file(&project_path)?;

        config.merge_env()?;

        Ok(config)
    }

    /// Merge in the contents of a TOML file at `path`, if it exists.
    /// Parse errors are surfaced as [`Error::Configuration`]: a present but
    /// broken config file fails loudly rather than silently falling back
    /// to defaults.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::Configuration(format!("reading '{}': {e}", path.display())))?;
        let partial: PartialConfig = toml::from_str(&raw)?;
        partial.apply_onto(self);
        Ok(())
    }

    /// Apply `REPOCACHE_*` environment variable overrides.
    pub fn merge_env(&mut self) -> Result<()> {
        if let Ok(v) = std::env::var("REPOCACHE_CACHE_ROOT") {
            self.cache_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REPOCACHE_CHECKOUT_ROOT") {
            self.checkout_root = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("REPOCACHE_DEFAULT_STRATEGY") {
            self.default_strategy = Strategy::from_str(&v)?;
        }
        if let Ok(v) = std::env::var("REPOCACHE_VERBOSE") {
            self.verbose = parse_bool(&v)?;
        }
        if let Ok(v) = std::env::var("REPOCACHE_FORCE") {
            self.force = parse_bool(&v)?;
        }
        if let Ok(v) = std::env::var("REPOCACHE_RECURSIVE_SUBMODULES") {
            self.recursive_submodules = parse_bool(&v)?;
        }
        if let Ok(v) = std::env::var("REPOCACHE_PROVIDER_TOKEN") {
            self.provider_token = Some(v);
        }
        if let Ok(v) = std::env::var("REPOCACHE_FORK_ORGANIZATION") {
            self.fork_organization = Some(v);
        }
        if let Ok(v) = std::env::var("REPOCACHE_AUTO_SYNC") {
            self.auto_sync = parse_bool(&v)?;
        }
        if let Ok(v) = std::env::var("REPOCACHE_SYNC_INTERVAL_HOURS") {
            self.sync_interval_hours = v
                .parse()
                .map_err(|_| Error::Configuration(format!("invalid sync interval '{v}'")))?;
        }
        Ok(())
    }

    /// Whether an entry last synced at `last_sync_time` (unix seconds)
    /// needs syncing now.
    #[must_use]
    pub fn needs_sync(&self, last_sync_time: i64, now: i64) -> bool {
        if !self.auto_sync {
            return false;
        }
        let interval_secs = i64::try_from(self.sync_interval_hours.saturating_mul(3600))
            .unwrap_or(i64::MAX);
        now - last_sync_time > interval_secs
    }
}

fn parse_bool(v: &str) -> Result<bool> {
    match v.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Configuration(format!("invalid boolean '{other}'"))),
    }
}

/// A partially-specified config as read from a TOML file; every field is
/// optional so a file only needs to name what it overrides.
#[derive(Debug, Default, Deserialize)]
struct PartialConfig {
    cache_root: Option<PathBuf>,
    checkout_root: Option<PathBuf>,
    default_strategy: Option<Strategy>,
    verbose: Option<bool>,
    force: Option<bool>,
    recursive_submodules: Option<bool>,
    provider_token: Option<String>,
    fork_organization: Option<String>,
    auto_sync: Option<bool>,
    sync_interval_hours: Option<u64>,
    lock_max_wait_secs: Option<u64>,
    lock_stale_secs: Option<u64>,
}

impl PartialConfig {
    fn apply_onto(self, target: &mut Config) {
        if let Some(v) = self.cache_root {
            target.cache_root = v;
        }
        if let Some(v) = self.checkout_root {
            target.checkout_root = v;
        }
        if let Some(v) = self.default_strategy {
            target.default_strategy = v;
        }
        if let Some(v) = self.verbose {
            target.verbose = v;
        }
        if let Some(v) = self.force {
            target.force = v;
        }
        if let Some(v) = self.recursive_submodules {
            target.recursive_submodules = v;
        }
        if let Some(v) = self.provider_token {
            target.provider_token = Some(v);
        }
        if let Some(v) = self.fork_organization {
            target.fork_organization = Some(v);
        }
        if let Some(v) = self.auto_sync {
            target.auto_sync = v;
        }
        if let Some(v) = self.sync_interval_hours {
            target.sync_interval_hours = v;
        }
        if let Some(v) = self.lock_max_wait_secs {
            target.lock_max_wait_secs = v;
        }
        if let Some(v) = self.lock_stale_secs {
            target.lock_stale_secs = v;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_strategy_is_auto() {
        assert_eq!(Config::default().default_strategy, Strategy::Auto);
    }

    #[test]
    fn needs_sync_false_when_auto_sync_disabled() {
        let config = Config {
            auto_sync: false,
            ..Config::default()
        };
        assert!(!config.needs_sync(0, 1_000_000));
    }

    #[test]
    fn needs_sync_true_past_interval() {
        let config = Config {
            auto_sync: true,
            sync_interval_hours: 1,
            ..Config::default()
        };
        assert!(config.needs_sync(0, 3601));
        assert!(!config.needs_sync(0, 3599));
    }

    #[test]
    fn merge_file_overrides_only_present_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "verbose = true\ndefault_strategy = \"shallow\"\n").unwrap();
        let mut config = Config::default();
        config.merge_file(&path).unwrap();
        assert!(config.verbose);
        assert_eq!(config.default_strategy, Strategy::Shallow);
        // Untouched field keeps its default.
        assert!(!config.force);
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("true").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("no").unwrap());
        assert!(parse_bool("nonsense").is_err());
    }
}

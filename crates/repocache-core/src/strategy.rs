//! Clone-strategy tag and the auto-selection decision table.

use serde::{Deserialize, Serialize};

use crate::error::{Error, MetadataError};

/// Shape of a checkout's history/object subset.
///
/// Stringly-typed on the wire but a closed tagged variant in Rust: an
/// unknown tag is rejected as
/// [`MetadataError::Corrupt`] rather than silently defaulting.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Strategy {
    /// Full bare history, no depth or filter restriction.
    Full,
    /// Shallow: history truncated to a depth.
    Shallow,
    /// Treeless: trees fetched on demand, blobs and commits present.
    Treeless,
    /// Blobless: blobs fetched on demand.
    Blobless,
    /// Defer to the auto-selection heuristic at use time.
    Auto,
}

impl Strategy {
    /// Parse a strategy tag from its stored string form, rejecting unknown
    /// tags as corrupt metadata rather than panicking or defaulting.
    pub fn parse_stored(raw: &str, source: std::path::PathBuf) -> Result<Self, Error> {
        raw.parse().map_err(|_| {
            Error::Metadata(MetadataError::Corrupt(
                source,
                format!("unknown strategy tag '{raw}'"),
            ))
        })
    }
}

/// Confidence level attached to an auto-selected strategy. Low-confidence
/// outcomes fall back to the configured default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confidence {
    /// Decision table matched unambiguously.
    High,
    /// Decision table matched a size-threshold heuristic.
    Medium,
    /// Fell through to the generic default row.
    Low,
}

/// Inputs to the auto-selection heuristic.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepoAnalysis {
    /// Estimated size of the full history, in bytes.
    pub size_bytes: u64,
    /// Estimated commit count.
    pub commit_count: u64,
    /// True if the repository has seen a commit recently.
    pub high_activity: bool,
    /// True if large/binary files appear to dominate, or the repo looks
    /// like a monorepo.
    pub large_files_or_monorepo: bool,
    /// Caller prefers fast initial clones over completeness.
    pub prefer_speed: bool,
}

const MB: u64 = 1024 * 1024;
const MEDIUM_THRESHOLD: u64 = 500 * MB;
const LARGE_THRESHOLD: u64 = 2 * 1024 * MB;

/// A push within this many seconds of `now` counts as "high activity".
const ACTIVITY_WINDOW_SECS: i64 = 30 * 24 * 3600;

impl RepoAnalysis {
    /// Build an analysis from a hosting-provider repo record, the only
    /// source of size/activity signal available before the store exists.
    /// Commit count has no cheap provider-side equivalent and is left at
    /// zero, which only affects the first decision-table row.
    #[must_use]
    pub fn from_repo_record(record: &crate::provider::RepoRecord, now: i64, prefer_speed: bool) -> Self {
        let size_bytes = record.size_kb.saturating_mul(1024);
        let high_activity = record
            .pushed_at
            .is_some_and(|t| now - t < ACTIVITY_WINDOW_SECS);
        Self {
            size_bytes,
            commit_count: 0,
            high_activity,
            large_files_or_monorepo: size_bytes > LARGE_THRESHOLD,
            prefer_speed,
        }
    }
}

/// Run the first-match-wins decision table.
#[must_use]
pub fn select_strategy(analysis: &RepoAnalysis, default_strategy: Strategy) -> Strategy {
    let (strategy, confidence) = decide(analysis);
    match confidence {
        Confidence::Low => default_strategy,
        _ => strategy,
    }
}

fn decide(a: &RepoAnalysis) -> (Strategy, Confidence) {
    if a.size_bytes < 10 * MB && a.commit_count < 100 {
        return (Strategy::Full, Confidence::High);
    }
    if a.size_bytes > MEDIUM_THRESHOLD && a.large_files_or_monorepo {
        return (Strategy::Blobless, Confidence::High);
    }
    if a.size_bytes > LARGE_THRESHOLD {
        return (Strategy::Treeless, Confidence::Medium);
    }
    if a.size_bytes > MEDIUM_THRESHOLD {
        return (Strategy::Shallow, Confidence::Medium);
    }
    if a.large_files_or_monorepo {
        return (Strategy::Blobless, Confidence::High);
    }
    if a.high_activity && a.prefer_speed {
        return (Strategy::Shallow, Confidence::Medium);
    }
    if !a.high_activity {
        return (Strategy::Full, Confidence::Medium);
    }
    let fallback = if a.size_bytes > MEDIUM_THRESHOLD / 2 {
        Strategy::Treeless
    } else {
        Strategy::Full
    };
    (fallback, Confidence::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_string_round_trips() {
        for s in [
            Strategy::Full,
            Strategy::Shallow,
            Strategy::Treeless,
            Strategy::Blobless,
            Strategy::Auto,
        ] {
            let rendered = s.to_string();
            let parsed = Strategy::parse_stored(&rendered, std::path::PathBuf::new()).unwrap();
            assert_eq!(s, parsed);
        }
    }

    #[test]
    fn unknown_tag_is_rejected_as_corrupt() {
        let err = Strategy::parse_stored("bogus", std::path::PathBuf::from("/x")).unwrap_err();
        assert!(matches!(err, Error::Metadata(MetadataError::Corrupt(_, _))));
    }

    #[test]
    fn small_repo_picks_full_with_high_confidence() {
        let analysis = RepoAnalysis {
            size_bytes: MB,
            commit_count: 10,
            ..Default::default()
        };
        assert_eq!(select_strategy(&analysis, Strategy::Auto), Strategy::Full);
    }

    #[test]
    fn monorepo_signal_picks_blobless() {
        let analysis = RepoAnalysis {
            size_bytes: MB,
            commit_count: 10_000,
            large_files_or_monorepo: true,
            ..Default::default()
        };
        assert_eq!(
            select_strategy(&analysis, Strategy::Auto),
            Strategy::Blobless
        );
    }

    #[test]
    fn huge_repo_without_monorepo_signal_picks_treeless() {
        let analysis = RepoAnalysis {
            size_bytes: LARGE_THRESHOLD + 1,
            commit_count: 50_000,
            ..Default::default()
        };
        assert_eq!(
            select_strategy(&analysis, Strategy::Auto),
            Strategy::Treeless
        );
    }

    #[test]
    fn analysis_from_repo_record_converts_kb_to_bytes_and_checks_activity_window() {
        let record = crate::provider::RepoRecord {
            full_name: "octocat/Hello-World".to_string(),
            clone_url: String::new(),
            ssh_url: String::new(),
            is_fork: false,
            is_private: false,
            fork_count: 0,
            size_kb: 1024,
            default_branch: None,
            pushed_at: Some(1_000),
        };
        let fresh = RepoAnalysis::from_repo_record(&record, 1_000 + 10, false);
        assert_eq!(fresh.size_bytes, 1024 * 1024);
        assert!(fresh.high_activity);

        let stale = RepoAnalysis::from_repo_record(&record, 1_000 + ACTIVITY_WINDOW_SECS + 1, false);
        assert!(!stale.high_activity);
    }

    #[test]
    fn low_confidence_falls_back_to_configured_default() {
        let analysis = RepoAnalysis {
            size_bytes: MEDIUM_THRESHOLD / 4,
            commit_count: 500,
            high_activity: true,
            prefer_speed: false,
            large_files_or_monorepo: false,
        };
        assert_eq!(decide(&analysis).1, Confidence::Low);
        assert_eq!(
            select_strategy(&analysis, Strategy::Blobless),
            Strategy::Blobless
        );
    }
}

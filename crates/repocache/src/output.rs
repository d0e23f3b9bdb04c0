//! View structs bridging `repocache-core`'s plain result types to the
//! CLI's human-readable and `--json` output modes.
//!
//! The core's report types are deliberately not `Serialize` — they are
//! internal return values, not a wire contract. Each type here owns that
//! contract instead, with a `Display` impl for the default text rendering
//! and a `Serialize` derive for `--json`.

use std::fmt;

use repocache_core::coordinator::{
    CheckoutOutcome, CleanReport, CloneReport, RepairAction, RepairEntry, SyncEntryOutcome,
    SyncReport, VerifyEntry, VerifyStatus,
};
use repocache_core::identity::RepoId;
use repocache_core::metadata::Metadata;
use serde::Serialize;

/// Print `value` as pretty JSON to stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn outcome_str(outcome: CheckoutOutcome) -> &'static str {
    match outcome {
        CheckoutOutcome::Created => "created",
        CheckoutOutcome::Updated => "updated",
        CheckoutOutcome::Repaired => "repaired",
        CheckoutOutcome::UpToDate => "up-to-date",
    }
}

fn verify_status_str(status: &VerifyStatus) -> String {
    match status {
        VerifyStatus::Absent => "absent".to_string(),
        VerifyStatus::Valid => "valid".to_string(),
        VerifyStatus::Invalid(kind) => format!("invalid ({kind})"),
    }
}

fn repair_action_str(action: RepairAction) -> &'static str {
    match action {
        RepairAction::Untouched => "untouched",
        RepairAction::Repaired => "repaired",
        RepairAction::Skipped => "skipped",
    }
}

/// `--json`/text view of a [`CloneReport`].
#[derive(Debug, Serialize)]
pub struct CloneView {
    pub id: RepoId,
    pub store_repopulated: bool,
    pub read_only: String,
    pub modifiable: Option<String>,
    pub metadata: Metadata,
}

impl From<&CloneReport> for CloneView {
    fn from(report: &CloneReport) -> Self {
        Self {
            id: report.id.clone(),
            store_repopulated: report.store_repopulated,
            read_only: outcome_str(report.read_only).to_string(),
            modifiable: report.modifiable.map(|o| outcome_str(o).to_string()),
            metadata: report.metadata.clone(),
        }
    }
}

impl fmt::Display for CloneView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(
            f,
            "  store:      {}",
            if self.store_repopulated { "repopulated" } else { "cache hit" }
        )?;
        writeln!(f, "  read-only:  {}", self.read_only)?;
        if let Some(modifiable) = &self.modifiable {
            writeln!(f, "  modifiable: {modifiable}")?;
        }
        write!(f, "  strategy:   {}", self.metadata.strategy)
    }
}

/// `--json`/text view of one [`crate::ListEntry`]-backed row.
#[derive(Debug, Serialize)]
pub struct ListEntryView {
    pub id: RepoId,
    pub original_url: String,
    pub fork_url: Option<String>,
    pub strategy: String,
    pub cache_size: i64,
    pub last_sync_time: i64,
    pub last_access_time: i64,
    pub ref_count: i64,
    pub has_read_only_checkout: bool,
    pub has_modifiable_checkout: bool,
}

impl From<&repocache_core::coordinator::ListEntry> for ListEntryView {
    fn from(entry: &repocache_core::coordinator::ListEntry) -> Self {
        Self {
            id: entry.id.clone(),
            original_url: entry.original_url.clone(),
            fork_url: entry.fork_url.clone(),
            strategy: entry.strategy.to_string(),
            cache_size: entry.cache_size,
            last_sync_time: entry.last_sync_time,
            last_access_time: entry.last_access_time,
            ref_count: entry.ref_count,
            has_read_only_checkout: entry.has_read_only_checkout,
            has_modifiable_checkout: entry.has_modifiable_checkout,
        }
    }
}

impl fmt::Display for ListEntryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ro = if self.has_read_only_checkout { "ro" } else { "-" };
        let mo = if self.has_modifiable_checkout { "mod" } else { "-" };
        write!(
            f,
            "{:<60} {:<10} refs={:<3} [{},{}]",
            self.id.to_string(),
            self.strategy,
            self.ref_count,
            ro,
            mo
        )
    }
}

/// `--json`/text view of a [`SyncReport`].
#[derive(Debug, Serialize)]
pub struct SyncView {
    pub entries: Vec<SyncEntryView>,
}

#[derive(Debug, Serialize)]
pub struct SyncEntryView {
    pub id: RepoId,
    pub fetched: bool,
    pub checkout_repaired: bool,
    pub modifiable_repaired: bool,
    pub error: Option<String>,
}

impl From<&SyncEntryOutcome> for SyncEntryView {
    fn from(outcome: &SyncEntryOutcome) -> Self {
        Self {
            id: outcome.id.clone(),
            fetched: outcome.fetched,
            checkout_repaired: outcome.checkout_repaired,
            modifiable_repaired: outcome.modifiable_repaired,
            error: outcome.error.clone(),
        }
    }
}

impl From<&SyncReport> for SyncView {
    fn from(report: &SyncReport) -> Self {
        Self {
            entries: report.entries.iter().map(SyncEntryView::from).collect(),
        }
    }
}

impl fmt::Display for SyncEntryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.id)?;
        if let Some(err) = &self.error {
            write!(f, "error: {err}")
        } else {
            write!(
                f,
                "fetched={} checkout_repaired={} modifiable_repaired={}",
                self.fetched, self.checkout_repaired, self.modifiable_repaired
            )
        }
    }
}

/// `--json`/text view of a [`CleanReport`].
#[derive(Debug, Serialize)]
pub struct CleanView {
    pub id: Option<RepoId>,
    pub read_only_removed: bool,
    pub modifiable_removed: bool,
    pub store_removed: bool,
    pub metadata_removed: bool,
    pub orphans_removed: Vec<String>,
}

impl From<&CleanReport> for CleanView {
    fn from(report: &CleanReport) -> Self {
        Self {
            id: report.id.clone(),
            read_only_removed: report.read_only_removed,
            modifiable_removed: report.modifiable_removed,
            store_removed: report.store_removed,
            metadata_removed: report.metadata_removed,
            orphans_removed: report
                .orphans_removed
                .iter()
                .map(|p| p.display().to_string())
                .collect(),
        }
    }
}

impl fmt::Display for CleanView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(id) = &self.id {
            writeln!(f, "{id}")?;
        }
        writeln!(f, "  read-only removed:  {}", self.read_only_removed)?;
        writeln!(f, "  modifiable removed: {}", self.modifiable_removed)?;
        writeln!(f, "  store removed:      {}", self.store_removed)?;
        if !self.orphans_removed.is_empty() {
            writeln!(f, "  orphans removed:")?;
            for orphan in &self.orphans_removed {
                writeln!(f, "    {orphan}")?;
            }
        }
        write!(f, "  metadata removed:   {}", self.metadata_removed)
    }
}

/// `--json`/text view of one [`VerifyEntry`].
#[derive(Debug, Serialize)]
pub struct VerifyEntryView {
    pub id: RepoId,
    pub store: String,
    pub read_only: String,
    pub modifiable: String,
    pub healthy: bool,
}

impl From<&VerifyEntry> for VerifyEntryView {
    fn from(entry: &VerifyEntry) -> Self {
        Self {
            id: entry.id.clone(),
            store: verify_status_str(&entry.store),
            read_only: verify_status_str(&entry.read_only),
            modifiable: verify_status_str(&entry.modifiable),
            healthy: entry.is_healthy(),
        }
    }
}

impl fmt::Display for VerifyEntryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = if self.healthy { "ok" } else { "UNHEALTHY" };
        write!(
            f,
            "{:<8} {:<60} store={} read_only={} modifiable={}",
            flag, self.id, self.store, self.read_only, self.modifiable
        )
    }
}

/// `--json`/text view of one [`RepairEntry`].
#[derive(Debug, Serialize)]
pub struct RepairEntryView {
    pub id: RepoId,
    pub store: String,
    pub read_only: String,
    pub modifiable: String,
}

impl From<&RepairEntry> for RepairEntryView {
    fn from(entry: &RepairEntry) -> Self {
        Self {
            id: entry.id.clone(),
            store: repair_action_str(entry.store).to_string(),
            read_only: repair_action_str(entry.read_only).to_string(),
            modifiable: repair_action_str(entry.modifiable).to_string(),
        }
    }
}

impl fmt::Display for RepairEntryView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:<60} store={} read_only={} modifiable={}",
            self.id, self.store, self.read_only, self.modifiable
        )
    }
}

/// Detailed single-entry view combining integrity status with metadata,
/// for `repocache status <url>`.
#[derive(Debug, Serialize)]
pub struct StatusView {
    pub id: RepoId,
    pub store: String,
    pub read_only: String,
    pub modifiable: String,
    pub healthy: bool,
    pub metadata: Option<Metadata>,
}

impl StatusView {
    #[must_use]
    pub fn new(entry: &VerifyEntry, metadata: Option<Metadata>) -> Self {
        Self {
            id: entry.id.clone(),
            store: verify_status_str(&entry.store),
            read_only: verify_status_str(&entry.read_only),
            modifiable: verify_status_str(&entry.modifiable),
            healthy: entry.is_healthy(),
            metadata,
        }
    }
}

impl fmt::Display for StatusView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "  store:      {}", self.store)?;
        writeln!(f, "  read-only:  {}", self.read_only)?;
        writeln!(f, "  modifiable: {}", self.modifiable)?;
        writeln!(f, "  healthy:    {}", self.healthy)?;
        match &self.metadata {
            Some(meta) => {
                writeln!(f, "  original_url: {}", meta.original_url)?;
                writeln!(f, "  strategy:     {}", meta.strategy)?;
                writeln!(f, "  ref_count:    {}", meta.ref_count)?;
                write!(f, "  last_sync:    {}", meta.last_sync_time)
            }
            None => write!(f, "  (no metadata: store has not been populated yet)"),
        }
    }
}

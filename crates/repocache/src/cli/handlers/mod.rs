//! Subcommand dispatch: one handler function per command group, routed by
//! name.

mod clean;
mod clone;
mod completion;
mod config;
mod list;
mod repair;
mod status;
mod sync;
mod verify;

use anyhow::Result;
use clap::ArgMatches;
use repocache_core::Coordinator;

/// Route a parsed top-level command to its handler.
pub async fn dispatch(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    match matches.subcommand() {
        Some(("clone", sub_m)) => clone::run(sub_m, coordinator).await,
        Some(("status", sub_m)) => status::run(sub_m, coordinator).await,
        Some(("list", sub_m)) => list::run(sub_m, coordinator).await,
        Some(("sync", sub_m)) => sync::run(sub_m, coordinator).await,
        Some(("clean", sub_m)) => clean::run(sub_m, coordinator).await,
        Some(("verify", sub_m)) => verify::run(sub_m, coordinator).await,
        Some(("repair", sub_m)) => repair::run(sub_m, coordinator).await,
        Some(("config", sub_m)) => config::run(sub_m, coordinator).await,
        Some(("completion", sub_m)) => completion::run(sub_m),
        _ => anyhow::bail!("unknown command, run 'repocache --help' for usage"),
    }
}

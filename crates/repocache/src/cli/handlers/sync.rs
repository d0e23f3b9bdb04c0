use anyhow::Result;
use clap::ArgMatches;
use repocache_core::Coordinator;

use crate::output::{print_json, SyncView};

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let report = coordinator.sync().await?;
    let view = SyncView::from(&report);

    if matches.get_flag("json") {
        print_json(&view)?;
    } else if view.entries.is_empty() {
        println!("no cached entries to sync");
    } else {
        for entry in &view.entries {
            println!("{entry}");
        }
    }
    Ok(())
}

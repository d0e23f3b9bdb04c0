use anyhow::Result;
use clap::ArgMatches;
use repocache_core::identity::parse_repo_url;
use repocache_core::Coordinator;

use crate::output::{print_json, RepairEntryView};

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let id = matches
        .get_one::<String>("url")
        .map(|url| parse_repo_url(url))
        .transpose()?;

    let entries = coordinator.repair(id.as_ref()).await?;
    let views: Vec<RepairEntryView> = entries.iter().map(RepairEntryView::from).collect();

    if matches.get_flag("json") {
        print_json(&views)?;
    } else if views.is_empty() {
        println!("no cached entries to repair");
    } else {
        for view in &views {
            println!("{view}");
        }
    }
    Ok(())
}

use anyhow::Result;
use clap::ArgMatches;
use repocache_core::Coordinator;

use crate::output::{print_json, ListEntryView};

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let mut entries = coordinator.list().await?;
    entries.sort_by(|a, b| a.id.to_string().cmp(&b.id.to_string()));
    let views: Vec<ListEntryView> = entries.iter().map(ListEntryView::from).collect();

    if matches.get_flag("json") {
        print_json(&views)?;
    } else if views.is_empty() {
        println!("no cached entries");
    } else {
        for view in &views {
            println!("{view}");
        }
    }
    Ok(())
}

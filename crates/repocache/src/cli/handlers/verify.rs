use anyhow::Result;
use clap::ArgMatches;
use repocache_core::identity::parse_repo_url;
use repocache_core::Coordinator;

use crate::output::{print_json, VerifyEntryView};

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let id = matches
        .get_one::<String>("url")
        .map(|url| parse_repo_url(url))
        .transpose()?;

    let entries = coordinator.verify(id.as_ref()).await?;
    let views: Vec<VerifyEntryView> = entries.iter().map(VerifyEntryView::from).collect();
    let any_unhealthy = entries.iter().any(|e| !e.is_healthy());

    if matches.get_flag("json") {
        print_json(&views)?;
    } else if views.is_empty() {
        println!("no cached entries to verify");
    } else {
        for view in &views {
            println!("{view}");
        }
    }

    if any_unhealthy {
        anyhow::bail!("one or more entries failed integrity verification");
    }
    Ok(())
}

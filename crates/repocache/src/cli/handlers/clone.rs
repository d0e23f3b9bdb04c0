use anyhow::Result;
use clap::ArgMatches;
use repocache_core::Coordinator;

use crate::output::{print_json, CloneView};

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let url = matches.get_one::<String>("url").expect("required arg");
    let modifiable = matches.get_flag("modifiable");

    let report = coordinator.clone(url, modifiable).await?;
    let view = CloneView::from(&report);

    if matches.get_flag("json") {
        print_json(&view)?;
    } else {
        println!("{view}");
    }
    Ok(())
}

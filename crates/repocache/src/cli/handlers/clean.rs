use anyhow::Result;
use clap::ArgMatches;
use repocache_core::Coordinator;

use crate::output::{print_json, CleanView};

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let url = matches.get_one::<String>("url").expect("required arg");
    let force = matches.get_flag("force") || coordinator.config().force;

    let report = coordinator.clean(url, force).await?;
    let view = CleanView::from(&report);

    if matches.get_flag("json") {
        print_json(&view)?;
    } else {
        println!("{view}");
    }
    Ok(())
}

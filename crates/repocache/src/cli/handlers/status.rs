use anyhow::Result;
use clap::ArgMatches;
use repocache_core::identity::parse_repo_url;
use repocache_core::path_resolver::{store_path, Roots};
use repocache_core::{metadata, Coordinator};

use crate::output::{print_json, StatusView};

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let url = matches.get_one::<String>("url").expect("required arg");
    let id = parse_repo_url(url)?;

    let entry = coordinator.verify(Some(&id)).await?.remove(0);

    let config = coordinator.config();
    let roots = Roots {
        cache_root: &config.cache_root,
        checkout_root: &config.checkout_root,
    };
    let meta = metadata::load(&store_path(&roots, &id)).await.ok();

    let view = StatusView::new(&entry, meta);

    if matches.get_flag("json") {
        print_json(&view)?;
    } else {
        println!("{view}");
    }
    Ok(())
}

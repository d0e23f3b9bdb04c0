use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use repocache_core::Coordinator;

const PROJECT_CONFIG_PATH: &str = ".repocache/config.toml";

pub async fn run(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    match matches.subcommand() {
        Some(("init", _)) => init(),
        Some(("show", sub_m)) => show(sub_m, coordinator),
        Some(("set", sub_m)) => set(sub_m),
        _ => anyhow::bail!("unknown config command, run 'repocache config --help' for usage"),
    }
}

/// Write a commented default `.repocache/config.toml` in the current
/// directory. Refuses to clobber an existing file.
fn init() -> Result<()> {
    let path = PathBuf::from(PROJECT_CONFIG_PATH);
    if path.exists() {
        anyhow::bail!("{} already exists, not overwriting", path.display());
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, DEFAULT_CONFIG_TEMPLATE)
        .with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

/// Set a single key in the project-local config file, creating it with
/// otherwise-default values if it does not exist yet. Values are parsed as
/// booleans or integers where they look like one, else kept as strings;
/// unknown keys are rejected by the next `Config::load`, not here, since
/// this handler never needs to know the full field set.
fn set(matches: &ArgMatches) -> Result<()> {
    let key = matches.get_one::<String>("key").expect("required arg");
    let value = matches.get_one::<String>("value").expect("required arg");

    let path = PathBuf::from(PROJECT_CONFIG_PATH);
    let raw = if path.exists() {
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?
    } else {
        String::new()
    };
    let mut doc: toml::Value = if raw.trim().is_empty() {
        toml::Value::Table(toml::Table::new())
    } else {
        raw.parse().with_context(|| format!("parsing {}", path.display()))?
    };
    let table = doc
        .as_table_mut()
        .ok_or_else(|| anyhow::anyhow!("{} is not a TOML table", path.display()))?;
    table.insert(key.clone(), parse_value(value));

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let rendered = toml::to_string_pretty(&doc)?;
    std::fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
    println!("set {key} = {value} in {}", path.display());
    Ok(())
}

fn parse_value(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(i) = raw.parse::<i64>() {
        toml::Value::Integer(i)
    } else {
        toml::Value::String(raw.to_string())
    }
}

const DEFAULT_CONFIG_TEMPLATE: &str = r#"# repocache project configuration
# Uncomment and edit any line; unset keys fall back to the built-in default.

# cache_root = ".repocache/stores"
# checkout_root = ".repocache/checkouts"
# default_strategy = "auto"          # full | shallow | treeless | blobless | auto
# verbose = false
# force = false
# recursive_submodules = false
# fork_organization = "my-org"
# auto_sync = false
# sync_interval_hours = 24
# lock_max_wait_secs = 60
# lock_stale_secs = 300
"#;

fn show(matches: &ArgMatches, coordinator: &Coordinator) -> Result<()> {
    let config = coordinator.config();
    if matches.get_flag("json") {
        println!("{}", serde_json::to_string_pretty(config)?);
    } else {
        println!("cache_root:          {}", config.cache_root.display());
        println!("checkout_root:       {}", config.checkout_root.display());
        println!("default_strategy:    {}", config.default_strategy);
        println!("verbose:             {}", config.verbose);
        println!("force:               {}", config.force);
        println!("recursive_submodules:{}", config.recursive_submodules);
        println!(
            "provider_token:      {}",
            if config.provider_token.is_some() { "set" } else { "unset" }
        );
        println!(
            "fork_organization:   {}",
            config.fork_organization.as_deref().unwrap_or("-")
        );
        println!("auto_sync:           {}", config.auto_sync);
        println!("sync_interval_hours: {}", config.sync_interval_hours);
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::ArgMatches;
use clap_complete::{generate, Shell};

pub fn run(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("install", sub_m)) => install(sub_m),
        Some(("uninstall", sub_m)) => uninstall(sub_m),
        Some(("status", sub_m)) => status(sub_m),
        _ => anyhow::bail!("unknown completion command, run 'repocache completion --help' for usage"),
    }
}

fn parse_shell(matches: &ArgMatches) -> Result<Shell> {
    let shell_name = matches.get_one::<String>("shell").expect("required arg");
    shell_name
        .parse()
        .map_err(|_| anyhow::anyhow!("unsupported shell '{shell_name}'"))
}

/// Where a given shell's completion script belongs, following each shell's
/// own convention for a user-local completions directory.
fn completion_path(shell: Shell, bin_name: &str) -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().ok_or_else(|| anyhow::anyhow!("could not determine home directory"))?;
    Ok(match shell {
        Shell::Bash => dirs.data_dir().join("bash-completion").join("completions").join(bin_name),
        Shell::Zsh => dirs.data_dir().join("zsh").join("site-functions").join(format!("_{bin_name}")),
        Shell::Fish => dirs.config_dir().join("fish").join("completions").join(format!("{bin_name}.fish")),
        Shell::Elvish => dirs.config_dir().join("elvish").join("lib").join(format!("{bin_name}.elv")),
        Shell::PowerShell => dirs.config_dir().join("powershell").join(format!("{bin_name}.ps1")),
        _ => anyhow::bail!("unsupported shell"),
    })
}

fn rendered_script(shell: Shell, bin_name: &str) -> String {
    let mut cmd = crate::cli::build_cli();
    let mut buf = Vec::new();
    generate(shell, &mut cmd, bin_name, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Generate a completion script and write it to the shell's conventional
/// completions directory, creating the directory if needed.
fn install(matches: &ArgMatches) -> Result<()> {
    let shell = parse_shell(matches)?;
    let bin_name = crate::cli::build_cli().get_name().to_string();
    let path = completion_path(shell, &bin_name)?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(&path, rendered_script(shell, &bin_name)).with_context(|| format!("writing {}", path.display()))?;
    println!("installed {} completion at {}", shell, path.display());
    Ok(())
}

/// Remove a previously installed completion script, if present.
fn uninstall(matches: &ArgMatches) -> Result<()> {
    let shell = parse_shell(matches)?;
    let bin_name = crate::cli::build_cli().get_name().to_string();
    let path = completion_path(shell, &bin_name)?;

    if !path.exists() {
        println!("no {shell} completion installed at {}", path.display());
        return Ok(());
    }
    std::fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
    println!("removed {shell} completion at {}", path.display());
    Ok(())
}

/// Report whether a completion script is currently installed for `shell`.
fn status(matches: &ArgMatches) -> Result<()> {
    let shell = parse_shell(matches)?;
    let bin_name = crate::cli::build_cli().get_name().to_string();
    let path = completion_path(shell, &bin_name)?;

    if path.exists() {
        println!("installed: {}", path.display());
    } else {
        println!("not installed (would be written to {})", path.display());
    }
    Ok(())
}

//! Clap command tree for the `repocache` binary.

pub mod handlers;

use clap::{Arg, ArgAction, Command};

/// Assemble the full `repocache` command tree.
pub fn build_cli() -> Command {
    Command::new("repocache")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Three-tier bare-store/checkout cache for git repositories")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(cmd_clone())
        .subcommand(cmd_status())
        .subcommand(cmd_list())
        .subcommand(cmd_sync())
        .subcommand(cmd_clean())
        .subcommand(cmd_verify())
        .subcommand(cmd_repair())
        .subcommand(cmd_config())
        .subcommand(cmd_completion())
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Output as JSON")
}

fn url_arg() -> Arg {
    Arg::new("url")
        .required(true)
        .help("Repository URL, in any form git accepts")
}

fn optional_url_arg() -> Arg {
    Arg::new("url")
        .required(false)
        .help("Repository URL; every cached entry if omitted")
}

fn cmd_clone() -> Command {
    Command::new("clone")
        .about("Clone a repository into the cache, creating checkouts as needed")
        .arg(url_arg())
        .arg(
            Arg::new("modifiable")
                .long("modifiable")
                .action(ArgAction::SetTrue)
                .help("Also ensure a fork-backed, writable checkout exists"),
        )
        .arg(json_arg())
        .after_help(
            "EXAMPLES:\n  repocache clone https://github.com/octocat/Hello-World.git\n  repocache clone git@github.com:octocat/Hello-World.git --modifiable\n",
        )
}

fn cmd_status() -> Command {
    Command::new("status")
        .about("Show a detailed view of a single cache entry")
        .arg(url_arg())
        .arg(json_arg())
}

fn cmd_list() -> Command {
    Command::new("list")
        .about("List every cached entry")
        .arg(json_arg())
}

fn cmd_sync() -> Command {
    Command::new("sync")
        .about("Fetch every cached store and repair any stale checkout")
        .arg(json_arg())
}

fn cmd_clean() -> Command {
    Command::new("clean")
        .about("Remove a cache entry: both checkouts, the store, and its metadata")
        .arg(url_arg())
        .arg(
            Arg::new("force")
                .long("force")
                .action(ArgAction::SetTrue)
                .help("Remove checkouts even if they have uncommitted changes"),
        )
        .arg(json_arg())
}

fn cmd_verify() -> Command {
    Command::new("verify")
        .about("Check every store and checkout without changing anything")
        .arg(optional_url_arg())
        .arg(json_arg())
}

fn cmd_repair() -> Command {
    Command::new("repair")
        .about("Repair every unhealthy side of a cache entry")
        .arg(optional_url_arg())
        .arg(json_arg())
}

fn cmd_config() -> Command {
    Command::new("config")
        .about("Inspect or edit the project-local configuration")
        .subcommand_required(true)
        .subcommand(
            Command::new("init")
                .about("Write a default .repocache/config.toml in the current directory"),
        )
        .subcommand(Command::new("show").about("Print the effective configuration").arg(json_arg()))
        .subcommand(
            Command::new("set")
                .about("Set a key in the project-local config file")
                .arg(Arg::new("key").required(true))
                .arg(Arg::new("value").required(true)),
        )
}

fn shell_arg() -> Arg {
    Arg::new("shell")
        .required(true)
        .value_parser(["bash", "zsh", "fish", "elvish", "powershell"])
        .help("Target shell")
}

fn cmd_completion() -> Command {
    Command::new("completion")
        .about("Manage shell completion scripts")
        .subcommand_required(true)
        .subcommand(
            Command::new("install")
                .about("Generate a completion script and write it into the shell's completion directory")
                .arg(shell_arg()),
        )
        .subcommand(
            Command::new("uninstall")
                .about("Remove a previously installed completion script")
                .arg(shell_arg()),
        )
        .subcommand(
            Command::new("status")
                .about("Report whether a completion script is installed")
                .arg(shell_arg()),
        )
        .after_help(
            "EXAMPLES:\n  repocache completion install bash\n  repocache completion status zsh\n  repocache completion uninstall fish\n",
        )
}

//! `repocache`: a CLI shell around [`repocache_core::Coordinator`].
//!
//! Every operation that can be unit-tested without a terminal lives in
//! `repocache-core`; this binary only wires a [`Config`], a [`VcsBackend`]
//! and a [`Provider`] together and dispatches parsed arguments to them.

use std::sync::Arc;

use anyhow::Result;
use repocache::cli;
use repocache_core::provider::{GitHubProvider, NullProvider, Provider};
use repocache_core::vcs::{GitCli, VcsBackend};
use repocache_core::{Config, Coordinator};
use tracing::Level;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir()?;
    let config = Config::load(&cwd)?;

    let vcs: Arc<dyn VcsBackend> = Arc::new(GitCli::discover()?);
    let provider: Arc<dyn Provider> = match config.provider_token.clone() {
        Some(token) => Arc::new(GitHubProvider::new(token)),
        None => Arc::new(NullProvider),
    };
    let coordinator = Coordinator::new(config, vcs, provider);

    let matches = cli::build_cli().get_matches();
    cli::handlers::dispatch(&matches, &coordinator).await
}

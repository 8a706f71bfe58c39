//! Namespace join and exec

use std::convert::Infallible;

use anyhow::{Context, Result};
use proxy_ns_namespace::config::SYSTEM_CONFIG_PATH;
use proxy_ns_namespace::{NamespaceManager, NetnsConfig};
use tracing::debug;

use crate::cli::Cli;

/// Load the configuration, join the namespace, and exec the command
///
/// Returns only if a step failed.
pub fn execute(cli: &Cli) -> Result<Infallible> {
    let config = NetnsConfig::load_or_default(SYSTEM_CONFIG_PATH)
        .with_context(|| format!("Failed to load configuration from {SYSTEM_CONFIG_PATH}"))?;

    let manager = NamespaceManager::new(config);
    let target = manager.resolve(cli.net.as_deref())?;

    debug!(
        namespace = %target.name(),
        command = ?cli.command,
        "Launching"
    );

    let never = manager.launch(&target, &cli.command)?;
    match never {}
}

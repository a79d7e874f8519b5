use std::path::Path;

use anyhow::Result;
use instadm_core::SyncConfig;

/// Resolve the config for this invocation.
///
/// An explicit `--config` path must load. Without one, the default location is
/// used when present, and built-in defaults otherwise.
pub fn load_config(path: Option<&Path>) -> Result<SyncConfig> {
    let config = SyncConfig::load_or_default(path)?;
    if config.rest_url.is_none() {
        tracing::debug!("No restUrl configured, remote commands will fail");
    }
    Ok(config)
}

//! Configuration loading

use anyhow::Result;
use std::path::Path;
use tracing::info;

use crate::Config;

/// Pick the config file to read.
///
/// Search order:
/// 1. explicit path (`--config`)
/// 2. `LIVEHUB_CONFIG_PATH` environment variable
/// 3. ./config.yaml (current working directory)
/// 4. /config/config.yaml (container mount path)
fn resolve_config_path(explicit: Option<&str>) -> Option<String> {
    let exists = |p: &String| Path::new(p).exists();
    explicit
        .map(str::to_string)
        .filter(exists)
        .or_else(|| std::env::var("LIVEHUB_CONFIG_PATH").ok().filter(exists))
        .or_else(|| {
            ["config.yaml", "/config/config.yaml"]
                .into_iter()
                .find(|p| Path::new(p).exists())
                .map(str::to_string)
        })
}

/// Load configuration from a config file or environment variables and validate it
pub fn load_config(explicit: Option<&str>) -> Result<Config> {
    let config = if let Some(path) = resolve_config_path(explicit) {
        eprintln!("Loading config from {path}");
        Config::from_file(&path)
            .map_err(|e| anyhow::anyhow!("Failed to load config from {path}: {e}"))?
    } else {
        eprintln!("No config file found, using environment variables");
        Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?
    };

    // Fail fast on misconfigurations
    if let Err(errors) = config.validate() {
        return Err(anyhow::anyhow!(
            "Configuration validation failed with {} error(s): {}",
            errors.len(),
            errors.join("; ")
        ));
    }

    info!("Configuration loaded and validated successfully");
    Ok(config)
}

//! Generic configuration I/O utilities
//!
//! YAML persistence for [`BridgeConfig`](super::BridgeConfig) and any other
//! serde configuration type.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::ErrorKind;
use std::path::Path;

/// Load a bridge configuration from a YAML file
///
/// A missing file yields the default config. A file that exists but cannot
/// be read or parsed logs a warning and also yields the default, so a bad
/// config never prevents an engine from starting.
///
/// ```ignore
/// let config: BridgeConfig = load_config(Path::new("bridge.yaml"));
/// ```
pub fn load_config<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("No config at {}, starting with built-in defaults", path.display());
            return T::default();
        }
        Err(e) => {
            log::warn!("Cannot read config {}: {}; using defaults", path.display(), e);
            return T::default();
        }
    };

    serde_yaml::from_str(&contents).unwrap_or_else(|e| {
        log::warn!("Ignoring malformed config {}: {}", path.display(), e);
        T::default()
    })
}

/// Write a configuration as YAML, creating missing parent directories
pub fn save_config<T>(config: &T, path: &Path) -> Result<()>
where
    T: Serialize,
{
    let yaml = serde_yaml::to_string(config).context("Serializing config")?;
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Creating config directory {}", dir.display()))?;
    }
    std::fs::write(path, yaml).with_context(|| format!("Writing config {}", path.display()))?;

    log::debug!("Wrote config to {}", path.display());
    Ok(())
}

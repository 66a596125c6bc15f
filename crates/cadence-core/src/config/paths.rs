//! Default locations for cadence configuration files

use std::path::PathBuf;

/// Get the default configuration directory
///
/// Returns: `{config_dir}/cadence` (e.g. `~/.config/cadence` on Linux),
/// falling back to `./cadence` when no config directory is known.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cadence")
}

/// Get the default path for a config file
///
/// # Arguments
/// * `filename` - Config file name (e.g., "bridge.yaml")
pub fn default_config_path(filename: &str) -> PathBuf {
    default_config_dir().join(filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_dir_ends_with_cadence() {
        assert!(default_config_dir().ends_with("cadence"));
    }

    #[test]
    fn test_config_path_includes_filename() {
        let path = default_config_path("bridge.yaml");
        assert!(path.ends_with("cadence/bridge.yaml"));
    }
}

//! Bridge configuration
//!
//! - [`BridgeConfig`]: real-time mode, block size, queue capacity, channels
//! - Generic YAML config loading/saving
//! - Default config file location
//!
//! ```ignore
//! use cadence_core::config::{default_config_path, load_config, BridgeConfig};
//!
//! let config: BridgeConfig = load_config(&default_config_path("bridge.yaml"));
//! ```

mod bridge;
mod io;
mod paths;

pub use bridge::BridgeConfig;
pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path};

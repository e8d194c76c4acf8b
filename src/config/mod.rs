//! Configuration module for volctl
//!
//! Loads and validates the TOML file that names the data directory, the
//! credential lock settings and the driver instances to register.
//!
//! ## Example Usage
//!
//! ```no_run
//! use volctl::config;
//!
//! let config = config::load_config("volctl.toml")?;
//! for (name, kind) in config::enabled_drivers(&config) {
//!     println!("Driver: {}, Kind: {:?}", name, kind);
//! }
//! # Ok::<(), config::ConfigError>(())
//! ```

mod loader;
mod types;

pub use loader::{enabled_drivers, load_config, parse_config, ConfigError, Result};
pub use types::*;

/// Expand tilde (~) in path
pub fn expand_tilde(path: &std::path::Path) -> std::path::PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

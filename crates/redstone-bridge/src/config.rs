//! Bridge configuration
//!
//! Read from an optional TOML file (`REDSTONE_CONFIG`) with individual
//! environment overrides on top. Every field has a default, so an empty file
//! or no file at all is a valid configuration.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{BridgeError, BridgeResult};

/// Environment variable naming a TOML configuration file
pub const CONFIG_ENV: &str = "REDSTONE_CONFIG";
/// Environment override for [`BridgeConfig::service_port`]
pub const SERVICE_PORT_ENV: &str = "REDSTONE_SERVICE_PORT";
/// Environment override for [`BridgeConfig::runtime_library`]
pub const DART_LIBRARY_ENV: &str = "REDSTONE_DART_LIBRARY";
/// Environment override for [`BridgeConfig::entry_point`]
pub const ENTRY_POINT_ENV: &str = "REDSTONE_ENTRY_POINT";

/// Location of the package configuration relative to the package root
const PACKAGE_CONFIG: &str = ".dart_tool/package_config.json";

/// Runtime options for the embedded VM
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    /// Port of the debugging/service endpoint (default: 5858)
    pub service_port: u16,

    /// Start the service isolate alongside the script (default: true)
    pub start_service_isolate: bool,

    /// Top-level function invoked after the script loads (default: "main")
    pub entry_point: String,

    /// Explicit package configuration; resolved from the script path if absent
    pub package_config: Option<PathBuf>,

    /// Explicit path of the embedding library; platform default name if absent
    pub runtime_library: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            service_port: 5858,
            start_service_isolate: true,
            entry_point: "main".to_string(),
            package_config: None,
            runtime_library: None,
        }
    }
}

impl BridgeConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> BridgeResult<Self> {
        toml::from_str(text).map_err(|e| BridgeError::Config(e.to_string()))
    }

    /// Load a configuration file
    pub fn from_file<P: AsRef<Path>>(path: P) -> BridgeResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Build the configuration from the process environment
    pub fn from_env() -> BridgeResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup
    pub(crate) fn from_lookup<F>(lookup: F) -> BridgeResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match lookup(CONFIG_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        if let Some(port) = lookup(SERVICE_PORT_ENV) {
            config.service_port = port.trim().parse().map_err(|_| {
                BridgeError::Config(format!("{SERVICE_PORT_ENV} is not a port: {port:?}"))
            })?;
        }
        if let Some(library) = lookup(DART_LIBRARY_ENV) {
            config.runtime_library = Some(PathBuf::from(library));
        }
        if let Some(entry) = lookup(ENTRY_POINT_ENV) {
            if entry.is_empty() {
                return Err(BridgeError::Config(format!("{ENTRY_POINT_ENV} is empty")));
            }
            config.entry_point = entry;
        }

        Ok(config)
    }

    /// Package configuration to use for `script`
    pub fn package_config_for(&self, script: &Path) -> PathBuf {
        self.package_config
            .clone()
            .unwrap_or_else(|| resolve_package_config(script))
    }
}

/// Locate `.dart_tool/package_config.json` for a script.
///
/// Prefers the nearest ancestor `lib` directory whose parent holds a
/// `pubspec.yaml`. Otherwise a script directly inside `lib/` resolves to the
/// parent of `lib`, and any other script to its own directory.
pub fn resolve_package_config(script: &Path) -> PathBuf {
    let Some(script_dir) = script.parent() else {
        return PathBuf::from(PACKAGE_CONFIG);
    };

    for dir in script_dir.ancestors() {
        if dir.file_name().is_some_and(|name| name == "lib") {
            if let Some(root) = dir.parent() {
                if root.join("pubspec.yaml").is_file() {
                    return root.join(PACKAGE_CONFIG);
                }
            }
        }
    }

    let root = if script_dir.file_name().is_some_and(|name| name == "lib") {
        script_dir.parent().unwrap_or(script_dir)
    } else {
        script_dir
    };
    root.join(PACKAGE_CONFIG)
}

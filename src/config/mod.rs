//! Configuration for the compositor client
//!
//! Settings come from an optional TOML file and from the process
//! environment. The environment is consulted every time a display brings up
//! its windowing context:
//!
//! - `ESSOS_USE_WAYLAND` overrides `backend.use_wayland`
//! - `XDG_RUNTIME_DIR` is used when `backend.runtime_dir` is not set

use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Environment variable selecting the backend mode (textual integer)
pub const USE_WAYLAND_ENV: &str = "ESSOS_USE_WAYLAND";

/// Platform runtime directory variable
pub const RUNTIME_DIR_ENV: &str = "XDG_RUNTIME_DIR";

/// Display name the windowing backend owns itself
pub const DEFAULT_RESERVED_DISPLAY: &str = "wayland-0";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ClientConfig {
    /// Windowing backend settings
    #[serde(default)]
    pub backend: BackendConfig,

    /// Display naming
    #[serde(default)]
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Run the backend in wayland mode
    pub use_wayland: bool,

    /// Runtime directory; falls back to `XDG_RUNTIME_DIR`
    pub runtime_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// Displays with this name are tracked but never get a context of their
    /// own
    pub reserved_name: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            use_wayland: true,
            runtime_dir: None,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            reserved_name: DEFAULT_RESERVED_DISPLAY.to_string(),
        }
    }
}

impl BackendConfig {
    /// Backend mode, with `ESSOS_USE_WAYLAND` taking precedence
    pub fn resolve_use_wayland(&self) -> bool {
        match std::env::var(USE_WAYLAND_ENV) {
            Ok(value) => {
                let enabled = parse_env_flag(&value);
                debug!("{}={:?} -> wayland={}", USE_WAYLAND_ENV, value, enabled);
                enabled
            }
            Err(_) => self.use_wayland,
        }
    }

    /// Configured runtime directory, else `XDG_RUNTIME_DIR`
    pub fn resolve_runtime_dir(&self) -> Option<PathBuf> {
        self.runtime_dir.clone().or_else(|| {
            std::env::var_os(RUNTIME_DIR_ENV)
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from)
        })
    }
}

/// Parse a textual integer flag the way C `atoi` does: optional leading
/// whitespace, an optional sign, then as many digits as follow. No digits
/// means 0. Non-zero is `true`.
pub fn parse_env_flag(value: &str) -> bool {
    let trimmed = value.trim_start();
    let unsigned = trimmed
        .strip_prefix('-')
        .or_else(|| trimmed.strip_prefix('+'))
        .unwrap_or(trimmed);

    unsigned
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .any(|c| c != '0')
}

impl ClientConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        // Expand ~ to home directory
        let expanded_path = if path.to_string_lossy().starts_with('~') {
            let home = std::env::var("HOME").context("Failed to get HOME environment variable")?;
            let rest = path.strip_prefix("~").unwrap_or(path);
            Path::new(&home).join(rest)
        } else {
            path.to_path_buf()
        };

        let contents = fs::read_to_string(&expanded_path)
            .with_context(|| format!("Failed to read config file: {}", expanded_path.display()))?;

        let config: ClientConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", expanded_path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.display.reserved_name.is_empty() {
            anyhow::bail!("Invalid reserved_name: must not be empty");
        }

        if let Some(dir) = &self.backend.runtime_dir {
            if !dir.is_absolute() {
                anyhow::bail!(
                    "Invalid runtime_dir: {} is not an absolute path",
                    dir.display()
                );
            }
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        fs::write(path, contents).context("Failed to write configuration file")?;

        Ok(())
    }
}

#[cfg(test)]
mod tests;

//! Configuration management

mod schema;

pub use schema::{Config, Format};

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the default config file
pub const CONFIG_ENV: &str = "SWEEPER_CONFIG_FILE";

/// Config file used when neither a path nor the environment names one
pub const DEFAULT_CONFIG_FILE: &str = "conf.yaml";

impl Config {
    /// Load configuration from a file or the default location
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = path.map(PathBuf::from).unwrap_or_else(Self::default_path);

        let content = std::fs::read(&config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let format = Format::from_path(&config_path);
        Self::from_slice(&content, format).with_context(|| {
            format!(
                "Failed to parse {} config from {}",
                format.name(),
                config_path.display()
            )
        })
    }

    /// Parse configuration from raw bytes.
    ///
    /// Captures the run's `now`, validates time formats and expands `~` and
    /// environment variables in rule paths.
    pub fn from_slice(content: &[u8], format: Format) -> Result<Self> {
        let mut config: Config = match format {
            Format::Yaml => serde_yaml::from_slice(content)?,
            Format::Toml => toml::from_str(std::str::from_utf8(content)?)?,
            Format::Json => serde_json::from_slice(content)?,
        };

        config.vars.validate()?;
        for rule in &mut config.rules {
            rule.path = crate::expand_path(&rule.path);
        }

        Ok(config)
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Write raw configuration bytes to a file (with advisory file locking)
    pub fn write_raw(path: &Path, content: &[u8]) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        // Use a lockfile to prevent concurrent writes
        let mut lock_path = path.as_os_str().to_owned();
        lock_path.push(".lock");
        let lock_path = PathBuf::from(lock_path);
        let lock_file = std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to create lock file: {}", lock_path.display()))?;

        use fs2::FileExt;
        lock_file
            .lock_exclusive()
            .with_context(|| "Failed to acquire config file lock")?;

        let result = std::fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()));

        let _ = lock_file.unlock();

        result
    }
}

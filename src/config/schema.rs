//! Configuration schema

use crate::rules::Rule;
use crate::vars::Vars;
use serde::Deserialize;
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Template settings shared by every rule
    #[serde(default)]
    pub vars: Vars,

    /// Rules, each scanned independently
    #[serde(default)]
    pub rules: Vec<Rule>,
}

/// Serialization format of a configuration file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Yaml,
    Toml,
    Json,
}

impl Format {
    /// Detect the format from a file extension, defaulting to YAML
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "toml" => Format::Toml,
            "json" => Format::Json,
            _ => Format::Yaml,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Format::Yaml => "YAML",
            Format::Toml => "TOML",
            Format::Json => "JSON",
        }
    }
}

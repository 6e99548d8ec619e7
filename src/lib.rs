//! Sweeper - rule-driven file maintenance
//!
//! Each rule binds a root directory to a combination of filters and an
//! ordered list of actions. A run walks every rule's tree concurrently and
//! applies the actions to each matching file.

pub mod config;
pub mod error;
pub mod http;
pub mod rules;
pub mod runner;
pub mod vars;

pub use config::Config;
pub use error::{Error, Result};
pub use rules::{Action, Filter, Operator, Rule};
pub use runner::{ExecuteOptions, RunReport, Sweeper, execute};
pub use vars::{Template, Vars};

/// Current version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Expand ~ and environment variables ($VAR, ${VAR}) in a path
pub fn expand_path(path: &std::path::Path) -> std::path::PathBuf {
    let path_str = path.to_string_lossy();

    // First expand ~ prefix
    let expanded = match (path_str.strip_prefix("~/"), dirs::home_dir()) {
        (Some(stripped), Some(home)) => home.join(stripped).to_string_lossy().to_string(),
        (None, Some(home)) if path_str == "~" => home.to_string_lossy().to_string(),
        _ => path_str.to_string(),
    };

    // Then expand $VAR and ${VAR} patterns; unset variables are left as written
    use std::sync::LazyLock;
    static ENV_RE: LazyLock<regex::Regex> = LazyLock::new(|| {
        regex::Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("invalid env regex")
    });

    let result = ENV_RE.replace_all(&expanded, |caps: &regex::Captures| {
        let var_name = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .unwrap_or("");
        std::env::var(var_name).unwrap_or_else(|_| caps[0].to_string())
    });

    std::path::PathBuf::from(result.as_ref())
}

//! Rule actions - what to do with matched files

use filetime::FileTime;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Error, Result};
use crate::vars::{Template, Vars};

/// Action kinds accepted in configuration files
pub const ACTIONS: [&str; 5] = ["echo", "touch", "move", "rename", "delete"];

/// Action to perform on a matched file
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "ActionSpec")]
pub enum Action {
    /// Log the rendered payload
    Echo(Template),

    /// Set access and modification time to the current wall-clock time
    Touch,

    /// Move the file to the rendered destination path
    Move(Template),

    /// Rename the file within its directory to the rendered name
    Rename(Template),

    /// Remove the file
    Delete,
}

/// Raw `{ action, payload }` pair as written in configuration
#[derive(Debug, Deserialize)]
struct ActionSpec {
    action: String,
    #[serde(default)]
    payload: String,
}

impl TryFrom<ActionSpec> for Action {
    type Error = Error;

    fn try_from(spec: ActionSpec) -> Result<Self> {
        Action::parse(&spec.action, &spec.payload)
    }
}

impl Action {
    /// Build an action from its kind and payload
    pub fn parse(kind: &str, payload: &str) -> Result<Self> {
        let action = match kind {
            "echo" => Self::Echo(Template::parse(payload)?),
            "touch" => Self::Touch,
            "move" => Self::Move(Template::parse(payload)?),
            "rename" => Self::Rename(Template::parse(payload)?),
            "delete" => Self::Delete,
            other => return Err(Error::UnknownAction(other.to_string())),
        };
        Ok(action)
    }

    /// Configuration name of this action
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Echo(_) => "echo",
            Self::Touch => "touch",
            Self::Move(_) => "move",
            Self::Rename(_) => "rename",
            Self::Delete => "delete",
        }
    }

    /// Execute this action on a file.
    ///
    /// With `dry_run` set, filesystem effects are only logged. `echo` logs in
    /// either mode since it never mutates anything.
    pub fn execute(&self, path: &Path, vars: &Vars, dry_run: bool) -> Result<()> {
        let prefix = if dry_run { "[dry-run] " } else { "" };

        match self {
            Action::Echo(template) => {
                let message = template.render(path, vars)?;
                info!("[{}] {}", path.display(), message);
            }

            Action::Touch => {
                info!("{}Touching {}", prefix, path.display());
                if !dry_run {
                    let now = FileTime::now();
                    filetime::set_file_times(path, now, now).map_err(Error::io("touch", path))?;
                }
            }

            Action::Move(template) => {
                let dest = PathBuf::from(template.render(path, vars)?);
                info!("{}Moving {} -> {}", prefix, path.display(), dest.display());
                if !dry_run {
                    transfer("move", path, &dest)?;
                }
            }

            Action::Rename(template) => {
                let new_name = template.render(path, vars)?;
                let dest = path.parent().unwrap_or(Path::new(".")).join(&new_name);
                info!("{}Renaming {} -> {}", prefix, path.display(), dest.display());
                if !dry_run {
                    transfer("rename", path, &dest)?;
                }
            }

            Action::Delete => {
                info!("{}Deleting {}", prefix, path.display());
                if !dry_run {
                    std::fs::remove_file(path).map_err(Error::io("remove", path))?;
                }
            }
        }

        Ok(())
    }
}

fn transfer(op: &'static str, from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).map_err(|source| Error::Transfer {
        op,
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    })
}

//! Units of work scheduled by the runner

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::trace;

use crate::error::{Error, Result};
use crate::rules::Rule;
use crate::vars::Vars;

/// State shared read-only by every task in a run, plus the cancellation flag
pub(crate) struct Shared {
    pub vars: Vars,
    pub dry_run: bool,
    cancelled: AtomicBool,
}

impl Shared {
    pub fn new(vars: Vars, dry_run: bool) -> Self {
        Self {
            vars,
            dry_run,
            cancelled: AtomicBool::new(false),
        }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A directory listing or a single file evaluation
pub(crate) enum Work {
    Scan { rule: Arc<Rule>, dir: PathBuf },
    Evaluate { rule: Arc<Rule>, file: PathBuf },
}

/// What a finished task reports back
pub(crate) enum Outcome {
    /// Entries discovered in a directory
    Scanned(Vec<Work>),
    /// A file was checked against its rule
    Evaluated { matched: bool, actions: usize },
    /// The run was cancelled before the task did anything
    Skipped,
}

impl Work {
    /// Root scan for a rule
    pub fn root(rule: Rule) -> Self {
        let dir = rule.path.clone();
        Work::Scan {
            rule: Arc::new(rule),
            dir,
        }
    }

    /// Run this unit on the current (blocking) thread
    pub fn run(self, shared: &Shared) -> Result<Outcome> {
        if shared.is_cancelled() {
            return Ok(Outcome::Skipped);
        }

        match self {
            Work::Scan { rule, dir } => scan(rule, dir).map(Outcome::Scanned),
            Work::Evaluate { rule, file } => {
                if !rule.matches(&file)? {
                    return Ok(Outcome::Evaluated {
                        matched: false,
                        actions: 0,
                    });
                }
                let actions =
                    rule.apply(&file, &shared.vars, shared.dry_run, || shared.is_cancelled())?;
                Ok(Outcome::Evaluated {
                    matched: true,
                    actions,
                })
            }
        }
    }
}

// List the immediate entries of `dir`. Subdirectories are only followed for
// recursive rules; symlinks are treated as files.
fn scan(rule: Arc<Rule>, dir: PathBuf) -> Result<Vec<Work>> {
    trace!("Scanning {}", dir.display());
    let mut work = Vec::new();

    for entry in std::fs::read_dir(&dir).map_err(Error::io("list directory", &dir))? {
        let entry = entry.map_err(Error::io("list directory", &dir))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(Error::io("stat", &path))?;

        if file_type.is_dir() {
            if rule.recursive {
                work.push(Work::Scan {
                    rule: Arc::clone(&rule),
                    dir: path,
                });
            }
        } else {
            work.push(Work::Evaluate {
                rule: Arc::clone(&rule),
                file: path,
            });
        }
    }

    Ok(work)
}

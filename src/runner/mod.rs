//! Rule runner - walks every rule's tree and applies it to each file
//!
//! Directory listings and file evaluations are independent units of work
//! drained from a queue into a bounded `JoinSet`. The run completes once the
//! queue is empty and every spawned task, including those discovered by other
//! tasks, has finished. The first failure cancels everything still pending.

mod task;

use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use task::{Outcome, Shared, Work};

/// Default number of tasks allowed in flight at once
pub const DEFAULT_CONCURRENCY: usize = 64;

/// Knobs for a single run
#[derive(Debug, Clone, Copy)]
pub struct ExecuteOptions {
    /// Maximum tasks in flight (values below 1 are treated as 1)
    pub concurrency: usize,

    /// Log actions instead of applying them
    pub dry_run: bool,
}

impl Default for ExecuteOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            dry_run: false,
        }
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub rules: usize,
    pub directories: u64,
    pub files_scanned: u64,
    pub files_matched: u64,
    pub actions: u64,
    pub elapsed_ms: u64,
}

/// Runs every rule of a configuration
pub struct Sweeper {
    config: Config,
    options: ExecuteOptions,
}

impl Sweeper {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            options: ExecuteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    /// Process every rule and wait for all work to finish.
    ///
    /// Returns the first error encountered. Mutations already applied by other
    /// tasks are not rolled back.
    pub async fn run(self) -> Result<RunReport> {
        let start = Instant::now();
        let limit = self.options.concurrency.max(1);
        let shared = Arc::new(Shared::new(self.config.vars, self.options.dry_run));

        let mut report = RunReport {
            rules: self.config.rules.len(),
            ..Default::default()
        };
        let mut pending: VecDeque<Work> =
            self.config.rules.into_iter().map(Work::root).collect();
        let mut tasks = JoinSet::new();
        let mut failure: Option<Error> = None;

        info!(
            "Running {} rules (concurrency: {}, dry run: {})",
            report.rules, limit, shared.dry_run
        );

        loop {
            while tasks.len() < limit {
                let Some(work) = pending.pop_front() else {
                    break;
                };
                let shared = Arc::clone(&shared);
                tasks.spawn_blocking(move || work.run(&shared));
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };

            match joined.map_err(Error::from).and_then(|outcome| outcome) {
                Ok(Outcome::Scanned(children)) => {
                    report.directories += 1;
                    if failure.is_none() {
                        pending.extend(children);
                    }
                }
                Ok(Outcome::Evaluated { matched, actions }) => {
                    report.files_scanned += 1;
                    if matched {
                        report.files_matched += 1;
                    }
                    report.actions += actions as u64;
                }
                Ok(Outcome::Skipped) => {}
                // Tasks aborted after the first failure
                Err(Error::Join(e)) if e.is_cancelled() && failure.is_some() => {}
                Err(e) => {
                    if failure.is_none() {
                        error!("{}", e);
                        shared.cancel();
                        pending.clear();
                        tasks.abort_all();
                        failure = Some(e);
                    }
                }
            }
        }

        report.elapsed_ms = start.elapsed().as_millis() as u64;

        match failure {
            Some(e) => Err(e),
            None => {
                info!(
                    "Processed {} files in {} directories: {} matched, {} actions ({} ms)",
                    report.files_scanned,
                    report.directories,
                    report.files_matched,
                    report.actions,
                    report.elapsed_ms
                );
                Ok(report)
            }
        }
    }
}

/// Run every rule of `config` with the given options
pub async fn execute(config: Config, options: ExecuteOptions) -> Result<RunReport> {
    Sweeper::new(config).with_options(options).run().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Action, Filter, Rule};
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    fn config(rules: Vec<Rule>) -> Config {
        Config {
            rules,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_counts_and_matches() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.txt").write_str("a").unwrap();
        temp.child("b.md").write_str("b").unwrap();
        temp.child("sub/c.txt").write_str("c").unwrap();

        let rule = Rule::new(temp.path())
            .recursive(true)
            .filter(Filter::parse("ext", ".txt").unwrap())
            .action(Action::parse("echo", "{{.FileName}}").unwrap());

        let report = execute(config(vec![rule]), ExecuteOptions::default())
            .await
            .unwrap();

        assert_eq!(report.rules, 1);
        assert_eq!(report.directories, 2);
        assert_eq!(report.files_scanned, 3);
        assert_eq!(report.files_matched, 2);
        assert_eq!(report.actions, 2);
    }

    #[tokio::test]
    async fn test_single_slot_still_completes() {
        let temp = assert_fs::TempDir::new().unwrap();
        for i in 0..10 {
            temp.child(format!("d{i}/f.tmp")).touch().unwrap();
        }

        let rule = Rule::new(temp.path())
            .recursive(true)
            .action(Action::parse("delete", "").unwrap());
        let options = ExecuteOptions {
            concurrency: 0,
            dry_run: false,
        };

        let report = execute(config(vec![rule]), options).await.unwrap();
        assert_eq!(report.files_matched, 10);
        for i in 0..10 {
            temp.child(format!("d{i}/f.tmp"))
                .assert(predicate::path::missing());
        }
    }

    #[tokio::test]
    async fn test_dry_run_counts_without_mutating() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("old.log").touch().unwrap();

        let rule = Rule::new(temp.path()).action(Action::parse("delete", "").unwrap());
        let options = ExecuteOptions {
            dry_run: true,
            ..Default::default()
        };

        let report = execute(config(vec![rule]), options).await.unwrap();
        assert_eq!(report.actions, 1);
        temp.child("old.log").assert(predicate::path::exists());
    }

    #[tokio::test]
    async fn test_missing_root_fails_run() {
        let temp = assert_fs::TempDir::new().unwrap();
        let rule = Rule::new(temp.path().join("missing"));

        let err = execute(config(vec![rule]), ExecuteOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { op: "list directory", .. }));
    }

    fn one_slot() -> ExecuteOptions {
        ExecuteOptions {
            concurrency: 1,
            dry_run: false,
        }
    }

    #[tokio::test]
    async fn test_failed_root_cancels_later_rules() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("keep/a.tmp").touch().unwrap();

        let rules = vec![
            Rule::new(temp.path().join("missing")),
            Rule::new(temp.child("keep").path()).action(Action::parse("delete", "").unwrap()),
        ];

        let err = execute(config(rules), one_slot()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Io { op: "list directory", ref path, .. } if path.ends_with("missing")
        ));
        temp.child("keep/a.tmp").assert(predicate::path::exists());
    }

    #[tokio::test]
    async fn test_failed_action_cancels_pending_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("inbox/a.log").touch().unwrap();
        temp.child("keep/b.tmp").touch().unwrap();

        let rules = vec![
            Rule::new(temp.child("inbox").path())
                .action(Action::parse("move", "/no/such/dir/a.log").unwrap()),
            Rule::new(temp.child("keep").path()).action(Action::parse("delete", "").unwrap()),
        ];

        let err = execute(config(rules), one_slot()).await.unwrap_err();
        assert!(matches!(err, Error::Transfer { op: "move", .. }));
        temp.child("inbox/a.log").assert(predicate::path::exists());
        temp.child("keep/b.tmp").assert(predicate::path::exists());
    }
}

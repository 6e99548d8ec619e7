//! Rule evaluation - combine filter results and drive actions

use std::path::Path;
use tracing::{debug, trace};

use super::{Operator, Rule};
use crate::error::Result;
use crate::vars::Vars;

impl Operator {
    /// Reduce `check` over `items` in order.
    ///
    /// `And` evaluates every item and is true for an empty list. `Or` stops at
    /// the first true result and is false for an empty list.
    pub fn evaluate<T>(
        self,
        items: &[T],
        mut check: impl FnMut(&T) -> Result<bool>,
    ) -> Result<bool> {
        match self {
            Operator::And => {
                let mut all = true;
                for item in items {
                    if !check(item)? {
                        all = false;
                    }
                }
                Ok(all)
            }
            Operator::Or => {
                for item in items {
                    if check(item)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

impl Rule {
    /// Check whether a file matches this rule's filters
    pub fn matches(&self, path: &Path) -> Result<bool> {
        let matched = self.operator.evaluate(&self.filters, |filter| {
            let result = filter.matches(path)?;
            trace!("{} filter on {}: {}", filter.kind(), path.display(), result);
            Ok(result)
        })?;

        if matched {
            debug!("Rule '{}' matched: {}", self.label(), path.display());
        }
        Ok(matched)
    }

    /// Run every action on a matched file, in order.
    ///
    /// Each action receives the original path, even after an earlier action
    /// moved or renamed the file. Returns the number of actions executed;
    /// `stop` is polled before each one.
    pub fn apply(
        &self,
        path: &Path,
        vars: &Vars,
        dry_run: bool,
        stop: impl Fn() -> bool,
    ) -> Result<usize> {
        let mut executed = 0;
        for action in &self.actions {
            if stop() {
                debug!("Stopping actions for {}", path.display());
                break;
            }
            trace!("Running {} on {}", action.kind(), path.display());
            action.execute(path, vars, dry_run)?;
            executed += 1;
        }
        Ok(executed)
    }
}

//! Rules - a root directory bound to filters and actions

mod action;
mod engine;
mod filter;

pub use action::{ACTIONS, Action};
pub use filter::{Comparison, FILTERS, Filter};

use serde::Deserialize;
use std::path::PathBuf;

/// How a rule combines its filter results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum Operator {
    /// Every filter must match
    #[default]
    #[serde(rename = "AND", alias = "and")]
    And,

    /// At least one filter must match
    #[serde(rename = "OR", alias = "or")]
    Or,
}

/// A rule that matches files under a directory and performs actions on them
#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    /// Optional label used in logs
    #[serde(default)]
    pub name: Option<String>,

    /// Root directory to scan
    pub path: PathBuf,

    /// Descend into subdirectories
    #[serde(default)]
    pub recursive: bool,

    /// Filter combination
    #[serde(default, rename = "op", alias = "operator")]
    pub operator: Operator,

    /// Filters, evaluated in order
    #[serde(default)]
    pub filters: Vec<Filter>,

    /// Actions, executed in order on every match
    #[serde(default)]
    pub actions: Vec<Action>,
}

impl Rule {
    /// Create a non-recursive AND rule with no filters or actions
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: None,
            path: path.into(),
            recursive: false,
            operator: Operator::And,
            filters: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Name for log messages, falling back to the root path
    pub fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

//! Templated payloads - `{{ .Variable | fn }}` blocks resolved per file

mod pipeline;

pub use pipeline::PipelineFn;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local};
use regex::Regex;
use serde::Deserialize;
use std::fmt::Write;
use std::path::{MAIN_SEPARATOR, Path};
use std::sync::LazyLock;

use crate::error::{Error, Result};

static BLOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("invalid block regex"));

/// Run-scoped values available to templates.
///
/// `now` is captured once when the configuration is built and never changes,
/// so every `.Time`/`.Date`/`.DateTime`/`.Ts` in a run resolves to the same instant.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vars {
    /// strftime format for `.Time`
    #[serde(default = "default_time_format")]
    pub time_format: String,

    /// strftime format for `.Date`
    #[serde(default = "default_date_format")]
    pub date_format: String,

    /// strftime format for `.DateTime`
    #[serde(default = "default_date_time_format")]
    pub date_time_format: String,

    #[serde(skip, default = "Local::now")]
    now: DateTime<Local>,
}

fn default_time_format() -> String {
    "%H-%M-%S".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_date_time_format() -> String {
    "%Y-%m-%d[%H-%M-%S]".to_string()
}

impl Default for Vars {
    fn default() -> Self {
        Self {
            time_format: default_time_format(),
            date_format: default_date_format(),
            date_time_format: default_date_time_format(),
            now: Local::now(),
        }
    }
}

impl Vars {
    /// Replace the captured instant
    pub fn with_now(mut self, now: DateTime<Local>) -> Self {
        self.now = now;
        self
    }

    /// The instant captured for this run
    pub fn now(&self) -> DateTime<Local> {
        self.now
    }

    /// Reject format strings chrono cannot render
    pub fn validate(&self) -> Result<()> {
        for format in [&self.time_format, &self.date_format, &self.date_time_format] {
            if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
                return Err(Error::InvalidTimeFormat(format.clone()));
            }
        }
        Ok(())
    }

    // chrono signals an unrenderable specifier with fmt::Error
    fn format_now(&self, format: &str) -> Result<String> {
        let mut out = String::new();
        write!(out, "{}", self.now.format(format))
            .map_err(|_| Error::InvalidTimeFormat(format.to_string()))?;
        Ok(out)
    }

    /// Resolve every block of `template` against `path`
    pub fn process(&self, template: &str, path: &Path) -> Result<String> {
        Template::parse(template)?.render(path, self)
    }
}

/// A variable that can appear at the head of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    FileSize,
    FileName,
    FilePath,
    FileExt,
    Time,
    Date,
    DateTime,
    Ts,
}

impl Variable {
    pub fn parse(name: &str) -> Result<Self> {
        let variable = match name {
            ".FileSize" => Self::FileSize,
            ".FileName" => Self::FileName,
            ".FilePath" => Self::FilePath,
            ".FileExt" => Self::FileExt,
            ".Time" => Self::Time,
            ".Date" => Self::Date,
            ".DateTime" => Self::DateTime,
            ".Ts" => Self::Ts,
            other => return Err(Error::UnknownVariable(other.to_string())),
        };
        Ok(variable)
    }

    /// Resolve the variable for one file
    pub fn resolve(self, path: &Path, vars: &Vars) -> Result<String> {
        let path_str = path.to_string_lossy();
        let value = match self {
            Self::FileSize => {
                let metadata = std::fs::metadata(path).map_err(Error::io("stat", path))?;
                metadata.len().to_string()
            }
            Self::FileName => last_segment(&path_str, MAIN_SEPARATOR).to_string(),
            Self::FilePath => path_str.into_owned(),
            Self::FileExt => last_segment(&path_str, '.').to_string(),
            Self::Time => vars.format_now(&vars.time_format)?,
            Self::Date => vars.format_now(&vars.date_format)?,
            Self::DateTime => vars.format_now(&vars.date_time_format)?,
            Self::Ts => vars.now.timestamp().to_string(),
        };
        Ok(value)
    }
}

// Text after the final separator, or the whole string if there is none
fn last_segment(s: &str, separator: char) -> &str {
    s.rsplit(separator).next().unwrap_or(s)
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Block {
        variable: Variable,
        chain: Vec<PipelineFn>,
    },
}

/// A payload string with its variable blocks compiled
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    segments: Vec<Segment>,
}

impl Template {
    /// Compile a payload, failing on unknown variables or malformed functions
    pub fn parse(source: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in BLOCK_RE.captures_iter(source) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Literal(source[last..whole.start()].to_string()));
            }
            last = whole.end();

            let mut tokens = inner.as_str().split('|').map(str::trim);
            let variable = Variable::parse(tokens.next().unwrap_or_default())?;
            let chain = tokens.map(PipelineFn::parse).collect::<Result<Vec<_>>>()?;
            segments.push(Segment::Block { variable, chain });
        }

        if last < source.len() {
            segments.push(Segment::Literal(source[last..].to_string()));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// The payload as written in the configuration
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Render the template for one file
    pub fn render(&self, path: &Path, vars: &Vars) -> Result<String> {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Block { variable, chain } => {
                    let value = variable.resolve(path, vars)?;
                    out.push_str(&pipeline::apply_all(value, chain));
                }
            }
        }
        Ok(out)
    }
}

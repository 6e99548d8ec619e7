//! Text transforms chained after a template variable

use crate::error::{Error, Result};

/// A single stage of a `{{ .Var | fn | fn }}` pipeline
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineFn {
    /// Strip leading and trailing whitespace
    Trim,
    /// Uppercase
    Upper,
    /// Lowercase
    Lower,
    /// Wrap in double quotes
    Quote,
    /// Replace with the character count of the value
    Len,
    /// Keep only the first N characters
    Head(usize),
    /// Unrecognized function, passes the value through
    Passthrough(String),
}

impl PipelineFn {
    /// Parse a trimmed pipeline token.
    ///
    /// Named functions match case-insensitively. `head <N>` must be spelled
    /// in lowercase and carry exactly one integer argument, separated by any
    /// run of whitespace.
    pub fn parse(token: &str) -> Result<Self> {
        let func = match token.to_lowercase().as_str() {
            "trim" => Self::Trim,
            "upper" => Self::Upper,
            "lower" => Self::Lower,
            "quote" => Self::Quote,
            "len" => Self::Len,
            _ if token.starts_with("head") => {
                let parts: Vec<&str> = token.split_whitespace().collect();
                let [_, count] = parts.as_slice() else {
                    return Err(Error::InvalidFunction(token.to_string()));
                };
                let count = count
                    .parse()
                    .map_err(|_| Error::InvalidFunction(token.to_string()))?;
                Self::Head(count)
            }
            _ => Self::Passthrough(token.to_string()),
        };
        Ok(func)
    }

    /// Apply this stage to a value
    pub fn apply(&self, value: String) -> String {
        match self {
            Self::Trim => value.trim().to_string(),
            Self::Upper => value.to_uppercase(),
            Self::Lower => value.to_lowercase(),
            Self::Quote => format!("\"{}\"", value),
            Self::Len => value.chars().count().to_string(),
            Self::Head(count) => value.chars().take(*count).collect(),
            Self::Passthrough(_) => value,
        }
    }
}

/// Run a value through every stage, left to right
pub fn apply_all(value: String, chain: &[PipelineFn]) -> String {
    chain.iter().fold(value, |acc, func| func.apply(acc))
}

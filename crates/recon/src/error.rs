use std::fmt;

use crate::model::SourceId;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (no rules, zero weight sum, etc.).
    ConfigValidation(String),
    /// A single rule failed validation. `field` names the offending field.
    InvalidRule {
        index: usize,
        field: &'static str,
        message: String,
    },
    /// A rule references a column missing from one source's headers.
    UnknownColumn {
        side: SourceId,
        rule: usize,
        column: String,
    },
    /// IO error (file read, CSV decode, etc.).
    Io(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::InvalidRule { index, field, message } => {
                write!(f, "rule {index}: invalid '{field}': {message}")
            }
            Self::UnknownColumn { side, rule, column } => {
                write!(f, "rule {rule}: column '{column}' not found in source {side}")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for ReconError {}

//! Pipeline error types.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::host::Diagnostic;

/// A failure reported by a [`SourceCompiler`](crate::SourceCompiler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct CompileError {
    /// Human readable message.
    pub message: String,
    /// 1-based line in the authored source.
    pub line: Option<u32>,
    /// 1-based column in the authored source.
    pub column: Option<u32>,
}

impl CompileError {
    /// Creates a compile error without a position.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Creates a compile error at the given position.
    pub fn at(message: impl Into<String>, line: u32, column: u32) -> Self {
        Self {
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }
}

/// A failure reported by a [`PrefixProcessor`](crate::PrefixProcessor).
///
/// The prefixer works on generated CSS, so there is no authored position.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct PrefixError {
    /// Human readable message.
    pub message: String,
}

impl PrefixError {
    /// Creates a prefix error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// The two external stages of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Compile,
    Prefix,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Compile => f.write_str("compile"),
            Stage::Prefix => f.write_str("prefix"),
        }
    }
}

/// Errors that can end a single file's transform.
#[derive(Debug, Error)]
pub enum TransformError {
    /// The source failed to compile.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The compiled CSS failed to prefix.
    #[error(transparent)]
    Prefix(#[from] PrefixError),

    /// A stage did not finish in time.
    #[error("The {stage} stage timed out after {}ms", .after.as_millis())]
    Timeout { stage: Stage, after: Duration },

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl TransformError {
    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns the authored source line, when known.
    pub fn line(&self) -> Option<u32> {
        match self {
            TransformError::Compile(e) => e.line,
            _ => None,
        }
    }

    /// Returns the authored source column, when known.
    pub fn column(&self) -> Option<u32> {
        match self {
            TransformError::Compile(e) => e.column,
            _ => None,
        }
    }

    /// Converts this error into a diagnostic for the host.
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic {
            message: self.to_string(),
            line: self.line(),
            column: self.column(),
        }
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config: {0}")]
    Read(#[from] std::io::Error),

    /// The configuration file is not valid JSON(C).
    #[error("Failed to parse config: {0}")]
    Parse(String),

    /// The configuration has an unexpected shape.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    /// Creates an invalid configuration error.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

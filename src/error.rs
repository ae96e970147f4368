//! Error handling for pyseed.
//! Errors are split by when they can happen: configuration errors are raised before
//! anything touches the filesystem, IO and external errors happen mid-run.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Bad or contradictory input. Always raised before the first side effect.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown project type '{0}' (expected one of: library, api, cli, data, tui)")]
    InvalidProjectType(String),

    #[error("unsupported Python version '{value}' (supported: {supported})")]
    UnsupportedRuntimeVersion { value: String, supported: String },

    #[error(
        "unknown license '{0}' (expected one of: MIT, Apache-2.0, GPL-3.0, BSD-3-Clause, Unlicense, None)"
    )]
    InvalidLicense(String),

    #[error("invalid boolean value '{value}' for {key}")]
    InvalidFlagValue { key: String, value: String },

    #[error("project name '{raw}' does not produce a valid identifier (got '{sanitized}')")]
    InvalidName { raw: String, sanitized: String },

    #[error("project name '{0}' is reserved")]
    ReservedName(String),

    #[error("target directory '{}' is not empty", .0.display())]
    TargetNotEmpty(PathBuf),

    #[error("target '{}' exists and is not a directory", .0.display())]
    TargetNotDirectory(PathBuf),

    #[error("a project name is required")]
    MissingProjectName,
}

/// A spawned tool could not be started or exited unsuccessfully.
#[derive(Error, Debug)]
pub enum ExternalError {
    #[error("{step}: '{program}' not found in PATH")]
    NotFound { step: String, program: String },

    #[error("{step}: failed to start '{program}': {source}")]
    Spawn {
        step: String,
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{step}: '{command}' exited with {status}")]
    Failed { step: String, command: String, status: ExitStatus },
}

impl ExternalError {
    /// Identity of the step that failed.
    pub fn step(&self) -> &str {
        match self {
            ExternalError::NotFound { step, .. }
            | ExternalError::Spawn { step, .. }
            | ExternalError::Failed { step, .. } => step,
        }
    }
}

/// Top-level error type for pyseed operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}.")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    #[error("Failed to write '{}': {source}.", path.display())]
    WriteError {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("External step failed: {0}.")]
    External(#[from] ExternalError),

    #[error("Dependency manager did not produce '{}'.", .0.display())]
    MissingLock(PathBuf),

    #[error("Remote repository '{0}' already exists. To delete it: gh repo delete {0} --yes")]
    RemoteExists(String),

    #[error("Template error: {0}.")]
    MinijinjaError(#[from] minijinja::Error),

    #[error("JSON error: {0}.")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid output path '{0}'.")]
    InvalidPath(String),

    #[error("Prompt error: {0}.")]
    PromptError(String),

    #[error("Generated tree is inconsistent:\n  {}", .0.join("\n  "))]
    Inconsistent(Vec<String>),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// Prints the error message to stderr and exits with status code 1.
pub fn default_error_handler(err: Error) {
    eprintln!("{err}");
    std::process::exit(1);
}

//! Error types used by this crate.

use std::{io, path::PathBuf, time::Duration};

use thiserror::Error;

/// Custom error type returned when a launch can not be composed, or when a host query fails in a
/// way the caller needs to know about.
#[derive(Error, Debug)]
pub enum LaunchError {
    /// A tool could not be found on `PATH`
    #[error("The executable '{0}' could not be found.")]
    MissingExecutable(String),

    /// A file exists at the given path but it can not be executed
    #[error("The file at {0:?} exists but is not executable.")]
    NotExecutable(PathBuf),

    /// Neither the caller nor the runner configuration named a Wine version
    #[error("The Wine version must be specified.")]
    UnspecifiedVersion,

    /// A version name which does not match any known Wine or Proton install
    #[error("Could not locate Wine version '{0}'.")]
    UnresolvableVersion(String),

    /// No version at all is installed for a runner
    #[error("No versions of {0} are installed.")]
    UnavailableRunner(String),

    /// A prefix, or the custom Wine path, is not set up the way it needs to be
    #[error("Misconfigured prefix: {0}")]
    MisconfiguredPrefix(String),

    /// A command ran for longer than it was allowed to
    #[error("Command {command:?} timed out after {timeout:?}")]
    ProcessTimeout { command: Vec<String>, timeout: Duration },

    /// The OS refused to start a command
    #[error("Could not run command {command:?}: {source}")]
    ProcessLaunchFailure {
        command: Vec<String>,
        #[source]
        source: io::Error,
    },

    /// Refusal to do something destructive to a protected path, such as the home directory
    #[error("Refusing to operate on protected path {0:?}")]
    FilesystemGuard(PathBuf),

    /// Shell-style string which could not be split into words
    #[error("Could not split {input:?} into words: {reason}")]
    ShellSyntax { input: String, reason: String },

    /// A configuration value outside of the accepted set
    #[error("Invalid value {value:?} for option '{key}'")]
    InvalidConfigValue { key: &'static str, value: String },

    /// A resolution which is not in the `WxH` format
    #[error("Invalid resolution {0:?}, expected the format WIDTHxHEIGHT")]
    InvalidResolution(String),

    /// Error originating from [`io::Error`]
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Error originating from [`nom::Err`]
    #[error(transparent)]
    Nom(#[from] nom::Err<nom::error::Error<String>>),
}

impl From<nom::Err<nom::error::Error<&str>>> for LaunchError {
    fn from(err: nom::Err<nom::error::Error<&str>>) -> Self {
        Self::Nom(err.map_input(Into::into))
    }
}

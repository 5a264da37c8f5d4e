//! Error types shared by every meow operation

use std::process::ExitStatus;

use thiserror::Error;

/// Result alias used across the library
pub type Result<T, E = MeowError> = std::result::Result<T, E>;

/// Why a child process did not complete successfully
#[derive(Debug, Error)]
pub enum ProcessFailure {
    #[error("failed to launch: {0}")]
    Launch(#[source] std::io::Error),

    #[error("could not be waited on: {0}")]
    Wait(#[source] std::io::Error),

    #[error("exited with {0}")]
    Exited(ExitStatus),

    #[error("terminated after cancellation")]
    Cancelled,
}

/// Every failure a meow operation can surface.
///
/// All of these are terminal for the current operation. Nothing is retried.
#[derive(Debug, Error)]
pub enum MeowError {
    /// No constant table entry exists for this (OS, architecture) pair
    #[error("unsupported platform: {os}/{arch}")]
    UnsupportedPlatform { os: String, arch: String },

    /// The platform is known but the named constant is not defined for it
    #[error("constant `{name}` is not defined for this platform")]
    ConstantNotFound { name: String },

    /// The server answered with a non-2xx status
    #[error("request failed with status code {status}")]
    Network { status: u16 },

    /// The HTTP transfer itself failed (connect error, connection dropped mid-body)
    #[error("transfer failed: {0}")]
    Transfer(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("`{program}` {cause}")]
    Process {
        program: String,
        #[source]
        cause: ProcessFailure,
    },

    #[error("container engine error: {0}")]
    Engine(#[from] bollard::errors::Error),

    /// Conflicting or malformed user input, reported before any work starts
    #[error("{0}")]
    Validation(String),

    #[error("not implemented: {0}")]
    NotImplemented(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl MeowError {
    pub(crate) fn process(program: impl Into<String>, cause: ProcessFailure) -> Self {
        Self::Process {
            program: program.into(),
            cause,
        }
    }
}

impl From<serde_yaml::Error> for MeowError {
    fn from(e: serde_yaml::Error) -> Self {
        Self::Config(e.to_string())
    }
}

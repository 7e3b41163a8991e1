use std::path::PathBuf;

use thiserror::Error;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures raised by provisioning and deployment steps.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("preflight failed: {0}")]
    Preflight(String),

    #[error("repository sync failed: {0}")]
    Sync(String),

    #[error("failed to install {package}: {reason}")]
    PackageInstall { package: String, reason: String },

    #[error("environment at {} could not be created", .0.display())]
    Environment(PathBuf),

    #[error("service failed to start: {reason} (see {})", log.display())]
    ServiceStart { reason: String, log: PathBuf },

    #[error("service process {pid} survived SIGKILL")]
    ServiceStop { pid: u32 },

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last_error: String,
    },

    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    #[error("required file not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("`{command}` exited with {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("duplicate step name: {0}")]
    DuplicateStep(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Step(#[from] StepError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("env file error: {0}")]
    EnvFile(#[from] dotenvy::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        // dialoguer::Error wraps an IO error
        Error::Io(std::io::Error::other(err.to_string()))
    }
}

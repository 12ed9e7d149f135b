//! Error types for renovate-changesets.

use thiserror::Error;

/// Main error type for renovate-changesets operations.
#[derive(Error, Debug)]
pub enum ChangesetsError {
    // Run context errors
    #[error("Please add the GITHUB_TOKEN to the changesets action")]
    MissingToken,

    #[error(
        "Please find base SHA, please make sure you are running in a PR context"
    )]
    MissingBaseSha,

    #[error("Failed to locate a PR associated with the Action context")]
    MissingPrNumber,

    #[error("Failed to locate the head branch of the pull request")]
    MissingHeadBranch,

    #[error("Invalid event payload: {0}")]
    InvalidEventPayload(String),

    // Configuration errors
    #[error("Failed to read changesets config: {0}")]
    ConfigError(String),

    #[error("Invalid workspace declaration: {0}")]
    InvalidWorkspace(String),

    // External command errors
    #[error("command `{command}` failed with exit code {code}: {stderr}")]
    CommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    // Parsing errors - automatic conversions via #[from]
    #[error("JSON parse error: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("YAML parse error: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("Regular expression error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("Template rendering failed: {0}")]
    TemplateError(#[from] tera::Error),

    #[error("Directory walk failed: {0}")]
    WalkError(#[from] walkdir::Error),

    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] log::SetLoggerError),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    // Generic wrapper for other errors
    #[error(transparent)]
    Other(#[from] color_eyre::Report),
}

/// Result type alias using ChangesetsError
pub type Result<T> = std::result::Result<T, ChangesetsError>;

impl ChangesetsError {
    /// Create a config error with context
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create an invalid workspace error
    pub fn invalid_workspace(msg: impl Into<String>) -> Self {
        Self::InvalidWorkspace(msg.into())
    }

    /// Create a failed command error
    pub fn command_failed(
        command: impl Into<String>,
        code: i32,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            command: command.into(),
            code,
            stderr: stderr.into(),
        }
    }
}

//! CLI error types with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const CONFIG: i32 = 2;
    pub const SINK: i32 = 3;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(
        code(fabricbeat::config),
        help("Check <config-dir>/<name>.yaml against the documented schema.")
    )]
    Config(#[from] fabricbeat_config::ConfigError),

    #[error("failed to initialize HTTP client: {0}")]
    #[diagnostic(code(fabricbeat::http))]
    Http(String),

    #[error("invalid {field}: {reason}")]
    #[diagnostic(code(fabricbeat::validation))]
    Validation { field: String, reason: String },

    #[error("bulk POST failed: {message}")]
    #[diagnostic(
        code(fabricbeat::sink),
        help("Check elastic_host, credentials, and index permissions.")
    )]
    Sink { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to render documents: {0}")]
    #[diagnostic(code(fabricbeat::render))]
    Render(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation { .. } => exit_code::CONFIG,
            Self::Sink { .. } => exit_code::SINK,
            _ => exit_code::GENERAL,
        }
    }
}

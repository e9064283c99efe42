//! CLI error types with miette diagnostics.
//!
//! Maps config and core errors into user-facing errors with actionable
//! help text.

use miette::Diagnostic;
use thiserror::Error;

use tessel_config::ConfigError;
use tessel_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const REQUEST: i32 = 5;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────
    #[error("No API URL configured")]
    #[diagnostic(
        code(tessel::no_url),
        help(
            "Set `url` under [api] in {path},\n\
             or pass --url / set TESSEL_URL."
        )
    )]
    NoUrl { path: String },

    #[error("Unknown entity type '{name}'")]
    #[diagnostic(
        code(tessel::unknown_entity),
        help("Declared entity types: {available}")
    )]
    UnknownEntity { name: String, available: String },

    #[error(transparent)]
    #[diagnostic(code(tessel::config))]
    Config(ConfigError),

    // ── Requests ─────────────────────────────────────────────────────
    #[error("{entity} '{id}' not found")]
    #[diagnostic(code(tessel::not_found))]
    NotFound { entity: String, id: String },

    #[error("Request failed: {message}")]
    #[diagnostic(code(tessel::request_failed))]
    Request { message: String },

    #[error("Could not reach the API: {message}")]
    #[diagnostic(
        code(tessel::connection_failed),
        help("Check the API URL, or pass --insecure for self-signed certificates.")
    )]
    Connection { message: String },

    // ── Wiring ───────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(tessel::core),
        help("Check the entity and operation declarations in the config file.")
    )]
    Core(CoreError),

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(tessel::validation))]
    Validation { field: String, reason: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to render output: {0}")]
    #[diagnostic(code(tessel::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoUrl { .. } | Self::Config(_) | Self::Core(_) => exit_code::CONFIG,
            Self::UnknownEntity { .. } | Self::Validation { .. } => exit_code::USAGE,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Request { .. } => exit_code::REQUEST,
            Self::Connection { .. } => exit_code::CONNECTION,
            Self::Io(_) | Self::Render(_) => exit_code::GENERAL,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Core(core) => core.into(),
            other => Self::Config(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Transport {
                message,
                status: None,
            } => Self::Connection { message },
            CoreError::Transport { message, .. } => Self::Request { message },
            other => Self::Core(other),
        }
    }
}

impl From<tessel_api::Error> for CliError {
    fn from(err: tessel_api::Error) -> Self {
        CoreError::from(err).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_split_by_status() {
        let unreachable = CliError::from(CoreError::Transport {
            message: "connection refused".into(),
            status: None,
        });
        assert_eq!(unreachable.exit_code(), exit_code::CONNECTION);

        let rejected = CliError::from(CoreError::Transport {
            message: "App not found".into(),
            status: Some(404),
        });
        assert_eq!(rejected.exit_code(), exit_code::REQUEST);
        assert_eq!(rejected.to_string(), "Request failed: App not found");
    }
}

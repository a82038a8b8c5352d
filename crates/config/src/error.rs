use thiserror::Error;
use vconf_errors::AppError;

/// Errors raised while registering or building configuration sources.
///
/// Fetch failures during a Vault load are not represented here: they are
/// logged and reported per path, never returned.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid argument `{name}`: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Missing argument `{0}`")]
    MissingArgument(&'static str),

    #[error("Invalid URI `{url}`: {reason}")]
    InvalidUri { url: String, reason: String },

    #[error("Failed to load client certificate: {0}")]
    Certificate(#[source] AppError),

    #[error("Failed to create secret store client: {0}")]
    Client(#[source] AppError),

    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),
}

impl ConfigError {
    pub(crate) fn blank(name: &'static str) -> Self {
        Self::InvalidArgument {
            name,
            reason: "must not be empty or whitespace".to_string(),
        }
    }
}

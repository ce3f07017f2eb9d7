//! Error types for the Discord bot.

use cloudbuild_core::{BuildServiceError, ConfigError, SessionError};
use thiserror::Error;

/// Errors that can stop the Discord bot.
#[derive(Debug, Error)]
pub enum DiscordError {
    /// Config file missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Build service client could not be created or started.
    #[error(transparent)]
    BuildService(#[from] BuildServiceError),

    /// Failed to create the gateway client.
    #[error("Failed to start bot: {0}")]
    BotStartFailed(String),

    /// The gateway connection ended with an error.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// A fatal session error, such as the configured server not being found.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Result type for Discord bot operations.
pub type Result<T> = std::result::Result<T, DiscordError>;

impl From<serenity::Error> for DiscordError {
    fn from(e: serenity::Error) -> Self {
        DiscordError::Gateway(e.to_string())
    }
}

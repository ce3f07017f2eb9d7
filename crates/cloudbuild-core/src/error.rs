//! Error types for the cloud build bot core.

use thiserror::Error;

/// Errors raised while loading the configuration file.
///
/// All of these are fatal: the process cannot run without a valid config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid JSON or does not match the expected shape.
    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// A required value is missing or empty after environment substitution.
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Errors from the build service client lifecycle.
///
/// Remote failures never show up here; they are rendered into the reply
/// text. These variants are precondition violations by the caller.
#[derive(Debug, Error)]
pub enum BuildServiceError {
    /// `start_worker` was called while a session is already open.
    #[error("Build service worker already started")]
    AlreadyStarted,

    /// A remote operation was called before `start_worker` or after `stop_worker`.
    #[error("Build service worker not started")]
    NotStarted,

    /// The API key cannot be used as an HTTP header value.
    #[error("API key is not a valid header value")]
    InvalidApiKey,

    /// The HTTP session could not be created.
    #[error("Failed to create HTTP session: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors reported by a chat platform implementation.
#[derive(Debug, Error)]
pub enum ChatError {
    /// A named channel is not part of the joined guild.
    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    /// The platform rejected or failed a request.
    #[error("Chat platform error: {0}")]
    Platform(String),
}

/// Errors surfaced by the bot session while handling platform events.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The configured guild is not among the guilds the bot has joined.
    #[error("Bot is not a member of the server: {0}")]
    GuildNotFound(String),

    /// Build service precondition failure.
    #[error(transparent)]
    BuildService(#[from] BuildServiceError),

    /// Chat platform failure.
    #[error(transparent)]
    Chat(#[from] ChatError),
}

/// Result type for build service operations.
pub type Result<T> = std::result::Result<T, BuildServiceError>;

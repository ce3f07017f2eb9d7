//! Cloudbuild Core - chat command handling for Unity Cloud Build.
//!
//! This crate holds everything the bot does that does not depend on a chat
//! SDK:
//!
//! - **catalog**: Build target names mapped to remote build target ids
//! - **client**: Unity Cloud Build REST client with a start/stop lifecycle
//! - **config**: JSON config loading with `${NAME}` environment substitution
//! - **events**: Filter for build notifications posted by the build service
//! - **platform**: The chat platform trait and platform-neutral message types
//! - **router**: Command parsing and dispatch
//! - **session**: Bot session tying the router and filter to platform events

pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod platform;
pub mod router;
pub mod session;

pub use catalog::BuildTargetCatalog;
pub use client::{
    BuildFailure, BuildRequestResult, BuildServiceClient, BuildTargetInfo, HttpOutcome,
    StartedBuild,
};
pub use config::{config_path, load_config, AppConfig, CloudBuildConfig, DiscordBotConfig};
pub use error::{BuildServiceError, ChatError, ConfigError, SessionError};
pub use events::BuildEventFilter;
pub use platform::{
    ChannelRef, ChatPlatform, Field, FieldSet, FieldSetAuthor, GuildRef, InboundMessage,
};
pub use router::{Command, CommandRouter};
pub use session::BotSession;

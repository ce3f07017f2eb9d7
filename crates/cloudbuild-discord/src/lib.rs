//! Discord bot interface for Unity Cloud Build.
//!
//! This crate connects [`cloudbuild_core::BotSession`] to Discord through
//! serenity. Mention the bot in one of its channels to run a command:
//!
//! # Commands
//!
//! - `help` - List available commands
//! - `supported_builds` - List configured build targets
//! - `build_target_info <target>` - Show build target details
//! - `build <target>` - Start a clean build of a target
//!
//! Successful build notifications posted by the build service in the build
//! channel are re-posted to the output channel without their download link.
//!
//! # Example
//!
//! ```no_run
//! use cloudbuild_discord::DiscordBot;
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = cloudbuild_core::load_config(Path::new("config/config.json"))?;
//!     let bot = DiscordBot::new(config)?;
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod error;
pub mod handler;
pub mod platform;

pub use bot::DiscordBot;
pub use error::{DiscordError, Result};
pub use platform::DiscordPlatform;

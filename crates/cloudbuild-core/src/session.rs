//! Bot session: routes platform events to the command router and the build
//! event filter.
//!
//! The session owns no chat connection. Each event handler receives the
//! platform to answer through, so the same session works against Discord
//! and against the in-memory platform used in tests.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::client::BuildServiceClient;
use crate::config::DiscordBotConfig;
use crate::error::{ChatError, SessionError};
use crate::events::BuildEventFilter;
use crate::platform::{ChannelRef, ChatPlatform, GuildRef, InboundMessage};
use crate::router::CommandRouter;

/// Per-process bot state shared by all event handlers.
pub struct BotSession {
    config: DiscordBotConfig,
    router: CommandRouter,
    filter: BuildEventFilter,
    /// Guild found on ready.
    guild: RwLock<Option<GuildRef>>,
    /// Text channels of the joined guild, by id.
    channels: RwLock<HashMap<u64, ChannelRef>>,
}

impl BotSession {
    pub fn new(config: DiscordBotConfig, router: CommandRouter, filter: BuildEventFilter) -> Self {
        Self {
            config,
            router,
            filter,
            guild: RwLock::new(None),
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// Build a session around a build service client, using the config's
    /// mention marker and build event author.
    pub fn from_config(config: DiscordBotConfig, client: Arc<BuildServiceClient>) -> Self {
        let router = CommandRouter::new(client, config.mention_marker.clone());
        let filter = BuildEventFilter::new(config.build_event_author.clone());
        Self::new(config, router, filter)
    }

    pub fn config(&self) -> &DiscordBotConfig {
        &self.config
    }

    /// Handle the platform's ready event: find the configured guild and
    /// record its text channels.
    ///
    /// # Errors
    /// [`SessionError::GuildNotFound`] if the bot is not in the guild. The
    /// caller is expected to shut down.
    pub async fn on_ready<P>(&self, platform: &P) -> Result<(), SessionError>
    where
        P: ChatPlatform + ?Sized,
    {
        let guild = platform
            .guilds()
            .await?
            .into_iter()
            .find(|g| g.name == self.config.guild)
            .ok_or_else(|| SessionError::GuildNotFound(self.config.guild.clone()))?;
        *self.guild.write().await = Some(guild.clone());

        let count = self.refresh_channels(platform).await?;
        info!(
            guild = %guild.name,
            bot = %self.config.bot_name,
            channels = count,
            "Connected to the server"
        );
        Ok(())
    }

    /// Handle one inbound chat message.
    pub async fn on_message<P>(
        &self,
        platform: &P,
        message: &InboundMessage,
    ) -> Result<(), SessionError>
    where
        P: ChatPlatform + ?Sized,
    {
        if message.from_self {
            return Ok(());
        }
        let Some(channel) = self.resolve_channel(platform, message).await? else {
            return Ok(());
        };
        if !self.config.bot_channels.contains(&channel.name) {
            return Ok(());
        }

        if channel.name == self.config.build_channel {
            self.process_build_event(platform, message).await
        } else if message.mentions_bot {
            self.process_bot_command(platform, &channel, message).await
        } else {
            Ok(())
        }
    }

    /// Look up a known text channel by id.
    pub async fn channel(&self, id: u64) -> Option<ChannelRef> {
        self.channels.read().await.get(&id).cloned()
    }

    /// Look up a known text channel by name.
    pub async fn channel_named(&self, name: &str) -> Option<ChannelRef> {
        self.channels
            .read()
            .await
            .values()
            .find(|c| c.name == name)
            .cloned()
    }

    /// Re-read the guild's text channels. Returns how many are known.
    ///
    /// Does nothing before the ready event.
    pub async fn refresh_channels<P>(&self, platform: &P) -> Result<usize, SessionError>
    where
        P: ChatPlatform + ?Sized,
    {
        let Some(guild) = self.guild.read().await.clone() else {
            return Ok(0);
        };
        let text_channels = platform.text_channels(&guild).await?;

        let mut channels = self.channels.write().await;
        channels.clear();
        channels.extend(text_channels.into_iter().map(|c| (c.id, c)));
        debug!(guild = %guild.name, channels = channels.len(), "Channel directory refreshed");
        Ok(channels.len())
    }

    /// Find the guild channel a message was posted in.
    ///
    /// A known channel takes the message's live name, so renames apply at
    /// once. An unknown id triggers one directory refresh, which picks up
    /// channels created after ready. Channels outside the guild stay unknown.
    async fn resolve_channel<P>(
        &self,
        platform: &P,
        message: &InboundMessage,
    ) -> Result<Option<ChannelRef>, SessionError>
    where
        P: ChatPlatform + ?Sized,
    {
        {
            let mut channels = self.channels.write().await;
            if let Some(known) = channels.get_mut(&message.channel_id) {
                if let Some(name) = &message.channel_name {
                    if *name != known.name {
                        debug!(from = %known.name, to = %name, "Channel renamed");
                        known.name.clone_from(name);
                    }
                }
                return Ok(Some(known.clone()));
            }
        }

        self.refresh_channels(platform).await?;
        Ok(self.channel(message.channel_id).await)
    }

    async fn process_bot_command<P>(
        &self,
        platform: &P,
        channel: &ChannelRef,
        message: &InboundMessage,
    ) -> Result<(), SessionError>
    where
        P: ChatPlatform + ?Sized,
    {
        if let Some(reply) = self.router.handle(&message.content).await? {
            platform.send_text(channel.id, &reply).await?;
        }
        Ok(())
    }

    async fn process_build_event<P>(
        &self,
        platform: &P,
        message: &InboundMessage,
    ) -> Result<(), SessionError>
    where
        P: ChatPlatform + ?Sized,
    {
        let Some(forwarded) = self.filter.filter(&message.author, &message.field_sets) else {
            debug!(author = %message.author, "Build event dropped");
            return Ok(());
        };

        let output = &self.config.output_channel;
        let mut target = self.channel_named(output).await;
        if target.is_none() {
            self.refresh_channels(platform).await?;
            target = self.channel_named(output).await;
        }
        let target = target.ok_or_else(|| ChatError::ChannelNotFound(output.clone()))?;

        platform.send_fields(target.id, &forwarded).await?;
        info!(channel = %output, "Build event forwarded");
        Ok(())
    }
}

//! Gateway event handler.

use std::sync::Arc;

use async_trait::async_trait;
use cloudbuild_core::{BotSession, SessionError};
use serenity::client::{Context, EventHandler};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::platform::{inbound_message, DiscordPlatform};

/// Forwards gateway events to the bot session.
///
/// Fatal session errors (the configured server is missing) are sent on
/// `fatal_tx` so the bot can shut down in order.
pub struct Handler {
    session: Arc<BotSession>,
    fatal_tx: mpsc::UnboundedSender<SessionError>,
}

impl Handler {
    pub fn new(session: Arc<BotSession>, fatal_tx: mpsc::UnboundedSender<SessionError>) -> Self {
        Self { session, fatal_tx }
    }
}

#[async_trait]
impl EventHandler for Handler {
    async fn ready(&self, ctx: Context, ready: Ready) {
        info!(user = %ready.user.name, "Connected to Discord gateway");
        let platform = DiscordPlatform::new(Arc::clone(&ctx.http));
        if let Err(e) = self.session.on_ready(&platform).await {
            error!(
                guild = %self.session.config().guild,
                error = %e,
                "Failed to connect to the server"
            );
            let _ = self.fatal_tx.send(e);
        }
    }

    async fn message(&self, ctx: Context, msg: Message) {
        let bot_id = ctx.cache.current_user().id;
        // Served from the cache for guild channels.
        let channel_name = match msg.channel_id.name(&ctx).await {
            Ok(name) => Some(name),
            Err(e) => {
                debug!(channel_id = %msg.channel_id, error = %e, "Channel name unavailable");
                None
            }
        };
        let inbound = inbound_message(&msg, bot_id, channel_name);
        let platform = DiscordPlatform::new(Arc::clone(&ctx.http));

        if let Err(e) = self.session.on_message(&platform, &inbound).await {
            error!(
                channel_id = %msg.channel_id,
                author = %msg.author.name,
                content = %msg.content,
                error = %e,
                "Failed to handle message"
            );
        }
    }
}

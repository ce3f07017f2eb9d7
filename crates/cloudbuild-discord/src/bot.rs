//! Main Discord bot implementation.

use std::sync::Arc;

use cloudbuild_core::{AppConfig, BotSession, BuildServiceClient};
use serenity::model::gateway::GatewayIntents;
use serenity::Client;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::error::{DiscordError, Result};
use crate::handler::Handler;

/// The Discord bot for Unity Cloud Build.
pub struct DiscordBot {
    /// Bot token.
    token: String,
    /// Build service client, shared with the session.
    client: Arc<BuildServiceClient>,
    /// Session state shared across event handlers.
    session: Arc<BotSession>,
}

impl DiscordBot {
    /// Create a bot from a loaded config. No connection is opened yet.
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = Arc::new(BuildServiceClient::new(&config.unity_cloud_build)?);
        let token = config.discord_bot.token.clone();
        let session = Arc::new(BotSession::from_config(config.discord_bot, Arc::clone(&client)));

        Ok(Self {
            token,
            client,
            session,
        })
    }

    /// Start the build service worker and run the gateway until Ctrl+C or a
    /// fatal session error. The worker is stopped on every exit path.
    pub async fn run(&self) -> Result<()> {
        self.client.start_worker().await?;

        let result = self.run_gateway().await;
        self.client.stop_worker().await;

        match &result {
            Ok(()) => info!("Bot stopped successfully"),
            Err(e) => error!(error = %e, "Bot stopped with error"),
        }
        result
    }

    async fn run_gateway(&self) -> Result<()> {
        let (fatal_tx, mut fatal_rx) = mpsc::unbounded_channel();
        let handler = Handler::new(Arc::clone(&self.session), fatal_tx);

        let intents = GatewayIntents::GUILDS
            | GatewayIntents::GUILD_MESSAGES
            | GatewayIntents::MESSAGE_CONTENT;

        let mut discord = Client::builder(&self.token, intents)
            .event_handler(handler)
            .await
            .map_err(|e| DiscordError::BotStartFailed(e.to_string()))?;
        let shard_manager = Arc::clone(&discord.shard_manager);

        info!(bot = %self.session.config().bot_name, "Starting Discord bot...");

        let result = tokio::select! {
            result = discord.start() => result.map_err(DiscordError::from),
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested");
                Ok(())
            }
            Some(err) = fatal_rx.recv() => Err(DiscordError::Session(err)),
        };

        shard_manager.shutdown_all().await;
        result
    }
}

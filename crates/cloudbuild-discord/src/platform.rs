//! serenity implementation of the chat platform trait.

use std::sync::Arc;

use async_trait::async_trait;
use cloudbuild_core::{
    ChannelRef, ChatError, ChatPlatform, Field, FieldSet, FieldSetAuthor, GuildRef,
    InboundMessage,
};
use serenity::builder::{CreateEmbed, CreateEmbedAuthor, CreateEmbedFooter, CreateMessage};
use serenity::http::Http;
use serenity::model::channel::{ChannelType, Embed, Message};
use serenity::model::id::{ChannelId, GuildId, UserId};
use serenity::model::Timestamp;
use tracing::warn;

/// Discord access through the gateway client's HTTP handle.
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Http>,
}

impl DiscordPlatform {
    pub fn new(http: Arc<Http>) -> Self {
        Self { http }
    }
}

fn platform_error(e: serenity::Error) -> ChatError {
    ChatError::Platform(e.to_string())
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn guilds(&self) -> Result<Vec<GuildRef>, ChatError> {
        let guilds = self.http.get_guilds(None, None).await.map_err(platform_error)?;
        Ok(guilds
            .into_iter()
            .map(|g| GuildRef {
                id: g.id.get(),
                name: g.name,
            })
            .collect())
    }

    async fn text_channels(&self, guild: &GuildRef) -> Result<Vec<ChannelRef>, ChatError> {
        let channels = GuildId::new(guild.id)
            .channels(&self.http)
            .await
            .map_err(platform_error)?;
        Ok(channels
            .into_values()
            .filter(|c| c.kind == ChannelType::Text)
            .map(|c| ChannelRef {
                id: c.id.get(),
                name: c.name,
            })
            .collect())
    }

    async fn send_text(&self, channel_id: u64, text: &str) -> Result<(), ChatError> {
        ChannelId::new(channel_id)
            .say(&self.http, text)
            .await
            .map_err(platform_error)?;
        Ok(())
    }

    async fn send_fields(&self, channel_id: u64, fields: &FieldSet) -> Result<(), ChatError> {
        let message = CreateMessage::new().embed(create_embed(fields));
        ChannelId::new(channel_id)
            .send_message(&self.http, message)
            .await
            .map_err(platform_error)?;
        Ok(())
    }
}

/// Convert a serenity message into the session's view of it.
///
/// `channel_name` is the channel's current name, looked up by the caller.
pub fn inbound_message(
    msg: &Message,
    bot_id: UserId,
    channel_name: Option<String>,
) -> InboundMessage {
    InboundMessage {
        channel_id: msg.channel_id.get(),
        channel_name,
        author: msg.author.name.clone(),
        from_self: msg.author.id == bot_id,
        mentions_bot: msg.mentions_user_id(bot_id),
        content: msg.content.clone(),
        field_sets: msg.embeds.iter().map(field_set_from_embed).collect(),
    }
}

pub fn field_set_from_embed(embed: &Embed) -> FieldSet {
    FieldSet {
        title: embed.title.clone(),
        description: embed.description.clone(),
        url: embed.url.clone(),
        colour: embed.colour.map(|c| c.0),
        author: embed.author.as_ref().map(|a| FieldSetAuthor {
            name: a.name.clone(),
            url: a.url.clone(),
            icon_url: a.icon_url.clone(),
        }),
        thumbnail: embed.thumbnail.as_ref().map(|t| t.url.clone()),
        image: embed.image.as_ref().map(|i| i.url.clone()),
        timestamp: embed.timestamp.map(|t| t.to_string()),
        footer: embed.footer.as_ref().map(|f| f.text.clone()),
        footer_icon_url: embed.footer.as_ref().and_then(|f| f.icon_url.clone()),
        fields: embed
            .fields
            .iter()
            .map(|f| Field {
                name: f.name.clone(),
                value: f.value.clone(),
                inline: f.inline,
            })
            .collect(),
    }
}

pub fn create_embed(fields: &FieldSet) -> CreateEmbed {
    let mut embed = CreateEmbed::new();
    if let Some(title) = &fields.title {
        embed = embed.title(title);
    }
    if let Some(description) = &fields.description {
        embed = embed.description(description);
    }
    if let Some(url) = &fields.url {
        embed = embed.url(url);
    }
    if let Some(colour) = fields.colour {
        embed = embed.colour(colour);
    }
    if let Some(author) = &fields.author {
        let mut builder = CreateEmbedAuthor::new(&author.name);
        if let Some(url) = &author.url {
            builder = builder.url(url);
        }
        if let Some(icon_url) = &author.icon_url {
            builder = builder.icon_url(icon_url);
        }
        embed = embed.author(builder);
    }
    if let Some(thumbnail) = &fields.thumbnail {
        embed = embed.thumbnail(thumbnail);
    }
    if let Some(image) = &fields.image {
        embed = embed.image(image);
    }
    if let Some(timestamp) = &fields.timestamp {
        match Timestamp::parse(timestamp) {
            Ok(timestamp) => embed = embed.timestamp(timestamp),
            Err(e) => warn!(%timestamp, error = %e, "Dropping unparsable embed timestamp"),
        }
    }
    if let Some(footer) = &fields.footer {
        let mut builder = CreateEmbedFooter::new(footer);
        if let Some(icon_url) = &fields.footer_icon_url {
            builder = builder.icon_url(icon_url);
        }
        embed = embed.footer(builder);
    }
    embed.fields(
        fields
            .fields
            .iter()
            .map(|f| (f.name.clone(), f.value.clone(), f.inline)),
    )
}

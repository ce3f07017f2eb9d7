//! Chat platform seam.
//!
//! The bot session never talks to a chat SDK directly. It receives
//! platform-neutral [`InboundMessage`] values and answers through the
//! [`ChatPlatform`] trait, which the Discord crate implements on top of
//! serenity and tests implement in memory.

use async_trait::async_trait;

use crate::error::ChatError;

/// A server (guild) the bot has joined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildRef {
    pub id: u64,
    pub name: String,
}

/// A text channel inside a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRef {
    pub id: u64,
    pub name: String,
}

/// A single named field of a rich message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            inline: false,
        }
    }
}

/// Author line of a rich message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSetAuthor {
    pub name: String,
    pub url: Option<String>,
    pub icon_url: Option<String>,
}

/// A rich message (Discord embed) with everything the bot forwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub colour: Option<u32>,
    pub author: Option<FieldSetAuthor>,
    pub thumbnail: Option<String>,
    pub image: Option<String>,
    /// RFC 3339 timestamp shown under the message.
    pub timestamp: Option<String>,
    pub footer: Option<String>,
    /// Only sent along with a footer text.
    pub footer_icon_url: Option<String>,
    pub fields: Vec<Field>,
}

impl FieldSet {
    /// Whether a field with exactly this name is present.
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f.name == name)
    }

    /// Remove every field with exactly this name. Returns how many were removed.
    pub fn remove_field(&mut self, name: &str) -> usize {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        before - self.fields.len()
    }
}

/// A chat message as seen by the bot session.
#[derive(Debug, Clone, Default)]
pub struct InboundMessage {
    /// Channel the message was posted in.
    pub channel_id: u64,
    /// Current name of that channel, when the platform knows it.
    pub channel_name: Option<String>,
    /// Display name of the author.
    pub author: String,
    /// Posted by the bot itself.
    pub from_self: bool,
    /// The bot is among the message's mentions.
    pub mentions_bot: bool,
    /// Raw message text, mention markup included.
    pub content: String,
    /// Rich field sets (embeds) attached to the message.
    pub field_sets: Vec<FieldSet>,
}

/// Operations the bot needs from a chat platform.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
    /// Guilds the bot is a member of.
    async fn guilds(&self) -> Result<Vec<GuildRef>, ChatError>;

    /// Text channels of a guild. Voice channels and categories are excluded.
    async fn text_channels(&self, guild: &GuildRef) -> Result<Vec<ChannelRef>, ChatError>;

    /// Post a plain text message.
    async fn send_text(&self, channel_id: u64, text: &str) -> Result<(), ChatError>;

    /// Post a rich message.
    async fn send_fields(&self, channel_id: u64, fields: &FieldSet) -> Result<(), ChatError>;
}

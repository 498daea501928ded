//! Inbound events as delivered by a transport.
//!
//! A transport decodes its wire protocol into [`RawEvent`]s. Each event has a
//! stable name ([`RawEvent::name`]) which is what event handlers subscribe to.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the event emitted once the session is established.
pub const READY: &str = "ready";
/// Name of the event carrying a newly posted message.
pub const MESSAGE_CREATE: &str = "messageCreate";
/// Name of the event carrying a user interaction.
pub const INTERACTION_CREATE: &str = "interactionCreate";

/// The author of a message or the user behind an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    /// Platform user id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Whether the account is an automated one.
    #[serde(default)]
    pub bot: bool,
}

impl Author {
    /// Creates a human author.
    pub fn user(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            bot: false,
        }
    }

    /// Creates an automated author.
    pub fn bot(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            bot: true,
            ..Self::user(id, name)
        }
    }
}

/// Kind of channel a message was posted in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// A text channel that belongs to a guild.
    #[default]
    GuildText,
    /// A private conversation.
    Direct,
    /// A thread or any other channel type.
    Other,
}

/// A message posted in a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Message id.
    pub id: String,
    /// Channel the message was posted in.
    pub channel_id: String,
    /// Kind of that channel.
    #[serde(default)]
    pub channel_kind: ChannelKind,
    /// The guild (permission scope) the channel belongs to, if any.
    #[serde(default)]
    pub scope: Option<String>,
    /// Who posted it.
    pub author: Author,
    /// Raw text content.
    pub content: String,
}

/// Kind of a user interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    /// A slash command invocation.
    #[default]
    Command,
    /// A button or select menu.
    Component,
    /// An autocomplete request.
    Autocomplete,
    /// A modal submission.
    ModalSubmit,
}

/// A user interaction, such as a slash command invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    /// Interaction id.
    pub id: String,
    /// What kind of interaction this is.
    #[serde(default)]
    pub kind: InteractionKind,
    /// Command name, exactly as registered.
    #[serde(default)]
    pub command_name: String,
    /// Option values supplied by the user.
    #[serde(default)]
    pub options: Value,
    /// The invoking user.
    pub user: Author,
    /// Channel the interaction happened in.
    pub channel_id: String,
    /// The guild (permission scope), if any.
    #[serde(default)]
    pub scope: Option<String>,
}

impl InteractionEvent {
    /// Returns `true` for slash command invocations.
    pub fn is_command(&self) -> bool {
        self.kind == InteractionKind::Command
    }
}

/// Emitted once the transport session is up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadyEvent {
    /// The bot's own account.
    pub user: Author,
    /// Number of guilds visible to the bot.
    #[serde(default)]
    pub scope_count: usize,
}

/// Any event a transport can deliver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum RawEvent {
    /// Session established.
    Ready(ReadyEvent),
    /// A message was posted.
    MessageCreate(MessageEvent),
    /// A user interacted with the bot.
    InteractionCreate(InteractionEvent),
    /// Anything else, kept opaque.
    Other {
        /// Event name.
        name: String,
        /// Event payload.
        #[serde(default)]
        payload: Value,
    },
}

impl RawEvent {
    /// Returns the name handlers subscribe to.
    pub fn name(&self) -> &str {
        match self {
            Self::Ready(_) => READY,
            Self::MessageCreate(_) => MESSAGE_CREATE,
            Self::InteractionCreate(_) => INTERACTION_CREATE,
            Self::Other { name, .. } => name,
        }
    }

    /// Returns the message payload, if this is a message event.
    pub fn as_message(&self) -> Option<&MessageEvent> {
        match self {
            Self::MessageCreate(message) => Some(message),
            _ => None,
        }
    }

    /// Returns the interaction payload, if this is an interaction event.
    pub fn as_interaction(&self) -> Option<&InteractionEvent> {
        match self {
            Self::InteractionCreate(interaction) => Some(interaction),
            _ => None,
        }
    }
}

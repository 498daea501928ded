//! Outbound replies.
//!
//! A [`Reply`] is a structured, transport-neutral notice. Transports decide
//! how to render it (an embed, plain text, a console line).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{InteractionEvent, MessageEvent};

/// Where a reply should be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplyTarget {
    /// Answer to a posted message.
    Message {
        /// Channel of the original message.
        channel_id: String,
        /// The message being answered.
        message_id: String,
    },
    /// Answer to an interaction.
    Interaction {
        /// Channel the interaction happened in.
        channel_id: String,
        /// The interaction being answered.
        interaction_id: String,
    },
}

impl From<&MessageEvent> for ReplyTarget {
    fn from(message: &MessageEvent) -> Self {
        Self::Message {
            channel_id: message.channel_id.clone(),
            message_id: message.id.clone(),
        }
    }
}

impl From<&InteractionEvent> for ReplyTarget {
    fn from(interaction: &InteractionEvent) -> Self {
        Self::Interaction {
            channel_id: interaction.channel_id.clone(),
            interaction_id: interaction.id.clone(),
        }
    }
}

/// A name/value pair shown beneath a reply's description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyField {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub inline: bool,
}

/// A structured reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Accent color as `#rrggbb`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<ReplyField>,
    /// Only visible to the invoking user (interactions only).
    #[serde(default)]
    pub ephemeral: bool,
}

impl Reply {
    /// Creates an empty reply.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a reply carrying only a description.
    pub fn text(description: impl Into<String>) -> Self {
        Self::new().description(description)
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    /// Appends a field.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>, inline: bool) -> Self {
        self.fields.push(ReplyField {
            name: name.into(),
            value: value.into(),
            inline,
        });
        self
    }

    pub fn ephemeral(mut self, ephemeral: bool) -> Self {
        self.ephemeral = ephemeral;
        self
    }
}

impl fmt::Display for Reply {
    /// Plain-text rendering, used by console transports and logs.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        let mut line = |f: &mut fmt::Formatter<'_>, text: &str| -> fmt::Result {
            if !first {
                writeln!(f)?;
            }
            first = false;
            write!(f, "{text}")
        };

        if let Some(title) = &self.title {
            line(f, title)?;
        }
        if let Some(description) = &self.description {
            line(f, description)?;
        }
        for field in &self.fields {
            line(f, &format!("{}: {}", field.name, field.value))?;
        }
        if let Some(footer) = &self.footer {
            line(f, &format!("-- {footer}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_display() {
        let reply = Reply::new()
            .title("Pong")
            .description("API Latency: **42ms**")
            .field("Shard", "0", true)
            .footer("brass");
        assert_eq!(
            reply.to_string(),
            "Pong\nAPI Latency: **42ms**\nShard: 0\n-- brass"
        );
        assert!(!reply.ephemeral);
    }

    #[test]
    fn test_empty_reply_renders_nothing() {
        assert_eq!(Reply::new().to_string(), "");
    }
}

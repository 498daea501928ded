//! Capabilities the framework needs from the outside world.
//!
//! The chat session itself is not part of Brass. A [`Transport`] delivers
//! events and carries replies; a [`Gateway`] reports session facts such as
//! latency. Both are held behind `Arc<dyn _>` by the runtime context.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TransportResult;
use crate::event::RawEvent;
use crate::reply::{Reply, ReplyTarget};

// =============================================================================
// Capabilities
// =============================================================================

/// A set of named permission tokens (e.g. `"BanMembers"`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, capability: impl Into<String>) -> bool {
        self.0.insert(capability.into())
    }

    pub fn contains(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Returns the tokens of `self` that `granted` lacks.
    pub fn missing_from(&self, granted: &CapabilitySet) -> CapabilitySet {
        self.0.difference(&granted.0).cloned().collect()
    }

    /// Returns `true` if every token of `self` is in `granted`.
    pub fn is_subset_of(&self, granted: &CapabilitySet) -> bool {
        self.0.is_subset(&granted.0)
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, capability) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(capability)?;
        }
        Ok(())
    }
}

/// Whose grants a capability lookup is about.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Principal {
    /// A user, by id.
    User(String),
    /// The bot's own account.
    Bot,
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user {id}"),
            Self::Bot => f.write_str("bot"),
        }
    }
}

// =============================================================================
// Registration payloads
// =============================================================================

/// The serializable part of a slash command, submitted by bulk registration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SlashCommandData {
    pub name: String,
    pub description: String,
    /// Option schema, passed through to the service untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<Value>,
}

impl SlashCommandData {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            options: Vec::new(),
        }
    }

    /// Appends an option definition.
    pub fn option(mut self, option: Value) -> Self {
        self.options.push(option);
        self
    }
}

/// Credentials needed to register slash commands.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub application_id: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("application_id", &self.application_id)
            .finish()
    }
}

// =============================================================================
// Traits
// =============================================================================

/// The chat transport.
///
/// Implementations must be cheap to share; every dispatch task holds an
/// `Arc` to the same instance.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Waits for the next inbound event. `None` means the session ended.
    async fn next_event(&self) -> Option<RawEvent>;

    /// Sends a reply.
    async fn send_reply(&self, target: &ReplyTarget, reply: Reply) -> TransportResult<()>;

    /// Replaces a reply that was already sent to `target`.
    ///
    /// The default implementation sends a new reply.
    async fn edit_reply(&self, target: &ReplyTarget, reply: Reply) -> TransportResult<()> {
        self.send_reply(target, reply).await
    }

    /// Returns the grants `principal` holds inside `scope`.
    async fn scoped_capabilities_of(
        &self,
        principal: &Principal,
        scope: &str,
    ) -> TransportResult<CapabilitySet>;

    /// Replaces the globally registered slash commands, returning how many
    /// the service accepted.
    async fn bulk_register(
        &self,
        credentials: &Credentials,
        commands: &[SlashCommandData],
    ) -> TransportResult<usize>;
}

/// Session facts reported by the gateway connection.
pub trait Gateway: Send + Sync + 'static {
    /// Current heartbeat round-trip in milliseconds; negative when unknown.
    fn current_latency_ms(&self) -> i64;

    /// The bot's own user id, once known.
    fn self_id(&self) -> Option<String>;
}

/// A shared transport.
pub type BoxedTransport = Arc<dyn Transport>;

/// A shared gateway.
pub type BoxedGateway = Arc<dyn Gateway>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_difference() {
        let required: CapabilitySet = ["BanMembers", "KickMembers"].into_iter().collect();
        let granted: CapabilitySet = ["KickMembers", "SendMessages"].into_iter().collect();

        assert!(!required.is_subset_of(&granted));
        let missing = required.missing_from(&granted);
        assert_eq!(missing.to_string(), "BanMembers");
        assert!(CapabilitySet::new().is_subset_of(&granted));
    }

    #[test]
    fn test_credentials_debug_hides_token() {
        let credentials = Credentials {
            token: "secret".into(),
            application_id: "42".into(),
        };
        let rendered = format!("{credentials:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("42"));
    }
}

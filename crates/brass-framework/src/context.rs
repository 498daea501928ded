//! Runtime and per-invocation contexts.
//!
//! [`BotContext`] is the long-lived object every handler receives: settings,
//! the frozen registry, the cooldown tracker and the transport/gateway
//! handles. [`MessageContext`] and [`InteractionContext`] wrap the triggering
//! event together with a way to answer it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use brass_core::{
    BoxedGateway, BoxedTransport, InteractionEvent, MessageEvent, Reply, ReplyTarget,
    TransportResult,
};

use crate::cooldown::CooldownTracker;
use crate::registry::Registry;
use crate::settings::BotSettings;

// =============================================================================
// BotContext
// =============================================================================

/// Shared state handed to the dispatcher, the gate and every handler.
pub struct BotContext {
    settings: BotSettings,
    registry: Arc<Registry>,
    cooldowns: CooldownTracker,
    transport: BoxedTransport,
    gateway: BoxedGateway,
}

impl BotContext {
    pub fn new(
        settings: BotSettings,
        registry: Arc<Registry>,
        cooldowns: CooldownTracker,
        transport: BoxedTransport,
        gateway: BoxedGateway,
    ) -> Self {
        Self {
            settings,
            registry,
            cooldowns,
            transport,
            gateway,
        }
    }

    pub fn settings(&self) -> &BotSettings {
        &self.settings
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn cooldowns(&self) -> &CooldownTracker {
        &self.cooldowns
    }

    pub fn transport(&self) -> &BoxedTransport {
        &self.transport
    }

    pub fn gateway(&self) -> &BoxedGateway {
        &self.gateway
    }

    /// Returns `true` if `user_id` bypasses the owner, disabled and beta checks.
    pub fn is_elevated(&self, user_id: &str) -> bool {
        self.settings.is_owner(user_id)
    }
}

impl std::fmt::Debug for BotContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotContext")
            .field("prefix", &self.settings.prefix)
            .field("registry", &self.registry.stats())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// MessageContext
// =============================================================================

/// A message command invocation.
#[derive(Clone)]
pub struct MessageContext {
    message: Arc<MessageEvent>,
    transport: BoxedTransport,
}

impl MessageContext {
    pub fn new(message: Arc<MessageEvent>, transport: BoxedTransport) -> Self {
        Self { message, transport }
    }

    /// The triggering message.
    pub fn message(&self) -> &MessageEvent {
        &self.message
    }

    /// The author's user id.
    pub fn author_id(&self) -> &str {
        &self.message.author.id
    }

    /// Replies to the triggering message.
    pub async fn reply(&self, reply: Reply) -> TransportResult<()> {
        let target = ReplyTarget::from(self.message.as_ref());
        self.transport.send_reply(&target, reply).await
    }
}

// =============================================================================
// InteractionContext
// =============================================================================

/// A slash command invocation.
///
/// Clones share the "already replied" flag, so the dispatcher can tell whether
/// the handler answered before it failed.
#[derive(Clone)]
pub struct InteractionContext {
    interaction: Arc<InteractionEvent>,
    transport: BoxedTransport,
    replied: Arc<AtomicBool>,
}

impl InteractionContext {
    pub fn new(interaction: Arc<InteractionEvent>, transport: BoxedTransport) -> Self {
        Self {
            interaction,
            transport,
            replied: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The triggering interaction.
    pub fn interaction(&self) -> &InteractionEvent {
        &self.interaction
    }

    /// The invoking user's id.
    pub fn user_id(&self) -> &str {
        &self.interaction.user.id
    }

    /// Whether a reply was already sent for this interaction.
    pub fn has_replied(&self) -> bool {
        self.replied.load(Ordering::Acquire)
    }

    /// Sends the initial reply.
    pub async fn reply(&self, reply: Reply) -> TransportResult<()> {
        let target = ReplyTarget::from(self.interaction.as_ref());
        self.transport.send_reply(&target, reply).await?;
        self.replied.store(true, Ordering::Release);
        Ok(())
    }

    /// Replaces the reply already sent.
    pub async fn edit_reply(&self, reply: Reply) -> TransportResult<()> {
        let target = ReplyTarget::from(self.interaction.as_ref());
        self.transport.edit_reply(&target, reply).await?;
        self.replied.store(true, Ordering::Release);
        Ok(())
    }

    /// Answers with `reply`, editing the earlier response if there was one.
    pub async fn respond(&self, reply: Reply) -> TransportResult<()> {
        if self.has_replied() {
            self.edit_reply(reply).await
        } else {
            self.reply(reply).await
        }
    }
}

//! In-memory [`Transport`] and [`Gateway`] for tests and local runs.
//!
//! [`RecordingTransport`] replays queued events, records every reply and
//! registration, and answers capability lookups from a grant table.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use brass_core::{
    Author, BoxedTransport, CapabilitySet, ChannelKind, Credentials, Gateway, InteractionEvent,
    InteractionKind, MessageEvent, Principal, RawEvent, Reply, ReplyTarget, SlashCommandData,
    Transport, TransportError, TransportResult,
};
use parking_lot::Mutex;

use crate::context::BotContext;
use crate::cooldown::CooldownTracker;
use crate::registry::Registry;
use crate::settings::BotSettings;

/// Scope used by [`message`] and [`interaction`].
pub const TEST_SCOPE: &str = "guild-1";

/// A reply captured by [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentReply {
    pub target: ReplyTarget,
    pub reply: Reply,
    /// Sent through `edit_reply`.
    pub edited: bool,
}

#[derive(Default)]
pub struct RecordingTransport {
    inbox: Mutex<VecDeque<RawEvent>>,
    sent: Mutex<Vec<SentReply>>,
    grants: Mutex<HashMap<(Principal, String), CapabilitySet>>,
    registered: Mutex<Vec<SlashCommandData>>,
    fail_lookups: AtomicBool,
    panic_lookups: AtomicBool,
    reject_registration: AtomicBool,
    register_calls: AtomicUsize,
}

impl RecordingTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queues an event for [`Transport::next_event`].
    pub fn push_event(&self, event: RawEvent) {
        self.inbox.lock().push_back(event);
    }

    /// Grants `capabilities` to `principal` inside `scope`.
    pub fn grant<I, S>(&self, principal: Principal, scope: &str, capabilities: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.grants
            .lock()
            .insert((principal, scope.to_string()), capabilities.into_iter().collect());
    }

    /// Makes every capability lookup fail.
    pub fn fail_capability_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    /// Makes every capability lookup panic.
    pub fn panic_on_capability_lookups(&self, panic: bool) {
        self.panic_lookups.store(panic, Ordering::SeqCst);
    }

    /// Makes bulk registration fail.
    pub fn reject_registration(&self, reject: bool) {
        self.reject_registration.store(reject, Ordering::SeqCst);
    }

    /// Every reply sent so far.
    pub fn replies(&self) -> Vec<SentReply> {
        self.sent.lock().clone()
    }

    /// Titles of every reply sent so far, in order.
    pub fn reply_titles(&self) -> Vec<String> {
        self.sent
            .lock()
            .iter()
            .map(|sent| sent.reply.title.clone().unwrap_or_default())
            .collect()
    }

    /// Number of bulk registration calls, accepted or not.
    pub fn register_calls(&self) -> usize {
        self.register_calls.load(Ordering::SeqCst)
    }

    /// Slash command data accepted by the last bulk registration.
    pub fn registered(&self) -> Vec<SlashCommandData> {
        self.registered.lock().clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn next_event(&self) -> Option<RawEvent> {
        self.inbox.lock().pop_front()
    }

    async fn send_reply(&self, target: &ReplyTarget, reply: Reply) -> TransportResult<()> {
        self.sent.lock().push(SentReply {
            target: target.clone(),
            reply,
            edited: false,
        });
        Ok(())
    }

    async fn edit_reply(&self, target: &ReplyTarget, reply: Reply) -> TransportResult<()> {
        self.sent.lock().push(SentReply {
            target: target.clone(),
            reply,
            edited: true,
        });
        Ok(())
    }

    async fn scoped_capabilities_of(
        &self,
        principal: &Principal,
        scope: &str,
    ) -> TransportResult<CapabilitySet> {
        if self.panic_lookups.load(Ordering::SeqCst) {
            panic!("capability lookup for {principal} in {scope} panicked");
        }
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(TransportError::CapabilityLookup {
                principal: principal.to_string(),
                scope: scope.to_string(),
                reason: "lookup disabled".to_string(),
            });
        }
        Ok(self
            .grants
            .lock()
            .get(&(principal.clone(), scope.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn bulk_register(
        &self,
        _credentials: &Credentials,
        commands: &[SlashCommandData],
    ) -> TransportResult<usize> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_registration.load(Ordering::SeqCst) {
            return Err(TransportError::RegistrationRejected(
                "401: Unauthorized".to_string(),
            ));
        }
        *self.registered.lock() = commands.to_vec();
        Ok(commands.len())
    }
}

/// A gateway reporting a fixed, adjustable latency.
#[derive(Debug)]
pub struct StaticGateway {
    latency_ms: AtomicI64,
    self_id: Option<String>,
}

impl StaticGateway {
    pub fn new(latency_ms: i64, self_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            latency_ms: AtomicI64::new(latency_ms),
            self_id: Some(self_id.into()),
        })
    }

    pub fn set_latency(&self, latency_ms: i64) {
        self.latency_ms.store(latency_ms, Ordering::Relaxed);
    }
}

impl Gateway for StaticGateway {
    fn current_latency_ms(&self) -> i64 {
        self.latency_ms.load(Ordering::Relaxed)
    }

    fn self_id(&self) -> Option<String> {
        self.self_id.clone()
    }
}

// =============================================================================
// Builders
// =============================================================================

/// Builds a context around `transport` with a fresh cooldown tracker.
pub fn context(
    settings: BotSettings,
    registry: Registry,
    transport: Arc<RecordingTransport>,
) -> Arc<BotContext> {
    let transport: BoxedTransport = transport;
    Arc::new(BotContext::new(
        settings,
        Arc::new(registry),
        CooldownTracker::new(),
        transport,
        StaticGateway::new(42, "bot-self"),
    ))
}

/// A guild text message from `author_id`.
pub fn message(author_id: &str, content: &str) -> MessageEvent {
    MessageEvent {
        id: format!("msg-{author_id}"),
        channel_id: "channel-1".to_string(),
        channel_kind: ChannelKind::GuildText,
        scope: Some(TEST_SCOPE.to_string()),
        author: Author::user(author_id, author_id),
        content: content.to_string(),
    }
}

/// A slash command invocation of `name` by `user_id`.
pub fn interaction(user_id: &str, name: &str) -> InteractionEvent {
    InteractionEvent {
        id: format!("int-{user_id}"),
        kind: InteractionKind::Command,
        command_name: name.to_string(),
        options: serde_json::Value::Null,
        user: Author::user(user_id, user_id),
        channel_id: "channel-1".to_string(),
        scope: Some(TEST_SCOPE.to_string()),
    }
}

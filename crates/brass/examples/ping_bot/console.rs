//! A transport that reads events from stdin and prints replies to stdout.
//!
//! Each input line becomes one event:
//!
//! - `/name` is a slash command invocation of `name`;
//! - anything else is a guild text message.
//!
//! A ready event is delivered before the first line.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use brass::core::{
    Author, CapabilitySet, ChannelKind, Credentials, Gateway, InteractionEvent, InteractionKind,
    MessageEvent, Principal, RawEvent, ReadyEvent, Reply, ReplyTarget, SlashCommandData,
    Transport, TransportResult,
};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::sync::Mutex;
use tracing::{debug, info};

const CHANNEL: &str = "console";
const SCOPE: &str = "console-guild";
pub const SELF_ID: &str = "ping-bot";

pub struct ConsoleTransport {
    user: Author,
    lines: Mutex<Lines<BufReader<Stdin>>>,
    ready_sent: AtomicBool,
    next_id: AtomicU64,
}

impl ConsoleTransport {
    pub fn new(user_id: &str) -> Self {
        Self {
            user: Author::user(user_id, user_id),
            lines: Mutex::new(BufReader::new(tokio::io::stdin()).lines()),
            ready_sent: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
        }
    }

    fn event_for(&self, line: &str) -> RawEvent {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        match line.strip_prefix('/') {
            Some(name) => RawEvent::InteractionCreate(InteractionEvent {
                id,
                kind: InteractionKind::Command,
                command_name: name.trim().to_string(),
                options: Default::default(),
                user: self.user.clone(),
                channel_id: CHANNEL.to_string(),
                scope: Some(SCOPE.to_string()),
            }),
            None => RawEvent::MessageCreate(MessageEvent {
                id,
                channel_id: CHANNEL.to_string(),
                channel_kind: ChannelKind::GuildText,
                scope: Some(SCOPE.to_string()),
                author: self.user.clone(),
                content: line.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn next_event(&self) -> Option<RawEvent> {
        if !self.ready_sent.swap(true, Ordering::SeqCst) {
            return Some(RawEvent::Ready(ReadyEvent {
                user: Author::bot(SELF_ID, "Ping Bot#0001"),
                scope_count: 1,
            }));
        }

        let mut lines = self.lines.lock().await;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) if line.trim().is_empty() => continue,
                Ok(Some(line)) => return Some(self.event_for(&line)),
                Ok(None) => return None,
                Err(err) => {
                    debug!(error = %err, "Failed to read stdin");
                    return None;
                }
            }
        }
    }

    async fn send_reply(&self, _target: &ReplyTarget, reply: Reply) -> TransportResult<()> {
        println!("{reply}");
        Ok(())
    }

    async fn scoped_capabilities_of(
        &self,
        _principal: &Principal,
        _scope: &str,
    ) -> TransportResult<CapabilitySet> {
        Ok(CapabilitySet::new())
    }

    async fn bulk_register(
        &self,
        credentials: &Credentials,
        commands: &[SlashCommandData],
    ) -> TransportResult<usize> {
        info!(
            application_id = %credentials.application_id,
            commands = commands.len(),
            "Registering slash commands (console, nothing is sent)"
        );
        Ok(commands.len())
    }
}

/// Reports a fixed heartbeat latency.
pub struct ConsoleGateway {
    pub latency_ms: i64,
}

impl Gateway for ConsoleGateway {
    fn current_latency_ms(&self) -> i64 {
        self.latency_ms
    }

    fn self_id(&self) -> Option<String> {
        Some(SELF_ID.to_string())
    }
}

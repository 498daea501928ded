//! Per-event dispatch.
//!
//! The [`Dispatcher`] turns one inbound message or interaction into at most
//! one handler invocation:
//!
//! ```text
//! message ──▶ filter ──▶ prefix split ──▶ resolve ──▶ GateLayer ──▶ InvokeService
//!                                           │ miss        │ deny         │ error
//!                                           ▼             ▼              ▼
//!                                       not found      denial       execution
//!                                        notice        notice      error notice
//! ```
//!
//! Every step is logged at `debug` inside a `dispatch` span. The returned
//! [`DispatchOutcome`] says how far the event got.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use brass_core::{
    ChannelKind, InteractionEvent, MessageEvent, RawEvent, Reply, ReplyTarget,
};
use futures::FutureExt;
use tower::{ServiceBuilder, ServiceExt};
use tracing::{Instrument, Level, debug, error, span, warn};

use crate::context::{BotContext, InteractionContext, MessageContext};
use crate::error::{InvokeError, panic_message};
use crate::gate::{Actor, Denial, Gate, GateLayer};
use crate::notice::Notices;
use crate::service::{Invocation, InvocationTarget, InvokeService};

/// How far an event got through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Not addressed to the bot, or not something it handles.
    Ignored,
    /// The command token did not resolve.
    NotFound,
    /// The gate refused the invocation.
    Denied(Denial),
    /// The handler ran to completion.
    Completed,
    /// The handler returned an error or panicked.
    Failed,
}

/// Splits `<prefix><command> args...` into a lower-cased command token and its arguments.
///
/// The prefix is matched case-insensitively; whitespace between prefix and
/// command is allowed. Returns `None` when the prefix is absent or no command
/// follows it.
pub fn split_command(content: &str, prefix: &str) -> Option<(String, Vec<String>)> {
    let rest = strip_prefix_ignore_case(content, prefix)?;
    let mut words = rest.split_whitespace();
    let command = words.next()?.to_lowercase();
    Some((command, words.map(str::to_string).collect()))
}

fn strip_prefix_ignore_case<'a>(content: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return None;
    }
    let mut rest = content.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = rest.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    let offset = rest.next().map_or(content.len(), |(index, _)| index);
    Some(&content[offset..])
}

/// Routes events to handlers through the gate.
#[derive(Clone)]
pub struct Dispatcher {
    ctx: Arc<BotContext>,
}

impl Dispatcher {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    /// Routes any event by kind; events other than messages and interactions are ignored.
    pub async fn on_event(&self, event: &RawEvent) -> DispatchOutcome {
        match event {
            RawEvent::MessageCreate(message) => self.on_message(Arc::new(message.clone())).await,
            RawEvent::InteractionCreate(interaction) => {
                self.on_interaction(Arc::new(interaction.clone())).await
            }
            _ => DispatchOutcome::Ignored,
        }
    }

    /// Handles a posted message.
    pub async fn on_message(&self, message: Arc<MessageEvent>) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            kind = "message",
            message_id = %message.id,
            author = %message.author.id
        );
        self.handle_message(message).instrument(span).await
    }

    async fn handle_message(&self, message: Arc<MessageEvent>) -> DispatchOutcome {
        if message.author.bot
            || self.ctx.gateway().self_id().as_deref() == Some(message.author.id.as_str())
        {
            debug!("Ignoring message from a bot account");
            return DispatchOutcome::Ignored;
        }
        if message.channel_kind != ChannelKind::GuildText {
            debug!(channel_kind = ?message.channel_kind, "Ignoring message outside a guild text channel");
            return DispatchOutcome::Ignored;
        }

        let settings = self.ctx.settings();
        let Some((token, args)) = split_command(&message.content, &settings.prefix) else {
            return DispatchOutcome::Ignored;
        };
        debug!(command = %token, args = args.len(), "Parsed command");

        let target = ReplyTarget::from(message.as_ref());
        let Some(command) = self.ctx.registry().resolve(&token) else {
            let suggestion = self
                .ctx
                .registry()
                .suggest(&token, settings.dispatch.suggestion_threshold);
            debug!(command = %token, suggestion = ?suggestion, "Command not found");
            let notice = Notices::new(settings).not_found(&token, suggestion.as_ref());
            self.send(&target, notice).await;
            return DispatchOutcome::NotFound;
        };

        let actor = Actor::new(
            message.author.id.clone(),
            message.scope.clone(),
            self.ctx.is_elevated(&message.author.id),
        );
        let invocation = Invocation {
            target: InvocationTarget::Command {
                command,
                message: MessageContext::new(Arc::clone(&message), Arc::clone(self.ctx.transport())),
                args,
            },
            actor,
        };

        match self.invoke(invocation).await {
            Ok(()) => DispatchOutcome::Completed,
            Err(InvokeError::Denied(denial)) => {
                self.send(&target, Notices::new(settings).denial(&denial)).await;
                DispatchOutcome::Denied(denial)
            }
            Err(err) => {
                let notice = self.failure_notice(&err, &message.author.id);
                self.send(&target, notice).await;
                DispatchOutcome::Failed
            }
        }
    }

    /// Handles a user interaction.
    pub async fn on_interaction(&self, interaction: Arc<InteractionEvent>) -> DispatchOutcome {
        let span = span!(
            Level::DEBUG,
            "dispatch",
            kind = "interaction",
            interaction_id = %interaction.id,
            command = %interaction.command_name,
            user = %interaction.user.id
        );
        self.handle_interaction(interaction).instrument(span).await
    }

    async fn handle_interaction(&self, interaction: Arc<InteractionEvent>) -> DispatchOutcome {
        if !interaction.is_command() {
            debug!(kind = ?interaction.kind, "Ignoring non-command interaction");
            return DispatchOutcome::Ignored;
        }

        let Some(command) = self.ctx.registry().slash_command(&interaction.command_name) else {
            debug!("Unknown slash command, ignoring");
            return DispatchOutcome::Ignored;
        };

        let actor = Actor::new(
            interaction.user.id.clone(),
            interaction.scope.clone(),
            self.ctx.is_elevated(&interaction.user.id),
        );
        let responder =
            InteractionContext::new(Arc::clone(&interaction), Arc::clone(self.ctx.transport()));
        let invocation = Invocation {
            target: InvocationTarget::Slash {
                command,
                interaction: responder.clone(),
            },
            actor,
        };

        match self.invoke(invocation).await {
            Ok(()) => DispatchOutcome::Completed,
            Err(InvokeError::Denied(denial)) => {
                let notice = Notices::new(self.ctx.settings())
                    .denial(&denial)
                    .ephemeral(true);
                if let Err(err) = responder.respond(notice).await {
                    warn!(error = %err, "Failed to send denial notice");
                }
                DispatchOutcome::Denied(denial)
            }
            Err(err) => {
                let notice = self
                    .failure_notice(&err, &interaction.user.id)
                    .ephemeral(true);
                if let Err(err) = responder.respond(notice).await {
                    warn!(error = %err, "Failed to send error notice");
                }
                DispatchOutcome::Failed
            }
        }
    }

    /// Runs an invocation through the gate and the handler.
    async fn invoke(&self, invocation: Invocation) -> Result<(), InvokeError> {
        let handler = invocation.handler().gate_name().to_string();
        let started = Instant::now();

        let stack = ServiceBuilder::new()
            .layer(GateLayer::new(Gate::new(Arc::clone(&self.ctx))))
            .service(InvokeService::new(Arc::clone(&self.ctx)));
        let result = match AssertUnwindSafe(stack.oneshot(invocation)).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => Err(InvokeError::System(panic_message(payload.as_ref()))),
        };

        match &result {
            Ok(()) => debug!(
                handler = %handler,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Handler completed"
            ),
            Err(InvokeError::Denied(_)) => {}
            Err(err) => error!(handler = %handler, error = %err, "Handler failed"),
        }
        result
    }

    fn failure_notice(&self, err: &InvokeError, actor_id: &str) -> Reply {
        let settings = self.ctx.settings();
        if let InvokeError::System(_) = err {
            return Notices::new(settings).system_error();
        }
        let reveal = self.ctx.is_elevated(actor_id) || settings.dispatch.expose_error_details;
        Notices::new(settings).execution_error(&err.detail(), reveal)
    }

    async fn send(&self, target: &ReplyTarget, reply: Reply) {
        if let Err(err) = self.ctx.transport().send_reply(target, reply).await {
            warn!(error = %err, "Failed to send notice");
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("prefix", &self.ctx.settings().prefix)
            .finish()
    }
}

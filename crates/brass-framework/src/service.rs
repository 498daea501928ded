//! The invocation service: runs a resolved handler with error and panic isolation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::BoxFuture;
use tower::Service;

use crate::context::{BotContext, InteractionContext, MessageContext};
use crate::descriptor::{CommandDescriptor, Gated, SlashCommandDescriptor};
use crate::error::{InvokeError, panic_message};
use crate::gate::Actor;

/// The handler half of an invocation.
#[derive(Clone)]
pub enum InvocationTarget {
    Command {
        command: Arc<CommandDescriptor>,
        message: MessageContext,
        args: Vec<String>,
    },
    Slash {
        command: Arc<SlashCommandDescriptor>,
        interaction: InteractionContext,
    },
}

/// A resolved invocation: which handler, with what input, for whom.
///
/// Lives for a single dispatch cycle.
#[derive(Clone)]
pub struct Invocation {
    pub target: InvocationTarget,
    pub actor: Actor,
}

impl Invocation {
    /// The handler as seen by the gate.
    pub fn handler(&self) -> &dyn Gated {
        match &self.target {
            InvocationTarget::Command { command, .. } => command.as_ref(),
            InvocationTarget::Slash { command, .. } => command.as_ref(),
        }
    }

    /// Raw arguments (empty for slash commands).
    pub fn args(&self) -> &[String] {
        match &self.target {
            InvocationTarget::Command { args, .. } => args,
            InvocationTarget::Slash { .. } => &[],
        }
    }
}

/// Innermost service of the dispatch stack; calls the handler body.
#[derive(Clone)]
pub struct InvokeService {
    ctx: Arc<BotContext>,
}

impl InvokeService {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }
}

impl Service<Invocation> for InvokeService {
    type Response = ();
    type Error = InvokeError;
    type Future = BoxFuture<'static, Result<(), InvokeError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        let ctx = Arc::clone(&self.ctx);

        async move {
            // Build the handler future inside the guarded block so a panic
            // while constructing it is caught too.
            let run = async move {
                match invocation.target {
                    InvocationTarget::Command {
                        command,
                        message,
                        args,
                    } => (command.run)(ctx, message, args).await,
                    InvocationTarget::Slash {
                        command,
                        interaction,
                    } => (command.run)(ctx, interaction).await,
                }
            };

            match AssertUnwindSafe(run).catch_unwind().await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(InvokeError::Failed(err)),
                Err(payload) => Err(InvokeError::Panicked(panic_message(payload.as_ref()))),
            }
        }
        .boxed()
    }
}

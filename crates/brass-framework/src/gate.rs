//! The prerequisite gate.
//!
//! Every resolved invocation passes through [`Gate::authorize`] before its
//! handler runs. Checks run in a fixed order and stop at the first denial:
//!
//! 1. owner-only (settings or the `owner` category) and the actor is not elevated;
//! 2. disabled and the actor is not elevated;
//! 3. beta-only, the actor is not elevated and not on the beta allow-list;
//! 4. the actor lacks a required capability in the current scope;
//! 5. the bot lacks a required capability in the current scope;
//! 6. the actor is inside an open cooldown window.
//!
//! Checks 4 and 5 only run when the invocation has a scope. Elevated actors
//! bypass checks 1–3 but never 4–6. A failed capability lookup denies the
//! check it belongs to.
//!
//! [`GateLayer`] puts the same checks in front of any tower service that
//! consumes [`Invocation`]s.

use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use brass_core::{CapabilitySet, Principal};
use futures::FutureExt;
use futures::future::BoxFuture;
use tower::Service;
use tower_layer::Layer;
use tracing::{debug, warn};

use crate::context::BotContext;
use crate::cooldown::window_from_secs;
use crate::descriptor::Gated;
use crate::error::InvokeError;
use crate::service::Invocation;

/// The user an invocation runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    /// Permission scope (guild) of the invocation, if any.
    pub scope: Option<String>,
    /// Owner status; bypasses the owner, disabled and beta checks.
    pub is_elevated: bool,
}

impl Actor {
    pub fn new(id: impl Into<String>, scope: Option<String>, is_elevated: bool) -> Self {
        Self {
            id: id.into(),
            scope,
            is_elevated,
        }
    }
}

/// Why the gate refused an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Denial {
    Unauthorized,
    TemporarilyDisabled,
    BetaOnly,
    InsufficientUserPermission { missing: CapabilitySet },
    InsufficientBotPermission { missing: CapabilitySet },
    RateLimited { remaining: Duration },
}

/// Result of [`Gate::authorize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
    Allowed,
    Denied(Denial),
}

impl Authorization {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }
}

/// Ordered authorization and rate-limit checks.
#[derive(Clone)]
pub struct Gate {
    ctx: Arc<BotContext>,
}

impl Gate {
    pub fn new(ctx: Arc<BotContext>) -> Self {
        Self { ctx }
    }

    /// Runs all checks for `handler` on behalf of `actor`.
    ///
    /// Opening a cooldown window is the last step, so a denial by any earlier
    /// check never consumes the actor's cooldown.
    pub async fn authorize(&self, handler: &dyn Gated, actor: &Actor) -> Authorization {
        let settings = handler.gate_settings();

        if handler.is_owner_only() && !actor.is_elevated {
            return Authorization::Denied(Denial::Unauthorized);
        }

        if settings.disabled && !actor.is_elevated {
            return Authorization::Denied(Denial::TemporarilyDisabled);
        }

        if settings.beta_only
            && !actor.is_elevated
            && !self.ctx.settings().is_beta_tester(&actor.id)
        {
            return Authorization::Denied(Denial::BetaOnly);
        }

        if let Some(scope) = actor.scope.as_deref() {
            let principal = Principal::User(actor.id.clone());
            let required = handler.required_user_capabilities();
            if let Some(missing) = self.missing_capabilities(required, &principal, scope).await {
                return Authorization::Denied(Denial::InsufficientUserPermission { missing });
            }

            let required = handler.required_bot_capabilities();
            if let Some(missing) = self.missing_capabilities(required, &Principal::Bot, scope).await
            {
                return Authorization::Denied(Denial::InsufficientBotPermission { missing });
            }
        }

        let window = window_from_secs(settings.cooldown);
        if let Err(remaining) = self
            .ctx
            .cooldowns()
            .acquire(handler.gate_name(), &actor.id, window)
        {
            return Authorization::Denied(Denial::RateLimited { remaining });
        }

        Authorization::Allowed
    }

    /// Returns the capabilities `principal` lacks, or `None` if it has them all.
    async fn missing_capabilities(
        &self,
        required: &CapabilitySet,
        principal: &Principal,
        scope: &str,
    ) -> Option<CapabilitySet> {
        if required.is_empty() {
            return None;
        }

        match self
            .ctx
            .transport()
            .scoped_capabilities_of(principal, scope)
            .await
        {
            Ok(granted) if required.is_subset_of(&granted) => None,
            Ok(granted) => Some(required.missing_from(&granted)),
            Err(err) => {
                warn!(%principal, scope, error = %err, "Capability lookup failed, denying");
                Some(required.clone())
            }
        }
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").finish_non_exhaustive()
    }
}

// =============================================================================
// Tower integration
// =============================================================================

/// A tower [`Layer`] that authorizes each [`Invocation`] before the inner service.
#[derive(Clone, Debug)]
pub struct GateLayer {
    gate: Gate,
}

impl GateLayer {
    pub fn new(gate: Gate) -> Self {
        Self { gate }
    }
}

impl<S> Layer<S> for GateLayer {
    type Service = GateService<S>;

    fn layer(&self, inner: S) -> GateService<S> {
        GateService {
            gate: self.gate.clone(),
            inner,
        }
    }
}

/// The [`Service`] produced by [`GateLayer`].
///
/// A denial short-circuits with [`InvokeError::Denied`]; the inner service
/// is only called for allowed invocations.
#[derive(Clone, Debug)]
pub struct GateService<S> {
    gate: Gate,
    inner: S,
}

impl<S> Service<Invocation> for GateService<S>
where
    S: Service<Invocation, Response = (), Error = InvokeError> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = ();
    type Error = InvokeError;
    type Future = BoxFuture<'static, Result<(), InvokeError>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, invocation: Invocation) -> Self::Future {
        let gate = self.gate.clone();
        let mut inner = self.inner.clone();

        async move {
            match gate.authorize(invocation.handler(), &invocation.actor).await {
                Authorization::Allowed => inner.call(invocation).await,
                Authorization::Denied(denial) => {
                    debug!(
                        handler = invocation.handler().gate_name(),
                        actor = %invocation.actor.id,
                        ?denial,
                        "Invocation denied"
                    );
                    Err(InvokeError::Denied(denial))
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::CommandDescriptor;
    use crate::registry::Registry;
    use crate::settings::BotSettings;
    use crate::testing::{self, RecordingTransport, TEST_SCOPE};

    fn noop(name: &str) -> CommandDescriptor {
        CommandDescriptor::new(name, |_, _, _| async { Ok(()) })
    }

    fn gate_with(settings: BotSettings, transport: &Arc<RecordingTransport>) -> Gate {
        Gate::new(testing::context(settings, Registry::new(), Arc::clone(transport)))
    }

    fn user(id: &str) -> Actor {
        Actor::new(id, Some(TEST_SCOPE.to_string()), false)
    }

    fn owner(id: &str) -> Actor {
        Actor::new(id, Some(TEST_SCOPE.to_string()), true)
    }

    #[tokio::test]
    async fn test_checks_run_in_order() {
        let transport = RecordingTransport::new();
        let gate = gate_with(BotSettings::default(), &transport);

        let everything = noop("all")
            .owner_only()
            .disabled()
            .beta_only()
            .user_permissions(["ManageGuild"])
            .cooldown(10.0);
        assert_eq!(
            gate.authorize(&everything, &user("u1")).await,
            Authorization::Denied(Denial::Unauthorized)
        );

        let disabled_beta = noop("db").disabled().beta_only();
        assert_eq!(
            gate.authorize(&disabled_beta, &user("u1")).await,
            Authorization::Denied(Denial::TemporarilyDisabled)
        );

        let beta_with_caps = noop("bc").beta_only().user_permissions(["ManageGuild"]);
        assert_eq!(
            gate.authorize(&beta_with_caps, &user("u1")).await,
            Authorization::Denied(Denial::BetaOnly)
        );

        let both_caps = noop("caps")
            .user_permissions(["ManageGuild"])
            .bot_permissions(["SendMessages"]);
        assert!(matches!(
            gate.authorize(&both_caps, &user("u1")).await,
            Authorization::Denied(Denial::InsufficientUserPermission { .. })
        ));

        transport.grant(Principal::User("u1".into()), TEST_SCOPE, ["ManageGuild"]);
        assert_eq!(
            gate.authorize(&both_caps, &user("u1")).await,
            Authorization::Denied(Denial::InsufficientBotPermission {
                missing: ["SendMessages"].into_iter().collect()
            })
        );
    }

    #[tokio::test]
    async fn test_owner_category_counts_as_owner_only() {
        let transport = RecordingTransport::new();
        let gate = gate_with(BotSettings::default(), &transport);
        let command = noop("reload").in_category("Owner");

        assert_eq!(
            gate.authorize(&command, &user("u1")).await,
            Authorization::Denied(Denial::Unauthorized)
        );
        assert!(gate.authorize(&command, &owner("o1")).await.is_allowed());
    }

    #[tokio::test]
    async fn test_elevated_bypasses_flags_but_not_capabilities() {
        let transport = RecordingTransport::new();
        let gate = gate_with(BotSettings::default(), &transport);

        let flagged = noop("flagged").owner_only().disabled().beta_only();
        assert!(gate.authorize(&flagged, &owner("o1")).await.is_allowed());

        let guarded = noop("guarded").user_permissions(["Administrator"]);
        assert!(matches!(
            gate.authorize(&guarded, &owner("o1")).await,
            Authorization::Denied(Denial::InsufficientUserPermission { .. })
        ));
    }

    #[tokio::test]
    async fn test_beta_allow_list() {
        let transport = RecordingTransport::new();
        let settings = BotSettings {
            beta: vec!["tester".into()],
            ..BotSettings::default()
        };
        let gate = gate_with(settings, &transport);
        let command = noop("preview").beta_only();

        assert!(gate.authorize(&command, &user("tester")).await.is_allowed());
        assert_eq!(
            gate.authorize(&command, &user("u1")).await,
            Authorization::Denied(Denial::BetaOnly)
        );
    }

    #[tokio::test]
    async fn test_capabilities_skipped_without_scope() {
        let transport = RecordingTransport::new();
        transport.fail_capability_lookups(true);
        let gate = gate_with(BotSettings::default(), &transport);
        let command = noop("ban").user_permissions(["BanMembers"]);

        let unscoped = Actor::new("u1", None, false);
        assert!(gate.authorize(&command, &unscoped).await.is_allowed());
    }

    #[tokio::test]
    async fn test_lookup_failure_denies_with_full_requirement() {
        let transport = RecordingTransport::new();
        transport.fail_capability_lookups(true);
        let gate = gate_with(BotSettings::default(), &transport);
        let command = noop("purge").bot_permissions(["ManageMessages", "ReadMessageHistory"]);

        assert_eq!(
            gate.authorize(&command, &user("u1")).await,
            Authorization::Denied(Denial::InsufficientBotPermission {
                missing: ["ManageMessages", "ReadMessageHistory"].into_iter().collect()
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_earlier_denial_does_not_consume_cooldown() {
        let transport = RecordingTransport::new();
        let gate = gate_with(BotSettings::default(), &transport);
        let command = noop("work").user_permissions(["SendMessages"]).cooldown(5.0);

        assert!(!gate.authorize(&command, &user("u1")).await.is_allowed());
        assert!(!gate.ctx.cooldowns().has_entry("work", "u1"));

        transport.grant(Principal::User("u1".into()), TEST_SCOPE, ["SendMessages"]);
        assert!(gate.authorize(&command, &user("u1")).await.is_allowed());
        assert!(matches!(
            gate.authorize(&command, &user("u1")).await,
            Authorization::Denied(Denial::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn test_layer_short_circuits_denials() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        use tower::{ServiceBuilder, ServiceExt};

        use crate::context::MessageContext;
        use crate::service::{InvocationTarget, InvokeService};

        let counter = Arc::new(AtomicUsize::new(0));
        let handler_counter = Arc::clone(&counter);
        let command = Arc::new(
            CommandDescriptor::new("secret", move |_, _, _| {
                let counter = Arc::clone(&handler_counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .owner_only(),
        );

        let transport = RecordingTransport::new();
        let ctx = testing::context(BotSettings::default(), Registry::new(), Arc::clone(&transport));
        let invocation = |actor: Actor| Invocation {
            target: InvocationTarget::Command {
                command: Arc::clone(&command),
                message: MessageContext::new(
                    Arc::new(testing::message(&actor.id, "!secret")),
                    Arc::clone(ctx.transport()),
                ),
                args: Vec::new(),
            },
            actor,
        };
        let stack = ServiceBuilder::new()
            .layer(GateLayer::new(Gate::new(Arc::clone(&ctx))))
            .service(InvokeService::new(Arc::clone(&ctx)));

        let denied = stack.clone().oneshot(invocation(user("u1"))).await;
        assert!(matches!(denied, Err(InvokeError::Denied(Denial::Unauthorized))));
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        tokio_test::assert_ok!(stack.oneshot(invocation(owner("o1"))).await);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}

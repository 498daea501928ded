//! Handler descriptors.
//!
//! A descriptor is everything the registry and the gate need to know about a
//! handler, plus the type-erased async function that runs it.
//!
//! ```rust,ignore
//! use brass_framework::descriptor::CommandDescriptor;
//!
//! let ping = CommandDescriptor::new("ping", |ctx, msg, _args| async move {
//!     msg.reply(Reply::text(format!("{}ms", ctx.gateway().current_latency_ms()))).await?;
//!     Ok(())
//! })
//! .alias("latency")
//! .cooldown(5.0);
//! ```

use std::future::Future;
use std::sync::Arc;

use brass_core::{BoxFuture, CapabilitySet, RawEvent, SlashCommandData};
use futures::FutureExt;

use crate::context::{BotContext, InteractionContext, MessageContext};

// =============================================================================
// Handler function types
// =============================================================================

/// Type-erased message command body.
pub type CommandFn = Arc<
    dyn Fn(Arc<BotContext>, MessageContext, Vec<String>) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// Type-erased slash command body.
pub type SlashCommandFn = Arc<
    dyn Fn(Arc<BotContext>, InteractionContext) -> BoxFuture<'static, anyhow::Result<()>>
        + Send
        + Sync,
>;

/// Type-erased event handler body.
pub type EventFn =
    Arc<dyn Fn(Arc<BotContext>, Arc<RawEvent>) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

fn into_command_fn<F, Fut>(run: F) -> CommandFn
where
    F: Fn(Arc<BotContext>, MessageContext, Vec<String>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, msg, args| run(ctx, msg, args).boxed())
}

fn into_slash_fn<F, Fut>(run: F) -> SlashCommandFn
where
    F: Fn(Arc<BotContext>, InteractionContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, interaction| run(ctx, interaction).boxed())
}

fn into_event_fn<F, Fut>(execute: F) -> EventFn
where
    F: Fn(Arc<BotContext>, Arc<RawEvent>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |ctx, event| execute(ctx, event).boxed())
}

// =============================================================================
// Settings shared by both command styles
// =============================================================================

/// Access and rate-limit flags of a command.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommandSettings {
    pub owner_only: bool,
    pub beta_only: bool,
    pub disabled: bool,
    /// Cooldown window in seconds. `None` or `0` disables rate limiting.
    pub cooldown: Option<f64>,
}

/// What the gate inspects on a handler.
pub trait Gated: Send + Sync {
    /// Name used in logs and as the cooldown namespace.
    fn gate_name(&self) -> &str;

    fn gate_category(&self) -> Option<&str>;

    fn gate_settings(&self) -> &CommandSettings;

    fn required_user_capabilities(&self) -> &CapabilitySet;

    fn required_bot_capabilities(&self) -> &CapabilitySet;

    /// Owner-only through settings or through the `owner` category.
    fn is_owner_only(&self) -> bool {
        self.gate_settings().owner_only
            || self
                .gate_category()
                .is_some_and(|category| category.eq_ignore_ascii_case("owner"))
    }
}

macro_rules! gated_builders {
    () => {
        /// Restricts the command to owners.
        pub fn owner_only(mut self) -> Self {
            self.settings.owner_only = true;
            self
        }

        /// Restricts the command to owners and beta testers.
        pub fn beta_only(mut self) -> Self {
            self.settings.beta_only = true;
            self
        }

        /// Marks the command as under maintenance.
        pub fn disabled(mut self) -> Self {
            self.settings.disabled = true;
            self
        }

        /// Sets the per-user cooldown window in seconds.
        pub fn cooldown(mut self, seconds: f64) -> Self {
            self.settings.cooldown = Some(seconds);
            self
        }

        /// Replaces all settings at once.
        pub fn with_settings(mut self, settings: CommandSettings) -> Self {
            self.settings = settings;
            self
        }

        /// Capabilities the invoking user must hold in the scope.
        pub fn user_permissions<I, S>(mut self, permissions: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.user_permissions = permissions.into_iter().collect();
            self
        }

        /// Capabilities the bot must hold in the scope.
        pub fn bot_permissions<I, S>(mut self, permissions: I) -> Self
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            self.bot_permissions = permissions.into_iter().collect();
            self
        }

        /// Sets the category. The loader overwrites it with the source category.
        pub fn in_category(mut self, category: impl Into<String>) -> Self {
            self.category = Some(category.into());
            self
        }
    };
}

// =============================================================================
// CommandDescriptor
// =============================================================================

/// A message-style command, triggered by `<prefix><name> args...`.
#[derive(Clone)]
pub struct CommandDescriptor {
    pub name: String,
    pub aliases: Vec<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub settings: CommandSettings,
    pub user_permissions: CapabilitySet,
    pub bot_permissions: CapabilitySet,
    pub run: CommandFn,
}

impl CommandDescriptor {
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(Arc<BotContext>, MessageContext, Vec<String>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            description: None,
            category: None,
            settings: CommandSettings::default(),
            user_permissions: CapabilitySet::new(),
            bot_permissions: CapabilitySet::new(),
            run: into_command_fn(run),
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    gated_builders!();
}

impl Gated for CommandDescriptor {
    fn gate_name(&self) -> &str {
        &self.name
    }

    fn gate_category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn gate_settings(&self) -> &CommandSettings {
        &self.settings
    }

    fn required_user_capabilities(&self) -> &CapabilitySet {
        &self.user_permissions
    }

    fn required_bot_capabilities(&self) -> &CapabilitySet {
        &self.bot_permissions
    }
}

impl std::fmt::Debug for CommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDescriptor")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("category", &self.category)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// SlashCommandDescriptor
// =============================================================================

/// A request/response command, registered with the chat service.
#[derive(Clone)]
pub struct SlashCommandDescriptor {
    pub data: SlashCommandData,
    pub category: Option<String>,
    pub settings: CommandSettings,
    pub user_permissions: CapabilitySet,
    pub bot_permissions: CapabilitySet,
    pub run: SlashCommandFn,
}

impl SlashCommandDescriptor {
    pub fn new<F, Fut>(data: SlashCommandData, run: F) -> Self
    where
        F: Fn(Arc<BotContext>, InteractionContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            data,
            category: None,
            settings: CommandSettings::default(),
            user_permissions: CapabilitySet::new(),
            bot_permissions: CapabilitySet::new(),
            run: into_slash_fn(run),
        }
    }

    pub fn name(&self) -> &str {
        &self.data.name
    }

    gated_builders!();
}

impl Gated for SlashCommandDescriptor {
    fn gate_name(&self) -> &str {
        &self.data.name
    }

    fn gate_category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    fn gate_settings(&self) -> &CommandSettings {
        &self.settings
    }

    fn required_user_capabilities(&self) -> &CapabilitySet {
        &self.user_permissions
    }

    fn required_bot_capabilities(&self) -> &CapabilitySet {
        &self.bot_permissions
    }
}

impl std::fmt::Debug for SlashCommandDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlashCommandDescriptor")
            .field("data", &self.data)
            .field("category", &self.category)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// EventDescriptor
// =============================================================================

/// A handler bound to a named event.
#[derive(Clone)]
pub struct EventDescriptor {
    pub name: String,
    /// Fire on the first future occurrence only.
    pub once: bool,
    pub execute: EventFn,
}

impl EventDescriptor {
    /// Binds to every occurrence of `name`.
    pub fn on<F, Fut>(name: impl Into<String>, execute: F) -> Self
    where
        F: Fn(Arc<BotContext>, Arc<RawEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            once: false,
            execute: into_event_fn(execute),
        }
    }

    /// Binds to the next occurrence of `name` only.
    pub fn once<F, Fut>(name: impl Into<String>, execute: F) -> Self
    where
        F: Fn(Arc<BotContext>, Arc<RawEvent>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            once: true,
            ..Self::on(name, execute)
        }
    }
}

impl std::fmt::Debug for EventDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDescriptor")
            .field("name", &self.name)
            .field("once", &self.once)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let command = CommandDescriptor::new("ban", |_, _, _| async { Ok(()) })
            .alias("b")
            .description("Ban a member")
            .cooldown(3.0)
            .user_permissions(["BanMembers"])
            .bot_permissions(["BanMembers"]);

        assert_eq!(command.aliases, vec!["b".to_string()]);
        assert_eq!(command.settings.cooldown, Some(3.0));
        assert!(command.user_permissions.contains("BanMembers"));
        assert!(!command.is_owner_only());
    }

    #[test]
    fn test_owner_category_implies_owner_only() {
        let command = CommandDescriptor::new("eval", |_, _, _| async { Ok(()) })
            .in_category("Owner");
        assert!(command.is_owner_only());

        let slash = SlashCommandDescriptor::new(SlashCommandData::new("eval", "Eval"), |_, _| async {
            Ok(())
        })
        .owner_only();
        assert!(slash.is_owner_only());
        assert_eq!(slash.name(), "eval");
    }

    #[test]
    fn test_event_binding_kind() {
        let once = EventDescriptor::once("ready", |_, _| async { Ok(()) });
        let every = EventDescriptor::on("messageCreate", |_, _| async { Ok(()) });
        assert!(once.once);
        assert!(!every.once);
    }
}

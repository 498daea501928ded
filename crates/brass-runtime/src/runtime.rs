//! Runtime orchestration: configuration → load → run → shutdown.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use brass_runtime::BrassRuntime;
//!
//! // Auto-loads brass.toml from the current directory
//! let runtime = BrassRuntime::new();
//!
//! // Or with a specific file and profile
//! let runtime = BrassRuntime::builder()
//!     .config_file("config/brass.toml")
//!     .profile("production")
//!     .build()?;
//!
//! let bot = runtime.load(transport, gateway).await?;
//! bot.run().await?;
//! ```
//!
//! Handler sources default to everything registered with the `command!`,
//! `slash_command!` and `event!` macros; [`BrassRuntime::commands`] and its
//! siblings add hand-built sources on top.

use std::sync::Arc;

use brass_core::{BoxedGateway, BoxedTransport, INTERACTION_CREATE, MESSAGE_CREATE, READY, RawEvent};
use brass_framework::{
    BotContext, CommandDescriptor, CooldownTracker, Dispatcher, EventBus, EventDescriptor,
    EventFn, HandlerSources, Loader, SlashCommandDescriptor,
};
use futures::FutureExt;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bot::{Bot, LoadSummary};
use crate::config::{BrassConfig, ConfigLoader, ConfigResult, validate_config};
use crate::error::RuntimeResult;
use crate::logging;

/// Loads handlers for one bot and hands back a runnable [`Bot`].
pub struct BrassRuntime {
    config: BrassConfig,
    discover: bool,
    commands: HandlerSources<CommandDescriptor>,
    slash_commands: HandlerSources<SlashCommandDescriptor>,
    events: HandlerSources<EventDescriptor>,
}

impl BrassRuntime {
    /// Creates a runtime from `brass.toml` in the current directory.
    ///
    /// Falls back to defaults if the configuration cannot be loaded.
    pub fn new() -> Self {
        let config = ConfigLoader::new()
            .with_current_dir()
            .with_user_config_dir()
            .load()
            .unwrap_or_else(|e| {
                eprintln!("Warning: Failed to load config ({e}), using defaults");
                BrassConfig::default()
            });

        Self::from_config(&config)
    }

    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }

    /// Creates a runtime from configuration and initializes logging from it.
    pub fn from_config(config: &BrassConfig) -> Self {
        logging::init_from_config(&config.logging);

        info!(
            prefix = %config.bot.prefix,
            owners = config.bot.owners.len(),
            log_level = %config.logging.level,
            "Runtime initialized from configuration"
        );

        Self {
            config: config.clone(),
            discover: true,
            commands: HandlerSources::new(),
            slash_commands: HandlerSources::new(),
            events: HandlerSources::new(),
        }
    }

    pub fn config(&self) -> &BrassConfig {
        &self.config
    }

    /// Adds message command sources.
    pub fn commands(mut self, sources: HandlerSources<CommandDescriptor>) -> Self {
        self.commands = self.commands.merge(sources);
        self
    }

    /// Adds slash command sources.
    pub fn slash_commands(mut self, sources: HandlerSources<SlashCommandDescriptor>) -> Self {
        self.slash_commands = self.slash_commands.merge(sources);
        self
    }

    /// Adds event handler sources.
    pub fn events(mut self, sources: HandlerSources<EventDescriptor>) -> Self {
        self.events = self.events.merge(sources);
        self
    }

    /// Skips the macro-registered sources; only explicitly added ones load.
    pub fn without_discovery(mut self) -> Self {
        self.discover = false;
        self
    }

    /// Runs the three load passes and builds the bot context.
    ///
    /// Load failures never abort: they are reported in the returned bot's
    /// [`LoadSummary`]. Slash command registration uses the configured
    /// credentials or `BOT_TOKEN`/`BOT_ID`.
    pub async fn load(self, transport: BoxedTransport, gateway: BoxedGateway) -> RuntimeResult<Bot> {
        let Self {
            config,
            discover,
            commands,
            slash_commands,
            events,
        } = self;

        let (commands, slash_commands, events) = if discover {
            (
                HandlerSources::discovered().merge(commands),
                HandlerSources::discovered().merge(slash_commands),
                HandlerSources::discovered().merge(events),
            )
        } else {
            (commands, slash_commands, events)
        };

        let bus = Arc::new(EventBus::new());
        bind_builtin_events(&bus);

        let credentials = config.credentials.resolve();
        if credentials.is_none() {
            warn!("No bot credentials configured; slash commands will not be registered");
        }

        let mut loader = Loader::new();
        let summary = LoadSummary {
            commands: loader.load_commands(commands).await,
            slash_commands: loader
                .load_slash_commands(slash_commands, transport.as_ref(), credentials.as_ref())
                .await,
            events: loader.load_events(events, &bus).await,
        };

        let shutdown = CancellationToken::new();
        let (cooldowns, scheduler) = CooldownTracker::with_scheduler(shutdown.child_token());
        let ctx = Arc::new(BotContext::new(
            config.bot,
            Arc::new(loader.into_registry()),
            cooldowns,
            transport,
            gateway,
        ));

        info!(stats = %ctx.registry().stats(), "Handlers loaded");
        Ok(Bot::new(ctx, bus, summary, shutdown, scheduler))
    }
}

impl Default for BrassRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BrassRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BrassRuntime")
            .field("config", &self.config)
            .field("discover", &self.discover)
            .field("commands", &self.commands.len())
            .field("slash_commands", &self.slash_commands.len())
            .field("events", &self.events.len())
            .finish()
    }
}

/// Routes messages and interactions to the dispatcher and logs session start.
fn bind_builtin_events(bus: &EventBus) {
    let dispatch: EventFn = Arc::new(|ctx, event| route(ctx, event).boxed());
    bus.on(MESSAGE_CREATE, Arc::clone(&dispatch));
    bus.on(INTERACTION_CREATE, dispatch);
    bus.once(READY, Arc::new(|ctx, event| log_ready(ctx, event).boxed()));
}

async fn route(ctx: Arc<BotContext>, event: Arc<RawEvent>) -> anyhow::Result<()> {
    Dispatcher::new(ctx).on_event(&event).await;
    Ok(())
}

async fn log_ready(ctx: Arc<BotContext>, event: Arc<RawEvent>) -> anyhow::Result<()> {
    if let RawEvent::Ready(ready) = event.as_ref() {
        info!(
            user = %ready.user.name,
            scopes = ready.scope_count,
            latency_ms = ctx.gateway().current_latency_ms(),
            "Session ready"
        );
    }
    Ok(())
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for creating a [`BrassRuntime`] with custom configuration.
pub struct RuntimeBuilder {
    config_loader: ConfigLoader,
}

impl RuntimeBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new().with_current_dir(),
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g., "development", "production").
    pub fn profile(mut self, profile: impl Into<String>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path<P: AsRef<std::path::Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges additional configuration programmatically.
    pub fn merge(mut self, config: BrassConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Loads and validates the configuration, then builds the runtime.
    pub fn build(self) -> ConfigResult<BrassRuntime> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;
        Ok(BrassRuntime::from_config(&config))
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use brass_core::{Author, ReadyEvent, Reply, SlashCommandData};
    use brass_framework::Source;
    use brass_framework::testing::{self, RecordingTransport, StaticGateway};

    fn runtime() -> BrassRuntime {
        BrassRuntime::from_config(&BrassConfig::default()).without_discovery()
    }

    fn ping() -> anyhow::Result<CommandDescriptor> {
        Ok(CommandDescriptor::new("ping", |_, message, _| async move {
            message.reply(Reply::text("pong")).await?;
            Ok(())
        }))
    }

    fn slash_ping() -> anyhow::Result<SlashCommandDescriptor> {
        Ok(SlashCommandDescriptor::new(
            SlashCommandData::new("ping", "Shows latency"),
            |_, interaction| async move {
                interaction.reply(Reply::text("pong")).await?;
                Ok(())
            },
        ))
    }

    fn ready() -> RawEvent {
        RawEvent::Ready(ReadyEvent {
            user: Author::bot("bot-self", "brass"),
            scope_count: 2,
        })
    }

    #[tokio::test]
    async fn test_load_and_pump_events() {
        let transport = RecordingTransport::new();
        transport.push_event(ready());
        transport.push_event(RawEvent::MessageCreate(testing::message("u1", "!ping")));
        transport.push_event(RawEvent::InteractionCreate(testing::interaction("u1", "ping")));

        let bot = runtime()
            .commands(HandlerSources::new().category("Test", [Source::from_fn("ping", ping)]))
            .slash_commands(
                HandlerSources::new().category("Test", [Source::from_fn("ping", slash_ping)]),
            )
            .load(transport.clone(), StaticGateway::new(42, "bot-self"))
            .await
            .unwrap();

        assert_eq!(bot.load_summary().commands.loaded, 1);
        assert_eq!(bot.load_summary().slash_commands.loaded, 1);

        let stats = bot.run_until(std::future::pending()).await.unwrap();
        assert_eq!(stats.events_received, 3);
        assert_eq!(stats.handlers_run, 3);
        assert_eq!(stats.registry.commands, 1);
        assert_eq!(transport.replies().len(), 2);
    }

    #[tokio::test]
    async fn test_ready_listener_fires_once() {
        let transport = RecordingTransport::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);

        let bot = runtime()
            .events(HandlerSources::new().category(
                "Bot",
                [Source::new("ready", move || {
                    let counter = Arc::clone(&counter);
                    async move {
                        Ok::<_, anyhow::Error>(EventDescriptor::once(READY, move |_, _| {
                            let counter = Arc::clone(&counter);
                            async move {
                                counter.fetch_add(1, Ordering::SeqCst);
                                Ok(())
                            }
                        }))
                    }
                })],
            ))
            .load(transport, StaticGateway::new(42, "bot-self"))
            .await
            .unwrap();

        assert_eq!(bot.dispatch(ready()).await, 2);
        assert_eq!(bot.dispatch(ready()).await, 0);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_the_pump() {
        let transport = RecordingTransport::new();
        let bot = runtime()
            .load(transport, StaticGateway::new(42, "bot-self"))
            .await
            .unwrap();

        let token = bot.shutdown_token();
        token.cancel();
        let stats = bot.run_until(std::future::pending()).await.unwrap();
        assert_eq!(stats.events_received, 0);
        assert!(token.is_cancelled());
    }
}

//! # Brass
//!
//! A command registry and dispatch gate for chat bots.
//!
//! ## Overview
//!
//! Brass discovers command and event handlers at startup, resolves each
//! incoming message or interaction to one handler, and runs it behind an
//! ordered set of authorization and rate-limit checks:
//!
//! ```text
//! ┌───────────┐     ┌──────────┐     ┌────────────┐     ┌──────┐     ┌─────────┐
//! │ Transport │────▶│ EventBus │────▶│ Dispatcher │────▶│ Gate │────▶│ Handler │
//! └───────────┘     └──────────┘     └────────────┘     └──────┘     └─────────┘
//!                                          │                │
//!                                       Registry        Cooldowns
//! ```
//!
//! - **Transport**: delivers events, sends replies and answers capability lookups
//! - **Registry**: canonical command names and aliases, filled by the loader
//! - **Gate**: owner → disabled → beta → user caps → bot caps → cooldown
//! - **Handlers**: plain async functions returning `anyhow::Result<()>`
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use brass::prelude::*;
//!
//! fn ping() -> anyhow::Result<CommandDescriptor> {
//!     Ok(CommandDescriptor::new("ping", |_, message, _| async move {
//!         message.reply(Reply::text("Pong!")).await?;
//!         Ok(())
//!     })
//!     .cooldown(5.0))
//! }
//!
//! brass::command!(PING, "Utility" => ping);
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = BrassRuntime::new().load(transport, gateway).await?;
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config`: TOML configuration files (default)
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use brass_core as core;
pub use brass_framework as framework;
pub use brass_runtime as runtime;

pub use brass_framework::{command, event, slash_command};

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use brass::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use brass_runtime::{Bot, BrassConfig, BrassRuntime};

    // Handler descriptors
    pub use brass_framework::{
        CommandDescriptor, CommandSettings, EventDescriptor, Gated, HandlerSources,
        SlashCommandDescriptor, Source,
    };

    // Contexts passed to handlers
    pub use brass_framework::{BotContext, InteractionContext, MessageContext};

    // Events and replies
    pub use brass_core::{
        INTERACTION_CREATE, MESSAGE_CREATE, READY, RawEvent, Reply, SlashCommandData,
    };

    // Capabilities for custom transports
    pub use brass_core::{BoxedGateway, BoxedTransport, Gateway, Transport};
}

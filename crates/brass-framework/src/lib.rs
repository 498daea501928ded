//! # Brass Framework
//!
//! Command registry, prerequisite gate and dispatch for chat bots.
//!
//! This layer provides:
//! - Descriptors for message commands, slash commands and event handlers
//! - The [`Loader`] that discovers handler sources and fills the [`Registry`]
//! - The [`Gate`]: ordered owner, disabled, beta, capability and cooldown checks
//! - The [`Dispatcher`] that routes messages and interactions through the gate
//! - The [`EventBus`] for named event subscriptions
//!
//! Transports and configuration live in other crates; everything here talks
//! to the outside world through [`brass_core::Transport`].

pub mod context;
pub mod cooldown;
pub mod descriptor;
pub mod dispatcher;
pub mod error;
pub mod events;
pub mod gate;
pub mod loader;
mod macros;
pub mod notice;
pub mod registry;
pub mod service;
pub mod settings;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{BotContext, InteractionContext, MessageContext};
pub use cooldown::{CooldownTracker, ExpiryScheduler};
pub use descriptor::{
    CommandDescriptor, CommandFn, CommandSettings, EventDescriptor, EventFn, Gated,
    SlashCommandDescriptor, SlashCommandFn,
};
pub use dispatcher::{DispatchOutcome, Dispatcher, split_command};
pub use error::{InvokeError, LoadError, LoadResult};
pub use events::EventBus;
pub use gate::{Actor, Authorization, Denial, Gate, GateLayer, GateService};
pub use loader::{HandlerSources, LoadReport, LoadRow, LoadStatus, Loader, Source};
pub use notice::{Notices, format_duration};
pub use registry::{Registry, RegistryStats, Suggestion};
pub use service::{Invocation, InvocationTarget, InvokeService};
pub use settings::{BotSettings, DispatchOptions, Emojis, Palette, Theme};

#[doc(hidden)]
pub use linkme;

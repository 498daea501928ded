//! # Brass Core
//!
//! Building blocks shared by every Brass crate:
//!
//! - **Text keys**: [`normalize`](normalize::normalize) folds command tokens
//!   into canonical keys; [`similarity`](similarity::similarity) scores how
//!   close two keys are.
//! - **Event model**: [`RawEvent`] and its payloads.
//! - **Replies**: [`Reply`] and [`ReplyTarget`].
//! - **Capabilities**: the [`Transport`] and [`Gateway`] traits that connect
//!   the framework to a chat service.
//!
//! ```text
//! ┌───────────┐  RawEvent   ┌────────────┐  Reply   ┌───────────┐
//! │ Transport │────────────▶│ Dispatcher │─────────▶│ Transport │
//! └───────────┘             └────────────┘          └───────────┘
//! ```

pub mod error;
pub mod event;
pub mod normalize;
pub mod reply;
pub mod similarity;
pub mod transport;

pub use error::{TransportError, TransportResult};
pub use event::{
    Author, ChannelKind, INTERACTION_CREATE, InteractionEvent, InteractionKind, MESSAGE_CREATE,
    MessageEvent, READY, RawEvent, ReadyEvent,
};
pub use normalize::normalize;
pub use reply::{Reply, ReplyField, ReplyTarget};
pub use similarity::similarity;
pub use transport::{
    BoxedGateway, BoxedTransport, CapabilitySet, Credentials, Gateway, Principal,
    SlashCommandData, Transport,
};

/// Boxed future used for type-erased async handlers.
pub type BoxFuture<'a, T> = futures::future::BoxFuture<'a, T>;

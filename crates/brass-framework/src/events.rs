//! Named event subscriptions.
//!
//! The [`EventBus`] maps event names to handlers. A handler is either bound to
//! every occurrence ([`EventBus::on`]) or to the next one only
//! ([`EventBus::once`]). One-shot handlers are taken out of the table before
//! they run, so concurrent emits fire them at most once.
//!
//! ```rust,ignore
//! let bus = EventBus::new();
//! bus.once("ready", ready_handler);
//! bus.on("messageCreate", message_handler);
//!
//! bus.emit(ctx, Arc::new(event)).await;
//! ```

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use brass_core::RawEvent;
use futures::FutureExt;
use futures::future::join_all;
use parking_lot::Mutex;
use tracing::{Instrument, Level, error, span, trace};

use crate::context::BotContext;
use crate::descriptor::{EventDescriptor, EventFn};
use crate::error::panic_message;

#[derive(Clone)]
struct Binding {
    handler: EventFn,
    once: bool,
}

/// Event name → handlers.
#[derive(Default)]
pub struct EventBus {
    bindings: Mutex<HashMap<String, Vec<Binding>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `handler` on every occurrence of `name`.
    pub fn on(&self, name: impl Into<String>, handler: EventFn) {
        self.bind(name.into(), handler, false);
    }

    /// Runs `handler` on the next occurrence of `name` only.
    pub fn once(&self, name: impl Into<String>, handler: EventFn) {
        self.bind(name.into(), handler, true);
    }

    /// Binds a descriptor according to its `once` flag.
    pub fn bind_descriptor(&self, descriptor: &EventDescriptor) {
        self.bind(
            descriptor.name.clone(),
            Arc::clone(&descriptor.execute),
            descriptor.once,
        );
    }

    fn bind(&self, name: String, handler: EventFn, once: bool) {
        self.bindings
            .lock()
            .entry(name)
            .or_default()
            .push(Binding { handler, once });
    }

    /// Number of handlers currently bound to `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.bindings.lock().get(name).map_or(0, Vec::len)
    }

    /// Runs every handler bound to the event's name and waits for them.
    ///
    /// Handler errors are logged and never propagated. Returns the number of
    /// handlers that ran.
    pub async fn emit(&self, ctx: Arc<BotContext>, event: Arc<RawEvent>) -> usize {
        let name = event.name().to_string();
        let span = span!(Level::DEBUG, "emit", event = %name);

        let handlers: Vec<EventFn> = {
            let mut bindings = self.bindings.lock();
            let Some(list) = bindings.get_mut(&name) else {
                trace!(event = %name, "No listeners");
                return 0;
            };
            let handlers = list.iter().map(|b| Arc::clone(&b.handler)).collect();
            list.retain(|b| !b.once);
            if list.is_empty() {
                bindings.remove(&name);
            }
            handlers
        };

        let count = handlers.len();
        let runs = handlers
            .into_iter()
            .map(|handler| AssertUnwindSafe(handler(Arc::clone(&ctx), Arc::clone(&event))).catch_unwind());
        for result in join_all(runs).instrument(span).await {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(err)) => error!(event = %name, error = ?err, "Event handler failed"),
                Err(payload) => error!(
                    event = %name,
                    panic = %panic_message(payload.as_ref()),
                    "Event handler panicked"
                ),
            }
        }
        count
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let bindings = self.bindings.lock();
        let mut names: Vec<_> = bindings.keys().collect();
        names.sort();
        f.debug_struct("EventBus").field("events", &names).finish()
    }
}

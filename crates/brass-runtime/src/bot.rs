//! A loaded bot: frozen registry, bound events and the event pump.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use brass_core::RawEvent;
use brass_framework::{BotContext, EventBus, LoadReport, RegistryStats};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::RuntimeResult;

/// Reports from the three load passes.
#[derive(Debug, Clone)]
pub struct LoadSummary {
    pub commands: LoadReport,
    pub slash_commands: LoadReport,
    pub events: LoadReport,
}

impl fmt::Display for LoadSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.commands)?;
        writeln!(f, "{}", self.slash_commands)?;
        write!(f, "{}", self.events)
    }
}

/// Counters collected while the bot runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RuntimeStats {
    pub registry: RegistryStats,
    pub events_received: u64,
    /// Handler runs across all events, built-in bindings included.
    pub handlers_run: u64,
}

impl fmt::Display for RuntimeStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}; {} events received, {} handler runs",
            self.registry, self.events_received, self.handlers_run
        )
    }
}

#[derive(Debug, Default)]
struct Counters {
    events_received: AtomicU64,
    handlers_run: AtomicU64,
}

/// A bot whose handlers are loaded and ready to receive events.
///
/// Created by [`BrassRuntime::load`](crate::BrassRuntime::load).
pub struct Bot {
    ctx: Arc<BotContext>,
    bus: Arc<EventBus>,
    summary: LoadSummary,
    shutdown: CancellationToken,
    scheduler: JoinHandle<()>,
    counters: Arc<Counters>,
}

impl Bot {
    pub(crate) fn new(
        ctx: Arc<BotContext>,
        bus: Arc<EventBus>,
        summary: LoadSummary,
        shutdown: CancellationToken,
        scheduler: JoinHandle<()>,
    ) -> Self {
        Self {
            ctx,
            bus,
            summary,
            shutdown,
            scheduler,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn context(&self) -> &Arc<BotContext> {
        &self.ctx
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn load_summary(&self) -> &LoadSummary {
        &self.summary
    }

    /// A token that stops [`run_until`](Self::run_until) when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            registry: self.ctx.registry().stats(),
            events_received: self.counters.events_received.load(Ordering::Relaxed),
            handlers_run: self.counters.handlers_run.load(Ordering::Relaxed),
        }
    }

    /// Emits one event to its listeners and waits for them.
    ///
    /// Returns the number of handlers that ran.
    pub async fn dispatch(&self, event: RawEvent) -> usize {
        emit(&self.ctx, &self.bus, &self.counters, Arc::new(event)).await
    }

    /// Pumps transport events until the transport closes, the shutdown token
    /// is cancelled or `shutdown` completes.
    ///
    /// Every event is emitted in its own task. In-flight tasks are awaited
    /// before the cooldown scheduler is stopped.
    pub async fn run_until<F>(self, shutdown: F) -> RuntimeResult<RuntimeStats>
    where
        F: Future<Output = ()>,
    {
        let mut tasks = JoinSet::new();
        let transport = Arc::clone(self.ctx.transport());
        tokio::pin!(shutdown);

        info!(stats = %self.ctx.registry().stats(), "Bot is running");

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    break;
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    log_task_result(joined);
                }
                event = transport.next_event() => match event {
                    Some(event) => {
                        let ctx = Arc::clone(&self.ctx);
                        let bus = Arc::clone(&self.bus);
                        let counters = Arc::clone(&self.counters);
                        tasks.spawn(async move {
                            emit(&ctx, &bus, &counters, Arc::new(event)).await;
                        });
                    }
                    None => {
                        info!("Transport closed");
                        break;
                    }
                },
            }
        }

        debug!(in_flight = tasks.len(), "Waiting for in-flight events");
        while let Some(joined) = tasks.join_next().await {
            log_task_result(joined);
        }

        let stats = self.stats();
        self.shutdown.cancel();
        self.scheduler.await?;
        info!(%stats, "Bot stopped");
        Ok(stats)
    }

    /// Runs until Ctrl+C or SIGTERM.
    pub async fn run(self) -> RuntimeResult<RuntimeStats> {
        let signals = wait_for_signal()?;
        self.run_until(signals).await
    }
}

impl fmt::Debug for Bot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bot")
            .field("registry", &self.ctx.registry().stats())
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

async fn emit(
    ctx: &Arc<BotContext>,
    bus: &EventBus,
    counters: &Counters,
    event: Arc<RawEvent>,
) -> usize {
    counters.events_received.fetch_add(1, Ordering::Relaxed);
    let ran = bus.emit(Arc::clone(ctx), event).await;
    counters.handlers_run.fetch_add(ran as u64, Ordering::Relaxed);
    ran
}

fn log_task_result(result: Result<(), tokio::task::JoinError>) {
    if let Err(err) = result {
        error!(error = %err, "Event task failed");
    }
}

/// Resolves on Ctrl+C or, on unix, SIGTERM.
fn wait_for_signal() -> RuntimeResult<impl Future<Output = ()>> {
    #[cfg(unix)]
    let mut sigterm =
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    Ok(async move {
        #[cfg(unix)]
        {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(err) = result {
                        warn!(error = %err, "Ctrl+C handler failed");
                    }
                    info!("Received Ctrl+C, shutting down");
                }
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down");
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(err) = tokio::signal::ctrl_c().await {
                warn!(error = %err, "Ctrl+C handler failed");
            }
            info!("Received Ctrl+C, shutting down");
        }
    })
}

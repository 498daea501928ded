//! Handler discovery and registry population.
//!
//! Handlers come from an explicit, closed set of *sources*: constructors that
//! produce one descriptor each, grouped by category. There are two ways to
//! declare them:
//!
//! - link-time registration with the [`command!`](crate::command),
//!   [`slash_command!`](crate::slash_command) and [`event!`](crate::event)
//!   macros, which append to the [`COMMAND_SOURCES`],
//!   [`SLASH_COMMAND_SOURCES`] and [`EVENT_SOURCES`] distributed slices;
//! - a hand-built [`HandlerSources`] list.
//!
//! ```rust,ignore
//! let sources = HandlerSources::new()
//!     .category("Test", [Source::from_fn("ping", ping::command)]);
//!
//! let mut loader = Loader::new();
//! let report = loader.load_commands(sources).await;
//! println!("{report}");
//! let registry = loader.into_registry();
//! ```
//!
//! Sources whose module name starts with `_` are skipped. Every source is
//! constructed concurrently; results are folded into the registry in source
//! order, so collision handling is deterministic. A source that fails to
//! construct or produces an invalid descriptor is counted, logged, and
//! skipped. It never aborts the batch.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use brass_core::normalize::normalize;
use brass_core::{BoxFuture, Credentials, SlashCommandData, Transport};
use comfy_table::{Cell, Table};
use futures::FutureExt;
use futures::future::join_all;
use linkme::distributed_slice;
use tracing::{debug, error, info, warn};

use crate::descriptor::{CommandDescriptor, EventDescriptor, SlashCommandDescriptor};
use crate::error::{LoadError, LoadResult, panic_message};
use crate::events::EventBus;
use crate::registry::Registry;

// =============================================================================
// Sources
// =============================================================================

/// A source registered at link time.
pub struct StaticSource<T: 'static> {
    pub category: &'static str,
    /// `module_path!()` of the declaring module.
    pub module: &'static str,
    pub build: fn() -> anyhow::Result<T>,
}

/// Message commands declared with [`command!`](crate::command).
#[distributed_slice]
pub static COMMAND_SOURCES: [StaticSource<CommandDescriptor>];

/// Slash commands declared with [`slash_command!`](crate::slash_command).
#[distributed_slice]
pub static SLASH_COMMAND_SOURCES: [StaticSource<SlashCommandDescriptor>];

/// Event handlers declared with [`event!`](crate::event).
#[distributed_slice]
pub static EVENT_SOURCES: [StaticSource<EventDescriptor>];

/// Descriptor types with a link-time source slice.
pub trait Discoverable: Sized + Send + 'static {
    fn static_sources() -> &'static [StaticSource<Self>];
}

impl Discoverable for CommandDescriptor {
    fn static_sources() -> &'static [StaticSource<Self>] {
        &COMMAND_SOURCES
    }
}

impl Discoverable for SlashCommandDescriptor {
    fn static_sources() -> &'static [StaticSource<Self>] {
        &SLASH_COMMAND_SOURCES
    }
}

impl Discoverable for EventDescriptor {
    fn static_sources() -> &'static [StaticSource<Self>] {
        &EVENT_SOURCES
    }
}

type BuildFn<T> = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<T>> + Send + Sync>;

/// One descriptor-producing constructor.
pub struct Source<T> {
    module: String,
    build: BuildFn<T>,
}

impl<T: Send + 'static> Source<T> {
    /// Wraps an async constructor.
    pub fn new<F, Fut>(module: impl Into<String>, build: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<T>> + Send + 'static,
    {
        Self {
            module: module.into(),
            build: Arc::new(move || build().boxed()),
        }
    }

    /// Wraps a plain constructor function.
    pub fn from_fn(module: impl Into<String>, build: fn() -> anyhow::Result<T>) -> Self {
        Self::new(module, move || async move { build() })
    }

    /// Last path segment of the module name.
    pub fn module_name(&self) -> &str {
        self.module.rsplit("::").next().unwrap_or(&self.module)
    }

    fn is_hidden(&self) -> bool {
        self.module_name().starts_with('_')
    }
}

impl<T> Clone for Source<T> {
    fn clone(&self) -> Self {
        Self {
            module: self.module.clone(),
            build: Arc::clone(&self.build),
        }
    }
}

/// Sources grouped by category, in declaration order.
pub struct HandlerSources<T> {
    categories: Vec<(String, Vec<Source<T>>)>,
}

impl<T> Default for HandlerSources<T> {
    fn default() -> Self {
        Self {
            categories: Vec::new(),
        }
    }
}

impl<T: Send + 'static> HandlerSources<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds sources to `name`, creating the category on first use.
    pub fn category<I>(mut self, name: impl Into<String>, sources: I) -> Self
    where
        I: IntoIterator<Item = Source<T>>,
    {
        let name = name.into();
        match self.categories.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, list)) => list.extend(sources),
            None => self.categories.push((name, sources.into_iter().collect())),
        }
        self
    }

    /// Groups link-time sources by category.
    pub fn from_static(entries: &'static [StaticSource<T>]) -> Self {
        entries.iter().fold(Self::new(), |sources, entry| {
            sources.category(entry.category, [Source::from_fn(entry.module, entry.build)])
        })
    }

    /// Appends every category of `other`.
    pub fn merge(self, other: HandlerSources<T>) -> Self {
        other
            .categories
            .into_iter()
            .fold(self, |sources, (name, list)| sources.category(name, list))
    }

    /// Total number of sources, hidden ones included.
    pub fn len(&self) -> usize {
        self.categories.iter().map(|(_, list)| list.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: Discoverable> HandlerSources<T> {
    /// Every source registered at link time for `T`.
    pub fn discovered() -> Self {
        Self::from_static(T::static_sources())
    }
}

// =============================================================================
// Report
// =============================================================================

/// Outcome of one source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadStatus {
    Loaded,
    Failed(String),
}

/// One row of a [`LoadReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRow {
    pub category: String,
    /// Descriptor name when loaded, module name otherwise.
    pub name: String,
    pub status: LoadStatus,
}

/// Summary of a load pass.
#[derive(Debug, Clone)]
pub struct LoadReport {
    /// What was loaded ("Commands", "Slash Commands", "Events").
    pub kind: &'static str,
    pub loaded: usize,
    pub failed: usize,
    /// Slash commands accepted by the transport. `None` for other kinds.
    pub registered: Option<usize>,
    pub elapsed: Duration,
    pub rows: Vec<LoadRow>,
    /// Set when the pass itself failed; counts are zero in that case.
    pub error: Option<String>,
}

impl LoadReport {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            loaded: 0,
            failed: 0,
            registered: None,
            elapsed: Duration::ZERO,
            rows: Vec::new(),
            error: None,
        }
    }

    fn fatal(kind: &'static str, elapsed: Duration, error: String) -> Self {
        Self {
            elapsed,
            error: Some(error),
            ..Self::new(kind)
        }
    }

    fn record(&mut self, category: &str, name: &str, status: LoadStatus) {
        match status {
            LoadStatus::Loaded => self.loaded += 1,
            LoadStatus::Failed(_) => self.failed += 1,
        }
        self.rows.push(LoadRow {
            category: category.to_string(),
            name: name.to_string(),
            status,
        });
    }

    fn log_summary(&self) {
        let elapsed_ms = self.elapsed.as_millis() as u64;
        match &self.error {
            Some(err) => error!(kind = self.kind, elapsed_ms, error = %err, "Loader failed"),
            None => info!(
                kind = self.kind,
                loaded = self.loaded,
                failed = self.failed,
                registered = ?self.registered,
                elapsed_ms,
                "Handlers loaded"
            ),
        }
    }
}

impl LoadReport {
    /// One row per source with its outcome, headed by the handler kind.
    pub fn table(&self) -> Table {
        let mut table = Table::new();
        table.set_header(vec![self.kind, "Status"]);
        for row in &self.rows {
            let status = match &row.status {
                LoadStatus::Loaded => "loaded".to_string(),
                LoadStatus::Failed(reason) => format!("failed: {reason}"),
            };
            table.add_row(vec![
                Cell::new(format!("{}/{}", row.category, row.name)),
                Cell::new(status),
            ]);
        }
        table
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.table())?;
        write!(
            f,
            "{} loaded, {} failed in {} ms",
            self.loaded,
            self.failed,
            self.elapsed.as_millis()
        )?;
        if let Some(registered) = self.registered {
            write!(f, ", {registered} registered")?;
        }
        if let Some(err) = &self.error {
            write!(f, " (error: {err})")?;
        }
        Ok(())
    }
}

// =============================================================================
// Loader
// =============================================================================

struct Unit<T> {
    category: String,
    module: String,
    outcome: LoadResult<T>,
}

/// Constructs every visible source concurrently; results keep source order.
async fn construct_all<T: Send + 'static>(sources: HandlerSources<T>) -> Vec<Unit<T>> {
    let categories = sources.categories.into_iter().map(|(category, list)| async move {
        let units = list.into_iter().filter_map(|source| {
            if source.is_hidden() {
                debug!(category = %category, module = %source.module, "Skipping hidden source");
                return None;
            }
            let category = category.clone();
            Some(async move {
                let module = source.module_name().to_string();
                let build = Arc::clone(&source.build);
                let result = AssertUnwindSafe(async move { build().await })
                    .catch_unwind()
                    .await;
                let outcome = match result {
                    Ok(Ok(descriptor)) => Ok(descriptor),
                    Ok(Err(err)) => Err(LoadError::Construct {
                        source_name: format!("{category}/{module}"),
                        reason: format!("{err:#}"),
                    }),
                    Err(payload) => Err(LoadError::Construct {
                        source_name: format!("{category}/{module}"),
                        reason: format!("panicked: {}", panic_message(payload.as_ref())),
                    }),
                };
                Unit {
                    category,
                    module,
                    outcome,
                }
            })
        });
        join_all(units).await
    });

    join_all(categories).await.into_iter().flatten().collect()
}

/// Checks credentials needed for bulk registration.
fn check_credentials(credentials: Option<&Credentials>) -> LoadResult<&Credentials> {
    let credentials = credentials.ok_or(LoadError::MissingCredential("BOT_TOKEN"))?;
    if credentials.token.trim().is_empty() {
        return Err(LoadError::MissingCredential("BOT_TOKEN"));
    }
    if credentials.application_id.trim().is_empty() {
        return Err(LoadError::MissingCredential("BOT_ID"));
    }
    Ok(credentials)
}

fn validate_command(command: &CommandDescriptor) -> Result<(), String> {
    if command.name.trim().is_empty() {
        return Err("missing name".into());
    }
    if normalize(&command.name).is_empty() {
        return Err(format!("name '{}' has no canonical form", command.name));
    }
    Ok(())
}

fn validate_slash_command(command: &SlashCommandDescriptor) -> Result<(), String> {
    if command.data.name.trim().is_empty() {
        return Err("missing data.name".into());
    }
    if command.data.description.trim().is_empty() {
        return Err("missing data.description".into());
    }
    Ok(())
}

fn validate_event(event: &EventDescriptor) -> Result<(), String> {
    if event.name.trim().is_empty() {
        return Err("missing name".into());
    }
    Ok(())
}

/// Builds the [`Registry`] from handler sources.
///
/// The loader is the registry's only writer. Once loading is done, take the
/// registry with [`into_registry`](Self::into_registry) and share it behind an `Arc`.
#[derive(Debug, Default)]
pub struct Loader {
    registry: Registry,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Continues loading into an existing registry.
    pub fn with_registry(registry: Registry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn into_registry(self) -> Registry {
        self.registry
    }

    /// Loads message commands.
    pub async fn load_commands(&mut self, sources: HandlerSources<CommandDescriptor>) -> LoadReport {
        const KIND: &str = "Commands";
        let started = Instant::now();
        let registry = &mut self.registry;

        let pass = async move {
            let mut report = LoadReport::new(KIND);
            for unit in construct_all(sources).await {
                match fold_unit(unit, "command", validate_command) {
                    Ok((category, mut command)) => {
                        command.category = Some(category.clone());
                        let name = command.name.clone();
                        registry.insert_command(command);
                        report.record(&category, &name, LoadStatus::Loaded);
                    }
                    Err((category, module, err)) => {
                        report.record(&category, &module, LoadStatus::Failed(err.to_string()));
                    }
                }
            }
            report
        };

        finish(KIND, started, pass).await
    }

    /// Loads slash commands, then submits their data to the transport in one call.
    ///
    /// A registration failure is logged and leaves `registered` at zero; the
    /// commands stay in the local registry either way.
    pub async fn load_slash_commands(
        &mut self,
        sources: HandlerSources<SlashCommandDescriptor>,
        transport: &dyn Transport,
        credentials: Option<&Credentials>,
    ) -> LoadReport {
        const KIND: &str = "Slash Commands";
        let started = Instant::now();
        let registry = &mut self.registry;

        let pass = async move {
            let mut report = LoadReport::new(KIND);
            for unit in construct_all(sources).await {
                match fold_unit(unit, "slash command", validate_slash_command) {
                    Ok((category, mut command)) => {
                        command.category = Some(category.clone());
                        let name = command.data.name.clone();
                        registry.insert_slash_command(command);
                        report.record(&category, &name, LoadStatus::Loaded);
                    }
                    Err((category, module, err)) => {
                        report.record(&category, &module, LoadStatus::Failed(err.to_string()));
                    }
                }
            }

            let data = registry.slash_command_data();
            report.registered = Some(register(transport, credentials, &data).await);
            report
        };

        finish(KIND, started, pass).await
    }

    /// Loads event handlers and binds them to `bus`.
    pub async fn load_events(
        &mut self,
        sources: HandlerSources<EventDescriptor>,
        bus: &EventBus,
    ) -> LoadReport {
        const KIND: &str = "Events";
        let started = Instant::now();
        let registry = &mut self.registry;

        let pass = async move {
            let mut report = LoadReport::new(KIND);
            for unit in construct_all(sources).await {
                match fold_unit(unit, "event", validate_event) {
                    Ok((category, event)) => {
                        bus.bind_descriptor(&event);
                        registry.record_event_binding();
                        debug!(event = %event.name, once = event.once, "Event handler bound");
                        report.record(&category, &event.name, LoadStatus::Loaded);
                    }
                    Err((category, module, err)) => {
                        report.record(&category, &module, LoadStatus::Failed(err.to_string()));
                    }
                }
            }
            report
        };

        finish(KIND, started, pass).await
    }
}

/// Submits `data` in one bulk call and returns how many were accepted.
///
/// An empty set is never sent, since that would clear commands already
/// registered with the service.
async fn register(
    transport: &dyn Transport,
    credentials: Option<&Credentials>,
    data: &[SlashCommandData],
) -> usize {
    if data.is_empty() {
        debug!("No slash commands to register");
        return 0;
    }
    let credentials = match check_credentials(credentials) {
        Ok(credentials) => credentials,
        Err(err) => {
            error!(error = %err, "Slash command registration skipped");
            return 0;
        }
    };
    match transport.bulk_register(credentials, data).await {
        Ok(count) => {
            info!(count, "Slash commands registered");
            count
        }
        Err(err) => {
            let err = LoadError::Registration(err.to_string());
            error!(error = %err, "Slash command registration failed");
            0
        }
    }
}

/// Validates a constructed unit, logging failures.
fn fold_unit<T>(
    unit: Unit<T>,
    kind: &'static str,
    validate: fn(&T) -> Result<(), String>,
) -> Result<(String, T), (String, String, LoadError)> {
    let Unit {
        category,
        module,
        outcome,
    } = unit;

    let checked = outcome.and_then(|descriptor| match validate(&descriptor) {
        Ok(()) => Ok(descriptor),
        Err(reason) => Err(LoadError::Validation {
            kind,
            source_name: format!("{category}/{module}"),
            reason,
        }),
    });

    match checked {
        Ok(descriptor) => Ok((category, descriptor)),
        Err(err) => {
            warn!(error = %err, "Skipping invalid handler source");
            Err((category, module, err))
        }
    }
}

/// Runs a load pass, turning a panic in the pass itself into a fatal report.
async fn finish<F>(kind: &'static str, started: Instant, pass: F) -> LoadReport
where
    F: Future<Output = LoadReport>,
{
    let mut report = match AssertUnwindSafe(pass).catch_unwind().await {
        Ok(report) => report,
        Err(payload) => LoadReport::fatal(kind, started.elapsed(), panic_message(payload.as_ref())),
    };
    report.elapsed = started.elapsed();
    report.log_summary();
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use brass_core::SlashCommandData;

    fn ping() -> anyhow::Result<CommandDescriptor> {
        Ok(CommandDescriptor::new("ping", |_, _, _| async { Ok(()) }).alias("p"))
    }

    fn nameless() -> anyhow::Result<CommandDescriptor> {
        Ok(CommandDescriptor::new("", |_, _, _| async { Ok(()) }))
    }

    fn broken() -> anyhow::Result<CommandDescriptor> {
        anyhow::bail!("database unavailable")
    }

    fn exploding() -> anyhow::Result<CommandDescriptor> {
        panic!("bad module")
    }

    fn slash_ping() -> anyhow::Result<SlashCommandDescriptor> {
        Ok(SlashCommandDescriptor::new(
            SlashCommandData::new("ping", "Shows latency"),
            |_, _| async { Ok(()) },
        ))
    }

    fn slash_undescribed() -> anyhow::Result<SlashCommandDescriptor> {
        Ok(SlashCommandDescriptor::new(
            SlashCommandData::new("broken", ""),
            |_, _| async { Ok(()) },
        ))
    }

    fn credentials() -> Credentials {
        Credentials {
            token: "token".into(),
            application_id: "app".into(),
        }
    }

    #[tokio::test]
    async fn test_failures_are_partitioned() {
        let sources = HandlerSources::new()
            .category(
                "Test",
                [
                    Source::from_fn("ping", ping),
                    Source::from_fn("nameless", nameless),
                ],
            )
            .category(
                "Broken",
                [
                    Source::from_fn("broken", broken),
                    Source::from_fn("exploding", exploding),
                ],
            );

        let mut loader = Loader::new();
        let report = loader.load_commands(sources).await;

        assert_eq!(report.loaded, 1);
        assert_eq!(report.failed, 3);
        assert!(report.error.is_none());
        assert_eq!(report.rows.len(), 4);

        let registry = loader.into_registry();
        let ping = registry.resolve("p").unwrap();
        assert_eq!(ping.category.as_deref(), Some("Test"));
    }

    #[tokio::test]
    async fn test_hidden_sources_are_skipped() {
        let sources = HandlerSources::new().category(
            "Test",
            [
                Source::from_fn("commands::test::_draft", broken),
                Source::from_fn("commands::test::ping", ping),
            ],
        );

        let mut loader = Loader::new();
        let report = loader.load_commands(sources).await;
        assert_eq!((report.loaded, report.failed), (1, 0));
    }

    #[tokio::test]
    async fn test_async_sources() {
        let sources = HandlerSources::new().category(
            "Test",
            [Source::new("ping", || async {
                tokio::task::yield_now().await;
                ping()
            })],
        );

        let mut loader = Loader::new();
        assert_eq!(loader.load_commands(sources).await.loaded, 1);
    }

    #[tokio::test]
    async fn test_slash_registration_submits_valid_data() {
        let transport = RecordingTransport::new();
        let sources = HandlerSources::new().category(
            "Test",
            [
                Source::from_fn("ping", slash_ping),
                Source::from_fn("broken", slash_undescribed),
            ],
        );

        let mut loader = Loader::new();
        let creds = credentials();
        let report = loader
            .load_slash_commands(sources, transport.as_ref(), Some(&creds))
            .await;

        assert_eq!((report.loaded, report.failed), (1, 1));
        assert_eq!(report.registered, Some(1));
        assert_eq!(transport.registered()[0].name, "ping");
    }

    #[tokio::test]
    async fn test_registration_failure_keeps_registry_usable() {
        let transport = RecordingTransport::new();
        transport.reject_registration(true);
        let sources =
            HandlerSources::new().category("Test", [Source::from_fn("ping", slash_ping)]);

        let mut loader = Loader::new();
        let creds = credentials();
        let report = loader
            .load_slash_commands(sources, transport.as_ref(), Some(&creds))
            .await;

        assert_eq!(report.registered, Some(0));
        assert_eq!(report.loaded, 1);
        assert!(loader.registry().slash_command("ping").is_some());
    }

    #[tokio::test]
    async fn test_missing_credentials_skip_registration() {
        let transport = RecordingTransport::new();
        let sources =
            HandlerSources::new().category("Test", [Source::from_fn("ping", slash_ping)]);

        let mut loader = Loader::new();
        let report = loader
            .load_slash_commands(sources, transport.as_ref(), None)
            .await;

        assert_eq!(report.registered, Some(0));
        assert!(transport.registered().is_empty());
        assert!(loader.registry().slash_command("ping").is_some());
    }

    #[tokio::test]
    async fn test_empty_slash_set_is_not_submitted() {
        let transport = RecordingTransport::new();
        let creds = credentials();

        let mut loader = Loader::new();
        let sources =
            HandlerSources::new().category("Test", [Source::from_fn("ping", slash_ping)]);
        loader
            .load_slash_commands(sources, transport.as_ref(), Some(&creds))
            .await;
        assert_eq!(transport.register_calls(), 1);

        let mut empty = Loader::new();
        let report = empty
            .load_slash_commands(HandlerSources::new(), transport.as_ref(), Some(&creds))
            .await;

        assert_eq!(report.registered, Some(0));
        assert_eq!(transport.register_calls(), 1);
        assert_eq!(transport.registered()[0].name, "ping");
    }

    #[tokio::test]
    async fn test_events_bind_to_bus() {
        fn ready() -> anyhow::Result<EventDescriptor> {
            Ok(EventDescriptor::once("ready", |_, _| async { Ok(()) }))
        }
        fn unnamed() -> anyhow::Result<EventDescriptor> {
            Ok(EventDescriptor::on("", |_, _| async { Ok(()) }))
        }

        let bus = EventBus::new();
        let sources = HandlerSources::new().category(
            "bot",
            [Source::from_fn("ready", ready), Source::from_fn("unnamed", unnamed)],
        );

        let mut loader = Loader::new();
        let report = loader.load_events(sources, &bus).await;

        assert_eq!((report.loaded, report.failed), (1, 1));
        assert_eq!(bus.listener_count("ready"), 1);
        assert_eq!(loader.registry().stats().events, 1);
    }

    #[test]
    fn test_report_table() {
        let mut report = LoadReport::new("Commands");
        report.record("Test", "ping", LoadStatus::Loaded);
        report.record("Test", "nameless", LoadStatus::Failed("missing name".into()));

        let table = report.table();
        assert_eq!(table.row_iter().count(), 2);
        let rendered = table.to_string();
        assert!(rendered.contains("Commands"));
        assert!(rendered.contains("Test/ping"));
        assert!(rendered.contains("failed: missing name"));
        assert!(report.to_string().ends_with("1 loaded, 1 failed in 0 ms"));
    }

    #[test]
    fn test_category_merging() {
        let sources = HandlerSources::new()
            .category("Test", [Source::from_fn("ping", ping)])
            .merge(HandlerSources::new().category("Test", [Source::from_fn("broken", broken)]));
        assert_eq!(sources.len(), 2);
        assert_eq!(sources.categories.len(), 1);
    }
}

//! Handlers registered with the macros, loaded by the runtime and driven
//! through the event bus.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use brass::core::{Author, ReadyEvent};
use brass::framework::testing::{self, RecordingTransport, StaticGateway};
use brass::framework::{Denial, DispatchOutcome, Dispatcher, LoadStatus};
use brass::prelude::*;

// ─── Discovered handlers ─────────────────────────────────────────────────────

fn ping() -> anyhow::Result<CommandDescriptor> {
    Ok(CommandDescriptor::new("ping", |_, message, args| async move {
        message
            .reply(Reply::text(format!("pong [{}]", args.join(","))))
            .await?;
        Ok(())
    })
    .alias("latency")
    .cooldown(5.0))
}

fn shutdown() -> anyhow::Result<CommandDescriptor> {
    Ok(CommandDescriptor::new("shutdown", |_, message, _| async move {
        message.reply(Reply::text("bye")).await?;
        Ok(())
    })
    .owner_only()
    .disabled())
}

fn broken() -> anyhow::Result<CommandDescriptor> {
    anyhow::bail!("missing table")
}

fn slash_ping() -> anyhow::Result<SlashCommandDescriptor> {
    Ok(SlashCommandDescriptor::new(
        SlashCommandData::new("ping", "Shows latency"),
        |ctx, interaction| async move {
            let latency = ctx.gateway().current_latency_ms();
            interaction
                .reply(Reply::text(format!("{latency}ms")))
                .await?;
            Ok(())
        },
    ))
}

static READY_SEEN: AtomicUsize = AtomicUsize::new(0);

fn ready_log() -> anyhow::Result<EventDescriptor> {
    Ok(EventDescriptor::once(READY, |_, _| async {
        READY_SEEN.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }))
}

brass::command!(PING, "Utility" => ping);
brass::command!(SHUTDOWN, "Owner" => shutdown);
brass::command!(BROKEN, "Utility" => broken);
brass::slash_command!(SLASH_PING, "Utility" => slash_ping);
brass::event!(READY_LOG, "Bot" => ready_log);

mod _draft {
    use brass::prelude::*;

    fn draft() -> anyhow::Result<CommandDescriptor> {
        Ok(CommandDescriptor::new("draft", |_, _, _| async { Ok(()) }))
    }

    brass::command!(DRAFT, "Utility" => draft);
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn config() -> BrassConfig {
    let mut config = BrassConfig::default();
    config.bot.owners = vec!["owner".into()];
    config.credentials.token = Some("token".into());
    config.credentials.application_id = Some("1".into());
    config
}

async fn load(transport: &Arc<RecordingTransport>) -> Bot {
    BrassRuntime::from_config(&config())
        .load(transport.clone(), StaticGateway::new(42, "bot-self"))
        .await
        .unwrap()
}

fn message(author: &str, content: &str) -> Arc<brass::core::MessageEvent> {
    Arc::new(testing::message(author, content))
}

fn descriptions(transport: &RecordingTransport) -> Vec<String> {
    transport
        .replies()
        .into_iter()
        .map(|sent| sent.reply.description.unwrap_or_default())
        .collect()
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_discovery_partitions_loaded_and_failed() {
    let transport = RecordingTransport::new();
    let bot = load(&transport).await;
    let summary = bot.load_summary();

    assert_eq!(summary.commands.loaded, 2);
    assert_eq!(summary.commands.failed, 1);
    assert!(
        summary
            .commands
            .rows
            .iter()
            .any(|row| matches!(&row.status, LoadStatus::Failed(reason) if reason.contains("missing table")))
    );
    assert_eq!(summary.slash_commands.loaded, 1);
    assert_eq!(summary.slash_commands.registered, Some(1));
    assert_eq!(summary.events.loaded, 1);
    assert_eq!(transport.registered().len(), 1);

    let registry = bot.context().registry();
    assert_eq!(registry.resolve("latency").unwrap().name, "ping");
    assert!(registry.resolve("draft").is_none());
    assert_eq!(
        registry.resolve("shutdown").unwrap().category.as_deref(),
        Some("Owner")
    );
}

#[tokio::test]
async fn test_ping_runs_with_empty_args() {
    let transport = RecordingTransport::new();
    let bot = load(&transport).await;

    let ran = bot
        .dispatch(RawEvent::MessageCreate(testing::message("u1", "!ping")))
        .await;
    assert_eq!(ran, 1);
    assert_eq!(descriptions(&transport), vec!["pong []".to_string()]);
}

#[tokio::test]
async fn test_alias_with_args_and_mixed_case_prefix() {
    let transport = RecordingTransport::new();
    let bot = load(&transport).await;
    let dispatcher = Dispatcher::new(Arc::clone(bot.context()));

    let outcome = dispatcher.on_message(message("u1", "!LaTeNcY a b")).await;
    assert_eq!(outcome, DispatchOutcome::Completed);
    assert_eq!(descriptions(&transport), vec!["pong [a,b]".to_string()]);
}

#[tokio::test]
async fn test_typo_is_not_found_and_nothing_runs() {
    let transport = RecordingTransport::new();
    let bot = load(&transport).await;
    let dispatcher = Dispatcher::new(Arc::clone(bot.context()));

    let outcome = dispatcher.on_message(message("u1", "!png")).await;
    assert_eq!(outcome, DispatchOutcome::NotFound);

    let replies = transport.replies();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].reply.title.as_deref(), Some("🚫 Command Not Found"));
    assert!(
        replies[0]
            .reply
            .description
            .as_deref()
            .unwrap_or_default()
            .contains("Did you mean `!ping`?")
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_invocation_inside_window_is_denied() {
    let transport = RecordingTransport::new();
    let bot = load(&transport).await;
    let dispatcher = Dispatcher::new(Arc::clone(bot.context()));

    assert_eq!(
        dispatcher.on_message(message("u1", "!ping")).await,
        DispatchOutcome::Completed
    );

    tokio::time::advance(Duration::from_secs(1)).await;
    assert_eq!(
        dispatcher.on_message(message("u1", "!ping")).await,
        DispatchOutcome::Denied(Denial::RateLimited {
            remaining: Duration::from_secs(4)
        })
    );

    // Another user has an independent window.
    assert_eq!(
        dispatcher.on_message(message("u2", "!ping")).await,
        DispatchOutcome::Completed
    );

    tokio::time::advance(Duration::from_secs(5)).await;
    assert_eq!(
        dispatcher.on_message(message("u1", "!ping")).await,
        DispatchOutcome::Completed
    );
}

#[tokio::test]
async fn test_owner_check_runs_before_disabled_check() {
    let transport = RecordingTransport::new();
    let bot = load(&transport).await;
    let dispatcher = Dispatcher::new(Arc::clone(bot.context()));

    assert_eq!(
        dispatcher.on_message(message("u1", "!shutdown")).await,
        DispatchOutcome::Denied(Denial::Unauthorized)
    );
    assert_eq!(
        dispatcher.on_message(message("owner", "!shutdown")).await,
        DispatchOutcome::Completed
    );
    assert_eq!(
        transport.reply_titles(),
        vec!["🚫 Unauthorized Access".to_string(), String::new()]
    );
}

#[tokio::test]
async fn test_once_event_fires_on_first_ready_only() {
    let transport = RecordingTransport::new();
    let bot = load(&transport).await;
    let ready = || {
        RawEvent::Ready(ReadyEvent {
            user: Author::bot("bot-self", "brass"),
            scope_count: 1,
        })
    };

    // Built-in ready log plus the discovered listener.
    assert_eq!(bot.dispatch(ready()).await, 2);
    assert_eq!(bot.dispatch(ready()).await, 0);
    assert_eq!(READY_SEEN.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rejected_registration_keeps_registry_usable() {
    let transport = RecordingTransport::new();
    transport.reject_registration(true);
    let bot = load(&transport).await;

    assert_eq!(bot.load_summary().slash_commands.loaded, 1);
    assert_eq!(bot.load_summary().slash_commands.registered, Some(0));

    let ran = bot
        .dispatch(RawEvent::InteractionCreate(testing::interaction("u1", "ping")))
        .await;
    assert_eq!(ran, 1);
    assert_eq!(descriptions(&transport), vec!["42ms".to_string()]);
}

#[tokio::test]
async fn test_run_until_drains_the_transport() {
    let transport = RecordingTransport::new();
    transport.push_event(RawEvent::MessageCreate(testing::message("u1", "!ping")));
    transport.push_event(RawEvent::MessageCreate(testing::message("u2", "!ping now")));
    transport.push_event(RawEvent::MessageCreate(testing::message("u3", "hello")));

    let bot = load(&transport).await;
    let stats = bot.run_until(std::future::pending()).await.unwrap();

    assert_eq!(stats.events_received, 3);
    assert_eq!(stats.registry.commands, 2);
    let mut replies = descriptions(&transport);
    replies.sort();
    assert_eq!(replies, vec!["pong []".to_string(), "pong [now]".to_string()]);
}

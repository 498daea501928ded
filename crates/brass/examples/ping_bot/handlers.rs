use brass::prelude::*;
use tracing::info;

fn pong(ctx: &BotContext) -> Reply {
    Reply::new()
        .color(&ctx.settings().theme.colors.blue)
        .title("🏓 Pong!")
        .description(format!(
            "API Latency: **{}ms**",
            ctx.gateway().current_latency_ms()
        ))
}

fn ping() -> anyhow::Result<CommandDescriptor> {
    Ok(CommandDescriptor::new("ping", |ctx, message, _| async move {
        message.reply(pong(&ctx)).await?;
        Ok(())
    })
    .description("Check the bot's latency and API response time.")
    .cooldown(5.0))
}

fn slash_ping() -> anyhow::Result<SlashCommandDescriptor> {
    Ok(SlashCommandDescriptor::new(
        SlashCommandData::new("ping", "Check the bot's latency and API response time."),
        |ctx, interaction| async move {
            interaction.reply(pong(&ctx)).await?;
            Ok(())
        },
    )
    .cooldown(5.0))
}

fn ready() -> anyhow::Result<EventDescriptor> {
    Ok(EventDescriptor::once(READY, |_, event| async move {
        if let RawEvent::Ready(ready) = event.as_ref() {
            info!("The bot successfully logged in as {}!", ready.user.name);
        }
        Ok(())
    }))
}

brass::command!(PING, "Test" => ping);
brass::slash_command!(SLASH_PING, "Test" => slash_ping);
brass::event!(READY_LOG, "Bot" => ready);

//! Ping Bot Example
//!
//! A console bot with one command in two flavours:
//!
//! - `!ping` as a message command
//! - `/ping` as a slash command
//!
//! Both reply with the gateway latency and share a 5 second cooldown per user.
//! A `ready` handler logs the bot's name once the session starts.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p brass --example ping_bot -- --user alice
//! ```
//!
//! Type lines into stdin; close it (Ctrl+D) or press Ctrl+C to stop.

mod console;
mod handlers;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use brass::prelude::*;
use clap::Parser;
use tracing::info;

use crate::console::{ConsoleGateway, ConsoleTransport};

#[derive(Parser, Debug)]
#[command(version, about = "A console bot for the Brass framework")]
struct Args {
    /// Configuration file; `brass.toml` in the current directory otherwise.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. `development` or `production`.
    #[arg(short, long)]
    profile: Option<String>,

    /// User id the console speaks as.
    #[arg(short, long, default_value = "console-user")]
    user: String,

    /// Reported gateway latency in milliseconds.
    #[arg(long, default_value_t = 42)]
    latency: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = BrassRuntime::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile.clone());
    }
    let runtime = builder.build()?;

    let transport = Arc::new(ConsoleTransport::new(&args.user));
    let gateway = Arc::new(ConsoleGateway {
        latency_ms: args.latency,
    });

    let bot = runtime.load(transport, gateway).await?;
    println!("{}", bot.load_summary());

    let stats = bot.run().await?;
    info!(%stats, "Goodbye");

    Ok(())
}

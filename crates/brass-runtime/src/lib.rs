//! Brass Runtime - Orchestration layer for the Brass bot framework.
//!
//! This crate provides:
//! - Layered configuration (`brass.toml`, profiles, `BRASS_*` environment)
//! - Logging setup on top of `tracing-subscriber`
//! - [`BrassRuntime`]: runs the load passes and builds the bot context
//! - [`Bot`]: pumps transport events through the event bus until shutdown
//!
//! ```ignore
//! use brass_runtime::BrassRuntime;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = BrassRuntime::new().load(transport, gateway).await?;
//!     println!("{}", bot.load_summary());
//!
//!     // Run until Ctrl+C
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

// Re-exports
pub use bot::{Bot, LoadSummary, RuntimeStats};
pub use config::{BrassConfig, ConfigError, ConfigLoader, ConfigResult, CredentialsConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::{LoggingBuilder, SpanEvents};
pub use runtime::{BrassRuntime, RuntimeBuilder};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Prelude module for convenient imports.
///
/// This provides all the commonly used logging macros:
/// - `trace!`, `debug!`, `info!`, `warn!`, `error!`
/// - `span`, `event`
/// - `instrument` attribute
/// - `Level` for span creation
pub mod prelude {
    pub use tracing::{Level, debug, error, event, info, instrument, span, trace, warn};
}

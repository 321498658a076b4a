//! A discord bot that plays music in voice channels, one queue per server.

mod commands;
mod data;
mod error;
mod lib;
mod log;
mod player;
mod setup;

pub use poise::serenity_prelude as serenity;

pub use data::Data;
pub use error::BotError;
use player::SessionRegistry;
pub use setup::Config;

/// Convenient type alias, the only [poise::Context] used by commands.
type Context<'a> = poise::Context<'a, Data, BotError>;

#[tokio::main]
async fn main() -> Result<(), BotError> {
    let config = match Config::read() {
        Ok(config) => config,
        Err(e) => {
            // Tracing isn't installed yet, so print directly.
            eprintln!("{e}");
            return Err(e.into());
        }
    };

    // Must be held until the end of main so buffered logs are flushed.
    let _guard = log::install_tracing(&config);

    let sessions = SessionRegistry::new();
    let mut client = setup::client(config, sessions.clone()).await?;

    // Leave every voice channel before the shards go down.
    let shard_manager = client.shard_manager.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for ctrl-c: {e}");
            return;
        }
        tracing::info!("Received ctrl-c, shutting down.");
        sessions.shutdown().await;
        shard_manager.shutdown_all().await;
    });

    client.start().await?;

    tracing::info!("Bye!");
    Ok(())
}

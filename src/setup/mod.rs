//! Defines and implements custom bot functionality.

mod config;
mod framework;

use songbird::SerenityInit;

use crate::data::HttpKey;
use crate::player::SessionRegistry;
use crate::serenity;
use crate::BotError;

pub use config::Config;

/// Constructs a [serenity::Client] with initialized [songbird] and [reqwest::Client].
///
/// `sessions` ends up in [Data](crate::Data), the caller keeps a clone to shut them down.
pub(super) async fn client(
    config: Config,
    sessions: SessionRegistry,
) -> Result<serenity::Client, BotError> {
    // Get discord token from config file
    let token = config.token()?.clone();

    // Intents we wish to use
    // See https://discord.com/developers/docs/topics/gateway#gateway-intents
    // Voice states are needed to find the channel of a command's author.
    let intents = serenity::GatewayIntents::non_privileged();

    let client = serenity::ClientBuilder::new(token, intents)
        .framework(framework::framework(config, sessions))
        .register_songbird()
        .type_map_insert::<HttpKey>(reqwest::Client::new())
        .await?;

    Ok(client)
}

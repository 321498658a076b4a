//! Implements the `/play` command.
//!
//! The bot joins the author's voice channel if needed, and queues the track.

use tracing::instrument;

use super::ensure_free;
use crate::data::GetData;
use crate::lib::call;
use crate::lib::youtube;
use crate::serenity::AutocompleteChoice;
use crate::BotError;
use crate::Context;

/// Min length of a partial query before searching for suggestions.
const MIN_PARTIAL_LEN: usize = 2;

/// Suggestions offered while typing.
const SUGGESTIONS: u8 = 5;

/// Plays from the given link or does a youtube search on the query.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn play(
    ctx: Context<'_>,
    #[description = "Youtube query or url"]
    #[autocomplete = "autocomplete_query"]
    query: String,
) -> Result<(), BotError> {
    let channel = call::author_channel(&ctx)?;
    let session = ctx.session().await?;
    ensure_free(&session, channel)?;

    // Searching can take longer than discord waits for a response.
    ctx.defer().await?;

    let item = ctx
        .data()
        .resolver
        .resolve(&query, ctx.author().id, ctx.channel_id())
        .await?;

    session.join(channel).await?;
    let queued = session.enqueue(item.clone()).await?;
    tracing::info!("Queued '{}', {queued} tracks waiting.", item.title);

    ctx.reply(format!("Enqueued {item}")).await?;
    Ok(())
}

/// Suggest youtube results for what's been typed so far.
#[instrument(skip(_ctx))]
async fn autocomplete_query(
    _ctx: Context<'_>,
    partial: &str,
) -> impl Iterator<Item = AutocompleteChoice> {
    let results = if partial.len() <= MIN_PARTIAL_LEN {
        tracing::trace!("Skipping search, query shorter than {MIN_PARTIAL_LEN} characters.");
        Vec::new()
    } else {
        youtube::search_query(partial, SUGGESTIONS)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Autocomplete search failed: {e}");
                Vec::new()
            })
    };

    results
        .into_iter()
        .map(|result| AutocompleteChoice::new(result.name, result.url))
}

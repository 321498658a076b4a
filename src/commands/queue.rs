//! Implements the queue commands: `/queue`, `/now`, `/shuffle` and `/remove`.

use std::sync::Arc;

use poise::CreateReply;
use serenity::CreateEmbed;
use serenity::CreateEmbedFooter;
use tracing::instrument;

use super::playing_session;
use crate::data::GetData;
use crate::error::UserError;
use crate::lib::announce::now_playing_embed;
use crate::player::GuildSession;
use crate::serenity;
use crate::BotError;
use crate::Context;

/// Show what's coming up
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 2)]
pub async fn queue(
    ctx: Context<'_>,
    #[description = "Page to show, starting at 1"]
    #[min = 1]
    page: Option<usize>,
) -> Result<(), BotError> {
    let guild = ctx.guild().ok_or(UserError::NotInGuild)?.name.clone();
    let session = ctx.existing_session().await?.ok_or(UserError::EmptyQueue)?;

    let total = session.queue().len().await;
    let page = page.unwrap_or(1);
    let bounds = PageBounds::new(page, total, ctx.data().queue_page_size)?;

    let items = session.queue().slice(bounds.start, bounds.end).await;
    let listing = items
        .iter()
        .enumerate()
        .map(|(i, item)| item.queue_line(bounds.start + i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    let mut embed = CreateEmbed::default()
        .title(format!("{guild} Queue"))
        .description(listing)
        .field("Total tracks", total.to_string(), true)
        .footer(CreateEmbedFooter::new(format!(
            "Viewing page {page}/{}",
            bounds.pages
        )));

    if let Some(current) = session.current() {
        embed = embed.field("Now playing", current.to_string(), true);
    }

    // Add thumbnail if front has a thumbnail.
    if let Some(url) = items.first().and_then(|item| item.thumbnail.clone()) {
        embed = embed.thumbnail(url);
    }

    ctx.send(CreateReply::default().embed(embed)).await?;
    Ok(())
}

/// Show the track that's playing.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn now(ctx: Context<'_>) -> Result<(), BotError> {
    let session = playing_session(&ctx).await?;
    let current = session.current().ok_or(UserError::NotPlaying)?;

    ctx.send(CreateReply::default().embed(now_playing_embed(&current)))
        .await?;
    Ok(())
}

/// Shuffle the queue.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only, guild_cooldown = 2)]
pub async fn shuffle(ctx: Context<'_>) -> Result<(), BotError> {
    let session = queued_session(&ctx).await?;

    session.queue().shuffle().await;
    ctx.reply("Shuffled the queue.").await?;
    Ok(())
}

/// Remove a track from the queue.
#[instrument(skip(ctx))]
#[poise::command(slash_command, guild_only)]
pub async fn remove(
    ctx: Context<'_>,
    #[description = "Position in the queue, as shown by /queue"]
    #[min = 1]
    position: usize,
) -> Result<(), BotError> {
    let index = position.checked_sub(1).ok_or(UserError::BadArgs {
        input: Some(position.to_string()),
    })?;
    let session = queued_session(&ctx).await?;

    let removed = session.queue().remove_at(index).await?;
    ctx.reply(format!("Removed {removed}.")).await?;
    Ok(())
}

/// The guild's session, if its queue has anything in it.
async fn queued_session(ctx: &Context<'_>) -> Result<Arc<GuildSession>, BotError> {
    let session = ctx.existing_session().await?.ok_or(UserError::EmptyQueue)?;
    if session.queue().is_empty().await {
        Err(UserError::EmptyQueue)?
    }
    Ok(session)
}

/// The slice of the queue shown on one page.
#[derive(Debug, PartialEq, Eq)]
struct PageBounds {
    start: usize,
    end: usize,
    pages: usize,
}

impl PageBounds {
    /// `page` is 1-based.
    fn new(page: usize, total: usize, per_page: usize) -> Result<Self, UserError> {
        if total == 0 {
            return Err(UserError::EmptyQueue);
        }

        let per_page = per_page.max(1);
        let pages = total.div_ceil(per_page);
        if page == 0 || page > pages {
            return Err(UserError::PageOutOfRange { page, pages });
        }

        let start = (page - 1) * per_page;
        Ok(Self {
            start,
            end: (start + per_page).min(total),
            pages,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_page_is_partial() {
        assert_eq!(
            PageBounds::new(3, 25, 10).unwrap(),
            PageBounds {
                start: 20,
                end: 25,
                pages: 3
            }
        );
        assert_eq!(
            PageBounds::new(1, 10, 10).unwrap(),
            PageBounds {
                start: 0,
                end: 10,
                pages: 1
            }
        );
    }

    #[test]
    fn pages_outside_the_queue_are_rejected() {
        assert!(matches!(
            PageBounds::new(4, 25, 10),
            Err(UserError::PageOutOfRange { page: 4, pages: 3 })
        ));
        assert!(matches!(
            PageBounds::new(0, 25, 10),
            Err(UserError::PageOutOfRange { page: 0, pages: 3 })
        ));
    }

    #[test]
    fn empty_queue_has_no_pages() {
        assert!(matches!(
            PageBounds::new(1, 0, 10),
            Err(UserError::EmptyQueue)
        ));
    }
}

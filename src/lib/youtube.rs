//! * Functionality for interfacing with youtube (e.g. searches).
//!
//! Everything goes through the `yt-dlp` binary, which must be on the `PATH`.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

use crate::error::ResolveError;
use crate::player::PlaybackItem;
use crate::player::Resolve;
use crate::player::StreamSource;
use crate::serenity::ChannelId;
use crate::serenity::UserId;

/// A youtube video with formatted metadata and its url.
pub struct SearchResult {
    /// Display name
    pub name: String,
    /// The url of source
    pub url: String,
}

/// Searches youtube for the given query.
///
/// `limit` is the max amount of results to get.
#[instrument(fields(query=query.as_ref()))]
pub async fn search_query(
    query: impl AsRef<str>,
    limit: u8,
) -> Result<Vec<SearchResult>, ResolveError> {
    let uri = format!("ytsearch{limit}:{}", query.as_ref());

    // Discord enforces a 100 char limit on choices.
    // Format is title [duration] (views) - channel
    let format: &str = &[
        "%(title).60s ",          // Title, at most 60 chars
        "[%(duration_string)s] ", // Duration in '[HH:MM:SS]' format, at most 10 chars
        "(%(view_count)D ",       // View count with decimal suffixes (e.g 10M, 200k, ...)
        " views)",
        "- ",
        "%(channel).14s", // Channel name, max 14 chars
    ]
    .concat();

    let ytdlp_args = [
        "--no-warnings",
        "--ignore-config",
        "--flat-playlist",
        "--print",
        format,
        "--print",
        "webpage_url",
        uri.as_str(),
    ];

    let stdout = run_ytdlp(&ytdlp_args).await?;

    let mut iter = stdout.split_terminator('\n');
    let mut results = Vec::new();
    while let (Some(name), Some(url)) = (iter.next(), iter.next()) {
        results.push(SearchResult {
            name: name.to_string(),
            url: url.to_string(),
        });
    }

    Ok(results)
}

/// Resolves queries with `yt-dlp`.
/// Urls are used as is, anything else is searched on youtube and the best match is taken.
#[derive(Debug, Default, Clone)]
pub struct YtDlp;

#[async_trait]
impl Resolve for YtDlp {
    #[instrument(skip(self))]
    async fn resolve(
        &self,
        query: &str,
        requester: UserId,
        channel: ChannelId,
    ) -> Result<PlaybackItem, ResolveError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(not_found(query));
        }

        let uri = to_uri(query);
        let ytdlp_args = [
            "--no-warnings",
            "--ignore-config",
            "--no-playlist",
            "-f",
            "bestaudio/best",
            "-J",
            uri.as_str(),
        ];

        let stdout = run_ytdlp(&ytdlp_args).await?;
        let info = parse_info(&stdout, query)?;
        Ok(info.into_item(requester, channel))
    }
}

/// Youtube search for plain text, the text itself for web urls.
fn to_uri(query: &str) -> String {
    let is_web_url = url::Url::parse(query)
        .map(|url| matches!(url.scheme(), "http" | "https"))
        .unwrap_or(false);

    if is_web_url {
        query.to_string()
    } else {
        format!("ytsearch1:{query}")
    }
}

fn not_found(query: &str) -> ResolveError {
    ResolveError::NotFound(format!("Couldn't find anything that matches `{query}`"))
}

/// Helper function that actually calls yt-dlp, returning its stdout.
async fn run_ytdlp(args: &[&str]) -> Result<String, ResolveError> {
    let output = tokio::process::Command::new("yt-dlp")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| ResolveError::FetchError(format!("Couldn't run yt-dlp: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ResolveError::FetchError(stderr.trim().to_string()));
    }

    String::from_utf8(output.stdout)
        .map_err(|e| ResolveError::FetchError(format!("yt-dlp printed invalid utf-8: {e}")))
}

/// The parts of yt-dlp's json output that are used.
#[derive(Debug, Deserialize)]
struct VideoInfo {
    title: Option<String>,
    uploader: Option<String>,
    uploader_url: Option<String>,
    /// Seconds, sometimes fractional. Missing for live streams.
    duration: Option<f64>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    /// Present for searches and playlists.
    entries: Option<Vec<Option<VideoInfo>>>,
}

/// Parse the output of `yt-dlp -J`, taking the first entry of a search or playlist.
fn parse_info(json: &str, query: &str) -> Result<ResolvedVideo, ResolveError> {
    if json.trim().is_empty() {
        return Err(not_found(query));
    }

    let info: VideoInfo = serde_json::from_str(json)
        .map_err(|e| ResolveError::FetchError(format!("Couldn't read yt-dlp output: {e}")))?;

    let info = match info.entries {
        None => info,
        Some(entries) => entries
            .into_iter()
            .flatten()
            .next()
            .ok_or_else(|| not_found(query))?,
    };

    let webpage_url = info.webpage_url.ok_or_else(|| {
        ResolveError::FetchError(format!("Couldn't retrieve any matches for `{query}`"))
    })?;

    Ok(ResolvedVideo {
        title: info.title.unwrap_or_else(|| "<MISSING TITLE>".to_string()),
        uploader: info.uploader.unwrap_or_default(),
        uploader_url: info.uploader_url,
        duration: Duration::from_secs(info.duration.unwrap_or_default().max(0.0) as u64),
        thumbnail: info.thumbnail,
        webpage_url,
    })
}

/// A video that's been found but isn't tied to a request yet.
#[derive(Debug, PartialEq)]
struct ResolvedVideo {
    title: String,
    uploader: String,
    uploader_url: Option<String>,
    duration: Duration,
    thumbnail: Option<String>,
    webpage_url: String,
}

impl ResolvedVideo {
    fn into_item(self, requester: UserId, channel: ChannelId) -> PlaybackItem {
        PlaybackItem {
            // The transport re-extracts from the page each time it plays,
            // so looping doesn't trip over expired stream urls.
            source: StreamSource {
                url: self.webpage_url.clone(),
            },
            title: self.title,
            uploader: self.uploader,
            uploader_url: self.uploader_url,
            duration: self.duration,
            thumbnail: self.thumbnail,
            webpage_url: self.webpage_url,
            requester,
            channel,
        }
    }
}

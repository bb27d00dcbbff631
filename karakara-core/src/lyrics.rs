use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;

use crate::config::PlayerConfig;
use crate::queue::{QueueItem, Track};

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLine {
    pub index: usize,
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    pub text: String,
}

pub type Lyrics = Vec<SubtitleLine>;

/// Longest wait for one track's subtitles before the item goes out without them
pub const LYRICS_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches and parses subtitles for a track. `None` means there is nothing to show.
pub trait LyricsSource: Send + Sync + 'static {
    fn lyrics_for(&self, track: &Track) -> impl Future<Output = Option<Lyrics>> + Send;
}

/// Source for displays that never show subtitles
pub struct NoLyrics;

impl LyricsSource for NoLyrics {
    async fn lyrics_for(&self, _track: &Track) -> Option<Lyrics> {
        None
    }
}

/// Downloads the track's `srt` attachment from the file server
pub struct HttpLyricsSource {
    http: reqwest::Client,
    config: PlayerConfig,
}

impl HttpLyricsSource {
    pub fn new(config: PlayerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(LYRICS_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("subtitle client without timeout: {}", e);
                reqwest::Client::new()
            });
        Self { http, config }
    }

    async fn download(&self, url: &str) -> reqwest::Result<String> {
        self.http
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await
    }
}

impl LyricsSource for HttpLyricsSource {
    async fn lyrics_for(&self, track: &Track) -> Option<Lyrics> {
        let attachment = track.attachment("srt")?;
        let url = self.config.attachment_url(&attachment.location);
        match self.download(&url).await {
            Ok(body) => Some(parse_srt(&body)),
            Err(e) => {
                log::warn!("subtitles unavailable at {}: {}", url, e);
                None
            }
        }
    }
}

/// Attach lyrics to every item, fetching them concurrently
pub async fn enrich<L: LyricsSource>(source: &L, items: Vec<QueueItem>) -> Vec<QueueItem> {
    enrich_within(source, items, LYRICS_TIMEOUT).await
}

/// Like [`enrich`], but a track whose lookup takes longer than `limit` gets `None`
pub async fn enrich_within<L: LyricsSource>(
    source: &L,
    items: Vec<QueueItem>,
    limit: Duration,
) -> Vec<QueueItem> {
    let lookups = items.iter().map(|item| async move {
        match tokio::time::timeout(limit, source.lyrics_for(&item.track)).await {
            Ok(lyrics) => lyrics,
            Err(_) => {
                log::warn!("subtitles for {} timed out", item.id);
                None
            }
        }
    });
    let lyrics = join_all(lookups).await;
    items
        .into_iter()
        .zip(lyrics)
        .map(|(mut item, lyrics)| {
            item.lyrics = lyrics;
            item
        })
        .collect()
}

/// Parse `H:MM:SS,mmm` (or with a `.` separator) into seconds
fn parse_timestamp(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (clock, fraction) = raw.split_once([',', '.']).unwrap_or((raw, "0"));
    let mut parts = clock.split(':').map(|p| p.trim().parse::<u32>());
    let hours = parts.next()?.ok()?;
    let minutes = parts.next()?.ok()?;
    let seconds = parts.next()?.ok()?;
    if parts.next().is_some() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let fraction: f64 = format!("0.{fraction}").parse().ok()?;
    Some(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + f64::from(seconds) + fraction)
}

/// Parse SubRip text. Blocks that do not contain a timing line are skipped.
pub fn parse_srt(source: &str) -> Lyrics {
    let normalized = source.replace("\r\n", "\n");
    let mut lines = Vec::new();

    for block in normalized.split("\n\n") {
        let mut rows = block.lines().map(str::trim).filter(|row| !row.is_empty());
        let Some(first) = rows.next() else {
            continue;
        };

        // The numeric counter is optional in the wild
        let (index, timing) = match first.parse::<usize>() {
            Ok(index) => match rows.next() {
                Some(timing) => (index, timing),
                None => continue,
            },
            Err(_) => (lines.len() + 1, first),
        };

        let Some((start, end)) = timing.split_once("-->") else {
            continue;
        };
        let (Some(start), Some(end)) = (parse_timestamp(start), parse_timestamp(end)) else {
            continue;
        };

        lines.push(SubtitleLine {
            index,
            start,
            end,
            text: rows.collect::<Vec<_>>().join("\n"),
        });
    }

    lines
}

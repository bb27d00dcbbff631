use std::collections::BTreeMap;
use std::fmt::Display;

use serde::{Deserialize, Serialize};
use strum::EnumIter;

use crate::lyrics::Lyrics;

/// Lifecycle of a queue item as tracked by the server
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    EnumIter,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum QueueItemStatus {
    #[default]
    Pending,
    Paused,
    Playing,
    Played,
    Skipped,
    Removed,
}

/// Server-assigned identifier. Numeric on the current server, kept opaque.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(i64),
    Text(String),
}

impl Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ItemId::Number(n) => write!(f, "{}", n),
            ItemId::Text(s) => write!(f, "{}", s),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type")]
    pub kind: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: Option<ItemId>,
    /// Duration in seconds
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub tags: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Track {
    /// First value of a tag, or an empty string when the tag is missing
    pub fn tag(&self, name: &str) -> &str {
        self.tags
            .get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn attachment(&self, kind: &str) -> Option<&Attachment> {
        self.attachments.iter().find(|a| a.kind == kind)
    }
}

/// A single entry of the shared queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub track: Track,
    #[serde(default)]
    pub status: QueueItemStatus,
    /// Parsed subtitles, attached locally after each fetch
    #[serde(skip)]
    pub lyrics: Option<Lyrics>,
}

/// Decorative thumbnail for the title screen
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    pub filename: String,
    /// Horizontal position in [0, 1)
    pub x: f64,
    /// Start delay in seconds, [0, 10)
    pub delay: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn status_uses_lowercase_names() {
        assert_eq!(QueueItemStatus::Skipped.to_string(), "skipped");
        assert_eq!(
            QueueItemStatus::from_str("playing").ok(),
            Some(QueueItemStatus::Playing)
        );
        assert!(QueueItemStatus::from_str("PLAYING").is_err());
    }

    #[test]
    fn queue_item_parses_server_payload() {
        let raw = r#"{
            "id": 42,
            "status": "pending",
            "performer_name": "ann",
            "track": {
                "id": "abc",
                "duration": 180.5,
                "tags": {"title": ["Mugen"], "artist": ["Someone", "Else"]},
                "attachments": [{"type": "srt", "location": "a/b.srt"}]
            }
        }"#;
        let item: QueueItem = serde_json::from_str(raw).unwrap();
        assert_eq!(item.id, ItemId::Number(42));
        assert_eq!(item.status, QueueItemStatus::Pending);
        assert_eq!(item.track.tag("title"), "Mugen");
        assert_eq!(item.track.tag("artist"), "Someone");
        assert_eq!(item.track.tag("category"), "");
        assert_eq!(item.track.attachment("srt").unwrap().location, "a/b.srt");
        assert!(item.lyrics.is_none());
    }

    #[test]
    fn item_id_displays_without_quotes() {
        assert_eq!(ItemId::Number(7).to_string(), "7");
        assert_eq!(ItemId::Text("x7".into()).to_string(), "x7");
    }
}

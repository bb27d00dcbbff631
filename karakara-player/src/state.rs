use std::sync::Arc;

use karakara_core::queue::{QueueItem, QueueItemStatus};
use karakara_core::store::Snapshot;

/// What the display needs between frames
pub struct AppState {
    pub snapshot: Arc<Snapshot>,
    pub queue_id: String,
    pub status_message: String,
}

impl AppState {
    pub fn new(queue_id: impl Into<String>, snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            queue_id: queue_id.into(),
            status_message: "Press any key to allow audio".to_string(),
        }
    }

    pub fn update(&mut self, snapshot: Arc<Snapshot>) {
        if snapshot.audio_allowed && !self.snapshot.audio_allowed {
            self.status_message = "Audio allowed".to_string();
        }
        self.snapshot = snapshot;
    }

    pub fn head(&self) -> Option<&QueueItem> {
        self.snapshot.head()
    }

    /// Waited seconds and threshold while autoplay is counting down for the head
    pub fn countdown(&self) -> Option<(f64, f64)> {
        let threshold = self.snapshot.settings.autoplay_seconds();
        let head = self.head()?;
        if threshold == 0.0 || head.status == QueueItemStatus::Playing {
            return None;
        }
        Some((self.snapshot.progress.min(threshold), threshold))
    }

    /// Title line for an item: `title` tag, falling back to its id
    pub fn item_title(item: &QueueItem) -> String {
        match item.track.tag("title") {
            "" => format!("#{}", item.id),
            title => title.to_string(),
        }
    }

    /// Format seconds as `M:SS`
    pub fn format_time(seconds: f64) -> String {
        let total = seconds.max(0.0).floor() as u64;
        format!("{}:{:02}", total / 60, total % 60)
    }
}

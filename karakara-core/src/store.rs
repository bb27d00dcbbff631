use std::sync::Arc;

use rand::Rng;

use crate::queue::{Image, QueueItem};
use crate::settings::{Settings, SettingsPatch};

/// Upper bound (exclusive) of the random image delay, in seconds
pub const IMAGE_MAX_DELAY: f64 = 10.0;

/// Describes the live persistent channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketInfo {
    pub url: String,
    /// Connection attempt that produced this channel, counted since the last successful open
    pub attempt: u32,
}

/// The whole local view at one instant
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub connected: bool,
    pub socket: Option<SocketInfo>,
    pub audio_allowed: bool,
    pub settings: Settings,
    pub queue: Vec<QueueItem>,
    pub images: Vec<Image>,
    /// Seconds the head item has been waiting, advanced by autoplay
    pub progress: f64,
}

impl Snapshot {
    pub fn head(&self) -> Option<&QueueItem> {
        self.queue.first()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshKind {
    Settings,
    Queue,
    Images,
}

impl RefreshKind {
    fn slot(self) -> usize {
        match self {
            RefreshKind::Settings => 0,
            RefreshKind::Queue => 1,
            RefreshKind::Images => 2,
        }
    }
}

/// Sequence number handed to a refresh when it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    pub kind: RefreshKind,
    pub seq: u64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Sequencer {
    issued: u64,
    applied: u64,
}

/// Owner of the canonical snapshot. Every transition swaps in a new `Arc<Snapshot>`.
#[derive(Debug)]
pub struct Store {
    snapshot: Arc<Snapshot>,
    sequencers: [Sequencer; 3],
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        Self {
            snapshot: Arc::new(Snapshot::default()),
            sequencers: [Sequencer::default(); 3],
        }
    }

    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot)
    }

    fn update(&mut self, apply: impl FnOnce(&mut Snapshot)) {
        let mut next = Snapshot::clone(&self.snapshot);
        apply(&mut next);
        self.snapshot = Arc::new(next);
    }

    // ==============================
    // Refresh sequencing
    // ==============================

    pub fn begin_refresh(&mut self, kind: RefreshKind) -> Ticket {
        let sequencer = &mut self.sequencers[kind.slot()];
        sequencer.issued += 1;
        Ticket {
            kind,
            seq: sequencer.issued,
        }
    }

    /// Returns true when the completion for `ticket` should be applied.
    /// Anything older than the last applied completion of the same kind is stale.
    pub fn accept(&mut self, ticket: Ticket) -> bool {
        let sequencer = &mut self.sequencers[ticket.kind.slot()];
        if ticket.seq > sequencer.applied {
            sequencer.applied = ticket.seq;
            true
        } else {
            false
        }
    }

    // ==============================
    // Transitions
    // ==============================

    pub fn set_settings(&mut self, patch: SettingsPatch) {
        self.update(|s| s.settings.merge(patch));
    }

    /// Replace the queue. Progress restarts when the head item or its status changed.
    pub fn set_queue(&mut self, items: Vec<QueueItem>) {
        self.update(|s| {
            let head_key = |q: &[QueueItem]| q.first().map(|i| (i.id.clone(), i.status));
            if head_key(&s.queue) != head_key(&items) {
                s.progress = 0.0;
            }
            s.queue = items;
        });
    }

    pub fn set_images(&mut self, filenames: Vec<String>) {
        self.set_images_with(filenames, &mut rand::rng());
    }

    pub fn set_images_with<R: Rng>(&mut self, filenames: Vec<String>, rng: &mut R) {
        let count = filenames.len();
        let images = filenames
            .into_iter()
            .enumerate()
            .map(|(n, filename)| Image {
                filename,
                x: n as f64 / count as f64,
                delay: rng.random_range(0.0..IMAGE_MAX_DELAY),
            })
            .collect();
        self.update(|s| s.images = images);
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.update(|s| s.connected = connected);
    }

    pub fn set_socket_handle(&mut self, socket: Option<SocketInfo>) {
        self.update(|s| s.socket = socket);
    }

    pub fn set_progress(&mut self, progress: f64) {
        self.update(|s| s.progress = progress.max(0.0));
    }

    pub fn allow_audio(&mut self) {
        self.update(|s| s.audio_allowed = true);
    }
}

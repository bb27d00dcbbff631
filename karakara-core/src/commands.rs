use crate::queue::{QueueItem, QueueItemStatus};
use crate::settings::SettingsPatch;
use crate::store::{SocketInfo, Ticket};

/// Commands processed, one at a time, by the player engine
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    /// Fetch settings and merge them in
    RefreshSettings,
    /// Fetch the queue, attach lyrics and replace the local queue
    RefreshQueue,
    /// Fetch a fresh set of decorative images
    RefreshImages { count: usize },
    /// Ask the server to change the head item's status
    RequestStatus(QueueItemStatus),
    /// A status change request did not reach the server
    StatusFailed(QueueItemStatus),
    SetConnected(bool),
    SetSocket(Option<SocketInfo>),
    /// The view layer has been granted permission to play audio
    AllowAudio,
    /// Completion of a settings refresh
    SettingsLoaded {
        ticket: Ticket,
        settings: SettingsPatch,
    },
    /// Completion of a queue refresh, lyrics already attached
    QueueLoaded {
        ticket: Ticket,
        items: Vec<QueueItem>,
    },
    /// Completion of an images refresh
    ImagesLoaded {
        ticket: Ticket,
        filenames: Vec<String>,
    },
    /// Stop the engine loop
    Quit,
}

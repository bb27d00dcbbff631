use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::api::{self, ApiClient};
use crate::autoplay::{Autoplay, AutoplayStep};
use crate::commands::PlayerCommand;
use crate::config::PlayerConfig;
use crate::connection::ConnectionListener;
use crate::dispatcher::{self, RefreshSink};
use crate::input::StatusSink;
use crate::lyrics::{self, LyricsSource};
use crate::queue::QueueItemStatus;
use crate::store::{RefreshKind, Snapshot, SocketInfo, Store};

/// Communication handle for the engine. Cheap to clone.
#[derive(Clone)]
pub struct PlayerHandle {
    pub cmd_tx: mpsc::UnboundedSender<PlayerCommand>,
    pub snapshot_rx: watch::Receiver<Arc<Snapshot>>,
}

impl PlayerHandle {
    pub fn send(&self, command: PlayerCommand) {
        if self.cmd_tx.send(command).is_err() {
            log::debug!("player engine is gone, command dropped");
        }
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<Snapshot> {
        Arc::clone(&self.snapshot_rx.borrow())
    }

    pub fn refresh_images(&self, count: usize) {
        self.send(PlayerCommand::RefreshImages { count });
    }

    pub fn allow_audio(&self) {
        self.send(PlayerCommand::AllowAudio);
    }

    pub fn quit(&self) {
        self.send(PlayerCommand::Quit);
    }
}

impl RefreshSink for PlayerHandle {
    fn refresh_queue(&self) {
        self.send(PlayerCommand::RefreshQueue);
    }

    fn refresh_settings(&self) {
        self.send(PlayerCommand::RefreshSettings);
    }
}

impl StatusSink for PlayerHandle {
    fn request_status_change(&self, status: QueueItemStatus) {
        self.send(PlayerCommand::RequestStatus(status));
    }
}

impl ConnectionListener for PlayerHandle {
    fn on_open(&self, socket: SocketInfo) {
        self.send(PlayerCommand::SetConnected(true));
        self.send(PlayerCommand::SetSocket(Some(socket)));
        // The channel carries no state of its own: resync everything
        self.refresh_settings();
        self.refresh_queue();
    }

    fn on_close(&self) {
        self.send(PlayerCommand::SetConnected(false));
        self.send(PlayerCommand::SetSocket(None));
    }

    fn on_message(&self, text: &str) {
        dispatcher::dispatch(text, self);
    }

    fn is_active(&self) -> bool {
        !self.cmd_tx.is_closed()
    }
}

/// Single owner of the store. Commands, refresh completions and autoplay
/// ticks are all handled on this one task.
pub struct PlayerEngine<A: ApiClient, L: LyricsSource> {
    store: Store,
    api: Arc<A>,
    lyrics: Arc<L>,
    autoplay: Autoplay,
    cmd_tx: mpsc::UnboundedSender<PlayerCommand>,
    cmd_rx: mpsc::UnboundedReceiver<PlayerCommand>,
    snapshot_tx: watch::Sender<Arc<Snapshot>>,
}

impl<A: ApiClient, L: LyricsSource> PlayerEngine<A, L> {
    pub fn new(api: A, lyrics: L, autoplay: Autoplay) -> (Self, PlayerHandle) {
        Self::with_store(Store::new(), api, lyrics, autoplay)
    }

    /// Engine for `config`, with the audio gate already open when configured so
    pub fn from_config(api: A, lyrics: L, config: &PlayerConfig) -> (Self, PlayerHandle) {
        let mut store = Store::new();
        if config.audio_allowed {
            store.allow_audio();
        }
        Self::with_store(store, api, lyrics, Autoplay::new(config.tick_rate))
    }

    pub fn with_store(store: Store, api: A, lyrics: L, autoplay: Autoplay) -> (Self, PlayerHandle) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(store.snapshot());

        let handle = PlayerHandle {
            cmd_tx: cmd_tx.clone(),
            snapshot_rx,
        };

        let engine = Self {
            store,
            api: Arc::new(api),
            lyrics: Arc::new(lyrics),
            autoplay,
            cmd_tx,
            cmd_rx,
            snapshot_tx,
        };

        (engine, handle)
    }

    /// Spawn the engine loop on the current runtime
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        log::info!(
            "player engine started (autoplay {} ticks/s)",
            self.autoplay.tick_rate()
        );
        let mut ticker = tokio::time::interval(self.autoplay.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.cmd_rx.recv() => match command {
                    Some(PlayerCommand::Quit) | None => break,
                    Some(command) => self.handle_command(command),
                },
                _ = ticker.tick() => self.on_tick(),
            }
        }

        log::info!("player engine stopped");
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.store.snapshot());
    }

    fn handle_command(&mut self, command: PlayerCommand) {
        match command {
            PlayerCommand::RefreshSettings => self.refresh_settings(),
            PlayerCommand::RefreshQueue => self.refresh_queue(),
            PlayerCommand::RefreshImages { count } => self.refresh_images(count),
            PlayerCommand::RequestStatus(status) => self.request_status_change(status),
            PlayerCommand::StatusFailed(status) => {
                if status == QueueItemStatus::Playing {
                    self.autoplay.rearm();
                }
            }
            PlayerCommand::SetConnected(connected) => {
                self.store.set_connected(connected);
                self.publish();
            }
            PlayerCommand::SetSocket(socket) => {
                self.store.set_socket_handle(socket);
                self.publish();
            }
            PlayerCommand::AllowAudio => {
                if !self.store.snapshot().audio_allowed {
                    log::info!("audio allowed");
                    self.store.allow_audio();
                    self.publish();
                }
            }
            PlayerCommand::SettingsLoaded { ticket, settings } => {
                if self.store.accept(ticket) {
                    self.store.set_settings(settings);
                    self.publish();
                } else {
                    log::debug!("discarding stale settings #{}", ticket.seq);
                }
            }
            PlayerCommand::QueueLoaded { ticket, items } => {
                if self.store.accept(ticket) {
                    log::info!("queue updated ({} items)", items.len());
                    self.store.set_queue(items);
                    self.publish();
                } else {
                    log::debug!("discarding stale queue #{}", ticket.seq);
                }
            }
            PlayerCommand::ImagesLoaded { ticket, filenames } => {
                if self.store.accept(ticket) {
                    self.store.set_images(filenames);
                    self.publish();
                } else {
                    log::debug!("discarding stale images #{}", ticket.seq);
                }
            }
            PlayerCommand::Quit => {}
        }
    }

    fn on_tick(&mut self) {
        match self.autoplay.tick(&self.store.snapshot()) {
            AutoplayStep::Idle => {}
            AutoplayStep::Advance(progress) => {
                self.store.set_progress(progress);
                self.publish();
            }
            AutoplayStep::Start(progress) => {
                self.store.set_progress(progress);
                self.publish();
                self.request_status_change(QueueItemStatus::Playing);
            }
        }
    }

    // ==============================================
    // Refreshes
    // ==============================================

    fn refresh_settings(&mut self) {
        let ticket = self.store.begin_refresh(RefreshKind::Settings);
        let api = Arc::clone(&self.api);
        let tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            match api::fetch_settings(&*api).await {
                Ok(settings) => {
                    let _ = tx.send(PlayerCommand::SettingsLoaded { ticket, settings });
                }
                Err(e) => log::warn!("settings refresh failed: {}", e),
            }
        });
    }

    fn refresh_queue(&mut self) {
        let ticket = self.store.begin_refresh(RefreshKind::Queue);
        let api = Arc::clone(&self.api);
        let source = Arc::clone(&self.lyrics);
        let tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            match api::fetch_queue(&*api).await {
                Ok(items) => {
                    let items = lyrics::enrich(&*source, items).await;
                    let _ = tx.send(PlayerCommand::QueueLoaded { ticket, items });
                }
                Err(e) => log::warn!("queue refresh failed: {}", e),
            }
        });
    }

    fn refresh_images(&mut self, count: usize) {
        let ticket = self.store.begin_refresh(RefreshKind::Images);
        let api = Arc::clone(&self.api);
        let tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            match api::fetch_images(&*api, count).await {
                Ok(filenames) => {
                    let _ = tx.send(PlayerCommand::ImagesLoaded { ticket, filenames });
                }
                Err(e) => log::warn!("images refresh failed: {}", e),
            }
        });
    }

    /// Tell the server what to do with the head item. Local state is left alone:
    /// the server broadcasts `queue_updated` and every client picks the change up together.
    fn request_status_change(&mut self, status: QueueItemStatus) {
        let snapshot = self.store.snapshot();
        let Some(head) = snapshot.head() else {
            log::warn!("status change to {} ignored: queue is empty", status);
            return;
        };

        log::info!("requesting {} for queue item {}", status, head.id);
        let id = head.id.clone();
        let api = Arc::clone(&self.api);
        let tx = self.cmd_tx.clone();
        tokio::spawn(async move {
            if let Err(e) = api::put_status(&*api, &id, status).await {
                log::warn!("status change to {} failed: {}", status, e);
                let _ = tx.send(PlayerCommand::StatusFailed(status));
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, ApiRequest, ApiResult, Method};
    use crate::lyrics::NoLyrics;
    use crate::settings::{AUTOPLAY, SettingValue};
    use std::sync::Mutex;

    /// Answers GETs from a canned map and records every request
    #[derive(Default)]
    struct FakeApi {
        replies: Mutex<Vec<(&'static str, ApiResult<serde_json::Value>)>>,
        seen: Arc<Mutex<Vec<ApiRequest>>>,
        failing_puts: bool,
    }

    impl FakeApi {
        fn failing_puts(mut self) -> Self {
            self.failing_puts = true;
            self
        }

        fn reply(self, endpoint: &'static str, value: serde_json::Value) -> Self {
            self.replies.lock().unwrap().push((endpoint, Ok(value)));
            self
        }
    }

    impl ApiClient for FakeApi {
        async fn send(&self, request: ApiRequest) -> ApiResult<serde_json::Value> {
            self.seen.lock().unwrap().push(request.clone());
            if request.method == Method::Put {
                if self.failing_puts {
                    return Err(ApiError::Status {
                        endpoint: request.endpoint.to_string(),
                        status: 503,
                    });
                }
                return Ok(serde_json::Value::Null);
            }
            let mut replies = self.replies.lock().unwrap();
            match replies.iter().position(|(e, _)| *e == request.endpoint) {
                Some(i) => replies.remove(i).1,
                None => Err(ApiError::Status {
                    endpoint: request.endpoint.to_string(),
                    status: 500,
                }),
            }
        }
    }

    fn queue_json(status: &str) -> serde_json::Value {
        serde_json::json!({"queue": [
            {"id": 1, "status": status, "track": {"tags": {"title": ["one"]}}},
            {"id": 2, "status": "pending", "track": {}}
        ]})
    }

    fn engine(api: FakeApi) -> (PlayerEngine<FakeApi, NoLyrics>, PlayerHandle) {
        PlayerEngine::new(api, NoLyrics, Autoplay::new(5))
    }

    /// Wait for the next command the engine sent to itself and apply it
    async fn complete(engine: &mut PlayerEngine<FakeApi, NoLyrics>) -> PlayerCommand {
        let command = engine.cmd_rx.recv().await.unwrap();
        engine.handle_command(command.clone());
        command
    }

    #[tokio::test]
    async fn queue_refresh_replaces_queue_and_publishes() {
        let (mut engine, handle) = engine(FakeApi::default().reply("queue_items", queue_json("pending")));
        engine.handle_command(PlayerCommand::RefreshQueue);
        assert!(matches!(complete(&mut engine).await, PlayerCommand::QueueLoaded { .. }));

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.queue.len(), 2);
        assert_eq!(snapshot.head().unwrap().track.tag("title"), "one");
    }

    #[tokio::test]
    async fn failed_refresh_leaves_snapshot_untouched() {
        let (mut engine, handle) = engine(FakeApi::default());
        let before = handle.snapshot();
        engine.handle_command(PlayerCommand::RefreshSettings);
        engine.handle_command(PlayerCommand::RefreshQueue);
        tokio::task::yield_now().await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(engine.cmd_rx.try_recv().is_err());
        assert_eq!(*handle.snapshot(), *before);
    }

    #[tokio::test]
    async fn status_request_does_not_touch_local_queue() {
        let api = FakeApi::default().reply("queue_items", queue_json("pending"));
        let seen = Arc::clone(&api.seen);
        let (mut engine, handle) = engine(api);
        engine.handle_command(PlayerCommand::RefreshQueue);
        complete(&mut engine).await;

        let before = handle.snapshot();
        engine.handle_command(PlayerCommand::RequestStatus(QueueItemStatus::Skipped));
        assert_eq!(*handle.snapshot(), *before);

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        let seen = seen.lock().unwrap();
        let put = seen.iter().find(|r| r.method == Method::Put).unwrap();
        assert_eq!(put.param_value("queue_item.id"), Some("1"));
        assert_eq!(put.param_value("status"), Some("skipped"));
        assert_eq!(*handle.snapshot(), *before);
    }

    #[tokio::test]
    async fn status_request_on_empty_queue_sends_nothing() {
        let api = FakeApi::default();
        let seen = Arc::clone(&api.seen);
        let (mut engine, _handle) = engine(api);
        engine.handle_command(PlayerCommand::RequestStatus(QueueItemStatus::Playing));
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stale_settings_completion_is_discarded() {
        let (mut engine, handle) = engine(FakeApi::default());
        let slow = engine.store.begin_refresh(RefreshKind::Settings);
        let fast = engine.store.begin_refresh(RefreshKind::Settings);

        engine.handle_command(PlayerCommand::SettingsLoaded {
            ticket: fast,
            settings: [(AUTOPLAY.to_string(), SettingValue::from(4.0))].into(),
        });
        engine.handle_command(PlayerCommand::SettingsLoaded {
            ticket: slow,
            settings: [(AUTOPLAY.to_string(), SettingValue::from(9.0))].into(),
        });

        assert_eq!(handle.snapshot().settings.autoplay_seconds(), 4.0);
    }

    #[tokio::test]
    async fn autoplay_requests_playing_once_on_tenth_tick() {
        let api = FakeApi::default().reply("queue_items", queue_json("pending"));
        let seen = Arc::clone(&api.seen);
        let (mut engine, _handle) = engine(api);
        engine.handle_command(PlayerCommand::RefreshQueue);
        complete(&mut engine).await;
        let ticket = engine.store.begin_refresh(RefreshKind::Settings);
        engine.handle_command(PlayerCommand::SettingsLoaded {
            ticket,
            settings: [(AUTOPLAY.to_string(), SettingValue::from(2.0))].into(),
        });
        engine.handle_command(PlayerCommand::AllowAudio);

        let puts = |seen: &Arc<Mutex<Vec<ApiRequest>>>| {
            seen.lock()
                .unwrap()
                .iter()
                .filter(|r| r.method == Method::Put && r.param_value("status") == Some("playing"))
                .count()
        };

        for _ in 0..9 {
            engine.on_tick();
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(puts(&seen), 0);

        engine.on_tick();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert_eq!(puts(&seen), 1);
        assert_eq!(engine.store.snapshot().progress, 2.0);
    }

    #[tokio::test]
    async fn failed_autoplay_start_is_retried() {
        let api = FakeApi::default()
            .reply("queue_items", queue_json("pending"))
            .failing_puts();
        let seen = Arc::clone(&api.seen);
        let (mut engine, _handle) = engine(api);
        engine.handle_command(PlayerCommand::RefreshQueue);
        complete(&mut engine).await;
        let ticket = engine.store.begin_refresh(RefreshKind::Settings);
        engine.handle_command(PlayerCommand::SettingsLoaded {
            ticket,
            settings: [(AUTOPLAY.to_string(), SettingValue::from(1.0))].into(),
        });
        engine.handle_command(PlayerCommand::AllowAudio);

        for _ in 0..20 {
            engine.on_tick();
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            while let Ok(command) = engine.cmd_rx.try_recv() {
                engine.handle_command(command);
            }
        }

        let attempts = seen
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.method == Method::Put && r.param_value("status") == Some("playing"))
            .count();
        assert!(attempts >= 2, "only {attempts} start attempt(s)");
        assert_eq!(
            engine.store.snapshot().head().unwrap().status,
            QueueItemStatus::Pending
        );
    }

    #[tokio::test]
    async fn reopen_resyncs_settings_and_queue_once() {
        let (mut engine, handle) = engine(FakeApi::default());
        let socket = SocketInfo {
            url: "wss://example/ws/".into(),
            attempt: 4,
        };

        handle.on_close();
        handle.on_close();
        handle.on_open(socket.clone());
        drop(handle);

        let mut commands = Vec::new();
        while let Ok(command) = engine.cmd_rx.try_recv() {
            commands.push(command);
        }
        let settings = commands
            .iter()
            .filter(|c| matches!(c, PlayerCommand::RefreshSettings))
            .count();
        let queue = commands
            .iter()
            .filter(|c| matches!(c, PlayerCommand::RefreshQueue))
            .count();
        assert_eq!((settings, queue), (1, 1));

        for command in commands {
            engine.handle_command(command);
        }
        let snapshot = engine.store.snapshot();
        assert!(snapshot.connected);
        assert_eq!(snapshot.socket, Some(socket));
    }

    #[tokio::test]
    async fn websocket_message_routes_through_dispatcher() {
        let (mut engine, handle) = engine(FakeApi::default());
        handle.on_message("queue_updated");
        handle.on_message("Settings");
        assert!(matches!(engine.cmd_rx.try_recv(), Ok(PlayerCommand::RefreshQueue)));
        assert!(engine.cmd_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn config_can_open_audio_gate_up_front() {
        let config = PlayerConfig {
            audio_allowed: true,
            ..PlayerConfig::default()
        };
        let (_engine, handle) = PlayerEngine::from_config(FakeApi::default(), NoLyrics, &config);
        assert!(handle.snapshot().audio_allowed);
    }

    #[tokio::test]
    async fn run_stops_on_quit() {
        let (engine, handle) = engine(FakeApi::default());
        let task = engine.spawn();
        handle.send(PlayerCommand::SetConnected(true));
        handle.quit();
        task.await.unwrap();
        assert!(handle.snapshot().connected);
        assert!(!handle.is_active());
    }
}

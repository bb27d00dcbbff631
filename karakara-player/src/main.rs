use std::io;
use std::time::Duration;

use clap::Parser;
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{self, Event, KeyCode, KeyEventKind},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};

use karakara_core::{
    api::HttpApiClient,
    config::{self, PlayerConfig, Scheme},
    connection::ConnectionManager,
    engine::{PlayerEngine, PlayerHandle},
    input::{self, KeyAction},
    lyrics::HttpLyricsSource,
};

mod logger;
mod state;
mod ui;

use state::AppState;

#[derive(Parser, Debug)]
#[command(version, about = "Player display for a shared karaoke queue")]
struct Args {
    /// Server host, optionally with a port
    #[arg(long, env = "KARAKARA_HOST", default_value = config::DEFAULT_HOST)]
    host: String,
    /// http or https
    #[arg(long, env = "KARAKARA_SCHEME", default_value = "https")]
    scheme: String,
    #[arg(long, env = "KARAKARA_QUEUE", default_value = config::DEFAULT_QUEUE_ID)]
    queue: String,
    /// Websocket port, when it differs from the API port
    #[arg(long, env = "KARAKARA_WS_PORT")]
    ws_port: Option<u16>,
    /// Autoplay ticks per second
    #[arg(long, default_value_t = config::DEFAULT_TICK_RATE)]
    tick_rate: u32,
    #[arg(long, default_value_t = config::DEFAULT_IMAGE_COUNT)]
    image_count: usize,
    /// Open the audio gate without waiting for a key press
    #[arg(long)]
    audio_allowed: bool,
    /// Log to stderr instead of drawing the terminal display
    #[arg(long)]
    headless: bool,
}

impl Args {
    fn config(&self) -> anyhow::Result<PlayerConfig> {
        let config = PlayerConfig {
            host: self.host.clone(),
            scheme: Scheme::parse(&self.scheme)?,
            queue_id: self.queue.clone(),
            ws_port: self.ws_port,
            tick_rate: self.tick_rate,
            image_count: self.image_count,
            audio_allowed: self.audio_allowed,
        };
        config.validate()?;
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::setup_logging(args.headless)?;
    let config = args.config()?;

    log::info!("Starting KaraKara player for queue {} on {}", config.queue_id, config.host);

    let runtime = tokio::runtime::Runtime::new()?;
    let guard = runtime.enter();

    // Create engine and get communication handle
    let (engine, handle) = PlayerEngine::from_config(
        HttpApiClient::new(config.clone()),
        HttpLyricsSource::new(config.clone()),
        &config,
    );
    let engine_task = engine.spawn();

    // The initial settings and queue fetch happens when the socket opens
    let _connection = ConnectionManager::new(config.websocket_url()).connect(handle.clone());
    handle.refresh_images(config.image_count);

    let result = if args.headless {
        runtime.block_on(async {
            tokio::signal::ctrl_c().await?;
            log::info!("interrupted");
            Ok::<(), anyhow::Error>(())
        })
    } else {
        run_tui(&handle, &config)
    };

    handle.quit();
    if let Err(e) = runtime.block_on(engine_task) {
        log::error!("player engine panicked: {}", e);
    }
    drop(guard);
    // The reconnect loop may be parked in a read; don't wait on it
    runtime.shutdown_timeout(Duration::from_millis(500));

    result
}

fn run_tui(handle: &PlayerHandle, config: &PlayerConfig) -> anyhow::Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut state = AppState::new(&config.queue_id, handle.snapshot());

    loop {
        state.update(handle.snapshot());

        terminal.draw(|f| ui::draw(f, &state))?;

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && handle_key(key.code, &mut state, handle) {
                    break;
                }
            }
        }
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    Ok(())
}

/// Browser-style name of a terminal key
fn key_name(code: KeyCode) -> Option<&'static str> {
    match code {
        KeyCode::Char('s') => Some("s"),
        KeyCode::Char(' ') => Some(" "),
        KeyCode::Enter => Some("Enter"),
        KeyCode::Esc => Some("Escape"),
        _ => None,
    }
}

/// Returns true when the player should exit
fn handle_key(code: KeyCode, state: &mut AppState, handle: &PlayerHandle) -> bool {
    if code == KeyCode::Char('q') {
        return true;
    }

    // Any key press counts as the user's permission to play audio
    if !state.snapshot.audio_allowed {
        handle.allow_audio();
    }

    let action = key_name(code).and_then(KeyAction::from_key_name);
    if input::handle_key(action, handle) {
        if let Some(action) = action {
            state.status_message = format!("Requested {}", action.status());
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_keys_map_to_actions() {
        let action = |code| key_name(code).and_then(KeyAction::from_key_name);
        assert_eq!(action(KeyCode::Char('s')), Some(KeyAction::Skip));
        assert_eq!(action(KeyCode::Enter), Some(KeyAction::Confirm));
        assert_eq!(action(KeyCode::Esc), Some(KeyAction::Cancel));
        assert_eq!(action(KeyCode::Char(' ')), Some(KeyAction::Toggle));
        assert_eq!(action(KeyCode::Char('x')), None);
    }

    #[test]
    fn defaults_build_a_valid_config() {
        let args = Args::parse_from(["karakara-player"]);
        let config = args.config().unwrap();
        assert_eq!(config, PlayerConfig::default());
    }

    #[test]
    fn bad_scheme_is_rejected() {
        let args = Args::parse_from(["karakara-player", "--scheme", "ftp"]);
        assert!(args.config().is_err());
    }
}

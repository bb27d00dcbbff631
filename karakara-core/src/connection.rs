use std::time::Duration;

use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};

use crate::store::SocketInfo;

/// Delay before the first reconnect after a drop
pub const INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const GROWTH_FACTOR: f64 = 1.3;
pub const MAX_DELAY: Duration = Duration::from_secs(10);
/// Longest wait for one connect attempt, handshake included
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),
    #[error("connection closed by server: {0}")]
    Closed(String),
    #[error("stream ended")]
    Ended,
}

/// Observer of the persistent channel's lifecycle
pub trait ConnectionListener: Send + Sync + 'static {
    fn on_open(&self, socket: SocketInfo);
    fn on_close(&self);
    /// One trimmed text frame
    fn on_message(&self, text: &str);
    /// The reconnect loop stops once this returns false
    fn is_active(&self) -> bool {
        true
    }
}

/// Exponential reconnect delay with an upper bound
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    factor: f64,
    max: Duration,
    current: Option<Duration>,
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(INITIAL_DELAY, GROWTH_FACTOR, MAX_DELAY)
    }
}

impl Backoff {
    pub fn new(initial: Duration, factor: f64, max: Duration) -> Self {
        Self {
            initial: initial.min(max),
            factor: factor.max(1.0),
            max,
            current: None,
        }
    }

    pub fn next_delay(&mut self) -> Duration {
        let next = match self.current {
            None => self.initial,
            Some(delay) => delay.mul_f64(self.factor).min(self.max),
        };
        self.current = Some(next);
        next
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// Keeps a websocket to the server open for the life of the process
pub struct ConnectionManager {
    url: String,
    backoff: Backoff,
    connect_timeout: Duration,
}

impl ConnectionManager {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            backoff: Backoff::default(),
            connect_timeout: CONNECT_TIMEOUT,
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Spawn the reconnect loop on the current runtime
    pub fn connect<L: ConnectionListener>(self, listener: L) -> JoinHandle<()> {
        tokio::spawn(self.run(listener))
    }

    pub async fn run<L: ConnectionListener>(mut self, listener: L) {
        let mut attempt: u32 = 0;

        while listener.is_active() {
            attempt = attempt.saturating_add(1);
            log::info!("setup_websocket {} (attempt {})", self.url, attempt);

            let attempt_result = tokio::time::timeout(
                self.connect_timeout,
                tokio_tungstenite::connect_async(self.url.as_str()),
            )
            .await;

            match attempt_result {
                Ok(Ok((stream, _response))) => {
                    log::info!("websocket open");
                    self.backoff.reset();
                    listener.on_open(SocketInfo {
                        url: self.url.clone(),
                        attempt,
                    });
                    attempt = 0;

                    let reason = pump(stream, &listener).await;
                    log::warn!("websocket closed: {}", reason);
                    listener.on_close();
                }
                Ok(Err(e)) => log::warn!("websocket connect failed: {}", e),
                Err(_) => log::warn!(
                    "websocket connect timed out after {:?}",
                    self.connect_timeout
                ),
            }

            if !listener.is_active() {
                break;
            }
            let delay = self.backoff.next_delay();
            log::debug!("reconnecting in {:?}", delay);
            tokio::time::sleep(delay).await;
        }

        log::info!("connection manager stopped");
    }
}

/// Deliver frames to `listener` until the channel fails or closes
pub async fn pump<S, L>(mut frames: S, listener: &L) -> ConnectionError
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
    L: ConnectionListener + ?Sized,
{
    while let Some(frame) = frames.next().await {
        match frame {
            Ok(Message::Text(text)) => listener.on_message(text.as_str().trim()),
            Ok(Message::Binary(data)) => {
                log::debug!("ignoring binary frame ({} bytes)", data.len())
            }
            Ok(Message::Close(frame)) => return ConnectionError::Closed(format!("{:?}", frame)),
            // Ping/pong are answered by tungstenite
            Ok(_) => {}
            Err(e) => return ConnectionError::WebSocket(e),
        }
    }
    ConnectionError::Ended
}

use thiserror::Error;

pub const DEFAULT_HOST: &str = "karakara.org.uk";
pub const DEFAULT_QUEUE_ID: &str = "demo";
/// Autoplay ticks per second
pub const DEFAULT_TICK_RATE: u32 = 5;
pub const DEFAULT_IMAGE_COUNT: usize = 25;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("unsupported scheme '{0}' (expected http or https)")]
    InvalidScheme(String),
    #[error("autoplay tick rate must be at least 1")]
    InvalidTickRate,
}

/// Transport scheme of the request/response API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Scheme {
    Http,
    #[default]
    Https,
}

impl Scheme {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        value
            .trim()
            .trim_end_matches(':')
            .to_ascii_lowercase()
            .parse()
            .map_err(|_| ConfigError::InvalidScheme(value.to_string()))
    }

    /// Websocket scheme paired with this transport
    pub fn websocket(self) -> &'static str {
        match self {
            Scheme::Http => "ws",
            Scheme::Https => "wss",
        }
    }
}

/// Startup configuration, read once and never revisited
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerConfig {
    pub host: String,
    pub scheme: Scheme,
    pub queue_id: String,
    /// Port for the websocket when it differs from the API port
    pub ws_port: Option<u16>,
    pub tick_rate: u32,
    pub image_count: usize,
    /// Start with the audio gate already open
    pub audio_allowed: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            scheme: Scheme::default(),
            queue_id: DEFAULT_QUEUE_ID.to_string(),
            ws_port: None,
            tick_rate: DEFAULT_TICK_RATE,
            image_count: DEFAULT_IMAGE_COUNT,
            audio_allowed: false,
        }
    }
}

impl PlayerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::Empty("host"));
        }
        if self.queue_id.trim().is_empty() {
            return Err(ConfigError::Empty("queue id"));
        }
        if self.tick_rate == 0 {
            return Err(ConfigError::InvalidTickRate);
        }
        Ok(())
    }

    /// `{scheme}://{host}/queue/{queue_id}/{endpoint}.json`
    pub fn api_url(&self, endpoint: &str) -> String {
        format!(
            "{}://{}/queue/{}/{}.json",
            self.scheme, self.host, self.queue_id, endpoint
        )
    }

    pub fn attachment_url(&self, location: &str) -> String {
        format!("{}://{}/files/{}", self.scheme, self.host, location)
    }

    pub fn websocket_url(&self) -> String {
        let port = self.ws_port.map(|p| format!(":{p}")).unwrap_or_default();
        format!("{}://{}{}/ws/", self.scheme.websocket(), self.host, port)
    }
}

use std::future::Future;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::PlayerConfig;
use crate::queue::{ItemId, QueueItem, QueueItemStatus};
use crate::settings::SettingsPatch;

pub type ApiResult<T> = Result<T, ApiError>;

/// Upper bound on one API round trip
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },
    #[error("invalid payload: {0}")]
    Payload(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum Method {
    #[strum(serialize = "GET")]
    Get,
    #[strum(serialize = "PUT")]
    Put,
}

/// A call against one endpoint of the queue API
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub endpoint: &'static str,
    pub params: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn get(endpoint: &'static str) -> Self {
        Self {
            method: Method::Get,
            endpoint,
            params: Vec::new(),
        }
    }

    pub fn put(endpoint: &'static str) -> Self {
        Self {
            method: Method::Put,
            endpoint,
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    pub fn param_value(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Request/response transport. Returns the `data` member of a successful reply.
pub trait ApiClient: Send + Sync + 'static {
    fn send(&self, request: ApiRequest) -> impl Future<Output = ApiResult<serde_json::Value>> + Send;
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct SettingsPayload {
    #[serde(default)]
    settings: SettingsPatch,
}

#[derive(Debug, Deserialize)]
struct QueuePayload {
    #[serde(default)]
    queue: Vec<QueueItem>,
}

#[derive(Debug, Deserialize)]
struct ImagesPayload {
    #[serde(default, alias = "thumbnails")]
    images: Vec<String>,
}

/// HTTP implementation backed by reqwest
pub struct HttpApiClient {
    http: reqwest::Client,
    config: PlayerConfig,
}

impl HttpApiClient {
    pub fn new(config: PlayerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                log::warn!("api client without timeout: {}", e);
                reqwest::Client::new()
            });
        Self { http, config }
    }
}

impl ApiClient for HttpApiClient {
    async fn send(&self, request: ApiRequest) -> ApiResult<serde_json::Value> {
        let url = self.config.api_url(request.endpoint);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
        };
        log::debug!("api({} {}) {:?}", request.method, url, request.params);

        let response = self
            .http
            .request(method, &url)
            .query(&request.params)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ApiError::Status {
                endpoint: request.endpoint.to_string(),
                status: response.status().as_u16(),
            });
        }

        let envelope: Envelope = response.json().await?;
        Ok(envelope.data)
    }
}

fn decode<T: DeserializeOwned>(data: serde_json::Value) -> ApiResult<T> {
    Ok(serde_json::from_value(data)?)
}

pub async fn fetch_settings<A: ApiClient>(api: &A) -> ApiResult<SettingsPatch> {
    let data = api.send(ApiRequest::get("settings")).await?;
    decode::<SettingsPayload>(data).map(|p| p.settings)
}

pub async fn fetch_queue<A: ApiClient>(api: &A) -> ApiResult<Vec<QueueItem>> {
    let data = api.send(ApiRequest::get("queue_items")).await?;
    decode::<QueuePayload>(data).map(|p| p.queue)
}

pub async fn fetch_images<A: ApiClient>(api: &A, count: usize) -> ApiResult<Vec<String>> {
    let data = api
        .send(ApiRequest::get("random_images").param("count", count))
        .await?;
    decode::<ImagesPayload>(data).map(|p| p.images)
}

/// Ask the server to move `id` to `status`. The acknowledgement payload is unused.
pub async fn put_status<A: ApiClient>(
    api: &A,
    id: &ItemId,
    status: QueueItemStatus,
) -> ApiResult<()> {
    let request = ApiRequest::put("queue_items")
        .param("queue_item.id", id)
        .param("status", status)
        .param("uncache", cache_buster());
    api.send(request).await.map(|_| ())
}

/// Milliseconds since the epoch, used to defeat intermediate caches
fn cache_buster() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default()
}

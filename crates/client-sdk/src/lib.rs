use std::fmt;

use common::{KeyListing, MessageReply, SetRequest};
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;

/// Failure of a store request, split by what the caller can do about it.
///
/// `detail` carries the server's human-readable explanation when the failure
/// body was JSON with a string `detail` field; anything else (missing body,
/// non-JSON, wrong shape) collapses to `None`.
#[derive(Debug)]
pub enum StoreApiError {
    NotFound { detail: Option<String> },
    Server { status: u16, detail: Option<String> },
    Transport(reqwest::Error),
}

impl StoreApiError {
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::NotFound { detail } | Self::Server { detail, .. } => detail.as_deref(),
            Self::Transport(_) => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl fmt::Display for StoreApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { detail: Some(detail) } => write!(f, "key not found: {detail}"),
            Self::NotFound { detail: None } => write!(f, "key not found"),
            Self::Server { status, detail: Some(detail) } => {
                write!(f, "server error (status {status}): {detail}")
            }
            Self::Server { status, detail: None } => write!(f, "server error (status {status})"),
            Self::Transport(err) => write!(f, "transport failure: {err}"),
        }
    }
}

impl std::error::Error for StoreApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for StoreApiError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err)
    }
}

/// Stateless HTTP client for one store node. Every call goes to the wire;
/// nothing is cached between calls.
#[derive(Clone)]
pub struct StoreClient {
    http: Client,
    base_url: String,
}

impl StoreClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Stores a key. The server's confirmation body is discarded; callers only
    /// learn that the write was accepted.
    pub async fn set(
        &self,
        key: impl Into<String>,
        value: impl Into<String>,
        ttl: Option<u64>,
    ) -> Result<(), StoreApiError> {
        let request = SetRequest {
            key: key.into(),
            value: value.into(),
            ttl,
        };

        let response = self
            .http
            .post(format!("{}/set", self.base_url))
            .json(&request)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    /// Fetches one record verbatim, as whatever JSON the server returned.
    pub async fn get(&self, key: impl AsRef<str>) -> Result<Value, StoreApiError> {
        let key = key.as_ref();

        let response = self
            .http
            .get(format!("{}/get/{key}", self.base_url))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    pub async fn delete(&self, key: impl AsRef<str>) -> Result<(), StoreApiError> {
        let key = key.as_ref();

        let response = self
            .http
            .delete(format!("{}/delete/{key}", self.base_url))
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    pub async fn list_keys(&self) -> Result<KeyListing, StoreApiError> {
        let response = self
            .http
            .get(format!("{}/keys", self.base_url))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Deletes every key. Returns the server's confirmation message.
    pub async fn clear_all(&self) -> Result<String, StoreApiError> {
        let response = self
            .http
            .delete(format!("{}/clear", self.base_url))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let reply: MessageReply = response.json().await?;
        Ok(reply.message)
    }

    /// Fetches the server's statistics document without interpreting it.
    pub async fn stats(&self) -> Result<Value, StoreApiError> {
        let response = self
            .http
            .get(format!("{}/stats", self.base_url))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        Ok(response.json().await?)
    }

    /// Triggers log compaction. The confirmation message is optional on the
    /// wire, so a missing or malformed body is not an error here.
    pub async fn compact(&self) -> Result<Option<String>, StoreApiError> {
        let response = self
            .http
            .post(format!("{}/compact", self.base_url))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let payload = response.json::<Value>().await.ok();
        Ok(payload
            .as_ref()
            .and_then(|body| body.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

/// Maps non-2xx responses to the error taxonomy. The failure body is read
/// only after the status check, so successful responses stay streamable.
async fn ensure_success(response: Response) -> Result<Response, StoreApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.bytes().await.unwrap_or_default();
    let detail = extract_detail(&body);

    if status == StatusCode::NOT_FOUND {
        return Err(StoreApiError::NotFound { detail });
    }

    Err(StoreApiError::Server {
        status: status.as_u16(),
        detail,
    })
}

fn extract_detail(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<Value>(body)
        .ok()?
        .get("detail")?
        .as_str()
        .map(str::to_string)
}

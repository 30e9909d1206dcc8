//! HTTP implementation of [`MatchStore`] against a pitchside server.

use std::time::Duration;

use pitchside_core::{
  clock::Checkpoint,
  event::{Event, Score},
  period::PeriodSchedule,
  status::MatchStatus,
  store::{MatchRecord, MatchStore},
};
use reqwest::{Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use uuid::Uuid;

// ─── Error ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
  #[error("could not build HTTP client: {0}")]
  Build(#[source] reqwest::Error),

  #[error("{method} {path} failed: {source}")]
  Transport {
    method: Method,
    path:   String,
    #[source]
    source: reqwest::Error,
  },

  #[error("{method} {path} → {status}: {message}")]
  Status {
    method:  Method,
    path:    String,
    status:  StatusCode,
    message: String,
  },

  #[error("{method} {path}: unexpected response body: {source}")]
  Decode {
    method: Method,
    path:   String,
    #[source]
    source: reqwest::Error,
  },
}

impl ClientError {
  /// A 4xx answer other than a timeout or rate limit: the server understood
  /// the request and will keep refusing it.
  pub fn is_rejection(&self) -> bool {
    match self {
      Self::Status { status, .. } => {
        status.is_client_error()
          && *status != StatusCode::REQUEST_TIMEOUT
          && *status != StatusCode::TOO_MANY_REQUESTS
      }
      _ => false,
    }
  }
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;

// ─── Client ───────────────────────────────────────────────────────────────────

/// Async HTTP client for the match REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client:   Client,
  base_url: String,
}

impl ApiClient {
  pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
    let client = Client::builder()
      .timeout(timeout)
      .build()
      .map_err(ClientError::Build)?;
    Ok(Self {
      client,
      base_url: base_url.into().trim_end_matches('/').to_string(),
    })
  }

  /// Send a request. Success and 404 responses are returned; every other
  /// status becomes [`ClientError::Status`].
  async fn call(
    &self,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
  ) -> Result<Response> {
    let mut req = self
      .client
      .request(method.clone(), format!("{}{path}", self.base_url));
    if let Some(body) = body {
      req = req.json(&body);
    }
    let resp = req.send().await.map_err(|source| ClientError::Transport {
      method: method.clone(),
      path: path.to_string(),
      source,
    })?;

    let status = resp.status();
    if status.is_success() || status == StatusCode::NOT_FOUND {
      return Ok(resp);
    }
    Err(ClientError::Status {
      method,
      path: path.to_string(),
      status,
      message: error_message(resp).await,
    })
  }

  async fn get_optional<T: DeserializeOwned>(&self, path: String) -> Result<Option<T>> {
    let resp = self.call(Method::GET, &path, None).await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Ok(None);
    }
    decode(Method::GET, &path, resp).await.map(Some)
  }

  /// A write; unlike reads, a 404 here is an error.
  async fn write(
    &self,
    method: Method,
    path: &str,
    body: Option<serde_json::Value>,
  ) -> Result<Response> {
    let resp = self.call(method.clone(), path, body).await?;
    if resp.status() == StatusCode::NOT_FOUND {
      return Err(ClientError::Status {
        method,
        path: path.to_string(),
        status: StatusCode::NOT_FOUND,
        message: error_message(resp).await,
      });
    }
    Ok(resp)
  }
}

async fn decode<T: DeserializeOwned>(method: Method, path: &str, resp: Response) -> Result<T> {
  resp.json().await.map_err(|source| ClientError::Decode {
    method,
    path: path.to_string(),
    source,
  })
}

/// The server's `{"error": "..."}` message, or the raw body.
async fn error_message(resp: Response) -> String {
  let text = resp.text().await.unwrap_or_default();
  serde_json::from_str::<serde_json::Value>(&text)
    .ok()
    .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
    .unwrap_or(text)
}

// ─── MatchStore ───────────────────────────────────────────────────────────────

impl MatchStore for ApiClient {
  type Error = ClientError;

  fn is_rejection(error: &ClientError) -> bool { error.is_rejection() }

  async fn load_match(&self, match_id: Uuid) -> Result<Option<MatchRecord>> {
    self.get_optional(format!("/matches/{match_id}")).await
  }

  async fn save_periods(&self, match_id: Uuid, schedule: PeriodSchedule) -> Result<MatchRecord> {
    let path = format!("/matches/{match_id}/periods");
    let resp = self.write(Method::PUT, &path, Some(json!(schedule))).await?;
    decode(Method::PUT, &path, resp).await
  }

  async fn save_score(&self, match_id: Uuid, score: Score) -> Result<()> {
    let body = json!({ "home_score": score.home, "away_score": score.away });
    let path = format!("/matches/{match_id}/score");
    self.write(Method::PUT, &path, Some(body)).await.map(drop)
  }

  async fn save_status(&self, match_id: Uuid, status: MatchStatus) -> Result<()> {
    let path = format!("/matches/{match_id}/status");
    let body = json!({ "status": status });
    self.write(Method::PUT, &path, Some(body)).await.map(drop)
  }

  async fn load_checkpoint(&self, match_id: Uuid) -> Result<Option<Checkpoint>> {
    self.get_optional(format!("/matches/{match_id}/state")).await
  }

  async fn save_checkpoint(&self, match_id: Uuid, checkpoint: Checkpoint) -> Result<()> {
    let path = format!("/matches/{match_id}/state");
    self
      .write(Method::PUT, &path, Some(json!(checkpoint)))
      .await
      .map(drop)
  }

  /// The backend's state reset also drops the match's events.
  async fn clear_checkpoint(&self, match_id: Uuid) -> Result<()> {
    let path = format!("/matches/{match_id}/state");
    self.write(Method::DELETE, &path, None).await.map(drop)
  }

  async fn append_event(&self, event: Event) -> Result<()> {
    let path = format!("/matches/{}/events", event.match_id);
    self.write(Method::POST, &path, Some(json!(event))).await.map(drop)
  }

  async fn list_events(&self, match_id: Uuid) -> Result<Vec<Event>> {
    Ok(
      self
        .get_optional(format!("/matches/{match_id}/events"))
        .await?
        .unwrap_or_default(),
    )
  }

  async fn clear_events(&self, match_id: Uuid) -> Result<()> {
    let path = format!("/matches/{match_id}/events");
    self.write(Method::DELETE, &path, None).await.map(drop)
  }
}

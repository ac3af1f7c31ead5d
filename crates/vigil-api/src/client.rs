// Admin API HTTP client
//
// Wraps `reqwest::Client` with backend-specific URL construction and action
// envelope unwrapping. Write endpoints all answer with
// `{ "status": "success" }` or `{ "error": "<detail>" }`; anything else is
// treated as a failure, and callers never see the envelope itself.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{InteractionPage, MemoryPage, NewMemory, StatusSnapshot, UserPage};

/// Raw HTTP client for the backend's admin API.
pub struct AdminClient {
    http: reqwest::Client,
    base_url: Url,
}

impl AdminClient {
    /// Create a new admin client from a `TransportConfig`.
    ///
    /// `base_url` is the backend root (e.g. `http://127.0.0.1:5000`).
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create an admin client with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The backend base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Derive the WebSocket URL for the admin event stream.
    pub fn event_socket_url(&self) -> Result<Url, Error> {
        let mut url = self.base_url.join("/admin/events")?;
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| Error::WebSocketConnect("cannot derive ws scheme".into()))?;
        Ok(url)
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Fetch the full system status snapshot.
    pub async fn system_status(&self) -> Result<StatusSnapshot, Error> {
        self.get_json(self.api_url("system/status")?).await
    }

    /// Export analytics for the trailing `days` days as a raw JSON blob.
    ///
    /// The blob is returned untyped: the caller serializes it straight to a
    /// download file without interpreting the rows.
    pub async fn export_analytics(&self, days: u32) -> Result<serde_json::Value, Error> {
        let mut url = self.api_url("analytics/export")?;
        url.query_pairs_mut().append_pair("days", &days.to_string());
        self.get_json(url).await
    }

    // ── Data views ───────────────────────────────────────────────────

    /// One page of recent interactions, newest first.
    pub async fn interactions(&self, page: u32) -> Result<InteractionPage, Error> {
        self.get_json(self.view_url("interactions", page)?).await
    }

    /// One page of users, ordered by most recent interaction.
    pub async fn users(&self, page: u32) -> Result<UserPage, Error> {
        self.get_json(self.view_url("users", page)?).await
    }

    /// One page of stored memories, newest first.
    pub async fn memories(&self, page: u32) -> Result<MemoryPage, Error> {
        self.get_json(self.view_url("memories", page)?).await
    }

    // ── Writes (enveloped) ───────────────────────────────────────────

    /// Set a platform adapter's active flag.
    pub async fn toggle_platform(&self, name: &str, active: bool) -> Result<(), Error> {
        let url = self.api_url(&format!("platform/{name}/toggle"))?;
        let body = serde_json::json!({ "active": active });
        self.post_action(url, Some(&body)).await
    }

    /// Create a memory record.
    pub async fn create_memory(&self, memory: &NewMemory) -> Result<(), Error> {
        let url = self.api_url("memory/create")?;
        let body = serde_json::to_value(memory).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: String::new(),
        })?;
        self.post_action(url, Some(&body)).await
    }

    /// Trigger a vault synchronization pass.
    pub async fn sync_vault(&self) -> Result<(), Error> {
        self.post_action(self.api_url("vault/sync")?, None).await
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Build a full URL under the admin API prefix: `{base}/admin/api/{path}`.
    fn api_url(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(&format!("/admin/api/{path}"))?)
    }

    /// Data views live one level up: `{base}/admin/{view}?format=json&page={page}`.
    fn view_url(&self, view: &str, page: u32) -> Result<Url, Error> {
        let mut url = self.base_url.join(&format!("/admin/{view}"))?;
        url.query_pairs_mut()
            .append_pair("format", "json")
            .append_pair("page", &page.to_string());
        Ok(url)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and decode the JSON body.
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, Error> {
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await.map_err(Error::Transport)?;
        // A non-2xx body is never a snapshot; fail before decoding.
        let resp = resp.error_for_status().map_err(Error::Transport)?;
        let body = resp.text().await.map_err(Error::Transport)?;

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    /// Send a POST and unwrap the `{status}`/`{error}` action envelope.
    async fn post_action(
        &self,
        url: Url,
        body: Option<&serde_json::Value>,
    ) -> Result<(), Error> {
        debug!("POST {}", url);

        let mut req = self.http.post(url);
        if let Some(body) = body {
            req = req.json(body);
        }
        let resp = req.send().await.map_err(Error::Transport)?;
        let text = resp.text().await.map_err(Error::Transport)?;

        parse_action_envelope(&text)
    }
}

/// Interpret an action response body.
///
/// `{"status": "success", ...}` is the only success shape. An `{error}`
/// envelope carries the server-provided detail; any other shape (including
/// non-JSON) is reported as an unexpected response.
fn parse_action_envelope(body: &str) -> Result<(), Error> {
    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: body.to_owned(),
        })?;

    if value["status"] == "success" {
        return Ok(());
    }

    match value["error"].as_str() {
        Some(detail) => Err(Error::Backend {
            message: detail.to_owned(),
        }),
        None => Err(Error::Backend {
            message: format!("unexpected response shape: {value}"),
        }),
    }
}

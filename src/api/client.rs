// src/api/client.rs
// REST client for the Ares Club backend

use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::config::ClientConfig;
use crate::error::{AresError, Result};
use crate::types::{
    ChatMessage, ContactReceipt, ContactRequest, FaqItem, Game, LoginRequest, LoginResponse,
    PaymentMethod, Promotion, User,
};

/// `{success, data, total}` wrapper used by every list endpoint.
///
/// A missing or null `data` decodes to an empty list. Rows are decoded one
/// at a time so a single malformed row is skipped instead of failing the list.
#[derive(Debug, Deserialize)]
struct ListEnvelope {
    success: Option<bool>,
    data: Option<Vec<serde_json::Value>>,
}

impl ListEnvelope {
    fn into_items<T: DeserializeOwned>(self, path: &str) -> Vec<T> {
        self.data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|row| match serde_json::from_value(row) {
                Ok(item) => Some(item),
                Err(e) => {
                    warn!(path, "Skipping malformed row: {}", e);
                    None
                }
            })
            .collect()
    }
}

/// FastAPI-style error body; `detail` is a string for handled errors
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    detail: Option<serde_json::Value>,
}

/// Stateless-per-call client for the REST API
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client for `base_url`. No timeout is applied unless one is given.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let parsed = Url::parse(base_url)?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(AresError::Config(format!(
                "backend URL must be http or https, got {}",
                parsed.scheme()
            )));
        }

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Self::new(&config.backend_url, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ========================================================================
    // MARKETING CONTENT
    // ========================================================================

    pub async fn fetch_games(&self) -> Result<Vec<Game>> {
        self.fetch_list("/api/games").await
    }

    pub async fn fetch_promotions(&self) -> Result<Vec<Promotion>> {
        self.fetch_list("/api/promotions").await
    }

    pub async fn fetch_payment_methods(&self) -> Result<Vec<PaymentMethod>> {
        self.fetch_list("/api/payment-methods").await
    }

    pub async fn fetch_faq(&self) -> Result<Vec<FaqItem>> {
        self.fetch_list("/api/faq").await
    }

    async fn fetch_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>> {
        let envelope: ListEnvelope = self.execute(self.http.get(self.url(path))).await?;
        Ok(envelope.into_items(path))
    }

    // ========================================================================
    // AUTH
    // ========================================================================

    /// Exchange credentials for a bearer token
    pub async fn login(&self, credentials: &LoginRequest) -> Result<LoginResponse> {
        let request = self.http.post(self.url("/api/auth/login")).json(credentials);
        self.execute(request).await
    }

    /// Fetch the profile the token belongs to
    pub async fn me(&self, token: &str) -> Result<User> {
        let request = self.http.get(self.url("/api/auth/me")).bearer_auth(token);
        self.execute(request).await
    }

    // ========================================================================
    // CHAT
    // ========================================================================

    /// Chat history snapshot. `success: false` is treated as an empty history.
    pub async fn fetch_chat_messages(&self) -> Result<Vec<ChatMessage>> {
        const PATH: &str = "/api/chat/messages";
        let envelope: ListEnvelope = self.execute(self.http.get(self.url(PATH))).await?;
        if envelope.success == Some(false) {
            return Ok(Vec::new());
        }
        Ok(envelope.into_items(PATH))
    }

    /// Admin-only send; the backend broadcasts the message on the realtime channel
    pub async fn send_chat_message(&self, token: &str, message: &str) -> Result<()> {
        let request = self
            .http
            .post(self.url("/api/chat/send"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "message": message }));
        let _: serde_json::Value = self.execute(request).await?;
        Ok(())
    }

    // ========================================================================
    // MISC
    // ========================================================================

    pub async fn health(&self) -> Result<serde_json::Value> {
        self.execute(self.http.get(self.url("/api/health"))).await
    }

    pub async fn contact(&self, request: &ContactRequest) -> Result<ContactReceipt> {
        self.execute(self.http.post(self.url("/api/contact")).json(request)).await
    }

    /// Send a request and decode a 2xx JSON body, mapping other statuses to `AresError::Status`
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let response = Self::check_status(response).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn check_status(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let url = response.url().clone();
        let body = response.text().await.unwrap_or_default();
        let detail = parse_detail(&body);
        debug!(%url, status = status.as_u16(), ?detail, "Request rejected");

        Err(AresError::Status {
            status: status.as_u16(),
            detail,
        })
    }
}

/// Extract a human-readable `detail` from an error body
fn parse_detail(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    match parsed.detail? {
        serde_json::Value::String(s) => Some(s),
        serde_json::Value::Null => None,
        other => Some(other.to_string()),
    }
}

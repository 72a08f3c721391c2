// src/login.rs
// Single-shot admin login form

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::error::AresError;
use crate::session::SessionStore;
use crate::types::{LoginRequest, Session};

/// Shown when the backend gives no usable reason
pub const LOGIN_FALLBACK_ERROR: &str = "Login failed";

/// Set on a successful login whose session could not be written to storage
pub const SESSION_NOT_SAVED: &str = "Logged in for now, but the session could not be saved";

/// Login form state. Fields survive a failed submit.
#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
    pub error: Option<String>,
    pub loading: bool,
}

impl LoginForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// POST the credentials and persist the session on success.
    ///
    /// Returns the new session for the page shell to adopt. On failure the
    /// form keeps its input and `error` holds the message to show.
    ///
    /// If the store rejects the session the login still succeeds for this
    /// process, but `error` is set to [`SESSION_NOT_SAVED`] since the identity
    /// will not survive a restart.
    pub async fn submit(&mut self, api: &ApiClient, store: &SessionStore) -> Option<Session> {
        self.loading = true;
        self.error = None;

        let request = LoginRequest {
            username: self.username.clone(),
            password: self.password.clone(),
        };
        let result = api.login(&request).await;
        self.loading = false;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(username = %self.username, "Login failed: {}", e);
                self.error = Some(login_error_message(&e));
                return None;
            }
        };

        if let Err(e) = store.save(&response.user, &response.access_token) {
            warn!(username = %response.user.username, "Failed to persist session: {}", e);
            self.error = Some(SESSION_NOT_SAVED.to_string());
        }
        info!(username = %response.user.username, admin = response.user.is_admin, "Logged in");

        self.username.clear();
        self.password.clear();
        Some(Session::new(response.user, response.access_token))
    }
}

/// Server `detail` when present, otherwise the generic fallback
pub fn login_error_message(error: &AresError) -> String {
    error
        .detail()
        .filter(|detail| !detail.trim().is_empty())
        .unwrap_or(LOGIN_FALLBACK_ERROR)
        .to_string()
}

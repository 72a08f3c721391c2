// src/session/store.rs
// Session persistence: bearer token + user profile under fixed keys

use std::sync::Arc;
use tracing::{debug, warn};

use super::storage::Storage;
use crate::error::Result;
use crate::types::{Session, User};

/// Storage key for the opaque bearer token
pub const TOKEN_KEY: &str = "token";
/// Storage key for the serialized user profile
pub const USER_KEY: &str = "user";

/// Loads, saves and clears the persisted session
#[derive(Clone)]
pub struct SessionStore {
    storage: Arc<dyn Storage>,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Restore the persisted session.
    ///
    /// Returns `None` unless both keys are present. A user entry that does not
    /// parse clears both keys; storage read failures are logged and treated as
    /// no session.
    pub fn load(&self) -> Option<Session> {
        let token = self.read(TOKEN_KEY)?;
        let raw_user = self.read(USER_KEY)?;

        match serde_json::from_str::<User>(&raw_user) {
            Ok(user) => {
                debug!(username = %user.username, "Restored session");
                Some(Session::new(user, token))
            }
            Err(e) => {
                warn!("Discarding corrupt stored user: {}", e);
                if let Err(e) = self.clear() {
                    warn!("Failed to clear corrupt session: {}", e);
                }
                None
            }
        }
    }

    /// Persist the user and token
    pub fn save(&self, user: &User, token: &str) -> Result<()> {
        self.storage.set(TOKEN_KEY, token)?;
        self.storage.set(USER_KEY, &serde_json::to_string(user)?)?;
        debug!(username = %user.username, "Saved session");
        Ok(())
    }

    /// Remove both keys
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(TOKEN_KEY)?;
        self.storage.remove(USER_KEY)?;
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, "Failed to read session storage: {}", e);
                None
            }
        }
    }
}

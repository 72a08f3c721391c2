// src/page/shell.rs
// Landing page state: identity, marketing sections and loading lifecycle

use tracing::{debug, info, warn};

use super::carousel::Carousel;
use crate::api::ApiClient;
use crate::error::Result;
use crate::session::SessionStore;
use crate::types::{FaqItem, Game, PaymentMethod, Promotion, Session};

/// WhatsApp deep link used by every call to action
pub const WHATSAPP_URL: &str =
    "https://wa.me/5491178419956?text=Hola!%20Buenas!!%20vengo%20por%20mi%20usuario%20de%20la%20suerte%20%F0%9F%8D%80";

/// Marketing sections. A section whose fetch failed is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    pub games: Vec<Game>,
    pub promotions: Vec<Promotion>,
    pub payment_methods: Vec<PaymentMethod>,
    pub faq: Vec<FaqItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Loading,
    Ready(PageContent),
}

pub struct PageShell {
    api: ApiClient,
    store: SessionStore,
    session: Option<Session>,
    state: LoadState,
    carousel: Carousel,
}

impl PageShell {
    /// Restore the persisted session and start in the loading state
    pub fn mount(api: ApiClient, store: SessionStore) -> Self {
        let session = store.load();
        if let Some(session) = &session {
            debug!(username = %session.user.username, "Mounted with stored session");
        }
        Self {
            api,
            store,
            session,
            state: LoadState::Loading,
            carousel: Carousel::hero(),
        }
    }

    /// Fetch all four sections concurrently and leave the loading state.
    ///
    /// Individual failures are logged and render as empty sections.
    pub async fn load(&mut self) -> &LoadState {
        let (games, promotions, payment_methods, faq) = tokio::join!(
            self.api.fetch_games(),
            self.api.fetch_promotions(),
            self.api.fetch_payment_methods(),
            self.api.fetch_faq(),
        );

        let content = PageContent {
            games: or_empty("games", games),
            promotions: or_empty("promotions", promotions),
            payment_methods: or_empty("payment methods", payment_methods),
            faq: or_empty("faq", faq),
        };
        info!(
            games = content.games.len(),
            promotions = content.promotions.len(),
            payment_methods = content.payment_methods.len(),
            faq = content.faq.len(),
            "Page loaded"
        );

        self.state = LoadState::Ready(content);
        &self.state
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, LoadState::Loading)
    }

    pub fn content(&self) -> Option<&PageContent> {
        match &self.state {
            LoadState::Ready(content) => Some(content),
            LoadState::Loading => None,
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Adopt the session produced by a successful login
    pub fn adopt_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Clear the stored session and forget the identity
    pub fn logout(&mut self) -> Result<()> {
        self.store.clear()?;
        if let Some(session) = self.session.take() {
            info!(username = %session.user.username, "Logged out");
        }
        Ok(())
    }

    pub fn carousel(&self) -> &Carousel {
        &self.carousel
    }

    pub fn carousel_mut(&mut self) -> &mut Carousel {
        &mut self.carousel
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn store(&self) -> &SessionStore {
        &self.store
    }
}

fn or_empty<T>(section: &str, result: Result<Vec<T>>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        warn!(section, "Failed to fetch section: {}", e);
        Vec::new()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemoryStorage;
    use crate::types::User;
    use std::sync::Arc;

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryStorage::new()))
    }

    fn unreachable_api() -> ApiClient {
        ApiClient::new("http://127.0.0.1:9", None).unwrap()
    }

    #[tokio::test]
    async fn test_load_with_dead_backend_renders_empty_sections() {
        let mut page = PageShell::mount(unreachable_api(), store());
        assert!(page.is_loading());
        assert!(page.content().is_none());

        let state = page.load().await.clone();
        assert_eq!(state, LoadState::Ready(PageContent::default()));
        assert_eq!(page.content(), Some(&PageContent::default()));
    }

    #[test]
    fn test_mount_restores_session() {
        let store = store();
        store.save(&User::new("admin", true), "tok").unwrap();

        let page = PageShell::mount(unreachable_api(), store);
        let session = page.session().unwrap();
        assert_eq!(session.token, "tok");
        assert!(session.is_admin());
    }

    #[test]
    fn test_logout_clears_store_and_session() {
        let store = store();
        store.save(&User::new("admin", true), "tok").unwrap();
        let mut page = PageShell::mount(unreachable_api(), store.clone());

        page.logout().unwrap();
        assert!(page.session().is_none());
        assert!(store.load().is_none());

        // Logging out twice is harmless
        page.logout().unwrap();
    }

    #[test]
    fn test_adopt_session_after_login() {
        let mut page = PageShell::mount(unreachable_api(), store());
        assert!(page.session().is_none());
        page.adopt_session(Session::new(User::new("admin", true), "fresh"));
        assert_eq!(page.session().unwrap().token, "fresh");
    }
}
